//! Compression transforms applied to encoded entries

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Deserialize;

use crate::domain::CacheAsideError;

const ZSTD_LEVEL: i32 = 0;

/// Compression algorithm applied to stored entries
///
/// The stored bytes carry no marker of the algorithm used, so readers and
/// writers must be configured identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionType {
    #[default]
    None,
    Gzip,
    Zstd,
}

impl std::fmt::Display for CompressionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompressionType::None => write!(f, "none"),
            CompressionType::Gzip => write!(f, "gzip"),
            CompressionType::Zstd => write!(f, "zstd"),
        }
    }
}

impl std::str::FromStr for CompressionType {
    type Err = CacheAsideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "" => Ok(CompressionType::None),
            "gzip" | "gz" => Ok(CompressionType::Gzip),
            "zstd" | "zstandard" => Ok(CompressionType::Zstd),
            _ => Err(CacheAsideError::configuration(format!(
                "Unknown compression type: {}. Valid types: none, gzip, zstd",
                s
            ))),
        }
    }
}

impl CompressionType {
    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CacheAsideError> {
        match self {
            CompressionType::None => Ok(data.to_vec()),
            CompressionType::Gzip => gzip_compress(data),
            CompressionType::Zstd => zstd::encode_all(data, ZSTD_LEVEL)
                .map_err(|e| CacheAsideError::encoding(format!("cannot write to zstd: {}", e))),
        }
    }

    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CacheAsideError> {
        match self {
            CompressionType::None => Ok(data.to_vec()),
            CompressionType::Gzip => gzip_decompress(data),
            CompressionType::Zstd => zstd::decode_all(data)
                .map_err(|e| CacheAsideError::decoding(format!("cannot read zstd: {}", e))),
        }
    }
}

fn gzip_compress(data: &[u8]) -> Result<Vec<u8>, CacheAsideError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| CacheAsideError::encoding(format!("cannot write to gzip: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| CacheAsideError::encoding(format!("cannot close gzip writer: {}", e)))
}

fn gzip_decompress(data: &[u8]) -> Result<Vec<u8>, CacheAsideError> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| CacheAsideError::decoding(format!("cannot read gzip: {}", e)))?;
    Ok(out)
}
