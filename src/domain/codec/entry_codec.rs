//! Entry codec: JSON then compression

use crate::domain::cache::CacheEntry;
use crate::domain::CacheAsideError;

use super::CompressionType;

/// Turns entries into backend bytes and back
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryCodec {
    compression: CompressionType,
}

impl EntryCodec {
    pub fn new(compression: CompressionType) -> Self {
        Self { compression }
    }

    pub fn compression(&self) -> CompressionType {
        self.compression
    }

    pub fn encode(&self, entry: &CacheEntry) -> Result<Vec<u8>, CacheAsideError> {
        let json = serde_json::to_vec(entry)
            .map_err(|e| CacheAsideError::encoding(format!("unable to marshal entry: {}", e)))?;
        self.compression.compress(&json)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<CacheEntry, CacheAsideError> {
        let json = self.compression.decompress(bytes)?;
        serde_json::from_slice(&json)
            .map_err(|e| CacheAsideError::decoding(format!("unable to unmarshal entry: {}", e)))
    }
}
