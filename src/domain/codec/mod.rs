//! Entry encoding and compression

mod compression;
mod entry_codec;

pub use compression::CompressionType;
pub use entry_codec::EntryCodec;
