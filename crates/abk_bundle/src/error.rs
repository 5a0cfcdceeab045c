//! Error types for package operations.
//!
//! All fallible functions in this crate return [`Result<T>`]. External error
//! types (IO, binrw, msgpack, image decoding) convert automatically via `From`.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("binary layout error: {0}")]
    BinRw(#[from] binrw::Error),

    #[error("object encoding error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("object decoding error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("invalid package magic: {0:02x?}")]
    InvalidMagic([u8; 8]),

    #[error("unsupported package version: {0}")]
    UnsupportedVersion(u32),

    #[error("invalid blob kind {kind} for '{name}'")]
    InvalidBlobKind { name: String, kind: u8 },

    #[error("invalid compression type {compression} for '{name}'")]
    InvalidCompression { name: String, compression: u8 },

    #[error("checksum mismatch for '{name}': expected {expected:016x}, got {actual:016x}")]
    ChecksumMismatch {
        name: String,
        expected: u64,
        actual: u64,
    },

    /// The template does not have the one-family shape the renamer expects.
    /// Fatal for the item being built; nothing is repaired.
    #[error("malformed template: {0}")]
    MalformedTemplate(String),

    /// No artwork with a recognized extension was found for an item.
    #[error("no source image found in {0}")]
    MissingSourceAsset(Utf8PathBuf),

    /// The artwork was found but cannot be rasterized.
    #[error("unsupported source image: {0}")]
    UnsupportedImage(Utf8PathBuf),
}

impl Error {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedTemplate(message.into())
    }
}
