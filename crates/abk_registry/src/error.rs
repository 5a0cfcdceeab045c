//! Error types for the registry crate.

use camino::Utf8PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("binary layout error: {0}")]
    BinRw(#[from] binrw::Error),

    #[error("failed to replace {path}: {source}")]
    Persist {
        path: Utf8PathBuf,
        #[source]
        source: tempfile::PersistError,
    },

    /// Keys are stored one per line, so they must be non-empty single-line strings.
    #[error("invalid identifier key {0:?}")]
    InvalidKey(String),

    /// The id table could not be parsed. Never skipped: a dropped record could
    /// lead to an id being issued twice.
    #[error("corrupt id table {path} at line {line}: {reason}")]
    CorruptTable {
        path: Utf8PathBuf,
        line: usize,
        reason: String,
    },

    #[error("identifier space exhausted")]
    IdOverflow,

    #[error("unsupported manifest version: {0}")]
    UnsupportedManifestVersion(u32),
}
