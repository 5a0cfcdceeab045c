//! Error types for batch runs.
//!
//! [`Error`] covers both batch-fatal failures (bad configuration, unreadable
//! inputs root, manifest IO) and the per-item failures that are caught and
//! recorded in the [`BatchReport`](crate::BatchReport).

use camino::Utf8PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Bundle(#[from] abk_bundle::Error),

    #[error(transparent)]
    Registry(#[from] abk_registry::Error),

    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("inputs directory not found: {0}")]
    InputsNotFound(Utf8PathBuf),

    #[error("template not found: {0}")]
    TemplateNotFound(Utf8PathBuf),

    #[error("path is not valid UTF-8: {0}")]
    NonUtf8Path(std::path::PathBuf),

    #[error("item panicked: {0}")]
    ItemPanicked(String),
}

/// Render `error` and its sources as `outer: inner: root`, dropping sources whose
/// message is already part of the previous one.
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut last = rendered.clone();
    let mut source = error.source();
    while let Some(cause) = source {
        let message = cause.to_string();
        if !last.contains(&message) {
            rendered.push_str(": ");
            rendered.push_str(&message);
        }
        last = message;
        source = cause.source();
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_chain_skips_repeated_messages() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let error = Error::Bundle(abk_bundle::Error::Io(io));
        assert_eq!(error_chain(&error), "IO error: gone");
    }

    #[test]
    fn test_error_chain_appends_distinct_sources() {
        let error = Error::Registry(abk_registry::Error::Persist {
            path: "ids.csv".into(),
            source: tempfile::PersistError {
                error: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                file: tempfile::NamedTempFile::new().unwrap(),
            },
        });
        let chain = error_chain(&error);
        assert!(chain.starts_with("failed to replace ids.csv"));
        assert!(chain.contains("disk full"));
    }
}
