use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("Configuration file not found: {path}")]
    #[diagnostic(
        code(config::not_found),
        help("Run 'jacket-forge config init' to create a forge.toml, or omit --config to use defaults")
    )]
    ConfigNotFound { path: Utf8PathBuf },

    #[error("Configuration file error: {path}")]
    #[diagnostic(
        code(config::parse_error),
        help("Check forge.toml for syntax errors and unknown value types")
    )]
    ConfigParseError {
        path: Utf8PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Configuration file already exists: {path}")]
    #[diagnostic(
        code(config::exists),
        help("Pass --force to overwrite it with the defaults")
    )]
    ConfigExists { path: Utf8PathBuf },

    #[error("Batch failed")]
    #[diagnostic(
        code(batch::failed),
        help("Check the template, inputs and output paths in forge.toml")
    )]
    Batch {
        #[from]
        source: abk_batch::Error,
    },

    #[error("{count} item(s) failed")]
    #[diagnostic(
        code(batch::items_failed),
        help("Failed items are listed above and in the log; fix them and re-run, finished items are skipped")
    )]
    ItemsFailed { count: usize },

    #[error("Registry operation failed")]
    #[diagnostic(
        code(registry::failed),
        help("Make sure the id table and manifest paths are writable and not corrupted")
    )]
    Registry {
        #[from]
        source: abk_registry::Error,
    },

    #[error("Package operation failed")]
    #[diagnostic(code(package::failed))]
    Package {
        #[from]
        source: abk_bundle::Error,
    },

    #[error("File not found: {path}")]
    #[diagnostic(
        code(file::not_found),
        help("Make sure the file exists and the path is correct")
    )]
    FileNotFound { path: Utf8PathBuf },

    #[error("IO operation failed")]
    #[diagnostic(code(io::operation_failed))]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

impl CliError {
    pub fn config_not_found(path: Utf8PathBuf) -> Self {
        Self::ConfigNotFound { path }
    }

    pub fn config_parse_error(path: Utf8PathBuf, source: toml::de::Error) -> Self {
        Self::ConfigParseError { path, source }
    }

    pub fn file_not_found(path: Utf8PathBuf) -> Self {
        Self::FileNotFound { path }
    }
}
