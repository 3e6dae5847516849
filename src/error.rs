// Error types shared across modules
use thiserror::Error;

/// Failures talking to the remote catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("catalog returned status {status} for {path}")]
    Status { status: u16, path: String },

    #[error("failed to parse catalog response from {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// Failures loading or saving the settings file
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}
