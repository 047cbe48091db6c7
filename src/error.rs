use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised by the search pipeline and the settings layer.
#[derive(Error, Debug)]
pub enum SearchError {
    /// Missing or unusable configuration, detected before any request is made.
    #[error("settings error: {0}")]
    Config(String),

    /// The API answered with a non-success status that is not handled as
    /// throttling.
    #[error("invalid status code {status} for {url}")]
    Status { status: StatusCode, url: String },

    /// The request itself failed: connect error, timeout, bad URL.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A returned record does not match the expected shape.
    #[error("malformed record: {0}")]
    MalformedRecord(#[from] serde_json::Error),

    /// A worker task panicked or was cancelled before its result was
    /// collected.
    #[error("worker task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings file is not valid TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("could not serialize settings: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}
