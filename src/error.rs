//! Library error type.

use uuid::Uuid;

/// Errors produced by the API client, the configuration loader and the
/// upload pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("request to {url} failed: {status} - {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("invalid upload destination: {0}")]
    Destination(String),

    #[error("no upload destination returned for asset {0}")]
    MissingDestination(Uuid),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("capacity allocation failed: {0}")]
    Allocation(#[source] Box<Error>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
