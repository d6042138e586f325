//! Error types for the scraper.
//!
//! Every failure is fatal for the run: errors bubble up with `?` to the
//! binary, which prints them and exits non-zero. Unknown properties are not
//! errors, they are `warn!` events emitted by the row builder.

use thiserror::Error;

/// A property value that cannot be rendered as a row field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowError {
    #[error("cannot render {property} of {item}: {reason}")]
    Unrenderable {
        item: String,
        property: String,
        reason: String,
    },
}

/// Failures talking to the SPARQL endpoint or the entity API.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error {code}: {info}")]
    Api { code: String, info: String },

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Failures writing rows to the local table.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Invalid identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("Row is missing unique key '{key}'")]
    MissingKey { key: String },
}

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Top-level error for a scrape run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("No ids returned by the query endpoint")]
    NoIds,

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Row(#[from] RowError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Export(#[from] crate::serialization::SerializationError),
}
