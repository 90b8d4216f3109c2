//! Config error type.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The layer is not well-formed JSON5.
    #[error("{layer}: malformed JSON5: {source}")]
    Syntax {
        layer: String,
        #[source]
        source: json5::Error,
    },
    /// A key the schema does not know about.
    #[error("{layer}: unknown key `{key}`")]
    UnknownKey { layer: String, key: String },
    /// A known key holding a value of the wrong shape or out of range.
    #[error("{layer}: `{key}` {problem}")]
    BadValue {
        layer: String,
        key: String,
        problem: String,
    },
    #[error("config does not decode: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn bad_value(layer: &str, key: &str, problem: impl Into<String>) -> Self {
        Self::BadValue {
            layer: layer.to_string(),
            key: key.to_string(),
            problem: problem.into(),
        }
    }
}
