// src/core/error.rs

use std::path::PathBuf;

use thiserror::Error;

/// Rejects a request before any probe is dispatched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid target: {0:?} is neither an IPv4 address nor a domain name")]
    InvalidTarget(String),
    #[error("unsupported scan kind: {0:?}")]
    UnsupportedScanKind(String),
    #[error("invalid port range: {0:?}")]
    InvalidPortRange(String),
    #[error("invalid intensity {0}: expected 0-5")]
    InvalidIntensity(u8),
    #[error("timeout must be greater than zero seconds")]
    InvalidTimeout,
}

/// Configuration or fingerprint library problems. Fatal at startup, never per request.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("configuration file {0} does not exist")]
    MissingFile(PathBuf),
    #[error("invalid configuration: {0}")]
    Invalid(#[from] figment::Error),
    #[error("failed to parse {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("fingerprint {fingerprint:?} has an invalid meta selector {selector:?}")]
    InvalidSelector { fingerprint: String, selector: String },
    #[error("fingerprint {fingerprint:?} has an empty {category} pattern")]
    EmptyPattern { fingerprint: String, category: &'static str },
    #[error("fingerprint library {0} contains no fingerprints")]
    EmptyLibrary(String),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
