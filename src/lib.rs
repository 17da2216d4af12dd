// src/lib.rs

pub mod config;
pub mod core;
pub mod logging;

pub use crate::config::ScannerConfig;
pub use crate::core::error::{ConfigError, ValidationError};
pub use crate::core::fingerprints::FingerprintLibrary;
pub use crate::core::models::{Finding, FingerprintReport, MatchResult, ScanResult, ScanStatus};
pub use crate::core::options::ScanOptions;
pub use crate::core::scanner::Scanner;
pub use crate::core::target::Target;
