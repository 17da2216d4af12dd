// src/core/options.rs

use serde::{Deserialize, Serialize};

use crate::config::DefaultOptions;
use crate::core::error::ValidationError;
use crate::core::models::ResolvedOptions;

/// Highest accepted intensity (maps onto nmap's `-T0`..`-T5`).
pub const MAX_INTENSITY: u8 = 5;

/// Per-request options as received from the caller; unset fields fall back to config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    pub port_range: Option<String>,
    pub intensity: Option<u8>,
    pub timeout_seconds: Option<u64>,
}

impl ScanOptions {
    pub fn resolve(&self, defaults: &DefaultOptions) -> Result<ResolvedOptions, ValidationError> {
        let port_range = self
            .port_range
            .as_deref()
            .unwrap_or(&defaults.port_range)
            .split_whitespace()
            .collect::<String>();
        validate_port_range(&port_range)?;

        let intensity = self.intensity.unwrap_or(defaults.intensity);
        if intensity > MAX_INTENSITY {
            return Err(ValidationError::InvalidIntensity(intensity));
        }

        let timeout_seconds = self.timeout_seconds.unwrap_or(defaults.timeout_seconds);
        if timeout_seconds == 0 {
            return Err(ValidationError::InvalidTimeout);
        }

        Ok(ResolvedOptions { port_range, intensity, timeout_seconds })
    }
}

/// Accepts a comma list of ports or `start-end` ranges within 1-65535.
fn validate_port_range(range: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidPortRange(range.to_string());
    if range.is_empty() {
        return Err(invalid());
    }
    for part in range.split(',') {
        let (start, end) = match part.split_once('-') {
            Some((s, e)) => (parse_port(s).ok_or_else(invalid)?, parse_port(e).ok_or_else(invalid)?),
            None => {
                let p = parse_port(part).ok_or_else(invalid)?;
                (p, p)
            }
        };
        if start > end {
            return Err(invalid());
        }
    }
    Ok(())
}

fn parse_port(s: &str) -> Option<u16> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<u16>().ok().filter(|&p| p >= 1)
}
