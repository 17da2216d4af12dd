// src/core/fingerprints.rs

use std::collections::BTreeMap;
use std::path::Path;

use scraper::Selector;
use serde::Deserialize;
use tracing::{debug, info};

use crate::core::error::ConfigError;

/// The library shipped inside the binary.
const BUNDLED_LIBRARY: &str = include_str!("../../data/fingerprints.json");

/// A meta-tag locator plus the substring its `content` attribute must contain.
#[derive(Debug, Clone)]
pub struct MetaTagRule {
    pub locator: String,
    pub selector: Selector,
    pub contains: String,
}

/// A response header (matched case-insensitively by name and value) and expected substring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRule {
    pub name: String,
    pub contains: String,
}

/// A named technology signature. An empty expected substring means "present at all".
#[derive(Debug, Clone)]
pub struct FingerprintDefinition {
    pub name: String,
    pub meta_tag_rules: Vec<MetaTagRule>,
    pub url_substrings: Vec<String>,
    pub header_rules: Vec<HeaderRule>,
    pub cookie_substrings: Vec<String>,
}

impl FingerprintDefinition {
    pub fn rule_count(&self) -> usize {
        self.meta_tag_rules.len() + self.url_substrings.len() + self.header_rules.len() + self.cookie_substrings.len()
    }
}

/// Read-only fingerprint arena, loaded once at startup and shared behind an `Arc`.
///
/// Keyed by name, so iteration is alphabetical.
#[derive(Debug, Clone)]
pub struct FingerprintLibrary {
    fingerprints: BTreeMap<String, FingerprintDefinition>,
}

// --- On-disk Format ---

#[derive(Debug, Deserialize)]
struct RawFingerprint {
    #[serde(default)]
    meta: Vec<RawMetaRule>,
    #[serde(default)]
    url: Vec<String>,
    #[serde(default)]
    headers: Vec<RawHeaderRule>,
    #[serde(default)]
    cookies: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawMetaRule {
    selector: String,
    #[serde(default)]
    contains: String,
}

#[derive(Debug, Deserialize)]
struct RawHeaderRule {
    name: String,
    #[serde(default)]
    contains: String,
}

impl FingerprintLibrary {
    pub fn bundled() -> Result<Self, ConfigError> {
        Self::from_json(BUNDLED_LIBRARY, "bundled fingerprint library")
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_json(&text, &path.display().to_string())
    }

    /// Loads the configured library, or the bundled one when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let library = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::bundled()?,
        };
        info!(fingerprints = library.len(), "Fingerprint library loaded.");
        Ok(library)
    }

    pub fn from_json(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let raw: BTreeMap<String, RawFingerprint> = serde_json::from_str(text)
            .map_err(|source| ConfigError::Parse { origin: origin.to_string(), source })?;
        if raw.is_empty() {
            return Err(ConfigError::EmptyLibrary(origin.to_string()));
        }

        let mut fingerprints = BTreeMap::new();
        for (name, def) in raw {
            let definition = compile(&name, def)?;
            debug!(fingerprint = %name, rules = definition.rule_count(), "Compiled fingerprint.");
            fingerprints.insert(name, definition);
        }
        Ok(Self { fingerprints })
    }

    pub fn get(&self, name: &str) -> Option<&FingerprintDefinition> {
        self.fingerprints.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FingerprintDefinition> {
        self.fingerprints.values()
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }
}

fn compile(name: &str, raw: RawFingerprint) -> Result<FingerprintDefinition, ConfigError> {
    let meta_tag_rules = raw
        .meta
        .into_iter()
        .map(|rule| {
            let selector = Selector::parse(&rule.selector).map_err(|_| ConfigError::InvalidSelector {
                fingerprint: name.to_string(),
                selector: rule.selector.clone(),
            })?;
            Ok(MetaTagRule { locator: rule.selector, selector, contains: rule.contains })
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

    // Only meta and header rules have a presence-only form.
    for (category, needles) in [("url", &raw.url), ("cookies", &raw.cookies)] {
        if needles.iter().any(String::is_empty) {
            return Err(ConfigError::EmptyPattern { fingerprint: name.to_string(), category });
        }
    }

    Ok(FingerprintDefinition {
        name: name.to_string(),
        meta_tag_rules,
        url_substrings: raw.url,
        header_rules: raw
            .headers
            .into_iter()
            .map(|h| HeaderRule { name: h.name.to_ascii_lowercase(), contains: h.contains })
            .collect(),
        cookie_substrings: raw.cookies,
    })
}
