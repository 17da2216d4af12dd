// src/core/scanner/fingerprint_scanner.rs

use scraper::Html;
use tracing::{debug, info, warn};

use crate::core::fingerprints::{FingerprintDefinition, FingerprintLibrary};
use crate::core::models::{FingerprintReport, MatchResult};
use crate::core::scanner::fetcher::{PageFetcher, PageSnapshot};
use crate::core::target::Target;

/// Fetches the target once and scores it against every fingerprint in `library`.
///
/// A failed fetch yields an empty report carrying the error; this never fails.
pub async fn run_fingerprint_scan(
    target: &Target,
    library: &FingerprintLibrary,
    fetcher: &dyn PageFetcher,
) -> FingerprintReport {
    let url = target.normalized_url();
    info!(host = %target, url = %url, "Starting fingerprint scan.");

    let snapshot = match fetcher.fetch(url).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(url = %url, error = %e, "Fingerprint fetch failed.");
            return FingerprintReport { matches: Vec::new(), error: Some(e) };
        }
    };

    let matches = match_fingerprints(&snapshot, library);
    info!(matches = matches.len(), best = ?matches.first().map(|m| &m.name), "Fingerprint scan finished.");
    FingerprintReport { matches, error: None }
}

/// Scores a captured response against the library.
///
/// Fingerprints without evidence are dropped. The rest are ordered by descending
/// confidence, ties alphabetically by name.
pub fn match_fingerprints(snapshot: &PageSnapshot, library: &FingerprintLibrary) -> Vec<MatchResult> {
    let document = Html::parse_document(&snapshot.body);

    debug!(total_fingerprints = %library.len(), "Applying fingerprint rules.");
    let mut matches: Vec<MatchResult> = library
        .iter()
        .filter_map(|def| {
            let evidence = collect_evidence(def, snapshot, &document);
            if evidence.is_empty() {
                return None;
            }
            debug!(fingerprint = %def.name, evidence = evidence.len(), "Fingerprint matched.");
            Some(MatchResult::from_evidence(def.name.clone(), evidence))
        })
        .collect();

    // Library iteration is by name, so a stable sort leaves ties alphabetical.
    matches.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    matches
}

/// One proof string per matching rule, across all four categories.
fn collect_evidence(
    def: &FingerprintDefinition,
    snapshot: &PageSnapshot,
    document: &Html,
) -> Vec<String> {
    let mut evidence = Vec::new();

    for rule in &def.meta_tag_rules {
        let found = document
            .select(&rule.selector)
            .any(|el| el.value().attr("content").unwrap_or_default().contains(&rule.contains));
        if found {
            evidence.push(format!("Meta tag {} contains \"{}\"", rule.locator, rule.contains));
        }
    }

    for needle in &def.url_substrings {
        if snapshot.body.contains(needle.as_str()) {
            evidence.push(format!("Page content references \"{}\"", needle));
        }
    }

    for rule in &def.header_rules {
        let expected = rule.contains.to_lowercase();
        if snapshot.header_values(&rule.name).any(|v| v.to_lowercase().contains(&expected)) {
            evidence.push(format!("Header {} contains \"{}\"", rule.name, rule.contains));
        }
    }

    for needle in &def.cookie_substrings {
        if snapshot.cookies.iter().any(|c| c.contains(needle.as_str())) {
            evidence.push(format!("Cookie contains \"{}\"", needle));
        }
    }

    evidence
}
