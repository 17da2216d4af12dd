// src/core/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::core::target::Target;

// --- Risk Labels ---

/// The four-level label attached to every port or vulnerability finding.
///
/// Variants are declared from least to most severe so that `Ord` follows risk.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Transport protocol of a port finding. Anything else is rejected by the parser.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

// --- Probes ---

/// The kind of a single unit of scanning work.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProbeKind {
    PortScan,
    VulnerabilityScan,
    FingerprintDetect,
}

/// The scan kinds accepted at the boundary. A composite kind expands to
/// several probes, see [`ScanKind::probes`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ScanKind {
    #[strum(to_string = "port", serialize = "ports", serialize = "nmap")]
    Port,
    #[strum(to_string = "vulnerability", serialize = "vuln", serialize = "nikto")]
    Vulnerability,
    #[strum(to_string = "fingerprint", serialize = "cms", serialize = "detect")]
    Fingerprint,
    #[strum(to_string = "comprehensive", serialize = "full", serialize = "all")]
    Comprehensive,
}

impl ScanKind {
    /// The probes this scan kind dispatches, in dispatch order.
    pub fn probes(self) -> &'static [ProbeKind] {
        match self {
            ScanKind::Port => &[ProbeKind::PortScan],
            ScanKind::Vulnerability => &[ProbeKind::VulnerabilityScan],
            ScanKind::Fingerprint => &[ProbeKind::FingerprintDetect],
            ScanKind::Comprehensive => &[
                ProbeKind::PortScan,
                ProbeKind::VulnerabilityScan,
                ProbeKind::FingerprintDetect,
            ],
        }
    }
}

/// One unit of scanning work. Built by the orchestrator and never mutated after dispatch.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub target: Target,
    pub kind: ProbeKind,
    pub options: ResolvedOptions,
}

/// Scan options after defaults have been applied and values validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedOptions {
    pub port_range: String,
    pub intensity: u8,
    pub timeout_seconds: u64,
}

/// Result of running one external tool. Never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Success(String),
    Failure(String),
}

impl ProbeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Success(_))
    }
}

// --- Findings ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortFinding {
    pub port: u16,
    pub protocol: Protocol,
    pub state: String,
    pub service: String,
    pub risk: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnFinding {
    pub description: String,
    pub severity: RiskLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub solution: String,
}

/// A probe that failed or timed out, kept in the findings list in place of its results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeError {
    pub probe: ProbeKind,
    pub reason: String,
}

/// A normalized observation produced by a probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Finding {
    Port(PortFinding),
    Vulnerability(VulnFinding),
    Error(ProbeError),
}

impl Finding {
    /// The risk label, absent only for error findings.
    pub fn risk(&self) -> Option<RiskLevel> {
        match self {
            Finding::Port(p) => Some(p.risk),
            Finding::Vulnerability(v) => Some(v.severity),
            Finding::Error(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Finding::Error(_))
    }
}

// --- Fingerprint Matches ---

/// `min(count * 0.3, 1.0)`, computed as `count * 3 / 10` so that round counts
/// land on the exact decimal (3 pieces give 0.9, not 0.8999...).
pub fn confidence_for(evidence_count: usize) -> f64 {
    (evidence_count as f64 * 3.0 / 10.0).min(1.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub name: String,
    pub evidence_count: usize,
    pub confidence: f64,
    pub evidence: Vec<String>,
}

impl MatchResult {
    /// Builds a match from its evidence; confidence is always derived from the count.
    pub fn from_evidence(name: impl Into<String>, evidence: Vec<String>) -> Self {
        let evidence_count = evidence.len();
        Self {
            name: name.into(),
            evidence_count,
            confidence: confidence_for(evidence_count),
            evidence,
        }
    }
}

/// The best-match accessor's return value. `name` is `None` for the "no match" sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestMatch {
    pub name: Option<String>,
    pub confidence: f64,
    pub evidence: Vec<String>,
}

/// Output of one fingerprint detection: sorted matches plus an optional error marker
/// when the page could not be fetched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FingerprintReport {
    pub matches: Vec<MatchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FingerprintReport {
    pub fn best_match(&self) -> BestMatch {
        match self.matches.first() {
            Some(best) => BestMatch {
                name: Some(best.name.clone()),
                confidence: best.confidence,
                evidence: best.evidence.clone(),
            },
            None => BestMatch {
                name: None,
                confidence: 0.0,
                evidence: vec![match &self.error {
                    Some(e) => format!("No technology identified: {}", e),
                    None => "No technology identified: no fingerprint matched the response".to_string(),
                }],
            },
        }
    }
}

// --- Main Report ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ScanStatus {
    Completed,
    Failed,
}

/// The unified output of one orchestration run. Immutable once returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub target: String,
    pub scan_kind: ScanKind,
    pub timestamp: DateTime<Utc>,
    pub status: ScanStatus,
    pub findings: Vec<Finding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint_matches: Option<Vec<MatchResult>>,
    pub duration_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanResult {
    /// Counts findings per risk label, highest first. Error findings are not counted.
    pub fn risk_summary(&self) -> Vec<(RiskLevel, usize)> {
        [RiskLevel::Critical, RiskLevel::High, RiskLevel::Medium, RiskLevel::Low]
            .into_iter()
            .map(|level| {
                let count = self.findings.iter().filter(|f| f.risk() == Some(level)).count();
                (level, count)
            })
            .collect()
    }
}
