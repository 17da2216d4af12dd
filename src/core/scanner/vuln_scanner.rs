// src/core/scanner/vuln_scanner.rs

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::{TemplateValues, ToolTemplate};
use crate::core::models::{Finding, ProbeOutcome, ProbeRequest, VulnFinding};
use crate::core::risk::{classify_vulnerability_severity, derive_solution};
use crate::core::runner;

/// Lower-case markers that make a plain-text line a finding on the fallback path.
const FALLBACK_MARKERS: &[&str] = &["osvdb-", "cve-", "vulnerability", "vulnerable", "misconfiguration"];

/// Description used when a structured entry carries no text at all.
const UNNAMED_FINDING: &str = "Unspecified finding reported by the vulnerability scanner";

/// A leading request path in a plain-text line, e.g. `+ /admin/: ...`.
static RE_LINE_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(/\S*?):\s").unwrap());

/// Which path produced the findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseSource {
    Structured,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VulnerabilityParse {
    pub findings: Vec<VulnFinding>,
    pub source: ParseSource,
}

#[derive(Debug, Deserialize)]
struct StructuredReport {
    vulnerabilities: Vec<StructuredEntry>,
}

#[derive(Debug, Deserialize)]
struct StructuredEntry {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    method: Option<String>,
}

/// Parses vulnerability-scanner output. Never fails.
///
/// The structured form is a JSON object with a `vulnerabilities` list, or a list
/// of such objects (one per scanned host). When the text is not that, the
/// output is scanned line by line for known markers instead.
pub fn parse_vulnerability_scan(raw: &str) -> VulnerabilityParse {
    match parse_structured(raw) {
        Some(findings) => {
            debug!(findings = findings.len(), "Parsed structured scanner output.");
            VulnerabilityParse { findings, source: ParseSource::Structured }
        }
        None => {
            debug!(bytes = raw.len(), "Structured parse failed, using line fallback.");
            VulnerabilityParse { findings: parse_lines(raw), source: ParseSource::Fallback }
        }
    }
}

fn parse_structured(raw: &str) -> Option<Vec<VulnFinding>> {
    let value: Value = serde_json::from_str(raw.trim()).ok()?;
    let reports: Vec<StructuredReport> = match value {
        Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<_, _>>()
            .ok()?,
        other => vec![serde_json::from_value(other).ok()?],
    };

    Some(
        reports
            .into_iter()
            .flat_map(|report| report.vulnerabilities)
            .map(|entry| {
                let description = entry
                    .message
                    .or(entry.description)
                    .or(entry.msg)
                    .or_else(|| entry.id.map(|id| format!("Scanner finding {}", id)))
                    .unwrap_or_else(|| UNNAMED_FINDING.to_string());
                build_finding(description, entry.url, entry.method)
            })
            .collect(),
    )
}

fn parse_lines(raw: &str) -> Vec<VulnFinding> {
    raw.lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            FALLBACK_MARKERS.iter().any(|marker| lower.contains(marker))
        })
        .map(|line| {
            let description = line.trim().trim_start_matches('+').trim().to_string();
            let url = RE_LINE_PATH.captures(&description).map(|c| c[1].to_string());
            build_finding(description, url, None)
        })
        .collect()
}

/// Severity and solution always come from the classifier, never from the tool.
fn build_finding(description: String, url: Option<String>, method: Option<String>) -> VulnFinding {
    VulnFinding {
        severity: classify_vulnerability_severity(&description),
        solution: derive_solution(&description),
        description,
        url,
        method,
    }
}

/// Runs the web-vulnerability tool for `request` and parses its report.
pub async fn run_vulnerability_scan(
    request: &ProbeRequest,
    template: &ToolTemplate,
) -> Result<Vec<Finding>, String> {
    let target = &request.target;
    info!(host = %target, url = %target.normalized_url(), "Starting vulnerability scan.");

    let command = template.expand(&TemplateValues {
        target: target.host(),
        url: target.normalized_url().as_str(),
        ports: &request.options.port_range,
        intensity: request.options.intensity,
        timeout_seconds: request.options.timeout_seconds,
    });

    let raw = match runner::run(&command, Duration::from_secs(request.options.timeout_seconds)).await {
        ProbeOutcome::Success(raw) => raw,
        ProbeOutcome::Failure(reason) => return Err(reason),
    };

    let parsed = parse_vulnerability_scan(&raw);
    info!(findings = parsed.findings.len(), source = ?parsed.source, "Vulnerability scan finished.");
    Ok(parsed.findings.into_iter().map(Finding::Vulnerability).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::RiskLevel;

    #[test]
    fn structured_report() {
        let raw = r#"{
            "host": "example.com",
            "vulnerabilities": [
                {"id": "999", "OSVDB": "0", "method": "GET", "url": "/login.php", "msg": "Potential SQL injection in login form"},
                {"method": "GET", "url": "/", "message": "Reflected XSS via q parameter", "severity": "low"}
            ]
        }"#;
        let parsed = parse_vulnerability_scan(raw);
        assert_eq!(parsed.source, ParseSource::Structured);
        assert_eq!(parsed.findings.len(), 2);
        assert_eq!(parsed.findings[0].severity, RiskLevel::Critical);
        assert!(parsed.findings[0].solution.contains("parameterized queries"));
        assert_eq!(parsed.findings[0].url.as_deref(), Some("/login.php"));
        assert_eq!(parsed.findings[0].method.as_deref(), Some("GET"));
        // The tool's own severity is ignored.
        assert_eq!(parsed.findings[1].severity, RiskLevel::Medium);
    }

    #[test]
    fn structured_list_of_hosts() {
        let raw = r#"[{"vulnerabilities": [{"msg": "Directory listing on /icons/"}]},
                      {"vulnerabilities": []}]"#;
        let parsed = parse_vulnerability_scan(raw);
        assert_eq!(parsed.source, ParseSource::Structured);
        assert_eq!(parsed.findings.len(), 1);
        assert!(parsed.findings[0].solution.contains("directory browsing"));
    }

    #[test]
    fn empty_structured_report_has_no_findings() {
        let parsed = parse_vulnerability_scan(r#"{"vulnerabilities": []}"#);
        assert_eq!(parsed.source, ParseSource::Structured);
        assert!(parsed.findings.is_empty());
    }

    #[test]
    fn malformed_json_uses_fallback() {
        let raw = "{\"vulnerabilities\": [\n  {\"msg\": \"Potential SQL injection vulnerability in login form\",\n  \"url\": \"/login\"\n";
        let parsed = parse_vulnerability_scan(raw);
        assert_eq!(parsed.source, ParseSource::Fallback);
        assert_eq!(parsed.findings.len(), 1);

        let fallback = &parsed.findings[0];
        let description = "{\"msg\": \"Potential SQL injection vulnerability in login form\",";
        assert_eq!(fallback.description, description);
        assert_eq!(fallback.severity, classify_vulnerability_severity(description));
        assert_eq!(fallback.solution, derive_solution(description));

        let structured = parse_structured(&format!(r#"{{"vulnerabilities":[{{"msg":{:?}}}]}}"#, description))
            .unwrap();
        assert_eq!(structured[0].severity, fallback.severity);
        assert_eq!(structured[0].solution, fallback.solution);
    }

    #[test]
    fn json_without_vulnerability_list_uses_fallback() {
        let parsed = parse_vulnerability_scan(r#"{"host": "example.com", "items": 3}"#);
        assert_eq!(parsed.source, ParseSource::Fallback);
        assert!(parsed.findings.is_empty());
    }

    #[test]
    fn plain_text_markers() {
        let raw = "\
- Nikto v2.5.0
+ Target IP:          93.184.216.34
+ Server: nginx
+ /admin/: OSVDB-3092: Admin login page found.
+ /: The X-Frame-Options header is not present.
+ /cgi-bin/test.cgi: Site appears vulnerable to the 'shellshock' vulnerability (CVE-2014-6271).
+ Server misconfiguration: directory listing enabled.
";
        let parsed = parse_vulnerability_scan(raw);
        assert_eq!(parsed.source, ParseSource::Fallback);
        assert_eq!(parsed.findings.len(), 3);
        assert_eq!(parsed.findings[0].url.as_deref(), Some("/admin/"));
        assert_eq!(parsed.findings[1].severity, RiskLevel::Critical);
        assert_eq!(parsed.findings[2].url, None);
    }

    #[test]
    fn garbage_never_panics() {
        for raw in ["", "\u{0}\u{1}", "[", "null", "42", "[{\"vulnerabilities\": 5}]"] {
            let parsed = parse_vulnerability_scan(raw);
            assert_eq!(parsed.source, ParseSource::Fallback);
        }
    }
}
