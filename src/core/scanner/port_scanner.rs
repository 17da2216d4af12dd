// src/core/scanner/port_scanner.rs

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::config::{TemplateValues, ToolTemplate};
use crate::core::models::{Finding, PortFinding, ProbeOutcome, ProbeRequest, Protocol};
use crate::core::risk::classify_port_risk;
use crate::core::runner;

/// `<port>/<protocol> <state> <service...>`, as printed in nmap's port table.
static RE_PORT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{1,5})/([A-Za-z]+)\s+(\S+)(?:\s+(.*))?$").unwrap());

/// Parses port-scanner output into findings, lazily.
///
/// Lines that are not port rows (headers, banners, summaries) are skipped, as are
/// rows whose protocol is neither `tcp` nor `udp` or whose port is out of range.
/// The iterator borrows `raw` and can be cloned to restart.
pub fn parse_port_scan(raw: &str) -> impl Iterator<Item = PortFinding> + Clone + '_ {
    raw.lines().filter_map(parse_port_line)
}

fn parse_port_line(line: &str) -> Option<PortFinding> {
    let caps = RE_PORT_LINE.captures(line)?;
    let port: u16 = caps[1].parse().ok().filter(|&p| p != 0)?;
    let protocol: Protocol = caps[2].parse().ok()?;
    let state = caps[3].to_string();
    let service = caps.get(4).map(|m| m.as_str().trim()).unwrap_or_default().to_string();
    let risk = classify_port_risk(port, &service);
    Some(PortFinding { port, protocol, state, service, risk })
}

/// Runs the port-scanning tool for `request` and parses its table.
///
/// Returns the failure reason when the tool could not produce output.
pub async fn run_port_scan(request: &ProbeRequest, template: &ToolTemplate) -> Result<Vec<Finding>, String> {
    let target = &request.target;
    info!(host = %target, ports = %request.options.port_range, "Starting port scan.");

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

    let findings: Vec<Finding> = parse_port_scan(&raw).map(Finding::Port).collect();
    debug!(lines = raw.lines().count(), "Parsed port scanner output.");
    info!(findings = findings.len(), "Port scan finished.");
    Ok(findings)
}
