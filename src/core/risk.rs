// src/core/risk.rs

use tracing::trace;

use crate::core::knowledge_base::{get_remediation, GENERIC_REMEDIATION, PORT_TIERS, SEVERITY_TIERS};
use crate::core::models::RiskLevel;

/// Risk of an exposed port. Total: every port maps to exactly one label.
///
/// Only the port number decides the tier; `service` is carried for tracing so a
/// service running on an unexpected port can be spotted in the logs.
pub fn classify_port_risk(port: u16, service: &str) -> RiskLevel {
    let risk = PORT_TIERS
        .iter()
        .find(|(_, ports)| ports.contains(&port))
        .map(|(level, _)| *level)
        .unwrap_or(RiskLevel::Low);
    trace!(port, service, %risk, "Classified port.");
    risk
}

/// Severity of a vulnerability description. Tiers are checked critical first.
pub fn classify_vulnerability_severity(description: &str) -> RiskLevel {
    SEVERITY_TIERS
        .iter()
        .find(|tier| tier.pattern.is_match(description))
        .map(|tier| tier.severity)
        .unwrap_or(RiskLevel::Low)
}

/// Remediation advice for a vulnerability description.
pub fn derive_solution(description: &str) -> String {
    match get_remediation(description) {
        Some(rule) => {
            trace!(code = rule.code, "Matched remediation rule.");
            rule.solution.to_string()
        }
        None => GENERIC_REMEDIATION.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::knowledge_base::{CRITICAL_PORTS, HIGH_PORTS, MEDIUM_PORTS};

    #[test]
    fn critical_ports_are_critical() {
        for &port in CRITICAL_PORTS {
            assert_eq!(classify_port_risk(port, ""), RiskLevel::Critical);
        }
    }

    #[test]
    fn every_port_has_one_tier() {
        for port in 0..=u16::MAX {
            let risk = classify_port_risk(port, "unknown");
            let expected = if CRITICAL_PORTS.contains(&port) {
                RiskLevel::Critical
            } else if HIGH_PORTS.contains(&port) {
                RiskLevel::High
            } else if MEDIUM_PORTS.contains(&port) {
                RiskLevel::Medium
            } else {
                RiskLevel::Low
            };
            assert_eq!(risk, expected, "port {port}");
        }
    }

    #[test]
    fn known_port_examples() {
        assert_eq!(classify_port_risk(22, "ssh OpenSSH 8.2"), RiskLevel::Medium);
        assert_eq!(classify_port_risk(3306, "mysql"), RiskLevel::High);
        assert_eq!(classify_port_risk(80, "http"), RiskLevel::Low);
        assert_eq!(classify_port_risk(3389, "ms-wbt-server"), RiskLevel::Critical);
    }

    #[test]
    fn sql_injection_is_critical() {
        let description = "Potential SQL injection in login form";
        assert_eq!(classify_vulnerability_severity(description), RiskLevel::Critical);
        assert!(derive_solution(description).contains("parameterized queries"));
    }

    #[test]
    fn severity_priority_order() {
        assert_eq!(classify_vulnerability_severity("Remote Code Execution in CGI"), RiskLevel::Critical);
        assert_eq!(classify_vulnerability_severity("Authentication bypass on /admin"), RiskLevel::High);
        assert_eq!(classify_vulnerability_severity("Reflected XSS in search"), RiskLevel::Medium);
        assert_eq!(classify_vulnerability_severity("CSRF token missing"), RiskLevel::Medium);
        // Critical wins over medium when both appear.
        assert_eq!(
            classify_vulnerability_severity("XSS chained into remote code execution"),
            RiskLevel::Critical
        );
        assert_eq!(classify_vulnerability_severity("Server header discloses version"), RiskLevel::Low);
    }

    #[test]
    fn solution_comes_from_the_matched_rule() {
        let description = "Potential SQL injection in login form";
        let rule = get_remediation(description).unwrap();
        assert_eq!(rule.code, "SQL_INJECTION");
        assert_eq!(derive_solution(description), rule.solution);
        assert_eq!(derive_solution("Server banner shows hostname"), GENERIC_REMEDIATION);
    }

    #[test]
    fn solutions_by_keyword() {
        assert!(derive_solution("reflected xss").contains("output encoding"));
        assert!(derive_solution("No CSRF protection").contains("anti-CSRF tokens"));
        assert!(derive_solution("Apache appears to be outdated").contains("patches"));
        assert!(derive_solution("SSL certificate expired").contains("TLS"));
        assert!(derive_solution("Directory listing found").contains("directory browsing"));
        assert_eq!(derive_solution("Interesting header"), GENERIC_REMEDIATION);
    }
}
