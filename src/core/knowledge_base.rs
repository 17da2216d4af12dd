//! Static, read-only tables behind the risk classifier.
//! Port tiers, vulnerability keyword tiers and remediation advice all live here
//! so the heuristics can be reviewed and updated in one place.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::models::RiskLevel;

// --- Port Tiers ---

/// Remote administration and file-sharing services that are routinely exploited.
pub const CRITICAL_PORTS: &[u16] = &[23, 135, 445, 1433, 3389];
/// Cleartext file transfer, NetBIOS and database listeners.
pub const HIGH_PORTS: &[u16] = &[21, 139, 3306, 5432];
/// Common services that are fine when hardened but worth a look.
pub const MEDIUM_PORTS: &[u16] = &[22, 25, 53, 110, 143, 993, 995];

/// Ports per tier, most severe first. Ports in no tier are low risk.
pub static PORT_TIERS: &[(RiskLevel, &[u16])] = &[
    (RiskLevel::Critical, CRITICAL_PORTS),
    (RiskLevel::High, HIGH_PORTS),
    (RiskLevel::Medium, MEDIUM_PORTS),
];

// --- Vulnerability Keyword Tiers ---

/// One severity tier: a label and the case-insensitive pattern that selects it.
pub struct SeverityTier {
    pub severity: RiskLevel,
    pub pattern: &'static Lazy<Regex>,
}

static RE_CRITICAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(remote code execution|code execution|rce|command injection|os command|sql ?injection|sqli|shellshock|backdoor|arbitrary file upload)\b",
    )
    .unwrap()
});
static RE_HIGH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(sql|auth(entication)? bypass|privilege escalation|path traversal|directory traversal|file inclusion|lfi|rfi|default (credentials|password))\b",
    )
    .unwrap()
});
static RE_MEDIUM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(xss|cross[- ]site scripting|csrf|xsrf|cross[- ]site request forgery|clickjacking|open redirect|information disclosure)\b",
    )
    .unwrap()
});

/// Checked in order; the first tier whose pattern matches wins.
pub static SEVERITY_TIERS: &[SeverityTier] = &[
    SeverityTier { severity: RiskLevel::Critical, pattern: &RE_CRITICAL },
    SeverityTier { severity: RiskLevel::High, pattern: &RE_HIGH },
    SeverityTier { severity: RiskLevel::Medium, pattern: &RE_MEDIUM },
];

// --- Remediation ---

/// Maps a family of findings to the fix we recommend for it.
pub struct RemediationRule {
    /// Short machine-readable identifier (e.g. "SQL_INJECTION").
    pub code: &'static str,
    pub pattern: &'static Lazy<Regex>,
    pub solution: &'static str,
}

static RE_FIX_SQLI: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(sql ?injection|sqli)\b").unwrap());
static RE_FIX_XSS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(xss|cross[- ]site scripting)\b").unwrap());
static RE_FIX_CSRF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(csrf|xsrf|cross[- ]site request forgery)\b").unwrap());
static RE_FIX_OUTDATED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(outdated|out of date|old version|obsolete|end of life)\b").unwrap()
});
static RE_FIX_TLS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(ssl|tls|certificate)\b").unwrap());
static RE_FIX_DIR_LISTING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(directory listing|directory indexing|directory browsing)\b").unwrap()
});

/// The remediation knowledge base, first match wins.
pub static REMEDIATIONS: &[RemediationRule] = &[
    RemediationRule {
        code: "SQL_INJECTION",
        pattern: &RE_FIX_SQLI,
        solution: "Use parameterized queries (prepared statements) for every database access and validate user input server-side.",
    },
    RemediationRule {
        code: "XSS",
        pattern: &RE_FIX_XSS,
        solution: "Sanitize user input and apply context-aware output encoding; add a restrictive Content-Security-Policy.",
    },
    RemediationRule {
        code: "CSRF",
        pattern: &RE_FIX_CSRF,
        solution: "Require anti-CSRF tokens on every state-changing request and set cookies with SameSite.",
    },
    RemediationRule {
        code: "OUTDATED_SOFTWARE",
        pattern: &RE_FIX_OUTDATED,
        solution: "Update the affected component to the latest vendor release and apply all outstanding security patches.",
    },
    RemediationRule {
        code: "TLS_CONFIGURATION",
        pattern: &RE_FIX_TLS,
        solution: "Renew the certificate if needed and reconfigure TLS to disable legacy protocols and weak cipher suites.",
    },
    RemediationRule {
        code: "DIRECTORY_LISTING",
        pattern: &RE_FIX_DIR_LISTING,
        solution: "Disable directory browsing in the web server configuration and remove files that should not be public.",
    },
];

/// Advice used when no remediation rule matches.
pub const GENERIC_REMEDIATION: &str =
    "Review the finding manually, confirm its impact and apply the vendor's security guidance.";

/// Returns the first remediation rule matching `description`, if any.
pub fn get_remediation(description: &str) -> Option<&'static RemediationRule> {
    REMEDIATIONS.iter().find(|rule| rule.pattern.is_match(description))
}
