// src/core/scanner/mod.rs

pub mod fetcher;
pub mod fingerprint_scanner;
pub mod port_scanner;
pub mod vuln_scanner;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::ScannerConfig;
use crate::core::error::{ConfigError, ValidationError};
use crate::core::fingerprints::FingerprintLibrary;
use crate::core::models::{
    Finding, FingerprintReport, MatchResult, ProbeError, ProbeKind, ProbeRequest, ScanKind, ScanResult,
    ScanStatus,
};
use crate::core::options::ScanOptions;
use crate::core::target::Target;

use self::fetcher::{HttpFetcher, PageFetcher};
use self::fingerprint_scanner::run_fingerprint_scan;
use self::port_scanner::run_port_scan;
use self::vuln_scanner::run_vulnerability_scan;

/// What one settled probe hands back to the orchestrator.
#[derive(Debug)]
enum ProbeOutput {
    Findings(Vec<Finding>),
    Fingerprint(FingerprintReport),
}

/// In-flight probe tasks in dispatch order. Dropping the set aborts whatever is
/// still running, which kills the probe's subprocess.
struct ProbeTasks(Vec<(ProbeKind, JoinHandle<ProbeOutput>)>);

impl Drop for ProbeTasks {
    fn drop(&mut self) {
        for (_, handle) in &self.0 {
            handle.abort();
        }
    }
}

/// The scan orchestrator.
///
/// Cheap to clone: configuration, fingerprint library and HTTP client are shared
/// read-only across every request and every probe task.
#[derive(Clone)]
pub struct Scanner {
    config: Arc<ScannerConfig>,
    library: Arc<FingerprintLibrary>,
    fetcher: Arc<dyn PageFetcher>,
}

impl Scanner {
    pub fn new(config: ScannerConfig, library: Arc<FingerprintLibrary>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { config: Arc::new(config), library, fetcher }
    }

    /// Loads the fingerprint library named by `config` and builds the HTTP client.
    pub fn from_config(config: ScannerConfig) -> Result<Self, ConfigError> {
        let library = FingerprintLibrary::load(config.fingerprint_library.as_deref())?;
        let fetcher = HttpFetcher::new(&config.http)?;
        Ok(Self::new(config, Arc::new(library), Arc::new(fetcher)))
    }

    /// Runs every probe of `scan_kind` against `target` concurrently and merges the results.
    ///
    /// Target, scan kind and options are validated before anything is dispatched.
    /// Probe failures become error findings, so any valid request yields a
    /// `completed` result. Findings keep dispatch order regardless of which
    /// probe finishes first.
    pub async fn run_scan(
        &self,
        target: &str,
        scan_kind: &str,
        options: &ScanOptions,
    ) -> Result<ScanResult, ValidationError> {
        let started = Instant::now();
        let timestamp = Utc::now();

        let parsed_target = Target::parse(target)?;
        let kind = ScanKind::from_str(scan_kind.trim())
            .map_err(|_| ValidationError::UnsupportedScanKind(scan_kind.to_string()))?;
        let options = options.resolve(&self.config.defaults)?;
        info!(host = %parsed_target, kind = %kind, ?options, "Scan request received.");

        let mut tasks = ProbeTasks(
            kind.probes()
                .iter()
                .map(|&probe| {
                    let request =
                        ProbeRequest { target: parsed_target.clone(), kind: probe, options: options.clone() };
                    (probe, self.dispatch(request))
                })
                .collect(),
        );
        info!(probes = tasks.0.len(), "Probes dispatched.");

        let mut findings = Vec::new();
        let mut fingerprint_matches: Option<Vec<MatchResult>> = None;

        for (probe, handle) in tasks.0.iter_mut() {
            let probe = *probe;
            match handle.await {
                Ok(ProbeOutput::Findings(probe_findings)) => findings.extend(probe_findings),
                Ok(ProbeOutput::Fingerprint(report)) => {
                    if let Some(reason) = report.error {
                        findings.push(probe_failure(ProbeKind::FingerprintDetect, reason));
                    }
                    fingerprint_matches = Some(report.matches);
                }
                Err(e) => {
                    error!(probe = %probe, error = %e, "Probe task did not complete, failing the scan.");
                    return Ok(ScanResult {
                        target: target.to_string(),
                        scan_kind: kind,
                        timestamp,
                        status: ScanStatus::Failed,
                        findings: Vec::new(),
                        fingerprint_matches: None,
                        duration_seconds: started.elapsed().as_secs_f64(),
                        error: Some(format!("{} probe did not complete: {}", probe, e)),
                    });
                }
            }
        }

        let duration_seconds = started.elapsed().as_secs_f64();
        info!(
            findings = findings.len(),
            errors = findings.iter().filter(|f| f.is_error()).count(),
            duration_seconds,
            "Scan completed."
        );

        Ok(ScanResult {
            target: target.to_string(),
            scan_kind: kind,
            timestamp,
            status: ScanStatus::Completed,
            findings,
            fingerprint_matches,
            duration_seconds,
            error: None,
        })
    }

    /// Identifies the technology stack of `target` from one HTTP response.
    pub async fn detect_fingerprint(&self, target: &str) -> Result<FingerprintReport, ValidationError> {
        let target = Target::parse(target)?;
        Ok(run_fingerprint_scan(&target, &self.library, self.fetcher.as_ref()).await)
    }

    /// Spawns one probe as its own task. Aborting the task kills any subprocess it started.
    fn dispatch(&self, request: ProbeRequest) -> JoinHandle<ProbeOutput> {
        let scanner = self.clone();
        tokio::spawn(async move { scanner.execute(request).await })
    }

    async fn execute(&self, request: ProbeRequest) -> ProbeOutput {
        let kind = request.kind;
        let result = match kind {
            ProbeKind::PortScan => run_port_scan(&request, &self.config.port_scanner).await,
            ProbeKind::VulnerabilityScan => run_vulnerability_scan(&request, &self.config.vulnerability_scanner).await,
            ProbeKind::FingerprintDetect => {
                let report = run_fingerprint_scan(&request.target, &self.library, self.fetcher.as_ref()).await;
                return ProbeOutput::Fingerprint(report);
            }
        };
        match result {
            Ok(findings) => ProbeOutput::Findings(findings),
            Err(reason) => {
                warn!(probe = %kind, %reason, "Probe failed.");
                ProbeOutput::Findings(vec![probe_failure(kind, reason)])
            }
        }
    }
}

fn probe_failure(probe: ProbeKind, reason: String) -> Finding {
    Finding::Error(ProbeError { probe, reason })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolTemplate;
    use crate::core::models::RiskLevel;
    use crate::core::scanner::fetcher::PageSnapshot;
    use async_trait::async_trait;
    use url::Url;

    struct StubFetcher(Result<PageSnapshot, String>);

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch(&self, _url: &Url) -> Result<PageSnapshot, String> {
            self.0.clone()
        }
    }

    struct PanickingFetcher;

    #[async_trait]
    impl PageFetcher for PanickingFetcher {
        async fn fetch(&self, _url: &Url) -> Result<PageSnapshot, String> {
            panic!("fetcher exploded");
        }
    }

    fn sh(script: &str) -> ToolTemplate {
        ToolTemplate { program: "sh".into(), args: vec!["-c".into(), script.into()] }
    }

    fn missing_tool() -> ToolTemplate {
        ToolTemplate { program: "/nonexistent/vanguard-probe".into(), args: vec![] }
    }

    fn wordpress_fetcher() -> Arc<dyn PageFetcher> {
        Arc::new(StubFetcher(Ok(PageSnapshot {
            body: r#"<meta name="generator" content="WordPress 6.5"><link href="/wp-content/a.css">"#.into(),
            status: 200,
            ..Default::default()
        })))
    }

    fn scanner(port: ToolTemplate, vuln: ToolTemplate, fetcher: Arc<dyn PageFetcher>) -> Scanner {
        let config = ScannerConfig { port_scanner: port, vulnerability_scanner: vuln, ..Default::default() };
        let library = FingerprintLibrary::bundled().unwrap();
        Scanner::new(config, Arc::new(library), fetcher)
    }

    #[tokio::test]
    async fn invalid_target_is_rejected_before_dispatch() {
        let scanner = scanner(missing_tool(), missing_tool(), wordpress_fetcher());
        let err = scanner.run_scan("not a domain", "comprehensive", &ScanOptions::default()).await;
        assert!(matches!(err, Err(ValidationError::InvalidTarget(_))));
        let err = scanner.detect_fingerprint("not a domain").await;
        assert!(matches!(err, Err(ValidationError::InvalidTarget(_))));
    }

    #[tokio::test]
    async fn unsupported_scan_kind_is_rejected() {
        let scanner = scanner(missing_tool(), missing_tool(), wordpress_fetcher());
        let err = scanner.run_scan("192.168.1.1", "quantum", &ScanOptions::default()).await;
        assert_eq!(err.unwrap_err(), ValidationError::UnsupportedScanKind("quantum".into()));
    }

    #[tokio::test]
    async fn invalid_options_are_rejected() {
        let scanner = scanner(missing_tool(), missing_tool(), wordpress_fetcher());
        let options = ScanOptions { intensity: Some(9), ..Default::default() };
        let err = scanner.run_scan("192.168.1.1", "port", &options).await;
        assert_eq!(err.unwrap_err(), ValidationError::InvalidIntensity(9));
    }

    #[tokio::test]
    async fn fingerprint_only_scan() {
        let scanner = scanner(missing_tool(), missing_tool(), wordpress_fetcher());
        let result = scanner.run_scan("blog.example.com", "cms", &ScanOptions::default()).await.unwrap();
        assert_eq!(result.status, ScanStatus::Completed);
        assert!(result.findings.is_empty());
        let matches = result.fingerprint_matches.unwrap();
        assert_eq!(matches[0].name, "WordPress");
        assert_eq!(matches[0].evidence_count, 2);
    }

    #[tokio::test]
    async fn every_probe_failing_still_completes() {
        let scanner = scanner(
            missing_tool(),
            missing_tool(),
            Arc::new(StubFetcher(Err("HTTP request failed: refused".into()))),
        );
        let result = scanner.run_scan("example.com", "comprehensive", &ScanOptions::default()).await.unwrap();
        assert_eq!(result.status, ScanStatus::Completed);
        let probes: Vec<ProbeKind> = result
            .findings
            .iter()
            .map(|f| match f {
                Finding::Error(e) => e.probe,
                other => panic!("unexpected finding {other:?}"),
            })
            .collect();
        assert_eq!(
            probes,
            vec![ProbeKind::PortScan, ProbeKind::VulnerabilityScan, ProbeKind::FingerprintDetect]
        );
        assert_eq!(result.fingerprint_matches, Some(vec![]));
    }

    #[tokio::test]
    async fn panicking_probe_fails_the_scan() {
        let scanner = scanner(missing_tool(), missing_tool(), Arc::new(PanickingFetcher));
        let result = scanner.run_scan("example.com", "fingerprint", &ScanOptions::default()).await.unwrap();
        assert_eq!(result.status, ScanStatus::Failed);
        assert!(result.findings.is_empty());
        assert!(result.error.is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn port_failure_does_not_block_vulnerabilities() {
        let scanner = scanner(
            missing_tool(),
            sh("echo '+ /login: Potential SQL injection vulnerability in login form'"),
            wordpress_fetcher(),
        );
        let result = scanner.run_scan("192.168.1.1", "comprehensive", &ScanOptions::default()).await.unwrap();
        assert_eq!(result.status, ScanStatus::Completed);
        assert!(matches!(&result.findings[0], Finding::Error(e) if e.probe == ProbeKind::PortScan));
        let vuln = result
            .findings
            .iter()
            .find_map(|f| match f {
                Finding::Vulnerability(v) => Some(v),
                _ => None,
            })
            .unwrap();
        assert_eq!(vuln.severity, RiskLevel::Critical);
        assert_eq!(vuln.url.as_deref(), Some("/login"));
        assert!(result.fingerprint_matches.is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn findings_keep_dispatch_order() {
        // The port probe finishes last but its findings still come first.
        let scanner = scanner(
            sh("sleep 1; echo '22/tcp open ssh OpenSSH 8.2'; echo '445/tcp open microsoft-ds'"),
            sh("echo 'OSVDB-3233: /icons/README: Apache default file found, misconfiguration.'"),
            wordpress_fetcher(),
        );
        let started = Instant::now();
        let result = scanner.run_scan("example.com", "comprehensive", &ScanOptions::default()).await.unwrap();
        assert_eq!(result.findings.len(), 3);
        assert!(matches!(&result.findings[0], Finding::Port(p) if p.port == 22));
        assert!(matches!(&result.findings[1], Finding::Port(p) if p.risk == RiskLevel::Critical));
        assert!(matches!(&result.findings[2], Finding::Vulnerability(_)));
        assert!(result.duration_seconds >= 1.0);
        assert!(started.elapsed().as_secs_f64() >= result.duration_seconds);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn templates_receive_target_and_options() {
        let scanner = scanner(
            sh("echo \"{ports}\" | grep -q '^22,80$' && echo '80/tcp open http'"),
            sh("true"),
            wordpress_fetcher(),
        );
        let options = ScanOptions { port_range: Some("22,80".into()), ..Default::default() };
        let result = scanner.run_scan("10.0.0.1", "port", &options).await.unwrap();
        assert_eq!(result.scan_kind, ScanKind::Port);
        assert!(matches!(&result.findings[..], [Finding::Port(p)] if p.port == 80));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn dropping_the_scan_kills_its_tools() {
        let marker = std::env::temp_dir().join(format!("vanguard-recon-cancelled-{}", std::process::id()));
        let _ = std::fs::remove_file(&marker);
        let scanner = scanner(sh(&format!("sleep 1; touch {}", marker.display())), sh("true"), wordpress_fetcher());

        let cancelled = tokio::time::timeout(
            std::time::Duration::from_millis(200),
            scanner.run_scan("10.0.0.1", "port", &ScanOptions::default()),
        )
        .await;
        assert!(cancelled.is_err());

        tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn probe_timeout_becomes_error_finding() {
        let scanner = scanner(sh("sleep 30"), sh("true"), wordpress_fetcher());
        let options = ScanOptions { timeout_seconds: Some(1), ..Default::default() };
        let result = scanner.run_scan("10.0.0.1", "port", &options).await.unwrap();
        assert_eq!(result.status, ScanStatus::Completed);
        assert!(matches!(&result.findings[..], [Finding::Error(e)] if e.reason == "timeout"));
    }
}
