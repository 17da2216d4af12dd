// src/main.rs

use color_eyre::eyre::{Result, WrapErr};
use serde::Serialize;
use tracing::{info, warn};

use vanguard_recon::core::options::ScanOptions;
use vanguard_recon::{logging, Scanner, ScannerConfig};

mod cli;

use cli::Command;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = cli::parse();

    match logging::initialize_logging() {
        Ok(path) => info!(log = %path.display(), "Logging initialized."),
        Err(e) => eprintln!("Warning: failed to initialize logging: {}", e),
    }

    let mut config = ScannerConfig::load(args.config.as_deref()).wrap_err("failed to load configuration")?;
    if let Some(path) = args.fingerprints {
        config.fingerprint_library = Some(path);
    }
    let scanner = Scanner::from_config(config).wrap_err("failed to initialize scanner")?;

    match args.command {
        Command::Scan { target, kind, ports, intensity, timeout } => {
            let options = ScanOptions { port_range: ports, intensity, timeout_seconds: timeout };
            let result = scanner.run_scan(&target, &kind, &options).await?;
            for (level, count) in result.risk_summary() {
                info!(%level, count, "Risk summary.");
            }
            print_json(&result, args.compact)?;
        }
        Command::Detect { target, best } => {
            let report = scanner.detect_fingerprint(&target).await?;
            if let Some(e) = &report.error {
                warn!(error = %e, "Fingerprint detection could not fetch the target.");
            }
            if best {
                print_json(&report.best_match(), args.compact)?;
            } else {
                print_json(&report, args.compact)?;
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    let text = if compact { serde_json::to_string(value)? } else { serde_json::to_string_pretty(value)? };
    println!("{}", text);
    Ok(())
}
