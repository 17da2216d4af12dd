// src/cli.rs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vanguard-recon")]
#[command(about = "Concurrent port, vulnerability and CMS fingerprint scanning")]
pub struct Cli {
    /// Configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Fingerprint library replacing the configured or bundled one
    #[arg(short, long, global = true)]
    pub fingerprints: Option<PathBuf>,

    /// Print compact JSON instead of pretty-printed
    #[arg(long, global = true)]
    pub compact: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a scan against a target
    Scan {
        /// IPv4 address or domain name
        target: String,

        /// port, vulnerability, fingerprint or comprehensive
        #[arg(short, long, default_value = "comprehensive")]
        kind: String,

        /// Ports to scan, e.g. "22,80-443"
        #[arg(short, long)]
        ports: Option<String>,

        /// Scan intensity from 0 (slowest) to 5
        #[arg(short, long)]
        intensity: Option<u8>,

        /// Per-probe timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,
    },
    /// Identify the CMS / technology stack of a target
    Detect {
        /// IPv4 address or domain name
        target: String,

        /// Only print the best match
        #[arg(long)]
        best: bool,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}
