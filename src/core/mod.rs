// src/core/mod.rs

// The scanning core: validation, probes, parsing, classification and the
// orchestrator that ties them together. Nothing here renders or persists.

/// Typed errors crossing the core's boundary.
pub mod error;

/// Static fingerprint library: loading, compiling and read-only access.
pub mod fingerprints;

/// Port tiers, severity keywords and remediation advice.
pub mod knowledge_base;

/// Data structures shared by every probe: findings, matches and the scan result.
pub mod models;

/// Caller options and their validation.
pub mod options;

/// Pure risk and severity classification.
pub mod risk;

/// External tool execution with timeouts.
pub mod runner;

/// Individual probes and the orchestrator running them concurrently.
pub mod scanner;

/// Target validation and URL normalization.
pub mod target;
