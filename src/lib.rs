//! # portsweep - a concurrent TCP port prober
//!
//! portsweep classifies each port of a single target as open, closed or
//! filtered using plain TCP connects, and can pull a one-line banner from
//! open services.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use portsweep::output::{ReportOptions, Reporter};
//! use portsweep::scanner::{self, ScanConfig};
//! use portsweep::types::{PortSpec, ScanTarget};
//!
//! #[tokio::main]
//! async fn main() {
//!     let target = ScanTarget::resolve("scanme.nmap.org").await.unwrap();
//!     let ports = "22,80,443".parse::<PortSpec>().unwrap().to_ports();
//!     let config = ScanConfig::new(target).with_banners();
//!
//!     let summary = scanner::run(&config, ports, Reporter::stdout(config.report)).await;
//!     println!("{} open", summary.counts.open);
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - validated ports, port specifications and resolved targets
//! - [`scanner`] - the connect prober and the worker-pool coordinator
//! - [`banner`] - the banner read/probe protocol and its port strategy table
//! - [`output`] - serialized per-port report lines
//! - [`config`] - optional settings file
//! - [`error`] - pre-scan error types

pub mod banner;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod scanner;
pub mod types;

// Re-export commonly used types
pub use error::{CliError, ConfigError};
pub use scanner::{ScanConfig, ScanOutcome, ScanSummary, Scanner};
pub use types::{Port, PortSpec, ScanTarget};
