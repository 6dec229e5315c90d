//! Command-line interface definitions for portsweep.
//!
//! Uses `clap` derive macros for declarative argument parsing. Flags override
//! the settings file, which overrides the built-in defaults.

use crate::config::AppSettings;
use crate::error::CliResult;
use crate::output::{ReportOptions, Reporter};
use crate::scanner::{self, ScanConfig, ScanSummary};
use crate::types::{Port, PortSpec, ScanTarget};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// A concurrent TCP port prober with protocol-aware banner grabbing.
#[derive(Parser, Debug, Clone)]
#[command(name = "portsweep")]
#[command(version, about = "Concurrent TCP port prober", long_about = None)]
pub struct Args {
    /// Hostname or IP address to scan
    #[arg(short, long, env = "PORTSWEEP_TARGET")]
    pub target: String,

    /// Ports to scan (e.g. "80", "22,80,443", "1-1000", "22-25,8000-9000")
    #[arg(short, long, default_value = "1-10000")]
    pub ports: String,

    /// Report closed ports and print the closed-port total
    #[arg(short, long)]
    pub verbose: bool,

    /// Try to grab a banner from each open port
    #[arg(short, long)]
    pub banner: bool,

    /// Worker count, clamped to the number of ports [default: 50]
    #[arg(long, alias = "th", value_name = "N")]
    pub threads: Option<usize>,

    /// Do not report filtered or unreachable ports
    #[arg(long)]
    pub hide_filtered: bool,

    /// Connect timeout in milliseconds [default: 3000]
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Wait per banner read in milliseconds [default: 1000]
    #[arg(long, value_name = "MS")]
    pub banner_timeout: Option<u64>,

    /// Banner read attempts per open port [default: 3]
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub banner_attempts: Option<u32>,

    /// Path to a JSON settings file
    #[arg(long, value_name = "PATH", env = "PORTSWEEP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Disable coloured output
    #[arg(long)]
    pub no_color: bool,
}

impl Args {
    /// Run the scan described by these arguments.
    ///
    /// Every error returned here happens before any worker starts.
    pub async fn execute(&self) -> CliResult<ScanSummary> {
        let settings = AppSettings::load(self.config.as_deref())?;
        let ports = self.port_set()?;
        let target = ScanTarget::resolve(&self.target).await?;

        let config = self.scan_config(target, &settings);
        debug!(?config, ports = ports.len(), "scan configured");

        let reporter = Reporter::stdout(config.report);
        Ok(scanner::run(&config, ports, reporter).await)
    }

    /// Parse the `--ports` specification into the ordered port set.
    pub fn port_set(&self) -> CliResult<Vec<Port>> {
        Ok(self.ports.parse::<PortSpec>()?.to_ports())
    }

    /// Merge flags over settings into a scan configuration.
    pub fn scan_config(&self, target: ScanTarget, settings: &AppSettings) -> ScanConfig {
        let mut banner = settings.banner_settings();
        if let Some(ms) = self.banner_timeout {
            banner.read_timeout = Duration::from_millis(ms);
        }
        if let Some(attempts) = self.banner_attempts {
            banner.max_attempts = attempts;
        }

        let report = ReportOptions {
            show_closed: self.verbose,
            hide_filtered: self.hide_filtered,
            color: !self.no_color && console::colors_enabled(),
        };

        let config = ScanConfig::new(target)
            .with_timeout(Duration::from_millis(
                self.timeout.unwrap_or(settings.connect_timeout_ms),
            ))
            .with_concurrency(self.threads.unwrap_or(settings.threads))
            .with_banner_settings(banner)
            .with_report_options(report);

        if self.banner {
            config.with_banners()
        } else {
            config
        }
    }
}
