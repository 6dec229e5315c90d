//! TCP Connect Scanner implementation.
//!
//! Performs standard TCP connect scans using the operating system's
//! socket API and classifies each attempt into a [`ScanOutcome`].

use crate::banner::{self, BannerSettings};
use crate::scanner::traits::{Banner, ScanOutcome, Scanner};
use crate::scanner::ScanConfig;
use crate::types::{Port, ScanTarget};
use async_trait::async_trait;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// TCP Connect Scanner.
///
/// Uses standard socket connect() calls to determine port status.
/// Does not require elevated privileges. Each call owns exactly one socket,
/// which is closed when the call returns.
pub struct TcpConnectScanner {
    target: ScanTarget,
    connect_timeout: Duration,
    grab_banners: bool,
    banner: BannerSettings,
}

impl TcpConnectScanner {
    /// Create a new TCP connect scanner.
    ///
    /// # Arguments
    /// * `target` - Resolved target to scan
    /// * `connect_timeout` - Connection timeout per port
    /// * `grab_banners` - Whether to attempt banner grabbing on open ports
    pub fn new(target: ScanTarget, connect_timeout: Duration, grab_banners: bool) -> Self {
        Self {
            target,
            connect_timeout,
            grab_banners,
            banner: BannerSettings::default(),
        }
    }

    /// Build a scanner from a full scan configuration.
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            target: config.target.clone(),
            connect_timeout: config.connect_timeout,
            grab_banners: config.grab_banners,
            banner: config.banner.clone(),
        }
    }

    /// Replace the banner settings.
    pub fn with_banner_settings(mut self, settings: BannerSettings) -> Self {
        self.banner = settings;
        self
    }

    async fn grab_banner(&self, stream: &mut TcpStream, port: Port) -> Banner {
        // A peer that reset between connect and now has nothing left to read.
        if let Err(e) = stream.peer_addr() {
            return Banner::Failed(e.to_string());
        }
        banner::acquire(stream, port, &self.target.original, &self.banner)
            .await
            .into()
    }
}

/// Await `connect` for at most `limit`, classifying any failure.
pub async fn connect_within<F, S>(connect: F, limit: Duration) -> Result<S, ScanOutcome>
where
    F: Future<Output = io::Result<S>>,
{
    match timeout(limit, connect).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => Err(classify_connect_error(&e)),
        Err(_) => Err(ScanOutcome::FilteredTimeout),
    }
}

/// Map an OS-level connect error to a port classification.
pub fn classify_connect_error(e: &io::Error) -> ScanOutcome {
    match e.kind() {
        io::ErrorKind::ConnectionRefused => ScanOutcome::ClosedRefused,
        io::ErrorKind::TimedOut => ScanOutcome::FilteredTimeout,
        _ => match e.raw_os_error() {
            Some(code) => ScanOutcome::FilteredOther { code },
            None => ScanOutcome::UnexpectedError {
                message: e.to_string(),
            },
        },
    }
}

#[async_trait]
impl Scanner for TcpConnectScanner {
    async fn scan_port(&self, port: Port) -> ScanOutcome {
        let addr = SocketAddr::new(self.target.ip, port.as_u16());
        let start = Instant::now();

        let outcome = match connect_within(TcpStream::connect(addr), self.connect_timeout).await {
            Ok(mut stream) => {
                let banner = if self.grab_banners {
                    Some(self.grab_banner(&mut stream, port).await)
                } else {
                    None
                };
                ScanOutcome::Open { banner }
            }
            Err(outcome) => outcome,
        };

        debug!(
            %port,
            %outcome,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "probe finished"
        );
        outcome
    }
}
