//! Banner acquisition for open TCP ports.
//!
//! Some services greet unprompted (SSH, FTP, SMTP), others say nothing until
//! asked (HTTP). The acquirer reads first, nudges on silence, and bounds the
//! total wait by an attempt budget. It never fails: every error path ends as
//! "no banner".

mod strategy;
mod stream;

pub use strategy::{
    http_head_request, ProbeStrategy, ProbeTable, DEFAULT_HTTP_PORTS, DEFAULT_LINE_PORTS,
    DEFAULT_TLS_PORTS,
};
pub use stream::{ProbeStream, BANNER_BUF_SIZE};

use crate::types::Port;
use std::io;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Default wait for each readability check.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Default number of read-wait cycles.
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Default bound on the TLS handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(3);

/// Knobs for a banner acquisition.
#[derive(Debug, Clone)]
pub struct BannerSettings {
    /// Wait applied to every readability check.
    pub read_timeout: Duration,
    /// Number of read-wait cycles in the plain loop.
    pub max_attempts: u32,
    /// Upper bound on the TLS handshake.
    pub handshake_timeout: Duration,
    /// Port to probe-strategy mapping.
    pub probes: ProbeTable,
}

impl Default for BannerSettings {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_attempts: DEFAULT_ATTEMPTS,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            probes: ProbeTable::default(),
        }
    }
}

/// Result of a banner acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BannerGrab {
    /// Extracted text, empty when nothing was obtained.
    pub text: String,
    /// Whether any non-empty text was obtained.
    pub found: bool,
}

impl BannerGrab {
    /// Extract the reportable banner from accumulated text.
    ///
    /// The first non-blank line wins; if every line is blank the whole text
    /// is used, trimmed.
    pub fn extract(raw: &str) -> Self {
        let text = raw
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_else(|| raw.trim())
            .to_string();
        Self {
            found: !text.is_empty(),
            text,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

/// Acquire a banner from an open connection.
///
/// `host` is the target as the user named it; it is used for TLS server-name
/// validation and the HTTP `Host:` header.
pub async fn acquire<S>(stream: &mut S, port: Port, host: &str, settings: &BannerSettings) -> BannerGrab
where
    S: ProbeStream + ?Sized,
{
    let strategy = settings.probes.strategy_for(port);

    if strategy == ProbeStrategy::Tls {
        let request = http_head_request(host);
        match stream
            .tls_exchange(
                host,
                &request,
                settings.read_timeout,
                settings.handshake_timeout,
            )
            .await
        {
            Ok(bytes) => {
                let mut text = String::new();
                decode_into(&bytes, &mut text);
                return BannerGrab::extract(&text);
            }
            Err(e) => debug!(%port, error = %e, "TLS probe failed, falling back to plain reads"),
        }
    }

    read_loop(stream, port, host, strategy, settings).await
}

async fn read_loop<S>(
    stream: &mut S,
    port: Port,
    host: &str,
    strategy: ProbeStrategy,
    settings: &BannerSettings,
) -> BannerGrab
where
    S: ProbeStream + ?Sized,
{
    let mut text = String::new();
    let mut buf = vec![0u8; BANNER_BUF_SIZE];

    'attempts: for attempt in 1..=settings.max_attempts {
        let deadline = Instant::now() + settings.read_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if !stream.wait_readable(remaining).await {
                trace!(%port, attempt, ?strategy, "silent, sending nudge");
                if let Err(e) = stream.send(&strategy.nudge(host)).await {
                    debug!(%port, attempt, error = %e, "nudge write failed");
                }
                continue 'attempts;
            }

            match stream.read_chunk(&mut buf).await {
                Ok(0) => {
                    trace!(%port, attempt, "peer closed");
                    break 'attempts;
                }
                Ok(n) => {
                    decode_into(&buf[..n], &mut text);
                    if has_content_line(&text) {
                        break 'attempts;
                    }
                    continue 'attempts;
                }
                // Spurious readiness: keep waiting out this attempt.
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => {
                    debug!(%port, attempt, error = %e, "banner read failed");
                    break 'attempts;
                }
            }
        }
    }

    BannerGrab::extract(&text)
}

/// Append the valid UTF-8 parts of `bytes`, dropping anything undecodable.
fn decode_into(bytes: &[u8], out: &mut String) {
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
}

fn has_content_line(text: &str) -> bool {
    text.lines().any(|line| !line.trim().is_empty())
}
