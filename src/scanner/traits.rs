//! Scanner trait abstraction and per-port outcome types.
//!
//! The coordinator only sees the [`Scanner`] trait, so tests can drive it
//! with a stub that never touches the network.

use crate::banner::BannerGrab;
use crate::types::Port;
use async_trait::async_trait;
use std::fmt;

/// What banner mode produced for an open port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Banner {
    /// Text the service sent, already reduced to one line.
    Text(String),
    /// The service said nothing usable.
    Missing,
    /// The banner step could not run at all.
    Failed(String),
}

impl From<BannerGrab> for Banner {
    fn from(grab: BannerGrab) -> Self {
        if grab.found {
            Self::Text(grab.text)
        } else {
            Self::Missing
        }
    }
}

/// Classification of a single probed port. Exactly one per dequeued port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Handshake completed. `banner` is `None` when banner mode is off.
    Open { banner: Option<Banner> },
    /// The host actively refused the connection.
    ClosedRefused,
    /// No answer before the connect timeout.
    FilteredTimeout,
    /// Connect failed with some other OS error.
    FilteredOther { code: i32 },
    /// The target name could not be resolved for this probe.
    ResolutionError,
    /// Anything else, including a probe that panicked.
    UnexpectedError { message: String },
}

impl fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open { .. } => write!(f, "open"),
            Self::ClosedRefused => write!(f, "closed"),
            Self::FilteredTimeout => write!(f, "filtered (timeout)"),
            Self::FilteredOther { code } => write!(f, "filtered (errno {})", code),
            Self::ResolutionError => write!(f, "unresolved"),
            Self::UnexpectedError { message } => write!(f, "error: {}", message),
        }
    }
}

/// Something that can classify one port of a fixed target.
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Probe a single port. Must not panic on network errors; every failure
    /// is expressed as a [`ScanOutcome`].
    async fn scan_port(&self, port: Port) -> ScanOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_display() {
        assert_eq!(ScanOutcome::Open { banner: None }.to_string(), "open");
        assert_eq!(ScanOutcome::ClosedRefused.to_string(), "closed");
        assert_eq!(ScanOutcome::FilteredTimeout.to_string(), "filtered (timeout)");
        assert_eq!(
            ScanOutcome::FilteredOther { code: 113 }.to_string(),
            "filtered (errno 113)"
        );
    }

    #[test]
    fn test_banner_from_grab() {
        let found = BannerGrab::extract("SSH-2.0-OpenSSH\r\n");
        assert_eq!(Banner::from(found), Banner::Text("SSH-2.0-OpenSSH".into()));
        assert_eq!(Banner::from(BannerGrab::none()), Banner::Missing);
    }
}
