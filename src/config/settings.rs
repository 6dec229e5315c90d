//! Application settings and paths.
//!
//! An optional JSON file supplies defaults for the scan knobs. Command-line
//! flags override whatever it sets.

use crate::banner::{
    BannerSettings, ProbeStrategy, ProbeTable, DEFAULT_ATTEMPTS, DEFAULT_HANDSHAKE_TIMEOUT,
    DEFAULT_HTTP_PORTS, DEFAULT_LINE_PORTS, DEFAULT_READ_TIMEOUT, DEFAULT_TLS_PORTS,
};
use crate::error::{ConfigError, ConfigResult};
use crate::scanner::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_THREADS};
use crate::types::Port;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Application directory paths following the XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/portsweep)
    pub config_dir: PathBuf,
}

impl Paths {
    /// Locate the per-user directories. Nothing is created on disk.
    pub fn discover() -> ConfigResult<Self> {
        let project = ProjectDirs::from("com", "portsweep", "portsweep")
            .ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// Defaults read from the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Requested worker count.
    pub threads: usize,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Banner readability wait in milliseconds.
    pub banner_timeout_ms: u64,
    /// Banner read-loop attempt budget.
    pub banner_attempts: u32,
    /// TLS handshake bound in milliseconds.
    pub tls_handshake_timeout_ms: u64,
    /// Ports nudged with an HTTP `HEAD`.
    pub http_probe_ports: Vec<Port>,
    /// Ports nudged with a bare line terminator.
    pub line_probe_ports: Vec<Port>,
    /// Ports where a TLS handshake is tried first.
    pub tls_probe_ports: Vec<Port>,
}

fn ports(list: &[u16]) -> Vec<Port> {
    list.iter().copied().filter_map(Port::new).collect()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT.as_millis() as u64,
            banner_timeout_ms: DEFAULT_READ_TIMEOUT.as_millis() as u64,
            banner_attempts: DEFAULT_ATTEMPTS,
            tls_handshake_timeout_ms: DEFAULT_HANDSHAKE_TIMEOUT.as_millis() as u64,
            http_probe_ports: ports(DEFAULT_HTTP_PORTS),
            line_probe_ports: ports(DEFAULT_LINE_PORTS),
            tls_probe_ports: ports(DEFAULT_TLS_PORTS),
        }
    }
}

impl AppSettings {
    /// Load settings from `path`, or from the default location when `None`.
    ///
    /// A missing default file yields defaults; a missing explicit file is an
    /// error.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let file = Paths::discover()?.settings_file();
                if file.exists() {
                    Self::load_from(&file)
                } else {
                    debug!(path = %file.display(), "no settings file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        settings.validate()?;
        debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Reject values that would make a scan meaningless.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.banner_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "banner_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "connect_timeout_ms",
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// Probe table built from the configured port lists.
    ///
    /// Later lists win when a port appears in more than one: line, then
    /// HTTP, then TLS.
    pub fn probe_table(&self) -> ProbeTable {
        let mut table = ProbeTable::new(ProbeStrategy::LineTerminator);
        table
            .set_all(self.line_probe_ports.iter().copied(), ProbeStrategy::LineTerminator)
            .set_all(self.http_probe_ports.iter().copied(), ProbeStrategy::HttpHead)
            .set_all(self.tls_probe_ports.iter().copied(), ProbeStrategy::Tls);
        table
    }

    /// Banner settings derived from this file.
    pub fn banner_settings(&self) -> BannerSettings {
        BannerSettings {
            read_timeout: Duration::from_millis(self.banner_timeout_ms),
            max_attempts: self.banner_attempts,
            handshake_timeout: Duration::from_millis(self.tls_handshake_timeout_ms),
            probes: self.probe_table(),
        }
    }
}
