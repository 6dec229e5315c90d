//! Port-to-probe lookup table.
//!
//! Silent services are nudged with a payload picked by port number. The table
//! keeps that heuristic in one place instead of spreading it through branches.

use crate::types::Port;
use std::collections::HashMap;

/// Well-known HTTP ports that get a `HEAD` request when silent.
pub const DEFAULT_HTTP_PORTS: &[u16] = &[80, 8080, 8000];

/// Line-oriented services that answer a bare line terminator.
/// 5431 is not a registered line protocol; it is kept as a table entry and
/// can be overridden from the settings file.
pub const DEFAULT_LINE_PORTS: &[u16] = &[21, 22, 23, 25, 110, 143, 993, 995, 5431];

/// Ports where a TLS handshake is attempted before the plain read loop.
pub const DEFAULT_TLS_PORTS: &[u16] = &[443];

const LINE_TERMINATOR: &[u8] = b"\r\n";

/// How to coax a banner out of a given port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeStrategy {
    /// Try a TLS handshake plus `HEAD` first; nudge with a line terminator
    /// if the plain fallback loop runs.
    Tls,
    /// Nudge with `HEAD / HTTP/1.0`.
    HttpHead,
    /// Nudge with a bare `\r\n`.
    LineTerminator,
}

impl ProbeStrategy {
    /// Payload sent when the service stays silent for one read wait.
    pub fn nudge(self, host: &str) -> Vec<u8> {
        match self {
            Self::HttpHead => http_head_request(host),
            Self::Tls | Self::LineTerminator => LINE_TERMINATOR.to_vec(),
        }
    }
}

/// Build the minimal HTTP request used by both the plain and TLS probes.
pub fn http_head_request(host: &str) -> Vec<u8> {
    format!("HEAD / HTTP/1.0\r\nHost: {}\r\n\r\n", host).into_bytes()
}

/// Explicit mapping from port to [`ProbeStrategy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTable {
    entries: HashMap<u16, ProbeStrategy>,
    fallback: ProbeStrategy,
}

impl ProbeTable {
    /// An empty table where every port uses `fallback`.
    pub fn new(fallback: ProbeStrategy) -> Self {
        Self {
            entries: HashMap::new(),
            fallback,
        }
    }

    /// Assign a strategy to a port, replacing any earlier entry.
    pub fn set(&mut self, port: Port, strategy: ProbeStrategy) -> &mut Self {
        self.entries.insert(port.as_u16(), strategy);
        self
    }

    /// Assign the same strategy to every port in `ports`.
    pub fn set_all(
        &mut self,
        ports: impl IntoIterator<Item = Port>,
        strategy: ProbeStrategy,
    ) -> &mut Self {
        for port in ports {
            self.set(port, strategy);
        }
        self
    }

    /// Strategy for `port`, falling back to the table default.
    pub fn strategy_for(&self, port: Port) -> ProbeStrategy {
        self.entries
            .get(&port.as_u16())
            .copied()
            .unwrap_or(self.fallback)
    }

    /// Entries sorted by port, for display and auditing.
    pub fn entries(&self) -> Vec<(u16, ProbeStrategy)> {
        let mut entries: Vec<_> = self.entries.iter().map(|(&p, &s)| (p, s)).collect();
        entries.sort_unstable_by_key(|&(p, _)| p);
        entries
    }
}

impl Default for ProbeTable {
    fn default() -> Self {
        let mut table = Self::new(ProbeStrategy::LineTerminator);
        let known = |ports: &'static [u16]| ports.iter().copied().filter_map(Port::new);
        table
            .set_all(known(DEFAULT_LINE_PORTS), ProbeStrategy::LineTerminator)
            .set_all(known(DEFAULT_HTTP_PORTS), ProbeStrategy::HttpHead)
            .set_all(known(DEFAULT_TLS_PORTS), ProbeStrategy::Tls);
        table
    }
}
