//! Port types with validation and parsing.
//!
//! The `Port` newtype ensures values are always valid port numbers (1-65535).
//! `PortRange` and `PortSpec` turn a textual specification such as
//! `"22,80,8000-8010"` into the ordered, duplicate-free port set a scan runs over.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A validated network port number (1-65535).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Port(u16);

impl Port {
    /// Minimum valid port number.
    pub const MIN: u16 = 1;
    /// Maximum valid port number.
    pub const MAX: u16 = 65535;

    /// Create a new Port from a u16, returning None if invalid.
    #[inline]
    pub const fn new(port: u16) -> Option<Self> {
        if port >= Self::MIN {
            Some(Self(port))
        } else {
            None
        }
    }

    /// Get the raw port number.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Forward so width/alignment flags apply to the number.
        fmt::Display::fmt(&self.0, f)
    }
}

impl TryFrom<u16> for Port {
    type Error = PortError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(PortError::OutOfRange(u32::from(value)))
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

/// Error type for port parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("port {0} is out of valid range (1-65535)")]
    OutOfRange(u32),
    #[error("invalid port number: {0:?}")]
    InvalidFormat(String),
    #[error("empty port specification")]
    Empty,
}

/// An inclusive range of ports. Construction normalizes reversed bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    start: Port,
    end: Port,
}

impl PortRange {
    /// Create a range; `start` and `end` are swapped if given in reverse.
    pub fn new(start: Port, end: Port) -> Self {
        if start > end {
            Self {
                start: end,
                end: start,
            }
        } else {
            Self { start, end }
        }
    }

    /// Create a range containing a single port.
    pub const fn single(port: Port) -> Self {
        Self {
            start: port,
            end: port,
        }
    }

    /// Iterate over all ports in this range.
    pub fn iter(&self) -> impl Iterator<Item = Port> {
        (self.start.0..=self.end.0).map(Port)
    }
}

/// A port specification made of single ports and ranges.
///
/// Supports formats like:
/// - Single port: "80"
/// - Comma-separated: "80,443,8080"
/// - Range: "1-1000" (a reversed range such as "1000-1" is accepted)
/// - Mixed: "22,80,443,8000-9000"
#[derive(Debug, Clone, Default)]
pub struct PortSpec {
    ranges: Vec<PortRange>,
}

impl PortSpec {
    /// Create an empty port specification.
    pub const fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    /// Add a port range to the specification.
    pub fn add_range(&mut self, range: PortRange) {
        self.ranges.push(range);
    }

    /// Add a single port to the specification.
    pub fn add_port(&mut self, port: Port) {
        self.ranges.push(PortRange::single(port));
    }

    /// All ports as a sorted, deduplicated vector.
    pub fn to_ports(&self) -> Vec<Port> {
        let mut ports: Vec<Port> = self.ranges.iter().flat_map(|r| r.iter()).collect();
        ports.sort_unstable();
        ports.dedup();
        ports
    }
}

fn parse_port(raw: &str) -> Result<Port, PortError> {
    let raw = raw.trim();
    let value: u32 = raw
        .parse()
        .map_err(|_| PortError::InvalidFormat(raw.to_string()))?;
    u16::try_from(value)
        .ok()
        .and_then(Port::new)
        .ok_or(PortError::OutOfRange(value))
}

impl FromStr for PortSpec {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PortError::Empty);
        }

        let mut spec = Self::new();

        for part in s.split(',') {
            let part = part.trim();
            match part.split_once('-') {
                Some((start, end)) => {
                    spec.add_range(PortRange::new(parse_port(start)?, parse_port(end)?));
                }
                None => spec.add_port(parse_port(part)?),
            }
        }

        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ports(spec: &str) -> Vec<u16> {
        spec.parse::<PortSpec>()
            .unwrap()
            .to_ports()
            .into_iter()
            .map(u16::from)
            .collect()
    }

    #[test]
    fn test_port_validation() {
        assert!(Port::new(0).is_none());
        assert!(Port::new(1).is_some());
        assert!(Port::new(65535).is_some());
    }

    #[test]
    fn test_port_display_honours_width() {
        let port = Port::new(22).unwrap();
        assert_eq!(format!("{:<5}|", port), "22   |");
    }

    #[test]
    fn test_port_spec_mixed_with_overlap() {
        assert_eq!(ports("80,22-25,24"), vec![22, 23, 24, 25, 80]);
    }

    #[test]
    fn test_reversed_range_is_swapped() {
        assert_eq!(ports("25-22"), vec![22, 23, 24, 25]);
    }

    #[test]
    fn test_port_spec_dedup_and_sort() {
        assert_eq!(ports("443,80,80,443,22"), vec![22, 80, 443]);
        assert_eq!("1-10000".parse::<PortSpec>().unwrap().to_ports().len(), 10000);
    }

    #[test]
    fn test_whitespace_is_tolerated() {
        assert_eq!(ports(" 80 , 8000 - 8001 "), vec![80, 8000, 8001]);
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert_eq!("0".parse::<PortSpec>().unwrap_err(), PortError::OutOfRange(0));
        assert_eq!(
            "1-65536".parse::<PortSpec>().unwrap_err(),
            PortError::OutOfRange(65536)
        );
    }

    #[test]
    fn test_malformed_rejected() {
        assert!(matches!(
            "abc".parse::<PortSpec>(),
            Err(PortError::InvalidFormat(_))
        ));
        assert!(matches!(
            "80,".parse::<PortSpec>(),
            Err(PortError::InvalidFormat(_))
        ));
        assert!(matches!(
            "1-2-3".parse::<PortSpec>(),
            Err(PortError::InvalidFormat(_))
        ));
        assert_eq!("  ".parse::<PortSpec>().unwrap_err(), PortError::Empty);
    }
}
