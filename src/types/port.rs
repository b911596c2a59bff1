//! Port numbers and port specifications.
//!
//! `Port` can never hold 0. `PortSpec` parses the textual forms accepted on the
//! command line ("80", "22,443", "20-25,80") and rejects anything malformed as a
//! whole; there is no partial parse.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A validated TCP port number (1-65535).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Port(u16);

impl Port {
    /// Lowest valid port number.
    pub const MIN: u16 = 1;
    /// Highest valid port number.
    pub const MAX: u16 = 65535;

    /// Create a port, returning `None` for 0.
    #[inline]
    pub const fn new(port: u16) -> Option<Self> {
        if port >= Self::MIN {
            Some(Self(port))
        } else {
            None
        }
    }

    /// Raw port number.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl TryFrom<u16> for Port {
    type Error = PortError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(PortError::OutOfRange(value.to_string()))
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

impl FromStr for Port {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PortError::InvalidFormat(s.to_string()));
        }
        // All digits: a parse failure here can only mean overflow.
        let value: u16 = s
            .parse()
            .map_err(|_| PortError::OutOfRange(s.to_string()))?;
        Self::new(value).ok_or_else(|| PortError::OutOfRange(s.to_string()))
    }
}

/// Errors produced while parsing ports and port specifications.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("port {0} is out of range (1-65535)")]
    OutOfRange(String),
    #[error("invalid port number: '{0}'")]
    InvalidFormat(String),
    #[error("invalid port range {0}-{1}: start is greater than end")]
    InvalidRange(u16, u16),
    #[error("empty entry in port specification '{0}'")]
    EmptyEntry(String),
    #[error("empty port specification")]
    Empty,
}

/// An inclusive range of ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    start: Port,
    end: Port,
}

impl PortRange {
    pub fn new(start: Port, end: Port) -> Result<Self, PortError> {
        if start > end {
            Err(PortError::InvalidRange(start.0, end.0))
        } else {
            Ok(Self { start, end })
        }
    }

    pub const fn single(port: Port) -> Self {
        Self {
            start: port,
            end: port,
        }
    }

    /// Number of ports in the range. Never zero.
    pub const fn len(&self) -> usize {
        (self.end.0 - self.start.0) as usize + 1
    }

    pub const fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = Port> {
        (self.start.0..=self.end.0).map(Port)
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

impl FromStr for PortRange {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('-') {
            Some((start, end)) => {
                let start: Port = start.parse()?;
                let end: Port = end.parse()?;
                Self::new(start, end)
            }
            None => Ok(Self::single(s.parse()?)),
        }
    }
}

/// A port specification made of one or more comma-separated ranges.
///
/// Duplicates across ranges are allowed in the input and collapsed by
/// [`PortSpec::to_ports`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    ranges: Vec<PortRange>,
}

impl PortSpec {
    /// All ports, sorted ascending with duplicates removed.
    pub fn to_ports(&self) -> Vec<Port> {
        let mut ports: Vec<Port> = self.ranges.iter().flat_map(|r| r.iter()).collect();
        ports.sort_unstable();
        ports.dedup();
        ports
    }

    /// Number of distinct ports.
    pub fn count(&self) -> usize {
        self.to_ports().len()
    }

    pub fn ranges(&self) -> &[PortRange] {
        &self.ranges
    }
}

impl FromStr for PortSpec {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PortError::Empty);
        }

        let ranges = s
            .split(',')
            .map(|part| {
                let part = part.trim();
                if part.is_empty() {
                    Err(PortError::EmptyEntry(s.to_string()))
                } else {
                    part.parse::<PortRange>()
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { ranges })
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ranges.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_validation() {
        assert!(Port::new(0).is_none());
        assert!(Port::new(1).is_some());
        assert!(Port::new(65535).is_some());
    }

    #[test]
    fn test_port_from_str() {
        assert_eq!("443".parse::<Port>().unwrap().as_u16(), 443);
        assert_eq!(
            "99999".parse::<Port>(),
            Err(PortError::OutOfRange("99999".to_string()))
        );
        assert_eq!(
            "0".parse::<Port>(),
            Err(PortError::OutOfRange("0".to_string()))
        );
        assert!(matches!("+80".parse::<Port>(), Err(PortError::InvalidFormat(_))));
    }

    #[test]
    fn test_port_range() {
        let range: PortRange = "20-25".parse().unwrap();
        assert_eq!(range.len(), 6);
        assert!(!range.is_empty());
        assert_eq!(range.to_string(), "20-25");
        assert_eq!(PortRange::single(Port::new(80).unwrap()).len(), 1);
        assert!(matches!(
            "25-20".parse::<PortRange>(),
            Err(PortError::InvalidRange(25, 20))
        ));
    }

    #[test]
    fn test_port_spec_parsing() {
        let spec: PortSpec = "80".parse().unwrap();
        assert_eq!(spec.count(), 1);

        let spec: PortSpec = "1-100".parse().unwrap();
        assert_eq!(spec.count(), 100);

        let spec: PortSpec = "20-25,80,443".parse().unwrap();
        let ports: Vec<u16> = spec.to_ports().into_iter().map(u16::from).collect();
        assert_eq!(ports, vec![20, 21, 22, 23, 24, 25, 80, 443]);
    }

    #[test]
    fn test_port_spec_dedup_and_sort() {
        let spec: PortSpec = "443,80,80,79-81".parse().unwrap();
        let ports: Vec<u16> = spec.to_ports().into_iter().map(u16::from).collect();
        assert_eq!(ports, vec![79, 80, 81, 443]);
    }

    #[test]
    fn test_port_spec_rejects_malformed() {
        for bad in ["", "abc", "99999", "0", "80,,443", "1-2-3", "-5", "80-", "80,abc"] {
            assert!(bad.parse::<PortSpec>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_port_spec_display() {
        let spec: PortSpec = "22, 80-82".parse().unwrap();
        assert_eq!(spec.ranges().len(), 2);
        assert_eq!(spec.to_string(), "22,80-82");
    }
}
