//! Core type definitions using newtype patterns for type safety.
//!
//! Parsing lives here so that malformed input is rejected before any
//! network activity happens.

mod port;
mod scan_id;
mod target;

pub use port::{Port, PortError, PortRange, PortSpec};
pub use scan_id::ScanId;
pub use target::{ScanTarget, TargetError, TargetSpec};
