//! Configuration for portprobe.
//!
//! Defaults come from an optional settings file and from built-in scan
//! profiles. Nothing here is ever written to disk.

mod profiles;
mod settings;

pub use profiles::Profile;
pub use settings::{default_settings_path, AppSettings};
