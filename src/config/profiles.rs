//! Built-in scan profiles.
//!
//! A profile bundles a port list with concurrency and timeout values tuned
//! for it. Profiles are compiled in; there is nothing to save or delete.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{PortError, PortSpec};

/// A named scan preset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: &'static str,
    pub description: &'static str,
    /// Port specification string.
    pub ports: &'static str,
    pub concurrency: usize,
    pub timeout_ms: u64,
    /// Whether the profile grabs banners from open ports.
    pub banner: bool,
}

const PROFILES: &[Profile] = &[
    Profile {
        name: "quick",
        description: "The twenty most commonly exposed services",
        ports: "21,22,23,25,53,80,110,111,135,139,143,443,445,993,995,1723,3306,3389,5900,8080",
        concurrency: 100,
        timeout_ms: 1500,
        banner: false,
    },
    Profile {
        name: "web",
        description: "Common HTTP(S) and web application ports",
        ports: "80,443,3000,5000,8000,8008,8080,8443,8888,9000",
        concurrency: 50,
        timeout_ms: 3000,
        banner: true,
    },
    Profile {
        name: "database",
        description: "Common database and cache ports",
        ports: "1433,1521,3306,5432,5984,6379,9042,9200,11211,27017",
        concurrency: 50,
        timeout_ms: 3000,
        banner: true,
    },
    Profile {
        name: "full",
        description: "Every TCP port",
        ports: "1-65535",
        concurrency: 1000,
        timeout_ms: 1000,
        banner: false,
    },
];

impl Profile {
    /// All built-in profiles.
    pub fn builtins() -> &'static [Profile] {
        PROFILES
    }

    /// Look up a profile by name (case-insensitive).
    pub fn find(name: &str) -> ConfigResult<&'static Profile> {
        PROFILES
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))
    }

    pub fn port_spec(&self) -> Result<PortSpec, PortError> {
        self.ports.parse()
    }
}
