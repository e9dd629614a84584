//! # Discovery Configuration
//!
//! How often an established stream re-announces itself by probing the
//! remote side for peers. Loadable from TOML:
//!
//! ```toml
//! [discovery]
//! period_secs = 5
//! ```

use crate::errors::ConfigError;
use serde::Deserialize;
use std::time::Duration;

/// Default re-announcement period, seconds.
const DEFAULT_PERIOD_SECS: u64 = 5;

/// Discovery configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Seconds between DISC_GET_PEERS probes on an established stream.
    pub period_secs: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            period_secs: DEFAULT_PERIOD_SECS,
        }
    }
}

/// Wrapper matching the `[discovery]` table in a peer config file.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    discovery: DiscoveryConfig,
}

impl DiscoveryConfig {
    /// The probe period as a [`Duration`].
    #[must_use]
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    /// Parse the `[discovery]` section out of a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text)?;
        file.discovery.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.period_secs == 0 {
            return Err(ConfigError::ZeroPeriod);
        }
        Ok(self)
    }
}
