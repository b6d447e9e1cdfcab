//! Share link configuration.

use serde::{Deserialize, Serialize};

/// Share link issuance and expiry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareConfig {
    /// Base URL used to build the public share URL (`{base_url}/share/{token}`).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Horizon used when a link is created without a TTL.
    #[serde(default = "default_non_expiring_years")]
    pub non_expiring_years: u32,
    /// Upper bound accepted for `expires_in` hours.
    #[serde(default = "default_max_ttl_hours")]
    pub max_ttl_hours: u32,
    /// Interval of the background sweep that deactivates lapsed links.
    /// `0` disables the sweep; expiry is then only observed on read.
    #[serde(default)]
    pub sweep_interval_seconds: u64,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            non_expiring_years: default_non_expiring_years(),
            max_ttl_hours: default_max_ttl_hours(),
            sweep_interval_seconds: 0,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_non_expiring_years() -> u32 {
    10
}

fn default_max_ttl_hours() -> u32 {
    24 * 365
}
