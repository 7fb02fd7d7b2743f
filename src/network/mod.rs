//! Network configuration (v2 format) written as `network-config`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Network config schema version emitted on the image
pub const NETWORK_CONFIG_VERSION: u8 = 2;

/// Network configuration (v2 format)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub version: u8,
    /// Interfaces keyed by name, emitted in sorted order
    #[serde(default)]
    pub ethernets: BTreeMap<String, EthernetConfig>,
}

/// Ethernet interface configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthernetConfig {
    #[serde(default)]
    pub addresses: Vec<String>,
    pub dhcp4: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway4: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nameservers: Option<NameserverConfig>,
}

/// Nameserver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameserverConfig {
    #[serde(default)]
    pub addresses: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            version: NETWORK_CONFIG_VERSION,
            ethernets: BTreeMap::new(),
        }
    }
}

impl NetworkConfig {
    /// Parse network config from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Return a copy with `name` configured as `ethernet`, replacing any
    /// earlier entry of the same name.
    pub fn with_ethernet(mut self, name: impl Into<String>, ethernet: EthernetConfig) -> Self {
        self.ethernets.insert(name.into(), ethernet);
        self
    }
}
