//! Instance metadata written as `meta-data`

use serde::{Deserialize, Serialize};

/// NoCloud instance metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaData {
    #[serde(rename = "local-hostname")]
    pub local_hostname: String,
}

impl MetaData {
    pub fn new(local_hostname: impl Into<String>) -> Self {
        Self {
            local_hostname: local_hostname.into(),
        }
    }

    /// Parse meta-data from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_local_hostname() {
        let yaml = MetaData::new("host1").to_yaml().unwrap();
        assert_eq!(yaml, "local-hostname: host1\n");
        assert_eq!(MetaData::from_yaml(&yaml).unwrap(), MetaData::new("host1"));
    }
}
