//! Seed document assembly
//!
//! Turns validated command line fields into the three NoCloud documents:
//! - `user-data` - cloud-config with the user account
//! - `meta-data` - instance hostname
//! - `network-config` - static ethernet configuration (v2)
//!
//! Assembly is a fold over [`SeedBuilder`] values; nothing is shared between
//! invocations.

use std::net::IpAddr;

use tracing::debug;

use crate::config::{
    CloudConfig, DEFAULT_SHELL, HASHED_PASSWORD_PLACEHOLDER, UserSpec, is_hashed_password,
};
use crate::error::{Result, SeedError};
use crate::metadata::MetaData;
use crate::network::{EthernetConfig, NameserverConfig, NetworkConfig};

/// File name of the cloud-config document on the image
pub const USER_DATA_FILE: &str = "user-data";
/// File name of the instance metadata document on the image
pub const META_DATA_FILE: &str = "meta-data";
/// File name of the network configuration document on the image
pub const NETWORK_CONFIG_FILE: &str = "network-config";

/// Account settings that have defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserOptions {
    /// Login shell (default: /bin/bash)
    pub shell: String,
    /// Lock the password so it cannot be used to log in
    pub locked: bool,
}

impl Default for UserOptions {
    fn default() -> Self {
        Self {
            shell: DEFAULT_SHELL.to_string(),
            locked: false,
        }
    }
}

/// A named ethernet interface with its static settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthernetSpec {
    pub name: String,
    pub settings: EthernetConfig,
}

/// Build a user entry with the default shell and an unlocked password
pub fn build_user(name: &str, password: &str, groups: &[String]) -> UserSpec {
    build_user_with(name, password, groups, &UserOptions::default())
}

/// Build a user entry
///
/// A password that starts with `$` and holds at least two `$` is treated as
/// pre-hashed and only the placeholder is stored in `passwd`.
pub fn build_user_with(
    name: &str,
    password: &str,
    groups: &[String],
    options: &UserOptions,
) -> UserSpec {
    let (passwd, plain_text_passwd) = if is_hashed_password(password) {
        debug!("Password for {} looks pre-hashed", name);
        (Some(HASHED_PASSWORD_PLACEHOLDER.to_string()), None)
    } else {
        (None, Some(password.to_string()))
    };

    let mut unique_groups: Vec<String> = Vec::with_capacity(groups.len());
    for group in groups {
        if !unique_groups.contains(group) {
            unique_groups.push(group.clone());
        }
    }

    UserSpec {
        groups: (!unique_groups.is_empty()).then_some(unique_groups),
        lock_passwd: options.locked,
        name: name.to_string(),
        passwd,
        plain_text_passwd,
        shell: options.shell.clone(),
    }
}

/// Build static settings for an ethernet interface
///
/// DHCP is always disabled. Fails when no address is given, or when an
/// address, gateway or nameserver is malformed.
pub fn build_ethernet(
    iface: &str,
    addresses: &[String],
    gateway: Option<&str>,
    nameservers: Option<&[String]>,
) -> Result<EthernetSpec> {
    if iface.trim().is_empty() {
        return Err(SeedError::validation("ethernet interface name is empty"));
    }
    if addresses.is_empty() {
        return Err(SeedError::validation(format!(
            "interface {iface} needs at least one address"
        )));
    }
    for address in addresses {
        validate_cidr(address)?;
    }

    let gateway4 = match gateway.filter(|g| !g.is_empty()) {
        Some(gateway) => {
            validate_ip(gateway, "gateway")?;
            Some(gateway.to_string())
        }
        None => None,
    };

    let nameservers = match nameservers.filter(|n| !n.is_empty()) {
        Some(servers) => {
            for server in servers {
                validate_ip(server, "nameserver")?;
            }
            Some(NameserverConfig {
                addresses: servers.to_vec(),
            })
        }
        None => None,
    };

    Ok(EthernetSpec {
        name: iface.to_string(),
        settings: EthernetConfig {
            addresses: addresses.to_vec(),
            dhcp4: false,
            gateway4,
            nameservers,
        },
    })
}

/// Check an `address/prefix` string
fn validate_cidr(cidr: &str) -> Result<()> {
    let (addr, prefix) = cidr.split_once('/').ok_or_else(|| {
        SeedError::validation(format!("address {cidr} is not in CIDR form (ADDR/NN)"))
    })?;

    let addr: IpAddr = addr
        .parse()
        .map_err(|_| SeedError::validation(format!("invalid IP address in {cidr}")))?;
    let max_prefix = if addr.is_ipv4() { 32 } else { 128 };

    // u8::from_str would also take "+24" and "024"
    let canonical = !prefix.is_empty()
        && prefix.bytes().all(|b| b.is_ascii_digit())
        && (prefix == "0" || !prefix.starts_with('0'));
    match prefix.parse::<u8>() {
        Ok(len) if canonical && len <= max_prefix => Ok(()),
        _ => Err(SeedError::validation(format!(
            "invalid prefix length in {cidr}"
        ))),
    }
}

fn validate_ip(value: &str, what: &str) -> Result<()> {
    value
        .parse::<IpAddr>()
        .map(|_| ())
        .map_err(|_| SeedError::validation(format!("invalid {what} address: {value}")))
}

/// Immutable builder for the seed document set
#[derive(Debug, Clone)]
pub struct SeedBuilder {
    hostname: String,
    users: Vec<UserSpec>,
    network: NetworkConfig,
}

impl SeedBuilder {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            users: Vec::new(),
            network: NetworkConfig::default(),
        }
    }

    /// Add a user account
    pub fn with_user(mut self, user: UserSpec) -> Self {
        self.users.push(user);
        self
    }

    /// Add an ethernet interface, replacing one with the same name
    pub fn with_ethernet(mut self, ethernet: EthernetSpec) -> Self {
        self.network = self.network.with_ethernet(ethernet.name, ethernet.settings);
        self
    }

    /// Produce the document set
    pub fn build(self) -> Result<SeedDocuments> {
        if self.hostname.trim().is_empty() {
            return Err(SeedError::validation("hostname is empty"));
        }
        if let Some((name, _)) = self
            .network
            .ethernets
            .iter()
            .find(|(_, eth)| eth.addresses.is_empty())
        {
            return Err(SeedError::validation(format!(
                "interface {name} needs at least one address"
            )));
        }

        debug!(
            "Assembling seed for {} ({} users, {} interfaces)",
            self.hostname,
            self.users.len(),
            self.network.ethernets.len()
        );

        Ok(SeedDocuments {
            user_data: CloudConfig::for_users(self.users),
            meta_data: MetaData::new(self.hostname),
            network_config: self.network,
        })
    }
}

/// Assemble the document set for one user and at most one interface
pub fn assemble(
    hostname: &str,
    user: UserSpec,
    ethernet: Option<EthernetSpec>,
) -> Result<SeedDocuments> {
    let builder = SeedBuilder::new(hostname).with_user(user);
    let builder = match ethernet {
        Some(ethernet) => builder.with_ethernet(ethernet),
        None => builder,
    };
    builder.build()
}

/// The three NoCloud documents
#[derive(Debug, Clone, PartialEq)]
pub struct SeedDocuments {
    pub user_data: CloudConfig,
    pub meta_data: MetaData,
    pub network_config: NetworkConfig,
}

/// A serialized document ready to be placed on the image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedFile {
    pub name: &'static str,
    pub content: Vec<u8>,
}

impl SeedDocuments {
    /// Serialize the documents in image order
    pub fn render(&self) -> Result<Vec<SeedFile>> {
        Ok(vec![
            SeedFile {
                name: USER_DATA_FILE,
                content: self.user_data.to_user_data()?.into_bytes(),
            },
            SeedFile {
                name: META_DATA_FILE,
                content: self.meta_data.to_yaml()?.into_bytes(),
            },
            SeedFile {
                name: NETWORK_CONFIG_FILE,
                content: self.network_config.to_yaml()?.into_bytes(),
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_build_user_plaintext() {
        let user = build_user("alice", "plaintextpw", &[]);
        assert_eq!(user.plain_text_passwd.as_deref(), Some("plaintextpw"));
        assert_eq!(user.passwd, None);
        assert_eq!(user.shell, "/bin/bash");
        assert!(!user.lock_passwd);
        assert_eq!(user.groups, None);
    }

    #[test]
    fn test_build_user_hashed_stores_placeholder() {
        let user = build_user("alice", "$6$abc$def", &[]);
        assert_eq!(user.passwd.as_deref(), Some("passwd"));
        assert_eq!(user.plain_text_passwd, None);
        assert!(user.has_hashed_password());
    }

    #[test]
    fn test_build_user_single_dollar_is_plaintext() {
        let user = build_user("alice", "$abc", &[]);
        assert_eq!(user.plain_text_passwd.as_deref(), Some("$abc"));
    }

    #[test]
    fn test_build_user_options_and_groups() {
        let options = UserOptions {
            shell: "/bin/zsh".to_string(),
            locked: true,
        };
        let user = build_user_with("bob", "pw", &strings(&["wheel", "adm", "wheel"]), &options);
        assert_eq!(user.shell, "/bin/zsh");
        assert!(user.lock_passwd);
        assert_eq!(user.groups, Some(strings(&["wheel", "adm"])));
    }

    #[test]
    fn test_build_ethernet_minimal() {
        let eth = build_ethernet("eth0", &strings(&["10.0.0.2/24"]), None, None).unwrap();
        assert_eq!(eth.name, "eth0");
        assert!(!eth.settings.dhcp4);
        assert_eq!(eth.settings.gateway4, None);
        assert_eq!(eth.settings.nameservers, None);
    }

    #[test]
    fn test_build_ethernet_full() {
        let eth = build_ethernet(
            "ens3",
            &strings(&["192.168.1.10/24", "fd00::10/64"]),
            Some("192.168.1.1"),
            Some(&strings(&["1.1.1.1", "9.9.9.9"])),
        )
        .unwrap();
        assert_eq!(eth.settings.addresses.len(), 2);
        assert_eq!(eth.settings.gateway4.as_deref(), Some("192.168.1.1"));
        assert_eq!(
            eth.settings.nameservers.unwrap().addresses,
            strings(&["1.1.1.1", "9.9.9.9"])
        );
    }

    #[test]
    fn test_build_ethernet_empty_nameservers_omitted() {
        let eth = build_ethernet("eth0", &strings(&["10.0.0.2/8"]), Some(""), Some(&[])).unwrap();
        assert_eq!(eth.settings.gateway4, None);
        assert_eq!(eth.settings.nameservers, None);
    }

    #[test]
    fn test_build_ethernet_requires_addresses() {
        let err = build_ethernet("eth0", &[], None, None).unwrap_err();
        assert!(matches!(err, SeedError::Validation(_)));
    }

    #[test]
    fn test_build_ethernet_rejects_bad_input() {
        for bad in ["10.0.0.2", "10.0.0.2/33", "not-an-ip/24", "fd00::1/129"] {
            let err = build_ethernet("eth0", &strings(&[bad]), None, None).unwrap_err();
            assert!(matches!(err, SeedError::Validation(_)), "{bad} accepted");
        }
        let err = build_ethernet("eth0", &strings(&["10.0.0.2/24"]), Some("gw"), None);
        assert!(err.is_err());
        let err = build_ethernet("", &strings(&["10.0.0.2/24"]), None, None);
        assert!(err.is_err());
    }

    #[test]
    fn test_build_ethernet_rejects_noncanonical_prefix() {
        let noncanonical = [
            "10.0.0.2/+24",
            "10.0.0.2/024",
            "10.0.0.2/",
            "10.0.0.2/ 24",
            "fd00::1/+64",
        ];
        for bad in noncanonical {
            let err = build_ethernet("eth0", &strings(&[bad]), None, None).unwrap_err();
            assert!(matches!(err, SeedError::Validation(_)), "{bad} accepted");
        }
        for good in ["10.0.0.2/0", "10.0.0.2/8", "10.0.0.2/32", "fd00::1/128"] {
            let eth = build_ethernet("eth0", &strings(&[good]), None, None);
            assert!(eth.is_ok(), "{good} rejected");
        }
    }

    #[test]
    fn test_assemble_without_network() {
        let docs = assemble("host1", build_user("alice", "pw", &[]), None).unwrap();
        assert_eq!(docs.meta_data.local_hostname, "host1");
        assert!(docs.network_config.ethernets.is_empty());
        assert_eq!(docs.network_config.version, 2);
        assert_eq!(docs.user_data.users.len(), 1);
    }

    #[test]
    fn test_assemble_is_deterministic() {
        let eth = build_ethernet("eth0", &strings(&["10.0.0.2/24"]), None, None).unwrap();
        let a = assemble("h", build_user("u", "p", &[]), Some(eth.clone())).unwrap();
        let b = assemble("h", build_user("u", "p", &[]), Some(eth)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.render().unwrap(), b.render().unwrap());
    }

    #[test]
    fn test_assemble_rejects_empty_hostname() {
        let err = assemble("  ", build_user("u", "p", &[]), None).unwrap_err();
        assert!(matches!(err, SeedError::Validation(_)));
    }

    #[test]
    fn test_assemble_rejects_interface_without_addresses() {
        let eth = EthernetSpec {
            name: "eth0".to_string(),
            settings: EthernetConfig {
                addresses: vec![],
                dhcp4: false,
                gateway4: None,
                nameservers: None,
            },
        };
        let err = assemble("h", build_user("u", "p", &[]), Some(eth)).unwrap_err();
        assert!(matches!(err, SeedError::Validation(_)));
    }

    #[test]
    fn test_builder_folds_multiple_values() {
        let eth0 = build_ethernet("eth0", &strings(&["10.0.0.2/24"]), None, None).unwrap();
        let eth1 = build_ethernet("eth1", &strings(&["10.1.0.2/24"]), None, None).unwrap();
        let docs = SeedBuilder::new("host")
            .with_user(build_user("a", "p", &[]))
            .with_user(build_user("b", "p", &[]))
            .with_ethernet(eth0)
            .with_ethernet(eth1)
            .build()
            .unwrap();
        assert_eq!(docs.user_data.users.len(), 2);
        assert_eq!(
            docs.network_config.ethernets.keys().collect::<Vec<_>>(),
            vec!["eth0", "eth1"]
        );
    }

    #[test]
    fn test_render_order_and_header() {
        let docs = assemble("host1", build_user("alice", "pw", &[]), None).unwrap();
        let files = docs.render().unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["user-data", "meta-data", "network-config"]);
        assert!(files[0].content.starts_with(b"#cloud-config\n"));
        assert_eq!(files[1].content, b"local-hostname: host1\n");
    }
}
