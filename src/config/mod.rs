//! Cloud-config (user-data) document types
//!
//! The user-data file on a cidata image is a cloud-config YAML document
//! that begins with the `#cloud-config` header line. Field order in these
//! structs is the order keys are emitted in.

use serde::{Deserialize, Serialize};

/// Header line cloud-init uses to recognize a cloud-config document
pub const CLOUD_CONFIG_HEADER: &str = "#cloud-config\n";

/// Message cloud-init logs once the final stage has run
pub const FINAL_MESSAGE: &str = "### BOOTED ###";

/// Login shell used when none is requested
pub const DEFAULT_SHELL: &str = "/bin/bash";

/// Value stored in `passwd` when a pre-hashed password is supplied.
///
/// The hash itself is not forwarded. Changing this alters the accounts
/// created on first boot, so it stays as-is until that is decided.
pub const HASHED_PASSWORD_PLACEHOLDER: &str = "passwd";

/// Main cloud-config structure written as `user-data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudConfig {
    /// Final message template
    pub final_message: String,

    /// Power state change after cloud-init finishes
    pub power_state: PowerState,

    /// Commands to run
    #[serde(default)]
    pub runcmd: Vec<RunCmd>,

    /// Users to create
    #[serde(default)]
    pub users: Vec<UserSpec>,
}

/// Power state configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerState {
    pub mode: PowerMode,
}

/// What the instance does once cloud-init completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerMode {
    Reboot,
    Poweroff,
    Halt,
}

/// Command to run (can be string or list of args)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunCmd {
    /// Shell command as string
    Shell(String),
    /// Command with arguments
    Args(Vec<String>),
}

impl RunCmd {
    /// Build an argument-vector command
    pub fn args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Args(args.into_iter().map(Into::into).collect())
    }
}

/// A user account entry in the `users` list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSpec {
    /// Supplementary groups, written as `groups: null` when there are none
    #[serde(default)]
    pub groups: Option<Vec<String>>,

    pub lock_passwd: bool,

    pub name: String,

    /// Pre-hashed password field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passwd: Option<String>,

    /// Plaintext password field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plain_text_passwd: Option<String>,

    pub shell: String,
}

impl UserSpec {
    /// Whether the password was classified as pre-hashed
    pub fn has_hashed_password(&self) -> bool {
        self.passwd.is_some()
    }
}

/// Check whether a password looks pre-hashed (crypt(3) style `$id$salt$hash`)
pub fn is_hashed_password(password: &str) -> bool {
    password.starts_with('$') && password.matches('$').count() >= 2
}

impl CloudConfig {
    /// Cloud-config for the given users with the fixed boot behaviour:
    /// reboot when done, drop snapd and disable cloud-init for later boots.
    pub fn for_users(users: Vec<UserSpec>) -> Self {
        Self {
            final_message: FINAL_MESSAGE.to_string(),
            power_state: PowerState {
                mode: PowerMode::Reboot,
            },
            runcmd: vec![
                RunCmd::args(["apt", "purge", "-y", "snapd"]),
                RunCmd::args([
                    "systemctl",
                    "disable",
                    "cloud-init",
                    "cloud-init-local",
                    "cloud-config",
                    "cloud-final",
                ]),
            ],
            users,
        }
    }

    /// Parse cloud-config from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        // Strip #cloud-config header if present
        let yaml = yaml
            .strip_prefix("#cloud-config")
            .map(|s| s.trim_start())
            .unwrap_or(yaml);

        serde_yaml::from_str(yaml)
    }

    /// Render as a complete user-data file, header included
    pub fn to_user_data(&self) -> Result<String, serde_yaml::Error> {
        let body = serde_yaml::to_string(self)?;
        Ok(format!("{CLOUD_CONFIG_HEADER}{body}"))
    }

    /// Check if this looks like a cloud-config (starts with #cloud-config)
    pub fn is_cloud_config(data: &str) -> bool {
        data.trim_start().starts_with("#cloud-config")
    }
}
