use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::lease::DEFAULT_MTU;

/// Private-use DHCP option codes accepted in [`CustomOptions`].
pub const PRIVATE_OPTION_RANGE: std::ops::RangeInclusive<u8> = 224..=254;

/// Smallest datagram every IPv4 host must accept (RFC 791).
const MIN_MTU: u16 = 576;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub server_interface: String,
    pub dummy_interface: String,
    pub run_directory: PathBuf,
    pub resolv_conf: PathBuf,
    pub hostname: Option<String>,
    pub mtu: u16,
    pub dhcp_options: Option<CustomOptions>,
}

/// Extra options requested for the guest NIC.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomOptions {
    pub boot_file_name: Option<String>,
    pub tftp_server_name: Option<String>,
    pub ntp_servers: Vec<Ipv4Addr>,
    pub private_options: Vec<PrivateOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateOption {
    pub option: u8,
    pub value: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_interface: "k6t-eth0".to_string(),
            dummy_interface: "eth0".to_string(),
            run_directory: PathBuf::from("/var/run/kubevirt-private"),
            resolv_conf: PathBuf::from("/etc/resolv.conf"),
            hostname: None,
            mtu: DEFAULT_MTU,
            dhcp_options: None,
        }
    }
}

impl Config {
    /// Loads `path` when given, otherwise returns the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                serde_json::from_str(&content)?
            }
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_interface.is_empty() {
            return Err(Error::InvalidConfig(
                "serverInterface must not be empty".to_string(),
            ));
        }

        if self.dummy_interface.is_empty() {
            return Err(Error::InvalidConfig(
                "dummyInterface must not be empty".to_string(),
            ));
        }

        if self.mtu < MIN_MTU {
            return Err(Error::InvalidConfig(format!(
                "mtu {} is below the minimum of {}",
                self.mtu, MIN_MTU
            )));
        }

        if let Some(options) = &self.dhcp_options {
            for private in &options.private_options {
                if !PRIVATE_OPTION_RANGE.contains(&private.option) {
                    return Err(Error::InvalidConfig(format!(
                        "private option {} is out of range, must be in range 224 to 254",
                        private.option
                    )));
                }
            }
        }

        Ok(())
    }

    /// Single-instance marker for this interface.
    pub fn lock_file(&self) -> PathBuf {
        self.run_directory
            .join(format!("dhcp_started-{}", self.server_interface))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mtu, 1480);
    }

    #[test]
    fn test_lock_file_path() {
        let config = Config::default();
        assert_eq!(
            config.lock_file(),
            PathBuf::from("/var/run/kubevirt-private/dhcp_started-k6t-eth0")
        );
    }

    #[test]
    fn test_private_option_out_of_range() {
        let config = Config {
            dhcp_options: Some(CustomOptions {
                private_options: vec![PrivateOption {
                    option: 200,
                    value: "x".to_string(),
                }],
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_private_option_range_bounds() {
        for option in [224u8, 240, 254] {
            let config = Config {
                dhcp_options: Some(CustomOptions {
                    private_options: vec![PrivateOption {
                        option,
                        value: "x".to_string(),
                    }],
                    ..Default::default()
                }),
                ..Default::default()
            };
            assert!(config.validate().is_ok(), "option {} should be accepted", option);
        }
    }

    #[test]
    fn test_small_mtu_rejected() {
        let config = Config {
            mtu: 500,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_interface_rejected() {
        let config = Config {
            server_interface: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{
            "serverInterface": "br0",
            "hostname": "vm1",
            "dhcpOptions": {
                "bootFileName": "pxelinux.0",
                "tftpServerName": "tftp.example.com",
                "ntpServers": ["10.0.0.1", "10.0.0.2"],
                "privateOptions": [{"option": 240, "value": "extra"}]
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.server_interface, "br0");
        assert_eq!(config.dummy_interface, "eth0");
        assert_eq!(config.mtu, DEFAULT_MTU);

        let options = config.dhcp_options.unwrap();
        assert_eq!(options.boot_file_name.as_deref(), Some("pxelinux.0"));
        assert_eq!(options.ntp_servers.len(), 2);
        assert_eq!(options.private_options[0].option, 240);
    }

    #[test]
    fn test_load_missing_path_uses_defaults() {
        let config = Config::load_or_default(None::<&Path>).unwrap();
        assert_eq!(config.server_interface, "k6t-eth0");
        assert!(Config::load_or_default(Some("/nonexistent/vmdhcp.json")).is_err());
    }
}
