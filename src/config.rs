use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::error::{Error, Result};

/// Upper bound on configured publish rules.
pub const MAX_PUBLISH_RULES: usize = 10;

const CONFIG_FILE: &str = ".config/sdm72-mon.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial device of the RS-485 adapter, e.g. `/dev/ttyUSB0`.
    pub device: Option<String>,
    pub baudrate: u32,
    pub stopbits: u8,
    pub slave_id: u8,
    /// `0xNN <topic>` lines, handled in order.
    pub publish: Vec<String>,
    pub reset_hour: u32,
    pub reset_minute: u32,
    pub mqtt: Option<MqttConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ca_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: None,
            baudrate: 9600,
            stopbits: 1,
            slave_id: 1,
            publish: Vec::new(),
            reset_hour: 0,
            reset_minute: 0,
            mqtt: None,
        }
    }
}

fn default_mqtt_port() -> u16 {
    1883
}

impl Config {
    /// Load `~/.config/sdm72-mon.toml`. A missing file yields the
    /// defaults; required settings are enforced where they are used.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text).map_err(|err| match err {
            Error::Config(msg) => Error::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    fn parse(text: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(text).map_err(|err| Error::Config(err.to_string()))?;
        if config.reset_hour > 23 || config.reset_minute > 59 {
            return Err(Error::Config(format!(
                "reset time {:02}:{:02} out of range",
                config.reset_hour, config.reset_minute
            )));
        }
        if config.publish.len() > MAX_PUBLISH_RULES {
            warn!(
                "ignoring publish rules beyond the first {MAX_PUBLISH_RULES}"
            );
            config.publish.truncate(MAX_PUBLISH_RULES);
        }
        Ok(config)
    }

    fn path() -> Result<PathBuf> {
        let home = std::env::var_os("HOME")
            .ok_or_else(|| Error::Config("HOME is not set".into()))?;
        Ok(PathBuf::from(home).join(CONFIG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, MAX_PUBLISH_RULES};
    use crate::error::Error;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = Config::parse("device = \"/dev/ttyUSB0\"\n").expect("config should parse");
        assert_eq!(config.device.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(config.baudrate, 9600);
        assert_eq!(config.stopbits, 1);
        assert_eq!(config.slave_id, 1);
        assert_eq!(config.reset_hour, 0);
        assert!(config.publish.is_empty());
        assert!(config.mqtt.is_none());
    }

    #[test]
    fn parses_full_config() {
        let text = r#"
            device = "/dev/ttyUSB1"
            baudrate = 19200
            stopbits = 2
            slave_id = 3
            reset_hour = 6
            reset_minute = 30
            publish = ["0x34 power", "0x56 energy"]

            [mqtt]
            host = "broker.local"
            username = "meter"
            password = "secret"
            ca_file = "/etc/ssl/ca.pem"
        "#;
        let config = Config::parse(text).expect("config should parse");
        assert_eq!(config.baudrate, 19_200);
        assert_eq!(config.publish.len(), 2);
        let mqtt = config.mqtt.expect("mqtt section should parse");
        assert_eq!(mqtt.host, "broker.local");
        assert_eq!(mqtt.port, 1883);
        assert_eq!(mqtt.username.as_deref(), Some("meter"));
    }

    #[test]
    fn rejects_out_of_range_reset_time() {
        let err = Config::parse("reset_hour = 24\n").expect_err("24 is not a valid hour");
        assert!(matches!(err, Error::Config(_)));
        Config::parse("reset_hour = 23\nreset_minute = 59\n").expect("edge values are valid");
    }

    #[test]
    fn publish_list_is_capped() {
        let rules: Vec<String> = (0..12).map(|i| format!("\"0x{i:02x} t{i}\"")).collect();
        let text = format!("publish = [{}]\n", rules.join(", "));
        let config = Config::parse(&text).expect("config should parse");
        assert_eq!(config.publish.len(), MAX_PUBLISH_RULES);
    }
}
