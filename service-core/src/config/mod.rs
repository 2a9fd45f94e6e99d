use crate::error::AppError;
use config::builder::DefaultState;
use config::{Config as Cfg, ConfigBuilder, ConfigError, File};
use serde::Deserialize;

/// Loopback unless overridden with `APP__HOST`.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Settings shared by every service: the listen address.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Load from `.env`, an optional `configuration` file and `APP__*`
    /// environment variables, in increasing order of precedence.
    pub fn load(default_port: u16) -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = defaults(default_port)?
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

fn defaults(default_port: u16) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Cfg::builder()
        .set_default("host", DEFAULT_HOST)?
        .set_default("port", i64::from(default_port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bind_loopback_on_the_service_port() {
        let parsed: Config = defaults(5005)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(parsed.host, "127.0.0.1");
        assert_eq!(parsed.port, 5005);
    }

    #[test]
    fn host_can_be_overridden() {
        let parsed: Config = defaults(5005)
            .unwrap()
            .set_override("host", "0.0.0.0")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(parsed.host, "0.0.0.0");
    }
}
