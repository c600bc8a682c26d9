use std::collections::HashMap;

use anyhow::Result;
use config::{Config, ConfigBuilder, builder::DefaultState};
use serde::Deserialize;

use crate::constants::ENV_PREFIX;
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub expansion: ExpansionConfig,
    #[serde(default)]
    pub timezone: TimezoneConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpansionConfig {
    /// Upper bound on occurrences produced by a single recurrence rule.
    pub max_instances: u16,
    /// How far past an open-ended time range recurring components are expanded.
    pub recurrence_horizon_days: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimezoneConfig {
    /// Zone used to interpret floating date-times when the caller supplies none.
    pub default_tzid: Option<String>,
    /// Additional TZID aliases, mapped to IANA names. Alias lookup ignores case.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    /// ## Summary
    /// Loads configuration from environment variables and an optional `config.toml`.
    /// Environment variables take precedence over file values.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        Ok(Self::builder()?
            .add_source(config::File::with_name("config.toml").required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .convert_case(config::Case::Snake)
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Self>()?
            .validated()?)
    }

    /// ## Summary
    /// Loads configuration from a TOML document layered over the defaults.
    ///
    /// ## Errors
    /// Returns an error if the document is not valid TOML or does not match `Settings`.
    pub fn from_toml(toml: &str) -> Result<Self> {
        Ok(Self::builder()?
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize::<Self>()?
            .validated()?)
    }

    /// ## Errors
    /// Returns [`CoreError::InvalidSetting`] for a zero instance cap or horizon.
    pub fn validated(self) -> CoreResult<Self> {
        if self.expansion.max_instances == 0 {
            return Err(CoreError::InvalidSetting {
                key: "expansion.max_instances",
                reason: "must be at least 1",
            });
        }
        if self.expansion.recurrence_horizon_days == 0 {
            return Err(CoreError::InvalidSetting {
                key: "expansion.recurrence_horizon_days",
                reason: "must be at least 1",
            });
        }
        Ok(self)
    }

    fn builder() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("expansion.max_instances", 1000)?
            .set_default("expansion.recurrence_horizon_days", 3650)?
            .set_default("logging.level", "info")?)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    tracing::debug!(settings = ?settings, "Configuration loaded");
    Ok(settings)
}
