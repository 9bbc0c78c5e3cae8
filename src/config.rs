use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::session::{SessionConfig, DEFAULT_MAX_LINES, DEFAULT_NAMESPACE};

#[derive(Debug, Default)]
pub enum ConfigLoadOption {
    #[default]
    Default,

    Path(PathBuf),
}

#[derive(Default, Debug, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// Log buffer capacity. Can only lower the default.
    pub max_lines: Option<usize>,
    /// Lines of history requested when a stream opens. Everything when unset.
    pub tail_lines: Option<i64>,
}

#[derive(Default, Debug, Deserialize, Serialize, PartialEq)]
pub struct InventoryConfig {
    /// Periodic pod refresh. Disabled when unset or zero.
    pub refresh_interval_secs: Option<u64>,
    pub default_namespace: Option<String>,
}

#[derive(Default, Debug, Deserialize, Serialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
}

impl Config {
    pub fn load(option: ConfigLoadOption) -> Result<Self> {
        let figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let config = match option {
            ConfigLoadOption::Default => figment,
            ConfigLoadOption::Path(path) => figment.merge(Yaml::file(path)),
        }
        .merge(Env::prefixed("PODWATCH_").split("__"))
        .extract_lossy()?;

        Ok(config)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            max_lines: self
                .logging
                .max_lines
                .map_or(DEFAULT_MAX_LINES, |lines| lines.clamp(1, DEFAULT_MAX_LINES)),
            default_namespace: self
                .inventory
                .default_namespace
                .clone()
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
        }
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        self.inventory
            .refresh_interval_secs
            .filter(|secs| 0 < *secs)
            .map(Duration::from_secs)
    }
}
