use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;

use crate::{
    config::{Config, ConfigLoadOption},
    workers::SessionWorkerConfig,
};

use super::args::ClipboardMode;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Command {
    /// kubeconfig path
    #[arg(short = 'C', long, display_order = 1000)]
    pub kubeconfig: Option<PathBuf>,

    /// Context
    #[arg(short, long, display_order = 1000)]
    pub context: Option<String>,

    /// Initial namespace filter ("all" for every namespace)
    #[arg(short, long, display_order = 1000)]
    pub namespace: Option<String>,

    /// Logging
    #[arg(short = 'l', long, display_order = 1000)]
    pub logging: bool,

    /// Config file path
    #[arg(long, display_order = 1000)]
    pub config_file: Option<PathBuf>,

    /// Clipboard mode (auto, system, or osc52)
    #[arg(
        long,
        value_name = "auto|system|osc52",
        default_value = "auto",
        env = "PODWATCH_CLIPBOARD",
        value_enum,
        display_order = 1000
    )]
    pub clipboard: ClipboardMode,
}

impl Command {
    pub fn init() -> Self {
        Self::parse()
    }

    /// `--namespace` wins over `inventory.default_namespace`.
    pub fn session_worker_config(&self, config: &Config) -> SessionWorkerConfig {
        let mut session = config.session_config();

        if let Some(namespace) = &self.namespace {
            session.default_namespace = namespace.clone();
        }

        SessionWorkerConfig {
            kubeconfig: self.kubeconfig.clone(),
            context: self.context.clone(),
            session,
            tail_lines: config.logging.tail_lines,
            refresh_interval: config.refresh_interval(),
        }
    }

    pub fn config_load_option(&self) -> Result<ConfigLoadOption> {
        let option = if let Some(path) = &self.config_file {
            match path.try_exists() {
                Ok(true) => ConfigLoadOption::Path(path.clone()),
                Ok(false) => {
                    eprintln!("Config file not found: {:?}", path);

                    ConfigLoadOption::Default
                }
                Err(err) => {
                    eprintln!("Failed to check config file exists: {}", err);

                    ConfigLoadOption::Default
                }
            }
        } else {
            let path = xdg_config_home()?.join("config.yaml");

            match path.try_exists() {
                Ok(true) => ConfigLoadOption::Path(path),
                Ok(false) => ConfigLoadOption::Default,
                Err(err) => {
                    eprintln!("Failed to check config file exists: {}", err);

                    ConfigLoadOption::Default
                }
            }
        };

        Ok(option)
    }
}

fn xdg_config_home() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(path).join("podwatch"));
    }

    dirs::home_dir()
        .map(|home| home.join(".config").join("podwatch"))
        .ok_or_else(|| anyhow!("Failed to get home directory"))
}
