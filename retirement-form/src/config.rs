//! Calculator configuration loaded with figment.
//!
//! Sources, later overriding earlier:
//! 1. Built-in defaults
//! 2. An optional YAML file
//! 3. Environment variables with the `RETIREMENT_` prefix
//!    (`RETIREMENT_BASE_URL`, `RETIREMENT_CALCULATE_PATH`)

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

pub const ENV_PREFIX: &str = "RETIREMENT_";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/retirement-plans";
pub const DEFAULT_CALCULATE_PATH: &str = "/calculate";

/// Where the calculator service lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorConfig {
    pub base_url: String,
    pub calculate_path: String,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            calculate_path: DEFAULT_CALCULATE_PATH.to_string(),
        }
    }
}

impl CalculatorConfig {
    /// The figment with every source merged in precedence order.
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(CalculatorConfig::default()));
        if let Some(path) = file {
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load configuration. An explicitly named file must exist.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        if let Some(path) = file {
            if !path.is_file() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("config file not found: {}", path.display()),
                )
                .into());
            }
        }
        let config: CalculatorConfig = Self::figment(file).extract()?;
        debug!(base_url = %config.base_url, path = %config.calculate_path, "calculator config loaded");
        Ok(config)
    }

    /// Full endpoint URL, joined with exactly one slash.
    pub fn calculate_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.calculate_path.trim_start_matches('/')
        )
    }
}
