use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::STREAMING_OPTIONS;
use crate::Error;
use crate::Result;

/// One `name=value` engine option.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct EngineOption {
    pub name: String,
    pub value: String,
}

impl EngineOption {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EngineConfig {
    /// Applied in order with `set_option_string` before `initialize`
    #[serde(default = "default_options")]
    pub options: Vec<EngineOption>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            options: default_options(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(option) = self.options.iter().find(|o| o.name.trim().is_empty()) {
            return Err(Error::Config(ConfigError::Message(format!(
                "engine option with value {:?} has an empty name",
                option.value
            ))));
        }

        if let Some(option) = self
            .options
            .iter()
            .find(|o| o.name.contains('\0') || o.value.contains('\0'))
        {
            return Err(Error::Config(ConfigError::Message(format!(
                "engine option {} contains a NUL byte",
                option.name.replace('\0', "\\0")
            ))));
        }

        Ok(())
    }
}

fn default_options() -> Vec<EngineOption> {
    STREAMING_OPTIONS
        .iter()
        .map(|(name, value)| EngineOption::new(*name, *value))
        .collect()
}
