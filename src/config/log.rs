use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::LOG_LEVELS;
use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogConfig {
    /// Minimum engine log level to request; `no` disables engine log events
    #[serde(default = "default_min_level")]
    pub min_level: String,

    /// Re-emit engine log messages through `tracing` (target `mpv`)
    #[serde(default = "default_forward_to_tracing")]
    pub forward_to_tracing: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            min_level: default_min_level(),
            forward_to_tracing: default_forward_to_tracing(),
        }
    }
}

impl LogConfig {
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.min_level.as_str()) {
            return Err(Error::Config(ConfigError::Message(format!(
                "min_level {:?} is not one of {:?}",
                self.min_level, LOG_LEVELS
            ))));
        }
        Ok(())
    }

    pub fn enabled(&self) -> bool {
        self.min_level != "no"
    }
}

fn default_min_level() -> String {
    "warn".into()
}

fn default_forward_to_tracing() -> bool {
    true
}
