use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PumpConfig {
    /// Timeout passed to each `wait_event` call, in seconds.
    /// Negative waits indefinitely; the pump is woken explicitly on close.
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: f64,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            wait_timeout_secs: default_wait_timeout_secs(),
        }
    }
}

impl PumpConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.wait_timeout_secs.is_finite() {
            return Err(Error::Config(ConfigError::Message(
                "wait_timeout_secs must be a finite number".into(),
            )));
        }
        Ok(())
    }
}

fn default_wait_timeout_secs() -> f64 {
    -1.0
}
