//! Player configuration.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file named by `CONFIG_PATH`
//! - `MPV__`-prefixed environment variable overrides
//! - Section-wise validation
mod engine;
mod log;
mod notify;
mod pump;
mod request;
pub use engine::*;
pub use log::*;
pub use notify::*;
pub use pump::*;
pub use request::*;


use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::CONFIG_PATH_ENV;
use crate::constants::ENV_PREFIX;
use crate::Result;

/// Main configuration container for the client layer.
///
/// Sources merge in order, later overriding earlier:
/// 1. Default values from code
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PlayerConfig {
    /// Options applied to the engine before initialization
    #[serde(default)]
    pub engine: EngineConfig,
    /// Event pump polling behaviour
    #[serde(default)]
    pub pump: PumpConfig,
    /// Reply waiting policy for tagged requests
    #[serde(default)]
    pub request: RequestConfig,
    /// Notification delivery settings
    #[serde(default)]
    pub notify: NotifyConfig,
    /// Engine log message forwarding
    #[serde(default)]
    pub log: LogConfig,
}

impl PlayerConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// # Note
    /// Validation is deferred so further overrides can be layered with
    /// [`with_override_config`](Self::with_override_config). Call
    /// [`validate`](Self::validate) before handing the config to a player.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("CONFIG_PATH", "config/player.toml");
    /// std::env::set_var("MPV__REQUEST__REPLY_TIMEOUT_MS", "2000");
    /// let cfg = PlayerConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var(CONFIG_PATH_ENV) {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(environment());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies overrides from another file, then the environment again.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates every section and returns the validated instance.
    pub fn validate(self) -> Result<Self> {
        self.engine.validate()?;
        self.pump.validate()?;
        self.request.validate()?;
        self.notify.validate()?;
        self.log.validate()?;
        Ok(self)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
