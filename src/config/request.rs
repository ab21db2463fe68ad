use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RequestConfig {
    /// Default wait for a reply event, in milliseconds. `0` waits indefinitely.
    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            reply_timeout_ms: default_reply_timeout_ms(),
        }
    }
}

impl RequestConfig {
    pub fn validate(&self) -> Result<()> {
        Ok(())
    }

    pub fn reply_timeout(&self) -> Option<Duration> {
        match self.reply_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

fn default_reply_timeout_ms() -> u64 {
    10_000
}
