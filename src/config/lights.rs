//! Lighting core configuration.
//!
//! The configuration is constructed once by the host and passed down to the
//! registry, the recovery decorator and the event dispatcher. There is no
//! global instance.

use serde::{Deserialize, Serialize};

use crate::util::types::Priority;

/// Feature whose group count follows the button panel layout.
pub const BUTTON_LIGHTS_FEATURE: &str = "ButtonLights";

const ENV_PRIORITY: &str = "CABINET_LIGHTS_PRIORITY";
const ENV_DYNAMIC_FEATURES: &str = "CABINET_LIGHTS_DYNAMIC_FEATURES";
const ENV_CHANNEL_CAPACITY: &str = "CABINET_LIGHTS_EVENT_CAPACITY";

/// Root configuration for the lighting core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightsConfig {
    /// Priority used for every acquisition request.
    pub client_priority: Priority,
    /// Features whose group count may change at runtime (panel
    /// reconfiguration). Replay tolerates invalid-group errors for these.
    pub dynamic_group_features: Vec<String>,
    /// Capacity of the inbound connectivity event channel.
    pub event_channel_capacity: usize,
    /// Name given to the connectivity event dispatcher thread.
    pub dispatcher_thread_name: String,
}

impl Default for LightsConfig {
    fn default() -> Self {
        Self {
            client_priority: Priority::Normal,
            dynamic_group_features: vec![BUTTON_LIGHTS_FEATURE.to_string()],
            event_channel_capacity: 256,
            dispatcher_thread_name: "lights-events".to_string(),
        }
    }
}

impl LightsConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.event_channel_capacity == 0 {
            return Err("event_channel_capacity must be greater than 0".into());
        }
        if self.dispatcher_thread_name.trim().is_empty() {
            return Err("dispatcher_thread_name must not be empty".into());
        }
        if let Some(blank) = self
            .dynamic_group_features
            .iter()
            .find(|f| f.trim().is_empty())
        {
            return Err(format!("dynamic_group_features contains an empty name: `{blank}`"));
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from defaults overridden by `CABINET_LIGHTS_*`
    /// environment variables. A `.env` file is loaded first when present.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        let mut cfg = Self::default();

        if let Ok(raw) = std::env::var(ENV_PRIORITY) {
            cfg.client_priority = serde_json::from_value(serde_json::Value::String(
                raw.trim().to_ascii_lowercase(),
            ))
            .map_err(|e| format!("{ENV_PRIORITY}: {e}"))?;
        }
        if let Ok(raw) = std::env::var(ENV_DYNAMIC_FEATURES) {
            cfg.dynamic_group_features = raw
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(String::from)
                .collect();
        }
        if let Ok(raw) = std::env::var(ENV_CHANNEL_CAPACITY) {
            cfg.event_channel_capacity = raw
                .trim()
                .parse()
                .map_err(|e| format!("{ENV_CHANNEL_CAPACITY}: {e}"))?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Whether replay may ignore invalid-group errors for `feature`.
    pub fn has_dynamic_groups(&self, feature: &str) -> bool {
        self.dynamic_group_features.iter().any(|f| f == feature)
    }
}
