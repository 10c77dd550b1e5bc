//! Bridge settings.
//!
//! `BridgeConfig` holds the few knobs the bridge needs at runtime: the
//! placeholder label and tint applied when a schedule command omits them, the
//! capacity of alarm update streams, and the platform version string reported
//! by the harness capability. Settings are stored as JSON and may be
//! overridden from the environment.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::builder::TintColor;
use crate::util::non_blank;

const CONFIG_SCHEMA_VERSION: u32 = 1;

pub const DEFAULT_LABEL: &str = "Alarm";
pub const DEFAULT_TINT_COLOR: &str = "#007AFF";
pub const DEFAULT_UPDATE_BUFFER: usize = 16;

pub const ENV_DEFAULT_LABEL: &str = "ALARM_BRIDGE_DEFAULT_LABEL";
pub const ENV_TINT_COLOR: &str = "ALARM_BRIDGE_TINT_COLOR";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    pub version: u32,
    /// Label used when a schedule command carries none
    pub default_label: String,
    /// Tint used when a schedule command carries none or a malformed one
    pub default_tint_color: String,
    /// Snapshots buffered per update stream before the capability waits
    pub update_buffer: usize,
    pub platform_version: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_SCHEMA_VERSION,
            default_label: DEFAULT_LABEL.to_string(),
            default_tint_color: DEFAULT_TINT_COLOR.to_string(),
            update_buffer: DEFAULT_UPDATE_BUFFER,
            platform_version: None,
        }
    }
}

impl BridgeConfig {
    /// Parse settings from a raw JSON payload.
    pub fn parse(payload: &str) -> Result<Self, String> {
        let mut config = serde_json::from_str::<Self>(payload)
            .map_err(|error| format!("invalid bridge config JSON: {error}"))?;
        if config.version != CONFIG_SCHEMA_VERSION {
            return Err(format!(
                "unsupported bridge config version {} (expected {})",
                config.version, CONFIG_SCHEMA_VERSION
            ));
        }
        config.normalize();
        Ok(config)
    }

    /// Load settings from `path`, or defaults when the file does not exist.
    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        Self::parse(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    /// Apply `ALARM_BRIDGE_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(label) = non_blank(lookup(ENV_DEFAULT_LABEL)) {
            self.default_label = label;
        }
        if let Some(tint) = non_blank(lookup(ENV_TINT_COLOR)) {
            self.default_tint_color = tint;
        }
    }

    /// Default tint, falling back to the built-in color when the configured
    /// value does not parse.
    #[must_use]
    pub fn default_tint(&self) -> TintColor {
        TintColor::parse(&self.default_tint_color).unwrap_or_default()
    }

    fn normalize(&mut self) {
        self.default_label = non_blank(Some(self.default_label.clone()))
            .unwrap_or_else(|| DEFAULT_LABEL.to_string());
        self.default_tint_color = non_blank(Some(self.default_tint_color.clone()))
            .unwrap_or_else(|| DEFAULT_TINT_COLOR.to_string());
        self.platform_version = non_blank(self.platform_version.take());
        if self.update_buffer == 0 {
            self.update_buffer = DEFAULT_UPDATE_BUFFER;
        }
    }
}
