use std::path::{Path, PathBuf};

use alarm_bridge_core::builder::TintColor;
use alarm_bridge_core::util::non_blank;
use alarm_bridge_core::BridgeConfig;

use crate::cli::ConfigCommands;
use crate::error::CliError;

const CONFIG_DIR_NAME: &str = "alarm-bridge";
const CONFIG_FILE_NAME: &str = "bridge-config.json";

/// Settings accepted by `config init`; `None` keeps the stored value.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigUpdate {
    pub default_label: Option<String>,
    pub tint_color: Option<String>,
    pub platform_version: Option<String>,
    pub update_buffer: Option<usize>,
}

pub fn run_config(command: ConfigCommands, path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommands::Show => {
            let config = load_config(path)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        ConfigCommands::Init {
            default_label,
            tint_color,
            platform_version,
            update_buffer,
        } => {
            let update = ConfigUpdate {
                default_label,
                tint_color,
                platform_version,
                update_buffer,
            };
            let config = run_config_init(path, update)?;
            println!("Bridge config written to {}", path.display());
            println!(
                "Default label '{}', tint {}",
                config.default_label, config.default_tint_color
            );
            Ok(())
        }
    }
}

/// Merge `update` into the stored config (or defaults) and save it.
pub fn run_config_init(path: &Path, update: ConfigUpdate) -> Result<BridgeConfig, CliError> {
    let mut config = BridgeConfig::load_from_path(path).map_err(CliError::Config)?;

    if let Some(label) = non_blank(update.default_label) {
        config.default_label = label;
    }
    if let Some(raw) = non_blank(update.tint_color) {
        let tint = TintColor::parse(&raw).ok_or(CliError::InvalidTintColor(raw))?;
        config.default_tint_color = tint.to_hex();
    }
    if let Some(version) = non_blank(update.platform_version) {
        config.platform_version = Some(version);
    }
    if let Some(buffer) = update.update_buffer {
        if buffer == 0 {
            return Err(CliError::Config(
                "update_buffer must be at least 1".to_string(),
            ));
        }
        config.update_buffer = buffer;
    }

    config.save_to_path(path).map_err(CliError::Config)?;
    BridgeConfig::load_from_path(path).map_err(CliError::Config)
}

/// Load the config at `path` and apply `ALARM_BRIDGE_*` overrides.
pub fn load_config(path: &Path) -> Result<BridgeConfig, CliError> {
    let mut config = BridgeConfig::load_from_path(path).map_err(CliError::Config)?;
    config.apply_env_overrides();
    Ok(config)
}

pub fn resolve_config_path(explicit: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .ok_or_else(|| CliError::Config("Failed to resolve config directory".to_string()))
}
