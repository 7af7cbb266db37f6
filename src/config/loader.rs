//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::AppConfig;
use crate::common::errors::{BotError, Result};

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with APP__, e.g. `APP__DISCORD__TOKEN`)
/// 2. Configuration file (TOML format)
/// 3. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("APP")
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("discord.announcement_channels")
            .with_list_parse_key("discord.no_trade_channels")
            .with_list_parse_key("telegram.no_trade_chats")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| BotError::Configuration(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| BotError::Configuration(e.to_string()))
}
