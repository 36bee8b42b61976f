use crate::agent::DEFAULT_ADDRESS;
use crate::tail::DEFAULT_LINES;
use crate::types::TailgateConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Idle timeout applied to remote follow streams, which never reach
/// end-of-data on their own.
pub const DEFAULT_FOLLOW_TIMEOUT_MS: u64 = 1000;

/// Get agent address with priority: flag > ENV > local > global > default
pub fn get_agent_address(flag: Option<String>) -> String {
    // 1. Explicit flag
    if let Some(address) = flag {
        return address;
    }

    // 2. Check environment variable
    if let Ok(env_address) = std::env::var("TAILGATE_ADDR") {
        if !env_address.is_empty() {
            return env_address;
        }
    }

    // 3. Check local, then global config
    if let Some(address) = from_configs(|config| config.address) {
        return address;
    }

    // 4. Use default
    DEFAULT_ADDRESS.to_string()
}

/// Get default tail length with priority: ENV > local > global > default
pub fn get_default_lines() -> usize {
    if let Some(lines) = env_parse("TAILGATE_LINES") {
        return lines;
    }

    from_configs(|config| config.default_lines).unwrap_or(DEFAULT_LINES)
}

/// Get follow-stream timeout with priority: ENV > local > global > default
pub fn get_follow_timeout_ms() -> u64 {
    if let Some(timeout) = env_parse("TAILGATE_TIMEOUT_MS") {
        return timeout;
    }

    from_configs(|config| config.timeout_ms).unwrap_or(DEFAULT_FOLLOW_TIMEOUT_MS)
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.trim().parse().ok()
}

fn from_configs<T>(field: impl Fn(TailgateConfig) -> Option<T>) -> Option<T> {
    load_local_config()
        .ok()
        .and_then(&field)
        .or_else(|| load_global_config().ok().and_then(&field))
}

/// Load local config from .tailgate/config.json
pub fn load_local_config() -> Result<TailgateConfig> {
    load_config_from(&PathBuf::from(".tailgate").join("config.json"))
        .context("Failed to load local config")
}

/// Load global config from ~/.config/tailgate/config.json
pub fn load_global_config() -> Result<TailgateConfig> {
    let config_dir = dirs::config_dir()
        .context("Failed to get config directory")?
        .join("tailgate");
    load_config_from(&config_dir.join("config.json")).context("Failed to load global config")
}

pub fn load_config_from(path: &Path) -> Result<TailgateConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: TailgateConfig = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config)
}
