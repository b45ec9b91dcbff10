use crate::pomodoro::Durations;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub work: String,
    pub short_break: String,
    pub long_break: String,
    pub autosave_interval: String,
    pub quote_interval: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work: "25m".to_string(),
            short_break: "5m".to_string(),
            long_break: "15m".to_string(),
            autosave_interval: "60s".to_string(),
            quote_interval: "60s".to_string(),
            data_dir: None,
        }
    }
}

fn parse(key: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value).with_context(|| format!("invalid duration for '{key}': {value}"))
}

impl Config {
    pub fn durations(&self) -> Result<Durations> {
        Ok(Durations {
            work: parse("work", &self.work)?.as_secs(),
            short_break: parse("short_break", &self.short_break)?.as_secs(),
            long_break: parse("long_break", &self.long_break)?.as_secs(),
        })
    }

    pub fn autosave_interval(&self) -> Result<Duration> {
        parse("autosave_interval", &self.autosave_interval)
    }

    pub fn quote_interval(&self) -> Result<Duration> {
        parse("quote_interval", &self.quote_interval)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let mut path =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
    path.push(".coursemate");
    path.push("config.json");
    Ok(path)
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

/// Read the config at `path`, writing the defaults there first if absent.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let config = Config::default();
        let data = serde_json::to_string_pretty(&config)?;
        fs::write(path, data)?;
        return Ok(config);
    }

    let data = fs::read_to_string(path)?;
    let config = serde_json::from_str(&data)
        .with_context(|| format!("invalid config file {}", path.display()))?;
    Ok(config)
}
