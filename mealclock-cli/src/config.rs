use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use mealclock_core::{WorkerConfig, DEFAULT_HORIZON_DAYS};

use crate::state::ensure_mealclock_home;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// IANA zone used to place meal times on the calendar.
    pub timezone: String,
    /// Days of reminders kept pending ahead of today.
    pub horizon_days: u32,
    /// Give up on the notification backend after this many seconds.
    pub reminder_timeout_secs: u64,
    pub state_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: "America/Chicago".to_string(),
            horizon_days: DEFAULT_HORIZON_DAYS,
            reminder_timeout_secs: 10,
            state_file: None,
        }
    }
}

impl Config {
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            horizon_days: self.horizon_days,
            call_timeout: Duration::from_secs(self.reminder_timeout_secs.max(1)),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_mealclock_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    parse_config(&s)
}

fn parse_config(s: &str) -> Result<Config> {
    toml::from_str(s).context("parse config.toml")
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}
