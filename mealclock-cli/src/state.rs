use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::config::Config;

/// `$MEALCLOCK_HOME`, or `~/.mealclock`.
pub fn mealclock_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("MEALCLOCK_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".mealclock"))
}

pub fn ensure_mealclock_home() -> Result<PathBuf> {
    let dir = mealclock_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// The app state document; `state_file` in config.toml overrides the default.
pub fn state_path(cfg: &Config) -> Result<PathBuf> {
    match &cfg.state_file {
        Some(p) => Ok(p.clone()),
        None => Ok(ensure_mealclock_home()?.join("state.json")),
    }
}

pub fn outbox_path() -> Result<PathBuf> {
    Ok(ensure_mealclock_home()?.join("reminders").join("outbox.json"))
}
