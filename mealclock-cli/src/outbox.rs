//! File-backed notification backend for the CLI.
//!
//! Pending reminders and the permission status live together in one JSON
//! file, so a desktop notifier (or a cron job) can pick them up. The user
//! grants or revokes permission with `mealclock reminders allow|deny`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use mealclock_core::{AuthorizationStatus, NotificationBackend, REMINDER_ID_PREFIX};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingReminder {
    pub id: String,
    pub fire_at: DateTime<Utc>,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutboxFile {
    authorization: AuthorizationStatus,
    #[serde(default)]
    pending: Vec<PendingReminder>,
}

impl Default for OutboxFile {
    fn default() -> Self {
        Self {
            authorization: AuthorizationStatus::NotDetermined,
            pending: Vec::new(),
        }
    }
}

pub struct FileOutbox {
    path: PathBuf,
    // Serializes read-modify-write cycles between the worker and commands.
    io: Mutex<()>,
}

impl FileOutbox {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pending reminders ordered by fire time.
    pub fn pending(&self) -> Result<Vec<PendingReminder>> {
        let _io = self.lock();
        let mut pending = self.read()?.pending;
        pending.sort_by(|a, b| a.fire_at.cmp(&b.fire_at).then_with(|| a.id.cmp(&b.id)));
        Ok(pending)
    }

    pub fn status(&self) -> Result<AuthorizationStatus> {
        let _io = self.lock();
        Ok(self.read()?.authorization)
    }

    /// Record the user's answer. Revoking drops everything this app queued.
    pub fn set_status(&self, status: AuthorizationStatus) -> Result<()> {
        self.update(|file| {
            file.authorization = status;
            if !status.allows_delivery() {
                file.pending.retain(|p| !p.id.starts_with(REMINDER_ID_PREFIX));
            }
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.io.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> Result<OutboxFile> {
        if !self.path.exists() {
            return Ok(OutboxFile::default());
        }
        let s = fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        serde_json::from_str(&s).with_context(|| format!("parse {}", self.path.display()))
    }

    fn write(&self, file: &OutboxFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(file)?;
        fs::write(&self.path, json).with_context(|| format!("write {}", self.path.display()))?;
        Ok(())
    }

    fn update<R>(&self, f: impl FnOnce(&mut OutboxFile) -> R) -> Result<R> {
        let _io = self.lock();
        let mut file = self.read()?;
        let out = f(&mut file);
        self.write(&file)?;
        Ok(out)
    }
}

impl NotificationBackend for FileOutbox {
    fn authorization_status(&self) -> AuthorizationStatus {
        match self.status() {
            Ok(status) => status,
            Err(e) => {
                log::warn!("reading reminder outbox failed: {e:#}");
                AuthorizationStatus::NotDetermined
            }
        }
    }

    /// Without an interactive prompt, the first request is granted. A
    /// recorded denial stands until `mealclock reminders allow`.
    fn request_authorization(&self) -> bool {
        let granted = self.update(|file| {
            if file.authorization == AuthorizationStatus::NotDetermined {
                file.authorization = AuthorizationStatus::Authorized;
            }
            file.authorization.allows_delivery()
        });
        match granted {
            Ok(granted) => {
                if !granted {
                    log::info!("reminders are denied; run `mealclock reminders allow` to enable them");
                }
                granted
            }
            Err(e) => {
                log::warn!("updating reminder outbox failed: {e:#}");
                false
            }
        }
    }

    fn cancel_by_prefix(&self, prefix: &str) {
        if let Err(e) = self.update(|file| file.pending.retain(|p| !p.id.starts_with(prefix))) {
            log::warn!("clearing reminder outbox failed: {e:#}");
        }
    }

    fn schedule(&self, id: &str, fire_at: DateTime<Utc>, title: &str, body: &str) -> Result<()> {
        self.update(|file| {
            if !file.authorization.allows_delivery() {
                anyhow::bail!("reminders are not authorized");
            }
            file.pending.retain(|p| p.id != id);
            file.pending.push(PendingReminder {
                id: id.to_string(),
                fire_at,
                title: title.to_string(),
                body: body.to_string(),
            });
            Ok(())
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn scratch() -> FileOutbox {
        FileOutbox::new(
            std::env::temp_dir()
                .join(format!("mealclock-outbox-{}", Uuid::new_v4()))
                .join("outbox.json"),
        )
    }

    fn cleanup(outbox: &FileOutbox) {
        if let Some(dir) = outbox.path().parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 2, h, 0, 0).unwrap()
    }

    #[test]
    fn first_request_grants() {
        let outbox = scratch();
        assert_eq!(outbox.authorization_status(), AuthorizationStatus::NotDetermined);
        assert!(outbox.request_authorization());
        assert_eq!(outbox.status().unwrap(), AuthorizationStatus::Authorized);
        cleanup(&outbox);
    }

    #[test]
    fn denial_sticks_and_blocks_scheduling() {
        let outbox = scratch();
        outbox.set_status(AuthorizationStatus::Denied).unwrap();
        assert!(!outbox.request_authorization());
        assert!(outbox.schedule("mealclock-2030-01-02-lunch", at(12), "MealClock", "x").is_err());
        assert!(outbox.pending().unwrap().is_empty());
        cleanup(&outbox);
    }

    #[test]
    fn schedule_replaces_same_id_and_cancel_keeps_foreign() {
        let outbox = scratch();
        outbox.set_status(AuthorizationStatus::Authorized).unwrap();
        outbox.schedule("mealclock-2030-01-02-lunch", at(12), "MealClock", "old").unwrap();
        outbox.schedule("mealclock-2030-01-02-lunch", at(12), "MealClock", "new").unwrap();
        outbox.schedule("mealclock-2030-01-02-breakfast", at(8), "MealClock", "b").unwrap();
        outbox.schedule("water-1", at(9), "Water", "drink").unwrap();

        let ids: Vec<_> = outbox.pending().unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(
            ids,
            ["mealclock-2030-01-02-breakfast", "water-1", "mealclock-2030-01-02-lunch"]
        );
        assert_eq!(outbox.pending().unwrap()[2].body, "new");

        outbox.cancel_by_prefix(REMINDER_ID_PREFIX);
        let ids: Vec<_> = outbox.pending().unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, ["water-1"]);
        cleanup(&outbox);
    }

    #[test]
    fn revoking_drops_our_pending_reminders() {
        let outbox = scratch();
        outbox.set_status(AuthorizationStatus::Authorized).unwrap();
        outbox.schedule("mealclock-2030-01-02-dinner", at(18), "MealClock", "d").unwrap();
        outbox.set_status(AuthorizationStatus::Denied).unwrap();
        assert!(outbox.pending().unwrap().is_empty());
        cleanup(&outbox);
    }
}
