//! Reminder projection: turn resolved meal slots into concrete future
//! notifications and push them to a delivery backend.

use chrono::{DateTime, Days, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::meal::MealKind;
use crate::resolver::Resolver;
use crate::settings::Settings;
use crate::time::day_key;

/// Every reminder id this app registers starts with this prefix, so clearing
/// our own reminders never touches anyone else's.
pub const REMINDER_ID_PREFIX: &str = "mealclock-";

pub const REMINDER_TITLE: &str = "MealClock";

pub const DEFAULT_HORIZON_DAYS: u32 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthorizationStatus {
    NotDetermined,
    Authorized,
    Denied,
    Provisional,
}

impl AuthorizationStatus {
    pub fn allows_delivery(self) -> bool {
        matches!(self, Self::Authorized | Self::Provisional)
    }
}

/// What the platform's notification service must offer.
pub trait NotificationBackend {
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Ask the user for permission. Returns whether it was granted.
    fn request_authorization(&self) -> bool;

    /// Remove every pending reminder whose id starts with `prefix`.
    fn cancel_by_prefix(&self, prefix: &str);

    /// Register (or replace, if the id is already pending) one reminder.
    fn schedule(
        &self,
        id: &str,
        fire_at: DateTime<Utc>,
        title: &str,
        body: &str,
    ) -> anyhow::Result<()>;
}

/// Why a projection was requested. Only an explicit re-enable may prompt
/// for permission again after a denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectionTrigger {
    Startup,
    StateChanged,
    NotificationsEnabled,
    NotificationsDisabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderIntent {
    pub id: String,
    pub date: NaiveDate,
    pub kind: MealKind,
    pub fire_at: DateTime<Utc>,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionOutcome {
    Disabled,
    Unauthorized,
    Withdrawn,
    Scheduled { scheduled: usize, failed: usize },
    TimedOut,
}

/// Stable per day and meal-time: re-projecting the same event yields the
/// same id.
pub fn reminder_id(date: NaiveDate, kind: MealKind) -> String {
    format!("{REMINDER_ID_PREFIX}{}-{}", day_key(date), kind.as_str())
}

/// "Time for Lunch: Soup, Bread (650 cal)" or "Time for Lunch (no meal
/// picked yet)".
pub fn reminder_body(resolver: &Resolver<'_>, date: NaiveDate, kind: MealKind) -> String {
    let meals = resolver.selected_meals(date, kind);
    if meals.is_empty() {
        return format!("Time for {} (no meal picked yet)", kind.title());
    }
    let names: Vec<&str> = meals.iter().map(|m| m.name.as_str()).collect();
    let calories = meals
        .iter()
        .fold(0u32, |total, m| total.saturating_add(m.calories));
    format!("Time for {}: {} ({calories} cal)", kind.title(), names.join(", "))
}

/// Deterministically project the next `horizon_days` days into reminders
/// that fire after `now`, ordered by day then time.
pub fn plan_reminders(
    resolver: &Resolver<'_>,
    settings: &Settings,
    now: DateTime<Utc>,
    horizon_days: u32,
) -> Vec<ReminderIntent> {
    if !settings.notifications_enabled {
        return vec![];
    }

    let lead = Duration::minutes(i64::from(settings.notify_minutes_before));
    let start = resolver.today(now);
    let mut out = Vec::new();

    for offset in 0..u64::from(horizon_days) {
        let Some(date) = start.checked_add_days(Days::new(offset)) else {
            break;
        };
        for slot in resolver.day_slots(date).sorted_by_time() {
            let fire_at = slot.time.on(date, resolver.tz()) - lead;
            if fire_at <= now {
                continue;
            }
            out.push(ReminderIntent {
                id: reminder_id(date, slot.kind),
                date,
                kind: slot.kind,
                fire_at,
                title: REMINDER_TITLE.to_string(),
                body: reminder_body(resolver, date, slot.kind),
            });
        }
    }

    out
}

/// Ensure delivery is permitted, asking at most once.
fn ensure_authorized<B: NotificationBackend + ?Sized>(
    backend: &B,
    trigger: ProjectionTrigger,
) -> bool {
    let status = backend.authorization_status();
    if status.allows_delivery() {
        return true;
    }
    let may_prompt = status == AuthorizationStatus::NotDetermined
        || trigger == ProjectionTrigger::NotificationsEnabled;
    if !may_prompt {
        return false;
    }
    backend.request_authorization() && backend.authorization_status().allows_delivery()
}

/// Replace this app's pending reminders with a fresh projection.
///
/// Does nothing at all when notifications are disabled or permission is
/// missing. Otherwise clears every reminder under [`REMINDER_ID_PREFIX`]
/// before scheduling, so a later run fully supersedes an earlier one.
pub fn project<B: NotificationBackend + ?Sized>(
    backend: &B,
    resolver: &Resolver<'_>,
    now: DateTime<Utc>,
    horizon_days: u32,
    trigger: ProjectionTrigger,
) -> ProjectionOutcome {
    let settings = &resolver.state().settings;
    if !settings.notifications_enabled {
        return ProjectionOutcome::Disabled;
    }
    if !ensure_authorized(backend, trigger) {
        log::info!("notifications not authorized; nothing scheduled");
        return ProjectionOutcome::Unauthorized;
    }

    backend.cancel_by_prefix(REMINDER_ID_PREFIX);

    let mut scheduled = 0;
    let mut failed = 0;
    for intent in plan_reminders(resolver, settings, now, horizon_days) {
        match backend.schedule(&intent.id, intent.fire_at, &intent.title, &intent.body) {
            Ok(()) => scheduled += 1,
            Err(e) => {
                failed += 1;
                log::warn!("failed to schedule reminder {}: {e:#}", intent.id);
            }
        }
    }

    log::debug!("projected {scheduled} reminders ({failed} failed)");
    ProjectionOutcome::Scheduled { scheduled, failed }
}

/// Clear this app's pending reminders, e.g. after notifications are turned off.
pub fn withdraw<B: NotificationBackend + ?Sized>(backend: &B) -> ProjectionOutcome {
    backend.cancel_by_prefix(REMINDER_ID_PREFIX);
    ProjectionOutcome::Withdrawn
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// In-memory backend that records every call.
    #[derive(Debug)]
    pub struct RecordingBackend {
        pub status: Mutex<AuthorizationStatus>,
        pub grant_on_request: bool,
        pub requests: Mutex<usize>,
        pub cancels: Mutex<Vec<String>>,
        pub pending: Mutex<Vec<(String, DateTime<Utc>, String)>>,
        pub fail_ids: Vec<String>,
    }

    impl RecordingBackend {
        pub fn new(status: AuthorizationStatus) -> Self {
            Self {
                status: Mutex::new(status),
                grant_on_request: true,
                requests: Mutex::new(0),
                cancels: Mutex::new(Vec::new()),
                pending: Mutex::new(Vec::new()),
                fail_ids: Vec::new(),
            }
        }

        pub fn pending_ids(&self) -> Vec<String> {
            self.pending.lock().unwrap().iter().map(|p| p.0.clone()).collect()
        }
    }

    impl NotificationBackend for RecordingBackend {
        fn authorization_status(&self) -> AuthorizationStatus {
            *self.status.lock().unwrap()
        }

        fn request_authorization(&self) -> bool {
            *self.requests.lock().unwrap() += 1;
            let next = if self.grant_on_request {
                AuthorizationStatus::Authorized
            } else {
                AuthorizationStatus::Denied
            };
            *self.status.lock().unwrap() = next;
            self.grant_on_request
        }

        fn cancel_by_prefix(&self, prefix: &str) {
            self.cancels.lock().unwrap().push(prefix.to_string());
            self.pending
                .lock()
                .unwrap()
                .retain(|(id, _, _)| !id.starts_with(prefix));
        }

        fn schedule(
            &self,
            id: &str,
            fire_at: DateTime<Utc>,
            _title: &str,
            body: &str,
        ) -> anyhow::Result<()> {
            if self.fail_ids.iter().any(|f| f == id) {
                anyhow::bail!("backend rejected {id}");
            }
            let mut pending = self.pending.lock().unwrap();
            pending.retain(|(existing, _, _)| existing != id);
            pending.push((id.to_string(), fire_at, body.to_string()));
            Ok(())
        }
    }
}
