//! The persisted aggregate: everything the app saves and loads as one document.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::day_log::DayLog;
use crate::meal::{sample_meals, sort_by_name, Meal, MealId};
use crate::schedule::{Holiday, WeeklySchedule};
use crate::settings::Settings;
use crate::time::{day_key, parse_day_key};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredState")]
pub struct AppState {
    pub meals: Vec<Meal>,
    pub weekly_slots_by_weekday: WeeklySchedule,
    pub holidays: Vec<Holiday>,
    pub settings: Settings,
    /// Keyed by `YYYY-MM-DD`.
    pub day_logs: BTreeMap<String, DayLog>,
}

impl Default for AppState {
    fn default() -> Self {
        let mut meals = sample_meals();
        sort_by_name(&mut meals);
        Self {
            meals,
            weekly_slots_by_weekday: WeeklySchedule::default(),
            holidays: Vec::new(),
            settings: Settings::default(),
            day_logs: BTreeMap::new(),
        }
    }
}

impl AppState {
    pub fn meal(&self, id: MealId) -> Option<&Meal> {
        self.meals.iter().find(|m| m.id == id)
    }

    pub fn holiday(&self, id: Uuid) -> Option<&Holiday> {
        self.holidays.iter().find(|h| h.id == id)
    }

    pub fn day_log(&self, date: NaiveDate) -> Option<&DayLog> {
        self.day_logs.get(&day_key(date))
    }

    /// Holidays stay ordered by date so the first match is deterministic.
    pub(crate) fn sort_holidays(&mut self) {
        self.holidays.sort_by_key(|h| h.date);
    }
}

/// Any document this app has ever written. Absent fields default instead of
/// failing the load.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredState {
    #[serde(default = "sample_meals")]
    meals: Vec<Meal>,
    #[serde(default)]
    weekly_slots_by_weekday: WeeklySchedule,
    #[serde(default)]
    holidays: Vec<serde_json::Value>,
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    day_logs: BTreeMap<String, DayLog>,
}

impl From<StoredState> for AppState {
    fn from(stored: StoredState) -> Self {
        let mut meals = stored.meals;
        sort_by_name(&mut meals);

        let holidays = stored
            .holidays
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<Holiday>(value) {
                Ok(h) => Some(h),
                Err(e) => {
                    log::warn!("dropping unreadable holiday: {e}");
                    None
                }
            })
            .collect();

        let day_logs = stored
            .day_logs
            .into_iter()
            .filter_map(|(key, log)| match parse_day_key(&key) {
                Some(date) => Some((day_key(date), log)),
                None => {
                    log::warn!("dropping day log with unreadable key '{key}'");
                    None
                }
            })
            .collect();

        let mut state = Self {
            meals,
            weekly_slots_by_weekday: stored.weekly_slots_by_weekday,
            holidays,
            settings: stored.settings,
            day_logs,
        };
        state.sort_holidays();
        state
    }
}
