//! Meal planner: the single write path into the app state.
//!
//! Every successful mutation commits as a unit: the whole state is saved, then
//! a reminder projection is requested from the snapshot that was just saved.
//! Mutations that name an unknown meal or holiday change nothing and commit
//! nothing.

use chrono::{NaiveDate, Weekday};
use chrono_tz::Tz;
use uuid::Uuid;

use crate::day_log::DayLog;
use crate::error::PlanError;
use crate::meal::{sort_by_name, Meal, MealId, MealKind};
use crate::reminders::ProjectionTrigger;
use crate::resolver::Resolver;
use crate::schedule::{DaySlots, Holiday, HolidayDate, HolidayMatching};
use crate::settings::Theme;
use crate::state::AppState;
use crate::store::StateStore;
use crate::time::{day_key, ClockTime};
use crate::worker::{ProjectionRequest, ProjectionSink};

/// Where a new holiday's meal times come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolidaySeed {
    /// Breakfast 08:00, lunch 12:30, dinner 18:30, snack 15:30.
    Defaults,
    /// Copy the times currently resolved for this date.
    FromSchedule(NaiveDate),
}

pub struct MealPlanner<S: StateStore, P: ProjectionSink> {
    state: AppState,
    store: S,
    sink: P,
    tz: Tz,
    save_warning: Option<String>,
}

impl<S: StateStore, P: ProjectionSink> MealPlanner<S, P> {
    /// Load the saved state (or start fresh), persist it in normalized form
    /// and request the startup projection.
    ///
    /// An unreadable document is logged and replaced by the default state.
    pub fn open(store: S, sink: P, tz: Tz) -> Self {
        let state = match store.load() {
            Ok(Some(state)) => state,
            Ok(None) => {
                log::info!("no saved state; starting with defaults");
                AppState::default()
            }
            Err(e) => {
                log::warn!("could not load saved state, starting with defaults: {e:#}");
                AppState::default()
            }
        };

        let mut planner = Self {
            state,
            store,
            sink,
            tz,
            save_warning: None,
        };
        planner.commit(ProjectionTrigger::Startup);
        planner
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.state, self.tz)
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    /// Give back the projection sink, e.g. to shut a worker down.
    pub fn into_sink(self) -> P {
        self.sink
    }

    /// The last save error, kept until a later save succeeds.
    pub fn save_warning(&self) -> Option<&str> {
        self.save_warning.as_deref()
    }

    /// Try saving again after a failure. Returns whether the state is saved.
    pub fn retry_save(&mut self) -> bool {
        self.save();
        self.save_warning.is_none()
    }

    /// Re-project reminders without changing anything.
    pub fn refresh_reminders(&self) {
        self.request_projection(ProjectionTrigger::StateChanged);
    }

    // Meals

    /// Insert `meal`, or replace the meal with the same id.
    pub fn add_meal(&mut self, meal: Meal) -> Result<MealId, PlanError> {
        meal.validate()?;
        let id = meal.id;
        match self.state.meals.iter_mut().find(|m| m.id == id) {
            Some(existing) => *existing = meal,
            None => self.state.meals.push(meal),
        }
        sort_by_name(&mut self.state.meals);
        self.commit(ProjectionTrigger::StateChanged);
        Ok(id)
    }

    /// Replace an existing meal. Unknown ids are ignored. Checked snapshots
    /// keep the calories they were taken with.
    pub fn update_meal(&mut self, meal: Meal) -> Result<(), PlanError> {
        meal.validate()?;
        let Some(existing) = self.state.meals.iter_mut().find(|m| m.id == meal.id) else {
            return Ok(());
        };
        *existing = meal;
        sort_by_name(&mut self.state.meals);
        self.commit(ProjectionTrigger::StateChanged);
        Ok(())
    }

    /// Remove a meal and every pick of it; checked meal-times that lose a pick
    /// are re-snapshotted from what remains.
    pub fn delete_meal(&mut self, id: MealId) {
        if self.purge_meal(id) {
            self.commit(ProjectionTrigger::StateChanged);
        }
    }

    /// Delete by position in the sorted meal list. Out-of-range positions
    /// are ignored.
    pub fn delete_meals_at(&mut self, positions: &[usize]) {
        let mut positions = positions.to_vec();
        positions.sort_unstable_by(|a, b| b.cmp(a));
        positions.dedup();
        let ids: Vec<MealId> = positions
            .into_iter()
            .filter_map(|i| self.state.meals.get(i).map(|m| m.id))
            .collect();

        let mut changed = false;
        for id in ids {
            changed |= self.purge_meal(id);
        }
        if changed {
            self.commit(ProjectionTrigger::StateChanged);
        }
    }

    fn purge_meal(&mut self, id: MealId) -> bool {
        let before = self.state.meals.len();
        self.state.meals.retain(|m| m.id != id);
        if self.state.meals.len() == before {
            return false;
        }

        let meals = &self.state.meals;
        for log in self.state.day_logs.values_mut() {
            for kind in log.purge_meal(id) {
                log.refresh_snapshot(kind, meals);
            }
        }
        self.state.day_logs.retain(|_, log| !log.is_empty());
        true
    }

    // Day plans

    pub fn add_meal_to_day(
        &mut self,
        date: NaiveDate,
        kind: MealKind,
        meal_id: MealId,
    ) -> Result<(), PlanError> {
        if self.state.meal(meal_id).is_none() {
            return Err(PlanError::UnknownMeal(meal_id));
        }
        self.edit_day(date, |log, meals| {
            log.add_meal(kind, meal_id);
            log.refresh_snapshot(kind, meals);
        });
        self.commit(ProjectionTrigger::StateChanged);
        Ok(())
    }

    /// Remove one pick of `meal_id`. Nothing happens if it was not picked.
    pub fn remove_meal_from_day(&mut self, date: NaiveDate, kind: MealKind, meal_id: MealId) {
        let removed = self.edit_day(date, |log, meals| {
            let removed = log.remove_meal(kind, meal_id);
            if removed {
                log.refresh_snapshot(kind, meals);
            }
            removed
        });
        if removed {
            self.commit(ProjectionTrigger::StateChanged);
        }
    }

    /// Check the meal-time with its current planned calories, or uncheck it.
    /// Returns whether it is now checked.
    pub fn toggle_checked(&mut self, date: NaiveDate, kind: MealKind) -> bool {
        let checked = self.edit_day(date, |log, meals| {
            if log.is_checked(kind) {
                log.set_checked(kind, None);
                false
            } else {
                let calories = log.planned_calories(kind, meals);
                log.set_checked(kind, Some(calories));
                true
            }
        });
        self.commit(ProjectionTrigger::StateChanged);
        checked
    }

    fn edit_day<R>(&mut self, date: NaiveDate, edit: impl FnOnce(&mut DayLog, &[Meal]) -> R) -> R {
        let key = day_key(date);
        let log = self.state.day_logs.entry(key.clone()).or_default();
        let out = edit(log, &self.state.meals);
        let empty = log.is_empty();
        if empty {
            self.state.day_logs.remove(&key);
        }
        out
    }

    // Schedule

    pub fn update_weekly_time(&mut self, weekday: Weekday, kind: MealKind, time: ClockTime) {
        self.state
            .weekly_slots_by_weekday
            .for_weekday_mut(weekday)
            .set_time(kind, time);
        self.commit(ProjectionTrigger::StateChanged);
    }

    pub fn update_holiday_time(&mut self, holiday_id: Uuid, kind: MealKind, time: ClockTime) {
        let Some(holiday) = self.state.holidays.iter_mut().find(|h| h.id == holiday_id) else {
            return;
        };
        holiday.slots.set_time(kind, time);
        self.commit(ProjectionTrigger::StateChanged);
    }

    pub fn add_holiday(&mut self, name: impl Into<String>, date: HolidayDate, seed: HolidaySeed) -> Uuid {
        let slots = match seed {
            HolidaySeed::Defaults => DaySlots::defaults(),
            HolidaySeed::FromSchedule(day) => {
                let resolved = self.resolver().day_slots(day).clone();
                let mut slots = DaySlots::defaults();
                for slot in resolved.iter() {
                    slots.set_time(slot.kind, slot.time);
                }
                slots
            }
        };
        let holiday = Holiday::new(name, date, slots);
        let id = holiday.id;
        self.state.holidays.push(holiday);
        self.state.sort_holidays();
        self.commit(ProjectionTrigger::StateChanged);
        id
    }

    /// Rename and/or move a holiday; its meal times are kept.
    pub fn update_holiday(&mut self, id: Uuid, name: impl Into<String>, date: HolidayDate) {
        let Some(holiday) = self.state.holidays.iter_mut().find(|h| h.id == id) else {
            return;
        };
        holiday.name = name.into();
        holiday.date = date;
        self.state.sort_holidays();
        self.commit(ProjectionTrigger::StateChanged);
    }

    pub fn delete_holiday(&mut self, id: Uuid) {
        let before = self.state.holidays.len();
        self.state.holidays.retain(|h| h.id != id);
        if self.state.holidays.len() != before {
            self.commit(ProjectionTrigger::StateChanged);
        }
    }

    // Settings

    /// Negative goals are stored as 0.
    pub fn set_daily_calorie_goal(&mut self, goal: i64) {
        self.state.settings.daily_calorie_goal = goal.clamp(0, i64::from(u32::MAX)) as u32;
        self.commit(ProjectionTrigger::StateChanged);
    }

    pub fn set_notifications_enabled(&mut self, enabled: bool) {
        self.state.settings.notifications_enabled = enabled;
        self.commit(if enabled {
            ProjectionTrigger::NotificationsEnabled
        } else {
            ProjectionTrigger::NotificationsDisabled
        });
    }

    pub fn set_notify_minutes_before(&mut self, minutes: u32) {
        self.state.settings.notify_minutes_before = minutes;
        self.commit(ProjectionTrigger::StateChanged);
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.state.settings.theme = theme;
        self.commit(ProjectionTrigger::StateChanged);
    }

    pub fn set_holiday_matching(&mut self, matching: HolidayMatching) {
        self.state.settings.holiday_matching = matching;
        self.commit(ProjectionTrigger::StateChanged);
    }

    // Commit

    fn commit(&mut self, trigger: ProjectionTrigger) {
        self.save();
        self.request_projection(trigger);
    }

    fn save(&mut self) {
        match self.store.save(&self.state) {
            Ok(()) => self.save_warning = None,
            Err(e) => {
                log::warn!("failed to save app state; keeping it in memory: {e:#}");
                self.save_warning = Some(format!("{e:#}"));
            }
        }
    }

    fn request_projection(&self, trigger: ProjectionTrigger) {
        self.sink.request(ProjectionRequest {
            state: self.state.clone(),
            tz: self.tz,
            trigger,
        });
    }
}
