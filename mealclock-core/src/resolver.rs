//! Read-only queries over the app state: which slots apply on a date, calorie
//! totals, and the next upcoming meal.

use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::meal::{Meal, MealKind};
use crate::schedule::{DaySlots, Holiday, MealSlot};
use crate::state::AppState;
use crate::time::{local_day, ClockTime};

/// How far `next_meal` looks ahead, in days including the starting day.
pub const NEXT_MEAL_HORIZON_DAYS: u64 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextMeal {
    pub date: NaiveDate,
    pub kind: MealKind,
    pub time: ClockTime,
    /// `time` projected onto `date` in the resolver's zone.
    pub at: DateTime<Utc>,
}

/// Query engine bound to one state snapshot and the user's local zone.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    state: &'a AppState,
    tz: Tz,
}

impl<'a> Resolver<'a> {
    pub fn new(state: &'a AppState, tz: Tz) -> Self {
        Self { state, tz }
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn state(&self) -> &'a AppState {
        self.state
    }

    /// The local calendar day of `now`.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        local_day(now, self.tz)
    }

    /// First holiday (in date order) that applies to `date`, if any.
    pub fn holiday_for(&self, date: NaiveDate) -> Option<&'a Holiday> {
        let matching = self.state.settings.holiday_matching;
        self.state
            .holidays
            .iter()
            .find(|h| h.date.matches(date, matching))
    }

    /// A matching holiday's slots replace the weekday's entirely.
    pub fn day_slots(&self, date: NaiveDate) -> &'a DaySlots {
        match self.holiday_for(date) {
            Some(holiday) => &holiday.slots,
            None => self.state.weekly_slots_by_weekday.for_date(date),
        }
    }

    /// The slots for `date`, in kind order.
    pub fn slots_for(&self, date: NaiveDate) -> Vec<MealSlot> {
        self.day_slots(date).iter().cloned().collect()
    }

    /// Meals picked for `kind` on `date`, in pick order. Picks whose meal no
    /// longer exists are skipped.
    pub fn selected_meals(&self, date: NaiveDate, kind: MealKind) -> Vec<&'a Meal> {
        let Some(log) = self.state.day_log(date) else {
            return Vec::new();
        };
        log.meal_ids(kind)
            .iter()
            .filter_map(|id| self.state.meal(*id))
            .collect()
    }

    pub fn is_checked(&self, date: NaiveDate, kind: MealKind) -> bool {
        self.state
            .day_log(date)
            .is_some_and(|log| log.is_checked(kind))
    }

    pub fn planned_calories_for(&self, date: NaiveDate, kind: MealKind) -> u32 {
        self.state
            .day_log(date)
            .map_or(0, |log| log.planned_calories(kind, &self.state.meals))
    }

    /// Calories of everything picked on `date`, checked or not.
    pub fn planned_calories(&self, date: NaiveDate) -> u32 {
        MealKind::ALL
            .iter()
            .map(|kind| self.planned_calories_for(date, *kind))
            .fold(0u32, u32::saturating_add)
    }

    /// Sum of the snapshots taken when meal-times were checked off.
    pub fn consumed_so_far(&self, date: NaiveDate) -> u32 {
        self.state
            .day_log(date)
            .map_or(0, |log| log.consumed_calories())
    }

    pub fn remaining_calories(&self, date: NaiveDate) -> u32 {
        self.state
            .settings
            .daily_calorie_goal
            .saturating_sub(self.consumed_so_far(date))
    }

    /// Consumed over goal, capped at 1.0. A zero goal counts as 1.
    pub fn goal_progress(&self, date: NaiveDate) -> f64 {
        let goal = self.state.settings.daily_calorie_goal.max(1);
        (f64::from(self.consumed_so_far(date)) / f64::from(goal)).min(1.0)
    }

    /// The first slot strictly after `after`, scanning from `after`'s local
    /// day for [`NEXT_MEAL_HORIZON_DAYS`] days.
    pub fn next_meal(&self, after: DateTime<Utc>) -> Option<NextMeal> {
        let start = self.today(after);
        (0..NEXT_MEAL_HORIZON_DAYS)
            .filter_map(|offset| start.checked_add_days(Days::new(offset)))
            .find_map(|date| {
                self.day_slots(date)
                    .sorted_by_time()
                    .into_iter()
                    .map(|slot| NextMeal {
                        date,
                        kind: slot.kind,
                        time: slot.time,
                        at: slot.time.on(date, self.tz),
                    })
                    .find(|next| next.at > after)
            })
    }

    /// "No meal picked yet", the meal's name, or "N meals".
    pub fn next_meal_summary(&self, next: &NextMeal) -> String {
        let meals = self.selected_meals(next.date, next.kind);
        match meals.as_slice() {
            [] => "No meal picked yet".to_string(),
            [only] => only.name.clone(),
            many => format!("{} meals", many.len()),
        }
    }
}
