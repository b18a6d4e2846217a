//! Per-day record of picked meals and checked meal-times.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::meal::{Meal, MealId, MealKind};

/// What was planned and eaten on one calendar day.
///
/// A kind is checked when it has a calorie snapshot. The snapshot is a frozen
/// copy of that kind's planned calories; callers refresh it through
/// [`DayLog::refresh_snapshot`] whenever the selection of a checked kind
/// changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayLog {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    meal_ids_by_kind: BTreeMap<MealKind, Vec<MealId>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    checked_calories_by_kind: BTreeMap<MealKind, u32>,
}

impl DayLog {
    pub fn meal_ids(&self, kind: MealKind) -> &[MealId] {
        self.meal_ids_by_kind
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, meal_id: MealId) -> bool {
        self.meal_ids_by_kind
            .values()
            .any(|ids| ids.contains(&meal_id))
    }

    /// Append; the same meal may be picked more than once.
    pub fn add_meal(&mut self, kind: MealKind, meal_id: MealId) {
        self.meal_ids_by_kind.entry(kind).or_default().push(meal_id);
    }

    /// Remove the first occurrence of `meal_id` from `kind`. Returns whether
    /// anything was removed.
    pub fn remove_meal(&mut self, kind: MealKind, meal_id: MealId) -> bool {
        let Some(ids) = self.meal_ids_by_kind.get_mut(&kind) else {
            return false;
        };
        let Some(pos) = ids.iter().position(|id| *id == meal_id) else {
            return false;
        };
        ids.remove(pos);
        if ids.is_empty() {
            self.meal_ids_by_kind.remove(&kind);
        }
        true
    }

    /// Remove every occurrence of `meal_id` from every kind. Returns the kinds
    /// that changed.
    pub fn purge_meal(&mut self, meal_id: MealId) -> Vec<MealKind> {
        let mut changed = Vec::new();
        for (kind, ids) in self.meal_ids_by_kind.iter_mut() {
            let before = ids.len();
            ids.retain(|id| *id != meal_id);
            if ids.len() != before {
                changed.push(*kind);
            }
        }
        self.meal_ids_by_kind.retain(|_, ids| !ids.is_empty());
        changed
    }

    pub fn is_checked(&self, kind: MealKind) -> bool {
        self.checked_calories_by_kind.contains_key(&kind)
    }

    pub fn checked_calories(&self, kind: MealKind) -> Option<u32> {
        self.checked_calories_by_kind.get(&kind).copied()
    }

    /// `Some` checks the kind with that snapshot, `None` unchecks it.
    pub fn set_checked(&mut self, kind: MealKind, calories: Option<u32>) {
        match calories {
            Some(c) => {
                self.checked_calories_by_kind.insert(kind, c);
            }
            None => {
                self.checked_calories_by_kind.remove(&kind);
            }
        }
    }

    /// Sum of calories of `kind`'s picks. Ids missing from `meals` count 0.
    /// Saturates at `u32::MAX`.
    pub fn planned_calories(&self, kind: MealKind, meals: &[Meal]) -> u32 {
        self.meal_ids(kind)
            .iter()
            .filter_map(|id| meals.iter().find(|m| m.id == *id))
            .fold(0u32, |total, m| total.saturating_add(m.calories))
    }

    /// Re-snapshot `kind` from its current picks if it is checked.
    pub fn refresh_snapshot(&mut self, kind: MealKind, meals: &[Meal]) {
        if self.is_checked(kind) {
            let calories = self.planned_calories(kind, meals);
            self.set_checked(kind, Some(calories));
        }
    }

    pub fn consumed_calories(&self) -> u32 {
        self.checked_calories_by_kind
            .values()
            .fold(0u32, |total, c| total.saturating_add(*c))
    }

    pub fn is_empty(&self) -> bool {
        self.meal_ids_by_kind.is_empty() && self.checked_calories_by_kind.is_empty()
    }
}
