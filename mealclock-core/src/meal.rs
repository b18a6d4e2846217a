//! Meal catalog entries and the fixed set of meal kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PlanError;

pub type MealId = Uuid;

/// The four meal-times of a day, in their fixed iteration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealKind {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealKind {
    pub const ALL: [MealKind; 4] = [
        MealKind::Breakfast,
        MealKind::Lunch,
        MealKind::Dinner,
        MealKind::Snack,
    ];

    /// Position in [`MealKind::ALL`].
    pub fn index(self) -> usize {
        match self {
            MealKind::Breakfast => 0,
            MealKind::Lunch => 1,
            MealKind::Dinner => 2,
            MealKind::Snack => 3,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            MealKind::Breakfast => "Breakfast",
            MealKind::Lunch => "Lunch",
            MealKind::Dinner => "Dinner",
            MealKind::Snack => "Snack",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MealKind::Breakfast => "breakfast",
            MealKind::Lunch => "lunch",
            MealKind::Dinner => "dinner",
            MealKind::Snack => "snack",
        }
    }
}

impl fmt::Display for MealKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for MealKind {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        MealKind::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| PlanError::UnknownMealKind(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub id: MealId,
    pub name: String,
    pub calories: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein_grams: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbs_grams: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat_grams: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Meal {
    pub fn new(name: impl Into<String>, calories: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            calories,
            protein_grams: None,
            carbs_grams: None,
            fat_grams: None,
            notes: None,
        }
    }

    pub fn with_macros(mut self, protein: u32, carbs: u32, fat: u32) -> Self {
        self.protein_grams = Some(protein);
        self.carbs_grams = Some(carbs);
        self.fat_grams = Some(fat);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// "25P • 45C • 15F", skipping unknown macros; "—" when none are known.
    pub fn macro_summary(&self) -> String {
        let parts: Vec<String> = [
            self.protein_grams.map(|g| format!("{g}P")),
            self.carbs_grams.map(|g| format!("{g}C")),
            self.fat_grams.map(|g| format!("{g}F")),
        ]
        .into_iter()
        .flatten()
        .collect();

        if parts.is_empty() {
            "—".to_string()
        } else {
            parts.join(" • ")
        }
    }

    pub(crate) fn validate(&self) -> Result<(), PlanError> {
        if self.name.trim().is_empty() {
            return Err(PlanError::EmptyMealName);
        }
        Ok(())
    }
}

/// Meals a fresh install starts with.
pub fn sample_meals() -> Vec<Meal> {
    vec![
        Meal::new("Breakfast", 450)
            .with_macros(25, 45, 15)
            .with_notes("Example meal"),
        Meal::new("Dinner", 750).with_macros(45, 55, 30),
        Meal::new("Lunch", 650).with_macros(35, 65, 20),
    ]
}

pub(crate) fn sort_by_name(meals: &mut [Meal]) {
    meals.sort_by_cached_key(|m| m.name.to_lowercase());
}
