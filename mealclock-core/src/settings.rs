use serde::{Deserialize, Deserializer, Serialize};

use crate::schedule::HolidayMatching;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    System,
    Light,
    Dark,
}

/// User preferences stored with the rest of the app state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    #[serde(deserialize_with = "clamp_non_negative")]
    pub daily_calorie_goal: u32,
    pub notifications_enabled: bool,
    /// 0 = remind at meal time.
    #[serde(deserialize_with = "clamp_non_negative")]
    pub notify_minutes_before: u32,
    pub theme: Theme,
    pub holiday_matching: HolidayMatching,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            daily_calorie_goal: 2000,
            notifications_enabled: true,
            notify_minutes_before: 0,
            theme: Theme::System,
            holiday_matching: HolidayMatching::Annual,
        }
    }
}

fn clamp_non_negative<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    let value = i64::deserialize(d)?;
    Ok(value.clamp(0, i64::from(u32::MAX)) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let s: Settings = serde_json::from_str(r#"{"dailyCalorieGoal":1800}"#).unwrap();
        assert_eq!(s.daily_calorie_goal, 1800);
        assert!(s.notifications_enabled);
        assert_eq!(s.theme, Theme::System);
        assert_eq!(s.holiday_matching, HolidayMatching::Annual);
    }

    #[test]
    fn negative_goal_clamps_to_zero() {
        let s: Settings =
            serde_json::from_str(r#"{"dailyCalorieGoal":-50,"notifyMinutesBefore":-5}"#).unwrap();
        assert_eq!(s.daily_calorie_goal, 0);
        assert_eq!(s.notify_minutes_before, 0);
    }
}
