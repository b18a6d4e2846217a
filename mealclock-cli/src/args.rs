//! Parsing and lookup helpers shared by the subcommands.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::ValueEnum;
use uuid::Uuid;

use mealclock_core::{AppState, Holiday, HolidayDate, HolidayMatching, Meal, Resolver, Theme};

/// `--date`, defaulting to today in the configured zone.
pub fn date_or_today(date: Option<NaiveDate>, resolver: &Resolver<'_>) -> NaiveDate {
    date.unwrap_or_else(|| resolver.today(Utc::now()))
}

/// `MM-DD` for a yearly holiday, `YYYY-MM-DD` for a one-off.
pub fn parse_holiday_date(s: &str) -> Result<HolidayDate> {
    let parts: Vec<&str> = s.trim().split('-').collect();
    let num = |p: &str| -> Result<u32> {
        p.parse::<u32>()
            .with_context(|| format!("'{s}' is not MM-DD or YYYY-MM-DD"))
    };
    let date = match parts.as_slice() {
        [m, d] => HolidayDate::annual(num(m)?, num(d)?)?,
        [y, m, d] => {
            let year = y
                .parse::<i32>()
                .with_context(|| format!("'{s}' is not MM-DD or YYYY-MM-DD"))?;
            HolidayDate::new(num(m)?, num(d)?, Some(year))?
        }
        _ => bail!("'{s}' is not MM-DD or YYYY-MM-DD"),
    };
    Ok(date)
}

/// Find a meal by id, unique id prefix, or case-insensitive name.
pub fn find_meal<'a>(state: &'a AppState, query: &str) -> Result<&'a Meal> {
    if let Ok(id) = Uuid::parse_str(query) {
        return state.meal(id).ok_or_else(|| anyhow!("no meal with id {id}"));
    }
    let by_name: Vec<&Meal> = state
        .meals
        .iter()
        .filter(|m| m.name.eq_ignore_ascii_case(query.trim()))
        .collect();
    if let [meal] = by_name.as_slice() {
        return Ok(meal);
    }
    unique(
        state.meals.iter().filter(|m| m.id.to_string().starts_with(query)),
        "meal",
        query,
    )
}

pub fn find_holiday<'a>(state: &'a AppState, query: &str) -> Result<&'a Holiday> {
    if let Ok(id) = Uuid::parse_str(query) {
        return state.holiday(id).ok_or_else(|| anyhow!("no holiday with id {id}"));
    }
    let by_name: Vec<&Holiday> = state
        .holidays
        .iter()
        .filter(|h| h.name.eq_ignore_ascii_case(query.trim()))
        .collect();
    if let [holiday] = by_name.as_slice() {
        return Ok(holiday);
    }
    unique(
        state.holidays.iter().filter(|h| h.id.to_string().starts_with(query)),
        "holiday",
        query,
    )
}

fn unique<'a, T>(mut matches: impl Iterator<Item = &'a T>, what: &str, query: &str) -> Result<&'a T> {
    let first = matches.next().ok_or_else(|| anyhow!("no {what} matches '{query}'"))?;
    if matches.next().is_some() {
        bail!("'{query}' matches more than one {what}; use more of the id");
    }
    Ok(first)
}

pub fn short_id(id: Uuid) -> String {
    id.to_string()[..8].to_string()
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ThemeArg {
    System,
    Light,
    Dark,
}

impl From<ThemeArg> for Theme {
    fn from(t: ThemeArg) -> Self {
        match t {
            ThemeArg::System => Theme::System,
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MatchingArg {
    /// Match month and day every year
    Annual,
    /// Also match the year when the holiday has one
    Exact,
}

impl From<MatchingArg> for HolidayMatching {
    fn from(m: MatchingArg) -> Self {
        match m {
            MatchingArg::Annual => HolidayMatching::Annual,
            MatchingArg::Exact => HolidayMatching::Exact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mealclock_core::DaySlots;

    #[test]
    fn holiday_dates() {
        let d = parse_holiday_date("07-04").unwrap();
        assert_eq!((d.month(), d.day(), d.year()), (7, 4, None));
        let d = parse_holiday_date("2025-01-01").unwrap();
        assert_eq!(d.year(), Some(2025));
        assert!(parse_holiday_date("02-30").is_err());
        assert!(parse_holiday_date("july 4").is_err());
        assert!(parse_holiday_date("1-2-3-4").is_err());
    }

    #[test]
    fn meal_lookup_by_name_or_prefix() {
        let state = AppState::default();
        let lunch = state.meals.iter().find(|m| m.name == "Lunch").unwrap();
        assert_eq!(find_meal(&state, "lunch").unwrap().id, lunch.id);
        assert_eq!(find_meal(&state, &lunch.id.to_string()).unwrap().id, lunch.id);
        assert_eq!(find_meal(&state, &short_id(lunch.id)).unwrap().id, lunch.id);
        assert!(find_meal(&state, "brunch").is_err());
        assert!(find_meal(&state, &Uuid::new_v4().to_string()).is_err());
    }

    #[test]
    fn duplicate_names_do_not_resolve() {
        let mut state = AppState::default();
        let date = HolidayDate::annual(12, 25).unwrap();
        state.holidays.push(Holiday::new("Xmas", date, DaySlots::defaults()));
        state.holidays.push(Holiday::new("Xmas", date, DaySlots::defaults()));
        assert!(find_holiday(&state, "Xmas").is_err());
    }
}
