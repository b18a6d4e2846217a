//! Meal-time schedule model: kind-keyed day slots, the weekly table and
//! holiday overrides.
//!
//! Two slot shapes have been persisted over time:
//! - kind-keyed `{id, kind, time}` (current), one slot per [`MealKind`];
//! - a free list of `{id, time, mealId?}` entries without a kind.
//!
//! Both decode through [`RawSlot`] and are folded into [`DaySlots`] by
//! [`normalize_slots`] at the persistence boundary, so the rest of the crate
//! only ever sees the kind-keyed shape.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::PlanError;
use crate::meal::MealKind;
use crate::time::{weekday_from_number, ClockTime};

/// A scheduled time of day for one meal kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealSlot {
    pub id: Uuid,
    pub kind: MealKind,
    pub time: ClockTime,
}

/// Any slot shape found in a stored document. Fields that fail to decode are
/// treated as absent rather than failing the whole load.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSlot {
    #[serde(default = "Uuid::new_v4", deserialize_with = "lenient_id")]
    pub id: Uuid,
    #[serde(default, deserialize_with = "lenient")]
    pub kind: Option<MealKind>,
    #[serde(default, deserialize_with = "lenient")]
    pub time: Option<ClockTime>,
    /// Meal reference from the list-shaped schema; dropped by normalization.
    #[serde(default, deserialize_with = "lenient")]
    pub meal_id: Option<Uuid>,
}

impl Default for RawSlot {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: None,
            time: None,
            meal_id: None,
        }
    }
}

impl From<&MealSlot> for RawSlot {
    fn from(slot: &MealSlot) -> Self {
        Self {
            id: slot.id,
            kind: Some(slot.kind),
            time: Some(slot.time),
            meal_id: None,
        }
    }
}

fn lenient<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = serde_json::Value::deserialize(d)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_id<'de, D: Deserializer<'de>>(d: D) -> Result<Uuid, D::Error> {
    Ok(lenient(d)?.unwrap_or_else(Uuid::new_v4))
}

pub fn default_time(kind: MealKind) -> ClockTime {
    match kind {
        MealKind::Breakfast => ClockTime::from_hm(8, 0),
        MealKind::Lunch => ClockTime::from_hm(12, 30),
        MealKind::Dinner => ClockTime::from_hm(18, 30),
        MealKind::Snack => ClockTime::from_hm(15, 30),
    }
}

/// Exactly one slot per [`MealKind`], stored in kind order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "Vec<MealSlot>")]
pub struct DaySlots([MealSlot; 4]);

impl DaySlots {
    pub fn defaults() -> Self {
        Self(MealKind::ALL.map(|kind| MealSlot {
            id: Uuid::new_v4(),
            kind,
            time: default_time(kind),
        }))
    }

    pub fn get(&self, kind: MealKind) -> &MealSlot {
        &self.0[kind.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &MealSlot> {
        self.0.iter()
    }

    /// Replace only the time of `kind`'s slot; its id is kept.
    pub fn set_time(&mut self, kind: MealKind, time: ClockTime) {
        self.0[kind.index()].time = time;
    }

    /// Slots ordered by time of day; equal times keep kind order.
    pub fn sorted_by_time(&self) -> Vec<MealSlot> {
        let mut slots = self.0.to_vec();
        slots.sort_by_key(|s| s.time);
        slots
    }

    pub fn to_raw(&self) -> Vec<RawSlot> {
        self.0.iter().map(RawSlot::from).collect()
    }
}

impl From<serde_json::Value> for DaySlots {
    fn from(value: serde_json::Value) -> Self {
        let raw: Vec<RawSlot> = match value {
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(|v| serde_json::from_value(v).unwrap_or_default())
                .collect(),
            _ => Vec::new(),
        };
        normalize_slots(&raw)
    }
}

impl From<DaySlots> for Vec<MealSlot> {
    fn from(slots: DaySlots) -> Self {
        slots.0.into()
    }
}

/// Fold any stored slot list into one slot per kind.
///
/// For each kind in fixed order: the first slot tagged with that kind wins;
/// otherwise an untagged slot at the kind's position is adopted; otherwise the
/// kind's default time is used. Legacy meal references are discarded.
/// Normalizing an already-normalized list returns it unchanged.
pub fn normalize_slots(raw: &[RawSlot]) -> DaySlots {
    DaySlots(MealKind::ALL.map(|kind| {
        if let Some(tagged) = raw.iter().find(|s| s.kind == Some(kind)) {
            return MealSlot {
                id: tagged.id,
                kind,
                time: tagged.time.unwrap_or_else(|| default_time(kind)),
            };
        }

        match raw.get(kind.index()) {
            Some(RawSlot {
                id,
                kind: None,
                time: Some(time),
                ..
            }) => MealSlot {
                id: *id,
                kind,
                time: *time,
            },
            _ => MealSlot {
                id: Uuid::new_v4(),
                kind,
                time: default_time(kind),
            },
        }
    }))
}

/// Recurring schedule: one [`DaySlots`] per weekday, numbered 1 = Sunday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, DaySlots>", into = "BTreeMap<String, DaySlots>")]
pub struct WeeklySchedule([DaySlots; 7]);

impl Default for WeeklySchedule {
    fn default() -> Self {
        Self(std::array::from_fn(|_| DaySlots::defaults()))
    }
}

impl WeeklySchedule {
    pub fn for_weekday(&self, weekday: Weekday) -> &DaySlots {
        &self.0[weekday.num_days_from_sunday() as usize]
    }

    pub fn for_date(&self, date: NaiveDate) -> &DaySlots {
        self.for_weekday(date.weekday())
    }

    pub fn for_number(&self, number: u8) -> Result<&DaySlots, PlanError> {
        Ok(self.for_weekday(weekday_from_number(number)?))
    }

    pub fn for_weekday_mut(&mut self, weekday: Weekday) -> &mut DaySlots {
        &mut self.0[weekday.num_days_from_sunday() as usize]
    }

    /// `(weekday number, slots)` for Sunday through Saturday.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &DaySlots)> {
        self.0.iter().enumerate().map(|(i, s)| (i as u8 + 1, s))
    }
}

impl From<BTreeMap<String, DaySlots>> for WeeklySchedule {
    fn from(mut stored: BTreeMap<String, DaySlots>) -> Self {
        Self(std::array::from_fn(|i| {
            stored
                .remove(&(i + 1).to_string())
                .unwrap_or_else(DaySlots::defaults)
        }))
    }
}

impl From<WeeklySchedule> for BTreeMap<String, DaySlots> {
    fn from(schedule: WeeklySchedule) -> Self {
        schedule
            .0
            .into_iter()
            .enumerate()
            .map(|(i, slots)| ((i + 1).to_string(), slots))
            .collect()
    }
}

/// How holiday dates are compared against calendar days. Applies to every
/// holiday at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HolidayMatching {
    /// Month and day only; the holiday recurs every year.
    #[default]
    Annual,
    /// Month and day, plus the year when the holiday carries one.
    Exact,
}

/// A holiday's calendar date. Orders by month, day, then year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawHolidayDate")]
pub struct HolidayDate {
    month: u32,
    day: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    year: Option<i32>,
}

#[derive(Deserialize)]
struct RawHolidayDate {
    month: u32,
    day: u32,
    #[serde(default)]
    year: Option<i32>,
}

impl TryFrom<RawHolidayDate> for HolidayDate {
    type Error = PlanError;

    fn try_from(raw: RawHolidayDate) -> Result<Self, Self::Error> {
        HolidayDate::new(raw.month, raw.day, raw.year)
    }
}

impl HolidayDate {
    pub fn new(month: u32, day: u32, year: Option<i32>) -> Result<Self, PlanError> {
        // 2000 is a leap year, so Feb 29 is accepted for recurring holidays.
        NaiveDate::from_ymd_opt(year.unwrap_or(2000), month, day)
            .ok_or(PlanError::InvalidHolidayDate { month, day })?;
        Ok(Self { month, day, year })
    }

    pub fn annual(month: u32, day: u32) -> Result<Self, PlanError> {
        Self::new(month, day, None)
    }

    pub fn on(date: NaiveDate) -> Self {
        Self {
            month: date.month(),
            day: date.day(),
            year: Some(date.year()),
        }
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn matches(&self, date: NaiveDate, matching: HolidayMatching) -> bool {
        if date.month() != self.month || date.day() != self.day {
            return false;
        }
        match (matching, self.year) {
            (HolidayMatching::Exact, Some(year)) => date.year() == year,
            _ => true,
        }
    }
}

impl fmt::Display for HolidayDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = NaiveDate::from_ymd_opt(self.year.unwrap_or(2000), self.month, self.day)
            .map(|d| d.format("%b %-d").to_string())
            .unwrap_or_else(|| format!("{}/{}", self.month, self.day));
        match self.year {
            Some(year) => write!(f, "{shown}, {year}"),
            None => f.write_str(&shown),
        }
    }
}

/// A date-specific override whose slots replace the weekday's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawHoliday")]
pub struct Holiday {
    pub id: Uuid,
    pub name: String,
    pub date: HolidayDate,
    pub slots: DaySlots,
}

impl Holiday {
    pub fn new(name: impl Into<String>, date: HolidayDate, slots: DaySlots) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            date,
            slots,
        }
    }
}

/// Both stored holiday shapes: `date: {year, month, day}` or top-level
/// `month`/`day`.
#[derive(Deserialize)]
struct RawHoliday {
    #[serde(default = "Uuid::new_v4")]
    id: Uuid,
    #[serde(default)]
    name: String,
    #[serde(default)]
    date: Option<HolidayDate>,
    #[serde(default)]
    month: Option<u32>,
    #[serde(default)]
    day: Option<u32>,
    #[serde(default = "DaySlots::defaults")]
    slots: DaySlots,
}

impl TryFrom<RawHoliday> for Holiday {
    type Error = PlanError;

    fn try_from(raw: RawHoliday) -> Result<Self, Self::Error> {
        let date = match (raw.date, raw.month, raw.day) {
            (Some(date), _, _) => date,
            (None, Some(month), Some(day)) => HolidayDate::annual(month, day)?,
            (None, month, day) => {
                return Err(PlanError::InvalidHolidayDate {
                    month: month.unwrap_or(0),
                    day: day.unwrap_or(0),
                });
            }
        };
        Ok(Self {
            id: raw.id,
            name: raw.name,
            date,
            slots: raw.slots,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> ClockTime {
        ClockTime::new(h, m).unwrap()
    }

    fn legacy(time: ClockTime) -> RawSlot {
        RawSlot {
            time: Some(time),
            meal_id: Some(Uuid::new_v4()),
            ..RawSlot::default()
        }
    }

    #[test]
    fn empty_input_yields_defaults() {
        let slots = normalize_slots(&[]);
        let times: Vec<_> = slots.iter().map(|s| s.time.to_string()).collect();
        assert_eq!(times, ["08:00", "12:30", "18:30", "15:30"]);
    }

    #[test]
    fn legacy_list_maps_by_position() {
        let raw = vec![legacy(t(7, 0)), legacy(t(13, 0)), legacy(t(19, 0))];
        let slots = normalize_slots(&raw);
        assert_eq!(slots.get(MealKind::Breakfast).time, t(7, 0));
        assert_eq!(slots.get(MealKind::Breakfast).id, raw[0].id);
        assert_eq!(slots.get(MealKind::Lunch).time, t(13, 0));
        assert_eq!(slots.get(MealKind::Dinner).time, t(19, 0));
        assert_eq!(slots.get(MealKind::Snack).time, t(15, 30));
    }

    #[test]
    fn tagged_slot_beats_position() {
        let raw = vec![
            RawSlot {
                kind: Some(MealKind::Dinner),
                time: Some(t(20, 0)),
                ..RawSlot::default()
            },
            legacy(t(11, 0)),
        ];
        let slots = normalize_slots(&raw);
        assert_eq!(slots.get(MealKind::Dinner).time, t(20, 0));
        // Position 0 is tagged for dinner, so breakfast falls back to its default.
        assert_eq!(slots.get(MealKind::Breakfast).time, t(8, 0));
        assert_eq!(slots.get(MealKind::Lunch).time, t(11, 0));
    }

    #[test]
    fn normalization_is_idempotent() {
        let raw = vec![legacy(t(6, 45)), legacy(t(12, 0))];
        let once = normalize_slots(&raw);
        let twice = normalize_slots(&once.to_raw());
        assert_eq!(once, twice);
    }

    #[test]
    fn malformed_entries_are_absorbed() {
        let json = r#"[{"time":{"hour":99,"minute":0}}, 42, {"kind":"lunch","time":{"hour":11,"minute":15}}]"#;
        let slots: DaySlots = serde_json::from_str(json).unwrap();
        assert_eq!(slots.get(MealKind::Breakfast).time, t(8, 0));
        assert_eq!(slots.get(MealKind::Lunch).time, t(11, 15));
        assert_eq!(slots.iter().count(), 4);
    }

    #[test]
    fn non_list_decodes_to_defaults() {
        let slots: DaySlots = serde_json::from_str(r#"{"oops":true}"#).unwrap();
        assert_eq!(slots.get(MealKind::Snack).time, t(15, 30));
    }

    #[test]
    fn sorted_by_time_orders_snack_before_dinner() {
        let kinds: Vec<_> = DaySlots::defaults()
            .sorted_by_time()
            .into_iter()
            .map(|s| s.kind)
            .collect();
        assert_eq!(
            kinds,
            [MealKind::Breakfast, MealKind::Lunch, MealKind::Snack, MealKind::Dinner]
        );
    }

    #[test]
    fn weekly_schedule_fills_missing_weekdays() {
        let json = r#"{"2":[{"time":{"hour":9,"minute":0}}],"bogus":[]}"#;
        let weekly: WeeklySchedule = serde_json::from_str(json).unwrap();
        assert_eq!(weekly.iter().count(), 7);
        for (n, slots) in weekly.iter() {
            assert_eq!(slots.iter().count(), 4, "weekday {n}");
        }
        assert_eq!(
            weekly.for_weekday(Weekday::Mon).get(MealKind::Breakfast).time,
            t(9, 0)
        );
        assert_eq!(
            weekly.for_number(1).unwrap().get(MealKind::Breakfast).time,
            t(8, 0)
        );
    }

    #[test]
    fn weekly_schedule_serializes_with_numeric_keys() {
        let value = serde_json::to_value(WeeklySchedule::default()).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["1", "2", "3", "4", "5", "6", "7"]);
    }

    #[test]
    fn holiday_date_matching() {
        let july4 = NaiveDate::from_ymd_opt(2025, 7, 4).unwrap();
        let annual = HolidayDate::annual(7, 4).unwrap();
        let dated = HolidayDate::new(7, 4, Some(2024)).unwrap();

        assert!(annual.matches(july4, HolidayMatching::Annual));
        assert!(annual.matches(july4, HolidayMatching::Exact));
        assert!(dated.matches(july4, HolidayMatching::Annual));
        assert!(!dated.matches(july4, HolidayMatching::Exact));
        assert!(!annual.matches(july4.succ_opt().unwrap(), HolidayMatching::Annual));
    }

    #[test]
    fn holiday_date_validates() {
        assert!(HolidayDate::annual(2, 29).is_ok());
        assert!(HolidayDate::new(2, 29, Some(2023)).is_err());
        assert!(HolidayDate::annual(13, 1).is_err());
    }

    #[test]
    fn holiday_dates_sort_by_month_then_day() {
        let mut dates = vec![
            HolidayDate::annual(12, 25).unwrap(),
            HolidayDate::new(1, 1, Some(2025)).unwrap(),
            HolidayDate::annual(7, 4).unwrap(),
        ];
        dates.sort();
        let shown: Vec<_> = dates.iter().map(|d| d.to_string()).collect();
        assert_eq!(shown, ["Jan 1, 2025", "Jul 4", "Dec 25"]);
    }

    #[test]
    fn holiday_decodes_both_stored_shapes() {
        let nested = r#"{"name":"Launch","date":{"year":2024,"month":3,"day":1},"slots":[]}"#;
        let flat = r#"{"name":"Xmas","month":12,"day":25,"slots":[{"time":{"hour":10,"minute":0}}]}"#;

        let a: Holiday = serde_json::from_str(nested).unwrap();
        assert_eq!(a.date, HolidayDate::new(3, 1, Some(2024)).unwrap());

        let b: Holiday = serde_json::from_str(flat).unwrap();
        assert_eq!(b.date, HolidayDate::annual(12, 25).unwrap());
        assert_eq!(b.slots.get(MealKind::Breakfast).time, t(10, 0));

        assert!(serde_json::from_str::<Holiday>(r#"{"name":"Nope"}"#).is_err());
    }
}
