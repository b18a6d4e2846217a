use anyhow::{anyhow, Result};
use chrono::{NaiveDate, Weekday};
use clap::Subcommand;

use mealclock_core::time::weekday_from_number;
use mealclock_core::{ClockTime, DaySlots, HolidaySeed, MealKind};

use crate::args::{find_holiday, parse_holiday_date, short_id};
use crate::Planner;

#[derive(Subcommand, Debug)]
pub enum ScheduleCommand {
    /// Show meal times for every weekday
    Show,

    /// Change one meal time on a weekday (1=Sunday .. 7=Saturday, or a name)
    Set {
        #[arg(value_parser = parse_weekday)]
        weekday: Weekday,
        kind: MealKind,
        time: ClockTime,
    },
}

#[derive(Subcommand, Debug)]
pub enum HolidaysCommand {
    /// List holidays and their meal times
    List,

    /// Add a holiday on MM-DD (every year) or YYYY-MM-DD
    Add {
        name: String,
        date: String,

        /// Start from the meal times already in effect on this date
        /// instead of the defaults
        #[arg(long)]
        copy_from: Option<NaiveDate>,
    },

    /// Rename or move a holiday (by name or id)
    Edit {
        holiday: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        date: Option<String>,
    },

    /// Change one of a holiday's meal times
    SetTime {
        holiday: String,
        kind: MealKind,
        time: ClockTime,
    },

    /// Delete a holiday
    Delete { holiday: String },
}

pub fn parse_weekday(s: &str) -> Result<Weekday> {
    if let Ok(n) = s.trim().parse::<u8>() {
        return Ok(weekday_from_number(n)?);
    }
    s.trim()
        .parse::<Weekday>()
        .map_err(|_| anyhow!("'{s}' is not a weekday (1-7 or a name like mon)"))
}

pub fn run_schedule(planner: &mut Planner, cmd: ScheduleCommand) -> Result<()> {
    match cmd {
        ScheduleCommand::Show => {
            for (n, slots) in planner.state().weekly_slots_by_weekday.iter() {
                let weekday = weekday_from_number(n)?;
                println!("{:<4}{}", format!("{weekday}"), render_slots(slots));
            }
        }
        ScheduleCommand::Set {
            weekday,
            kind,
            time,
        } => {
            planner.update_weekly_time(weekday, kind, time);
            println!("{weekday} {}: {time}", kind.title());
        }
    }
    Ok(())
}

pub fn run_holidays(planner: &mut Planner, cmd: HolidaysCommand) -> Result<()> {
    match cmd {
        HolidaysCommand::List => {
            let holidays = &planner.state().holidays;
            if holidays.is_empty() {
                println!("No holidays. Add one with: mealclock holidays add <name> <MM-DD>");
            }
            for h in holidays {
                println!("{} | {} | {}", h.date, h.name, short_id(h.id));
                println!("    {}", render_slots(&h.slots));
            }
        }
        HolidaysCommand::Add {
            name,
            date,
            copy_from,
        } => {
            let date = parse_holiday_date(&date)?;
            let seed = match copy_from {
                Some(day) => HolidaySeed::FromSchedule(day),
                None => HolidaySeed::Defaults,
            };
            let id = planner.add_holiday(name.trim(), date, seed);
            println!("Added holiday {} on {date}", short_id(id));
        }
        HolidaysCommand::Edit {
            holiday,
            name,
            date,
        } => {
            let current = find_holiday(planner.state(), &holiday)?;
            let id = current.id;
            let name = name.unwrap_or_else(|| current.name.clone());
            let date = match date {
                Some(d) => parse_holiday_date(&d)?,
                None => current.date,
            };
            planner.update_holiday(id, name.trim(), date);
            println!("Updated {holiday}: {name} on {date}");
        }
        HolidaysCommand::SetTime {
            holiday,
            kind,
            time,
        } => {
            let id = find_holiday(planner.state(), &holiday)?.id;
            planner.update_holiday_time(id, kind, time);
            println!("{holiday} {}: {time}", kind.title());
        }
        HolidaysCommand::Delete { holiday } => {
            let id = find_holiday(planner.state(), &holiday)?.id;
            planner.delete_holiday(id);
            println!("Deleted {holiday}");
        }
    }
    Ok(())
}

fn render_slots(slots: &DaySlots) -> String {
    slots
        .sorted_by_time()
        .iter()
        .map(|s| format!("{} {}", s.kind.as_str(), s.time))
        .collect::<Vec<_>>()
        .join("  ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekdays_by_number_or_name() {
        assert_eq!(parse_weekday("1").unwrap(), Weekday::Sun);
        assert_eq!(parse_weekday("7").unwrap(), Weekday::Sat);
        assert_eq!(parse_weekday("thu").unwrap(), Weekday::Thu);
        assert_eq!(parse_weekday("Friday").unwrap(), Weekday::Fri);
        assert!(parse_weekday("0").is_err());
        assert!(parse_weekday("8").is_err());
        assert!(parse_weekday("someday").is_err());
    }

    #[test]
    fn default_slots_render_in_time_order() {
        assert_eq!(
            render_slots(&DaySlots::defaults()),
            "breakfast 08:00  lunch 12:30  snack 15:30  dinner 18:30"
        );
    }
}
