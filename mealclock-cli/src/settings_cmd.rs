use anyhow::Result;
use clap::{Subcommand, ValueEnum};

use crate::args::{MatchingArg, ThemeArg};
use crate::Planner;

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Show current settings
    Show,

    /// Daily calorie goal (negative values are stored as 0)
    Goal {
        #[arg(allow_negative_numbers = true)]
        calories: i64,
    },

    /// Turn meal reminders on or off
    Notifications { state: Toggle },

    /// Remind this many minutes before each meal (0 = at meal time)
    Lead { minutes: u32 },

    Theme { theme: ThemeArg },

    /// How holidays with a year are matched
    HolidayMatching { matching: MatchingArg },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

pub fn run(planner: &mut Planner, cmd: SettingsCommand) -> Result<()> {
    match cmd {
        SettingsCommand::Show => {}
        SettingsCommand::Goal { calories } => planner.set_daily_calorie_goal(calories),
        SettingsCommand::Notifications { state } => {
            planner.set_notifications_enabled(matches!(state, Toggle::On))
        }
        SettingsCommand::Lead { minutes } => planner.set_notify_minutes_before(minutes),
        SettingsCommand::Theme { theme } => planner.set_theme(theme.into()),
        SettingsCommand::HolidayMatching { matching } => {
            planner.set_holiday_matching(matching.into())
        }
    }

    let s = &planner.state().settings;
    println!("daily_calorie_goal: {}", s.daily_calorie_goal);
    println!("notifications: {}", if s.notifications_enabled { "on" } else { "off" });
    println!("notify_minutes_before: {}", s.notify_minutes_before);
    println!("theme: {:?}", s.theme);
    println!("holiday_matching: {:?}", s.holiday_matching);
    Ok(())
}
