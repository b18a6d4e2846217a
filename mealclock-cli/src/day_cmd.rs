use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::Subcommand;

use mealclock_core::{MealKind, Resolver};

use crate::args::{date_or_today, find_meal};
use crate::Planner;

#[derive(Subcommand, Debug)]
pub enum DayCommand {
    /// Show a day's meal times, picks and calorie progress
    Show {
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Pick a meal for a meal-time (the same meal may be picked twice)
    Add {
        kind: MealKind,
        meal: String,

        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Remove one pick of a meal from a meal-time
    Remove {
        kind: MealKind,
        meal: String,

        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Mark a meal-time as eaten, or unmark it
    Check {
        kind: MealKind,

        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

pub fn run(planner: &mut Planner, cmd: DayCommand) -> Result<()> {
    match cmd {
        DayCommand::Show { date } => {
            let resolver = planner.resolver();
            let date = date_or_today(date, &resolver);
            print!("{}", render_day(&resolver, date));
        }
        DayCommand::Add { kind, meal, date } => {
            let date = date_or_today(date, &planner.resolver());
            let meal = find_meal(planner.state(), &meal)?;
            let (id, name) = (meal.id, meal.name.clone());
            planner.add_meal_to_day(date, kind, id)?;
            println!("{date} {}: added {name}", kind.title());
        }
        DayCommand::Remove { kind, meal, date } => {
            let date = date_or_today(date, &planner.resolver());
            let meal = find_meal(planner.state(), &meal)?;
            let (id, name) = (meal.id, meal.name.clone());
            planner.remove_meal_from_day(date, kind, id);
            println!("{date} {}: removed {name}", kind.title());
        }
        DayCommand::Check { kind, date } => {
            let date = date_or_today(date, &planner.resolver());
            let checked = planner.toggle_checked(date, kind);
            let consumed = planner.resolver().consumed_so_far(date);
            let verb = if checked { "checked" } else { "unchecked" };
            println!("{date} {}: {verb} ({consumed} cal eaten so far)", kind.title());
        }
    }
    Ok(())
}

pub fn render_day(resolver: &Resolver<'_>, date: NaiveDate) -> String {
    let mut out = format!("# {}", date.format("%a %b %-d %Y"));
    if let Some(holiday) = resolver.holiday_for(date) {
        out.push_str(&format!(" ({})", holiday.name));
    }
    out.push('\n');

    let goal = resolver.state().settings.daily_calorie_goal;
    let consumed = resolver.consumed_so_far(date);
    out.push_str(&format!(
        "Goal {goal} cal | eaten {consumed} | left {} | planned {} | {:.0}%\n\n",
        resolver.remaining_calories(date),
        resolver.planned_calories(date),
        resolver.goal_progress(date) * 100.0
    ));

    for slot in resolver.day_slots(date).sorted_by_time() {
        let mark = if resolver.is_checked(date, slot.kind) { "x" } else { " " };
        let meals = resolver.selected_meals(date, slot.kind);
        let picks = if meals.is_empty() {
            "-".to_string()
        } else {
            let names: Vec<&str> = meals.iter().map(|m| m.name.as_str()).collect();
            format!(
                "{} ({} cal)",
                names.join(", "),
                resolver.planned_calories_for(date, slot.kind)
            )
        };
        out.push_str(&format!(
            "[{mark}] {} {:<9} {picks}\n",
            slot.time,
            slot.kind.title()
        ));
    }
    out
}

/// One line for `mealclock next`.
pub fn render_next(resolver: &Resolver<'_>) -> String {
    match resolver.next_meal(Utc::now()) {
        Some(next) => format!(
            "Next: {} at {} on {} | {}",
            next.kind.title(),
            next.time,
            next.date.format("%a %b %-d"),
            resolver.next_meal_summary(&next)
        ),
        None => "No upcoming meals in the next two weeks".to_string(),
    }
}
