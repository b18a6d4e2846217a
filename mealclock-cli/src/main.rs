use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::sync::Arc;

use mealclock_core::{parse_timezone, JsonFileStore, MealPlanner, ProjectionWorker};

mod args;
mod config;
mod day_cmd;
mod meals_cmd;
mod outbox;
mod reminders_cmd;
mod schedule_cmd;
mod settings_cmd;
mod state;

use day_cmd::DayCommand;
use meals_cmd::MealsCommand;
use outbox::FileOutbox;
use reminders_cmd::RemindersCommand;
use schedule_cmd::{HolidaysCommand, ScheduleCommand};
use settings_cmd::SettingsCommand;

pub(crate) type Planner = MealPlanner<JsonFileStore, ProjectionWorker>;

#[derive(Parser, Debug)]
#[command(
    name = "mealclock",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("MEALCLOCK_BUILD_SHA"), ")"),
    about = "Plan meals, track calories and get reminded at meal time"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default ~/.mealclock/config.toml
    Init,

    /// Today's meal plan
    Today,

    /// The next upcoming meal
    Next,

    /// Meal catalog
    Meals {
        #[command(subcommand)]
        command: MealsCommand,
    },

    /// Picks and check-offs for a day
    Day {
        #[command(subcommand)]
        command: DayCommand,
    },

    /// Weekly meal times
    Schedule {
        #[command(subcommand)]
        command: ScheduleCommand,
    },

    /// Dates with their own meal times
    Holidays {
        #[command(subcommand)]
        command: HolidaysCommand,
    },

    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },

    /// Meal reminders
    Reminders {
        #[command(subcommand)]
        command: RemindersCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Command::Init = cli.command {
        return config::init_config();
    }

    let cfg = config::load_config()?;
    let tz = parse_timezone(&cfg.timezone)?;
    let outbox = Arc::new(FileOutbox::new(state::outbox_path()?));

    if let Command::Reminders { command } = &cli.command {
        if !command.needs_planner() {
            return reminders_cmd::run_outbox(&outbox, tz, command);
        }
    }

    let store = JsonFileStore::new(state::state_path(&cfg)?);
    let worker = ProjectionWorker::spawn(Arc::clone(&outbox), cfg.worker_config());
    let mut planner = MealPlanner::open(store, worker, tz);

    let result = dispatch(&mut planner, &outbox, &cfg, cli.command);

    if let Some(warning) = planner.save_warning().map(str::to_owned) {
        if !planner.retry_save() {
            eprintln!("warning: changes are not saved: {warning}");
        }
    }

    let outcome = planner.into_sink().shutdown().await;
    log::debug!("last reminder projection: {outcome:?}");

    result
}

fn dispatch(
    planner: &mut Planner,
    outbox: &FileOutbox,
    cfg: &config::Config,
    command: Command,
) -> Result<()> {
    match command {
        Command::Init => Ok(()),
        Command::Today => day_cmd::run(planner, DayCommand::Show { date: None }),
        Command::Next => {
            println!("{}", day_cmd::render_next(&planner.resolver()));
            Ok(())
        }
        Command::Meals { command } => meals_cmd::run(planner, command),
        Command::Day { command } => day_cmd::run(planner, command),
        Command::Schedule { command } => schedule_cmd::run_schedule(planner, command),
        Command::Holidays { command } => schedule_cmd::run_holidays(planner, command),
        Command::Settings { command } => settings_cmd::run(planner, command),
        Command::Reminders { command } => {
            reminders_cmd::run(planner, outbox, cfg.horizon_days, command)
        }
    }
}
