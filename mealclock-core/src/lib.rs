//! mealclock-core: meal catalog, weekly schedule, holidays, day logs and
//! reminder projection for MealClock

pub mod day_log;
pub mod error;
pub mod meal;
pub mod planner;
pub mod reminders;
pub mod resolver;
pub mod schedule;
pub mod settings;
pub mod state;
pub mod store;
pub mod time;
pub mod worker;

pub use day_log::DayLog;
pub use error::PlanError;
pub use meal::{sample_meals, Meal, MealId, MealKind};
pub use planner::{HolidaySeed, MealPlanner};
pub use reminders::{
    plan_reminders, project, reminder_id, withdraw, AuthorizationStatus, NotificationBackend,
    ProjectionOutcome, ProjectionTrigger, ReminderIntent, DEFAULT_HORIZON_DAYS,
    REMINDER_ID_PREFIX,
};
pub use resolver::{NextMeal, Resolver};
pub use schedule::{DaySlots, Holiday, HolidayDate, HolidayMatching, MealSlot, WeeklySchedule};
pub use settings::{Settings, Theme};
pub use state::AppState;
pub use store::{JsonFileStore, StateStore};
pub use chrono_tz::Tz;
pub use time::{parse_timezone, ClockTime};
pub use worker::{ProjectionRequest, ProjectionSink, ProjectionWorker, WorkerConfig};
