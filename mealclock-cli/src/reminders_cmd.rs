use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Subcommand;

use mealclock_core::{plan_reminders, AuthorizationStatus, Tz};

use crate::outbox::FileOutbox;
use crate::Planner;

#[derive(Subcommand, Debug)]
pub enum RemindersCommand {
    /// List reminders waiting in the outbox
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Permission and outbox summary
    Status,

    /// Show what would be scheduled, without touching the outbox
    Preview {
        /// Days ahead (default: config horizon_days)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Re-project reminders now
    Sync,

    /// Allow reminders and schedule them
    Allow,

    /// Revoke permission and drop pending reminders
    Deny,
}

impl RemindersCommand {
    /// Commands that only touch the outbox skip loading the app state, so no
    /// startup projection races with them.
    pub fn needs_planner(&self) -> bool {
        !matches!(self, Self::List { .. } | Self::Status | Self::Deny)
    }
}

pub fn run_outbox(outbox: &FileOutbox, tz: Tz, cmd: &RemindersCommand) -> Result<()> {
    match cmd {
        RemindersCommand::List { limit } => list(outbox, tz, *limit),
        RemindersCommand::Status => status(outbox),
        RemindersCommand::Deny => {
            outbox.set_status(AuthorizationStatus::Denied)?;
            println!("Reminders denied; pending meal reminders removed");
            Ok(())
        }
        _ => Ok(()),
    }
}

pub fn run(
    planner: &mut Planner,
    outbox: &FileOutbox,
    horizon_days: u32,
    cmd: RemindersCommand,
) -> Result<()> {
    match cmd {
        RemindersCommand::List { .. } | RemindersCommand::Status | RemindersCommand::Deny => {
            run_outbox(outbox, planner.tz(), &cmd)
        }
        RemindersCommand::Preview { days } => {
            let resolver = planner.resolver();
            let intents = plan_reminders(
                &resolver,
                &planner.state().settings,
                Utc::now(),
                days.unwrap_or(horizon_days),
            );
            if !planner.state().settings.notifications_enabled {
                println!("Notifications are off; nothing would be scheduled.");
            }
            for i in &intents {
                println!(
                    "{} | {} | {}",
                    format_fire(i.fire_at, resolver.tz()),
                    i.id,
                    i.body
                );
            }
            Ok(())
        }
        RemindersCommand::Sync => {
            planner.refresh_reminders();
            println!("Reminders re-projected into {}", outbox.path().display());
            Ok(())
        }
        RemindersCommand::Allow => {
            outbox.set_status(AuthorizationStatus::Authorized)?;
            planner.refresh_reminders();
            println!("Reminders allowed");
            Ok(())
        }
    }
}

/// Fire times are shown in the configured zone, not the host's.
fn format_fire(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%a %b %-d %H:%M").to_string()
}

fn list(outbox: &FileOutbox, tz: Tz, limit: usize) -> Result<()> {
    let now = Utc::now();
    let upcoming: Vec<_> = outbox
        .pending()?
        .into_iter()
        .filter(|p| p.fire_at > now)
        .collect();
    if upcoming.is_empty() {
        println!("No upcoming reminders in {}", outbox.path().display());
        return Ok(());
    }

    for (i, r) in upcoming.iter().take(limit).enumerate() {
        println!(
            "{}. {} {} | {}",
            i + 1,
            format_fire(r.fire_at, tz),
            r.title,
            r.body
        );
    }
    if upcoming.len() > limit {
        println!("... and {} more", upcoming.len() - limit);
    }
    Ok(())
}

fn status(outbox: &FileOutbox) -> Result<()> {
    let now = Utc::now();
    let pending = outbox.pending()?;
    let upcoming = pending.iter().filter(|p| p.fire_at > now).count();
    println!("Permission: {:?}", outbox.status()?);
    println!(
        "Outbox: {} total, {} upcoming, {} past ({})",
        pending.len(),
        upcoming,
        pending.len() - upcoming,
        outbox.path().display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbox_only_commands_skip_the_planner() {
        assert!(!RemindersCommand::List { limit: 5 }.needs_planner());
        assert!(!RemindersCommand::Status.needs_planner());
        assert!(!RemindersCommand::Deny.needs_planner());
        assert!(RemindersCommand::Sync.needs_planner());
        assert!(RemindersCommand::Allow.needs_planner());
        assert!(RemindersCommand::Preview { days: None }.needs_planner());
    }

    #[test]
    fn fire_times_use_the_configured_zone() {
        let at = DateTime::parse_from_rfc3339("2030-01-01T17:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let tokyo = mealclock_core::parse_timezone("Asia/Tokyo").unwrap();
        let new_york = mealclock_core::parse_timezone("America/New_York").unwrap();

        assert_eq!(format_fire(at, tokyo), "Wed Jan 2 02:30");
        assert_eq!(format_fire(at, new_york), "Tue Jan 1 12:30");
    }
}
