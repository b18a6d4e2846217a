use anyhow::{bail, Result};
use clap::Subcommand;

use mealclock_core::Meal;

use crate::args::{find_meal, short_id};
use crate::Planner;

#[derive(Subcommand, Debug)]
pub enum MealsCommand {
    /// List the meal catalog
    List,

    /// Add a meal to the catalog
    Add {
        name: String,

        #[arg(long)]
        calories: u32,

        #[arg(long)]
        protein: Option<u32>,

        #[arg(long)]
        carbs: Option<u32>,

        #[arg(long)]
        fat: Option<u32>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Change fields of an existing meal (by name or id)
    Edit {
        meal: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        calories: Option<u32>,

        #[arg(long)]
        protein: Option<u32>,

        #[arg(long)]
        carbs: Option<u32>,

        #[arg(long)]
        fat: Option<u32>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete meals by name or id; they are also removed from every day
    Delete { meals: Vec<String> },

    /// Delete meals by their position in `meals list` (1-based)
    DeleteAt { positions: Vec<usize> },
}

pub fn run(planner: &mut Planner, cmd: MealsCommand) -> Result<()> {
    match cmd {
        MealsCommand::List => list(planner),
        MealsCommand::Add {
            name,
            calories,
            protein,
            carbs,
            fat,
            notes,
        } => {
            let meal = Meal {
                protein_grams: protein,
                carbs_grams: carbs,
                fat_grams: fat,
                notes,
                ..Meal::new(name, calories)
            };
            let id = planner.add_meal(meal)?;
            println!("Added meal {}", short_id(id));
            Ok(())
        }
        MealsCommand::Edit {
            meal,
            name,
            calories,
            protein,
            carbs,
            fat,
            notes,
        } => {
            let mut updated = find_meal(planner.state(), &meal)?.clone();
            if let Some(name) = name {
                updated.name = name;
            }
            if let Some(calories) = calories {
                updated.calories = calories;
            }
            updated.protein_grams = protein.or(updated.protein_grams);
            updated.carbs_grams = carbs.or(updated.carbs_grams);
            updated.fat_grams = fat.or(updated.fat_grams);
            updated.notes = notes.or(updated.notes);
            planner.update_meal(updated)?;
            println!("Updated {meal}");
            Ok(())
        }
        MealsCommand::Delete { meals } => {
            if meals.is_empty() {
                bail!("name at least one meal to delete");
            }
            let ids = meals
                .iter()
                .map(|q| find_meal(planner.state(), q).map(|m| m.id))
                .collect::<Result<Vec<_>>>()?;
            for id in ids {
                planner.delete_meal(id);
            }
            println!("Deleted {} meal(s)", meals.len());
            Ok(())
        }
        MealsCommand::DeleteAt { positions } => {
            let before = planner.state().meals.len();
            let indices: Vec<usize> = positions.iter().filter_map(|p| p.checked_sub(1)).collect();
            planner.delete_meals_at(&indices);
            println!("Deleted {} meal(s)", before - planner.state().meals.len());
            Ok(())
        }
    }
}

fn list(planner: &Planner) -> Result<()> {
    let meals = &planner.state().meals;
    if meals.is_empty() {
        println!("No meals yet. Add one with: mealclock meals add <name> --calories <n>");
        return Ok(());
    }
    for (i, m) in meals.iter().enumerate() {
        println!(
            "{:>2}. {} | {} cal | {} | {}",
            i + 1,
            m.name,
            m.calories,
            m.macro_summary(),
            short_id(m.id)
        );
        if let Some(notes) = m.notes.as_deref().filter(|n| !n.is_empty()) {
            println!("      {notes}");
        }
    }
    Ok(())
}
