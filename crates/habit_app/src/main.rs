use std::path::PathBuf;
use std::process;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use habit_app::{AppConfig, HabitBoard};
use habit_core::date::{parse_date, today};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "habit-tracker", about = "Track daily habits", version)]
struct Cli {
    /// Habit data file. Defaults to the per-user data directory.
    #[arg(long, global = true)]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show every habit with the current week.
    List {
        /// Also show the year heatmap for these habit ids.
        #[arg(long)]
        expand: Vec<String>,
    },
    /// Create a habit.
    Add {
        name: String,
        #[arg(long)]
        icon: Option<String>,
    },
    /// Rename a habit or change its icon.
    Edit {
        id: String,
        name: Option<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    /// Delete a habit and its history.
    Remove {
        id: String,
        /// Confirm the removal.
        #[arg(long)]
        yes: bool,
    },
    /// Mark a day as done (today by default).
    Done {
        id: String,
        #[arg(long, value_parser = parse_day)]
        date: Option<NaiveDate>,
    },
    /// Mark a day as not done (today by default).
    Undo {
        id: String,
        #[arg(long, value_parser = parse_day)]
        date: Option<NaiveDate>,
    },
    /// Flip a day between done and not done.
    Toggle {
        id: String,
        #[arg(long, value_parser = parse_day)]
        date: Option<NaiveDate>,
    },
    /// Show the year heatmap for one habit.
    Year { id: String },
    /// List the available icons.
    Icons,
}

fn parse_day(raw: &str) -> Result<NaiveDate, String> {
    parse_date(raw).ok_or_else(|| format!("`{raw}` is not a YYYY-MM-DD date"))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::from_env()?;
    if let Some(file) = &cli.file {
        config = config.with_data_file(file);
    }
    let mut board = HabitBoard::open(&config, today())?;
    tracing::debug!(location = %board.store().storage_location(), "board ready");

    let notice = match cli.command.unwrap_or(Command::List { expand: Vec::new() }) {
        Command::List { expand } => {
            for id in &expand {
                board.set_expanded(id, true)?;
            }
            board.render()
        }
        Command::Add { name, icon } => board.add(&name, icon.as_deref())?,
        Command::Edit { id, name, icon } => board.edit(&id, name.as_deref(), icon.as_deref())?,
        Command::Remove { id, yes } => board.remove(&id, yes)?,
        Command::Done { id, date } => board.mark(&id, date, true)?,
        Command::Undo { id, date } => board.mark(&id, date, false)?,
        Command::Toggle { id, date } => board.toggle(&id, date)?,
        Command::Year { id } => board.render_year(&id)?,
        Command::Icons => {
            let icons = board.store().icons();
            icons
                .choices()
                .iter()
                .map(|icon| {
                    if icon == icons.fallback() {
                        format!("{icon} (default)\n")
                    } else {
                        format!("{icon}\n")
                    }
                })
                .collect()
        }
    };
    print!("{notice}");
    if !notice.ends_with('\n') {
        println!();
    }
    Ok(())
}
