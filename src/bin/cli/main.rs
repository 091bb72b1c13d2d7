mod app;
mod commands;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use ssat_review_lib::activity::ActivityKind;
use ssat_review_lib::review::Difficulty;
use ssat_review_lib::storage::ItemKey;

#[derive(Parser)]
#[command(name = "ssat-review-cli", about = "SSAT spaced-repetition review scheduler", version)]
struct Cli {
    /// Config file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory, overriding the config file
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Record a review of an item
    Review {
        learner: Uuid,
        /// Item key, e.g. word:lucid or lesson:/verbal/analogies
        item: ItemKey,
        /// 0-3 or wait/easy/medium/hard
        difficulty: Difficulty,
        /// Whether the learner recalled the item
        #[arg(long)]
        recalled: Option<bool>,
    },

    /// List items due now, hardest first
    Due { learner: Uuid },

    /// Schedule items the learner has seen but never reviewed
    Sync {
        learner: Uuid,
        #[arg(required = true)]
        items: Vec<ItemKey>,
    },

    /// Undo an accidental review; the item becomes new and due
    Uncomplete { learner: Uuid, item: ItemKey },

    /// Review statistics
    Stats { learner: Uuid },

    /// Items becoming due over the coming days
    Forecast {
        learner: Uuid,
        #[arg(long, default_value = "7")]
        days: u32,
    },

    /// Show when each rating would bring an item back
    Preview,

    /// Record study activity
    Log {
        learner: Uuid,
        /// word-reviewed, minute-studied, question-answered or lesson-completed
        kind: ActivityKind,
        #[arg(long, default_value = "1")]
        quantity: u32,
    },

    /// Streak and today's goal progress
    Streak { learner: Uuid },

    /// Activity per day
    Calendar {
        learner: Uuid,
        #[arg(long, default_value = "28")]
        days: u32,
    },

    /// Run one notification sweep
    Sweep,

    /// Run notification sweeps periodically
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && atty_check();
    let format = &cli.format;

    let app = app::App::new(cli.config.as_deref(), cli.data_dir.clone())?;

    match cli.command {
        Command::Review { learner, item, difficulty, recalled } => {
            commands::review::run_review(&app, learner, &item, difficulty, recalled, format, use_color).await?;
        }
        Command::Due { learner } => {
            commands::review::run_due(&app, learner, format, use_color).await?;
        }
        Command::Sync { learner, items } => {
            commands::review::run_sync(&app, learner, &items, format).await?;
        }
        Command::Uncomplete { learner, item } => {
            commands::review::run_uncomplete(&app, learner, &item, format).await?;
        }
        Command::Stats { learner } => {
            commands::review::run_stats(&app, learner, format, use_color).await?;
        }
        Command::Forecast { learner, days } => {
            commands::review::run_forecast(&app, learner, days, format).await?;
        }
        Command::Preview => {
            commands::review::run_preview(&app, format, use_color)?;
        }
        Command::Log { learner, kind, quantity } => {
            commands::activity::run_log(&app, learner, kind, quantity, format).await?;
        }
        Command::Streak { learner } => {
            commands::activity::run_streak(&app, learner, format, use_color).await?;
        }
        Command::Calendar { learner, days } => {
            commands::activity::run_calendar(&app, learner, days, format, use_color).await?;
        }
        Command::Sweep => {
            commands::sweep::run_sweep(&app, format, use_color).await?;
        }
        Command::Watch => {
            commands::sweep::run_watch(&app, format, use_color).await?;
        }
    }

    Ok(())
}

/// Check if stdout is a terminal (for color support)
fn atty_check() -> bool {
    unsafe { libc_isatty(1) != 0 }
}

extern "C" {
    #[link_name = "isatty"]
    fn libc_isatty(fd: i32) -> i32;
}
