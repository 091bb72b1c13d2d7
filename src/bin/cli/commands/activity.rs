use anyhow::{Context, Result};
use uuid::Uuid;

use ssat_review_lib::activity::{ActivityEvent, ActivityKind, GoalMetric, StreakState};

use crate::app::App;
use crate::render::terminal::{paint, progress_bar, Color};
use crate::OutputFormat;

pub async fn run_log(
    app: &App,
    learner: Uuid,
    kind: ActivityKind,
    quantity: u32,
    format: &OutputFormat,
) -> Result<()> {
    let now = app.now();
    let event = ActivityEvent::new(learner, now, kind, quantity);
    app.tracker
        .record(&event, now)
        .await
        .context("Activity was not recorded")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&event)?),
        OutputFormat::Plain => println!("Logged {:?} x{}", kind, quantity),
    }

    Ok(())
}

fn metric_line(label: &str, metric: &GoalMetric) -> String {
    format!(
        "  {:<20} {} {:>3}/{:<3} {:.0}%",
        label,
        progress_bar(metric.percent, 20),
        metric.done,
        metric.goal,
        metric.percent
    )
}

/// Streak badge and today's goal ring
pub async fn run_streak(app: &App, learner: Uuid, format: &OutputFormat, use_color: bool) -> Result<()> {
    let snapshot = app
        .tracker
        .snapshot(learner, app.now())
        .await
        .context("Couldn't load activity")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        OutputFormat::Plain => {
            let streak = &snapshot.streak;
            match streak.state {
                StreakState::ActiveStreak(days) => {
                    let badge = format!("{}-day streak", days);
                    println!("{}", paint(&badge, Color::BOLD, use_color));
                }
                StreakState::NoStreak => println!("No active streak"),
            }
            if streak.needs_activity {
                println!("{}", paint("Study today to keep your streak going.", Color::YELLOW, use_color));
            }
            println!("Longest streak: {} day(s)", streak.longest_streak);

            let progress = &snapshot.progress;
            println!("\nToday ({}):", progress.date);
            println!("{}", metric_line("Words reviewed", &progress.words_reviewed));
            println!("{}", metric_line("Minutes studied", &progress.minutes_studied));
            println!("{}", metric_line("Questions answered", &progress.questions_answered));

            let overall = format!("  Overall {}%", progress.overall_percent);
            if progress.is_complete {
                println!("{}", paint(&format!("{} - daily goal complete", overall), Color::GREEN, use_color));
            } else {
                println!("{}", overall);
            }
        }
    }

    Ok(())
}

pub async fn run_calendar(app: &App, learner: Uuid, days: u32, format: &OutputFormat, use_color: bool) -> Result<()> {
    let calendar = app
        .tracker
        .calendar(learner, app.now(), days)
        .await
        .context("Couldn't load activity")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&calendar)?),
        OutputFormat::Plain => {
            for day in &calendar {
                let mark = if day.qualifies() {
                    paint("#", Color::GREEN, use_color)
                } else {
                    paint(".", Color::GRAY, use_color)
                };
                println!(
                    "{} {}  {:>3} events  {:>3} words  {:>3} min  {:>3} questions  {:>2} lessons",
                    day.date.format("%a %Y-%m-%d"),
                    mark,
                    day.event_count,
                    day.words_reviewed,
                    day.minutes_studied,
                    day.questions_answered,
                    day.lessons_completed
                );
            }
        }
    }

    Ok(())
}
