use std::collections::BTreeSet;

use anyhow::{Context, Result};
use uuid::Uuid;

use ssat_review_lib::review::{format_delay, Difficulty};
use ssat_review_lib::storage::{ItemKey, ScheduleEntry};

use crate::app::App;
use crate::render::terminal::{difficulty_color, paint, relative_time, Color};
use crate::OutputFormat;

fn entry_line(app: &App, entry: &ScheduleEntry, use_color: bool) -> String {
    let now = app.now();
    format!(
        "{:<8} {:<32} {:>3}x  due {}",
        paint(entry.difficulty.label(), difficulty_color(entry.difficulty), use_color),
        entry.item.to_string(),
        entry.review_count,
        relative_time(entry.next_review_at, now)
    )
}

pub async fn run_review(
    app: &App,
    learner: Uuid,
    item: &ItemKey,
    difficulty: Difficulty,
    recalled: Option<bool>,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let now = app.now();
    let entry = app
        .scheduler
        .record_review(learner, item, difficulty, now, recalled)
        .await
        .context("Review was not saved")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entry)?),
        OutputFormat::Plain => {
            let local = entry.next_review_at.with_timezone(&app.offset);
            println!(
                "Rated {} as {}. Next review {} (in {}), review #{}.",
                entry.item,
                paint(difficulty.label(), difficulty_color(difficulty), use_color),
                local.format("%Y-%m-%d %H:%M"),
                format_delay(entry.next_review_at - now),
                entry.review_count
            );
        }
    }

    Ok(())
}

pub async fn run_due(app: &App, learner: Uuid, format: &OutputFormat, use_color: bool) -> Result<()> {
    let due = app
        .scheduler
        .get_due_items(learner, app.now())
        .await
        .context("Couldn't load reviews")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&due)?),
        OutputFormat::Plain => {
            if due.is_empty() {
                println!("Nothing due. All caught up.");
                return Ok(());
            }
            for entry in &due {
                println!("{}", entry_line(app, entry, use_color));
            }
            println!("\n{} item(s) due", due.len());
        }
    }

    Ok(())
}

/// Distinct requested keys that had an entry before the sync
fn already_scheduled(items: &[ItemKey], created: &[ScheduleEntry]) -> usize {
    let unique: BTreeSet<&ItemKey> = items.iter().collect();
    unique.len().saturating_sub(created.len())
}

pub async fn run_sync(app: &App, learner: Uuid, items: &[ItemKey], format: &OutputFormat) -> Result<()> {
    let created = app
        .scheduler
        .sync_missing_schedules(learner, items, app.now())
        .await
        .context("Failed to sync schedules")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&created)?),
        OutputFormat::Plain => {
            for entry in &created {
                println!("+ {}", entry.item);
            }
            println!("{} new, {} already scheduled", created.len(), already_scheduled(items, &created));
        }
    }

    Ok(())
}

pub async fn run_uncomplete(app: &App, learner: Uuid, item: &ItemKey, format: &OutputFormat) -> Result<()> {
    let existed = app
        .scheduler
        .uncomplete(learner, item, app.now())
        .await
        .context("Failed to reset item")?;

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "item": item.to_string(),
                "hadState": existed,
            }))?
        ),
        OutputFormat::Plain => {
            if existed {
                println!("Reset {}; it is due again now.", item);
            } else {
                println!("{} has no schedule; nothing to reset.", item);
            }
        }
    }

    Ok(())
}

pub async fn run_stats(app: &App, learner: Uuid, format: &OutputFormat, use_color: bool) -> Result<()> {
    let stats = app
        .scheduler
        .review_stats(learner, app.now())
        .await
        .context("Couldn't load review statistics")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Plain => {
            println!("{}", paint("Review statistics", Color::BOLD, use_color));
            println!("  Items tracked:   {}", stats.total_items);
            println!("  Due now:         {}", stats.due_items);
            println!(
                "  By difficulty:   {} hard, {} medium, {} easy, {} waiting",
                stats.hard_items, stats.medium_items, stats.easy_items, stats.waiting_items
            );
            println!("  Never reviewed:  {}", stats.never_reviewed);
            println!("  Reviewed today:  {}", stats.reviewed_today);
            println!("  Total reviews:   {}", stats.total_reviews);
            match stats.recall_rate {
                Some(rate) => println!("  Recall rate:     {:.0}%", rate * 100.0),
                None => println!("  Recall rate:     -"),
            }
        }
    }

    Ok(())
}

pub async fn run_forecast(app: &App, learner: Uuid, days: u32, format: &OutputFormat) -> Result<()> {
    let forecast = app
        .scheduler
        .forecast(learner, app.now(), days)
        .await
        .context("Couldn't load reviews")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&forecast)?),
        OutputFormat::Plain => {
            for day in &forecast {
                println!("{}  {:>4}  {}", day.date.format("%a %Y-%m-%d"), day.due_count, "*".repeat(day.due_count.min(50)));
            }
        }
    }

    Ok(())
}

/// Next due time for each rating, shown before the learner picks one
pub fn run_preview(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let now = app.now();
    let preview = app.scheduler.policy().preview(now);

    match format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = preview
                .iter()
                .map(|(difficulty, at)| {
                    serde_json::json!({
                        "difficulty": difficulty.as_i64(),
                        "label": difficulty.label(),
                        "nextReviewAt": at,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            for (difficulty, at) in &preview {
                println!(
                    "{} {:<8} {}",
                    difficulty.as_i64(),
                    paint(difficulty.label(), difficulty_color(*difficulty), use_color),
                    format_delay(*at - now)
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_already_scheduled_ignores_duplicates() {
        let learner = Uuid::new_v4();
        let items: Vec<ItemKey> = ["word:Lucid", "word:lucid", "word:terse", "word:terse", "word:aloof"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        let created = vec![ScheduleEntry::unreviewed(learner, ItemKey::word("aloof"), Utc::now())];

        assert_eq!(already_scheduled(&items, &created), 2);
        assert_eq!(already_scheduled(&items[..1], &[]), 1);
    }
}
