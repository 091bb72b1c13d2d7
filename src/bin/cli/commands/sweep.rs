use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use ssat_review_lib::notify::{start_sweep_scheduler, DeliveryStatus, SweepReport};

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

fn print_report(report: &SweepReport, format: &OutputFormat, use_color: bool) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Plain => {
            println!(
                "{} due item(s) across {} learner(s)",
                report.due_items, report.learners
            );
            for result in &report.results {
                let status = match result.status {
                    DeliveryStatus::Delivered => paint("delivered", Color::GREEN, use_color),
                    DeliveryStatus::Skipped => paint("skipped", Color::GRAY, use_color),
                    DeliveryStatus::Failed => paint("failed", Color::RED, use_color),
                    DeliveryStatus::TimedOut => paint("timed out", Color::RED, use_color),
                };
                let reason = result.reason.as_deref().map(|r| format!(" ({})", r)).unwrap_or_default();
                println!("  {} {:>4} due  {}{}", result.learner_id, result.due_count, status, reason);
            }
            println!(
                "delivered={} skipped={} failed={} timed_out={}",
                report.delivered, report.skipped, report.failed, report.timed_out
            );
        }
    }
    Ok(())
}

/// One sweep, then exit
pub async fn run_sweep(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let report = app.sweep().run(app.now()).await.context("Sweep failed")?;
    print_report(&report, format, use_color)
}

/// Sweep periodically until Ctrl-C
pub async fn run_watch(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let interval = Duration::from_secs(app.config.sweep.interval_secs);
    let scheduler = start_sweep_scheduler(Arc::new(app.sweep()), app.clock(), interval);
    let mut reports = scheduler.reports();

    eprintln!("Sweeping every {}s. Press Ctrl-C to stop.", interval.as_secs());

    loop {
        tokio::select! {
            changed = reports.changed() => {
                if changed.is_err() {
                    break;
                }
                let report = reports.borrow_and_update().clone();
                if let Some(report) = report {
                    print_report(&report, format, use_color)?;
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    scheduler.shutdown().await;
    Ok(())
}
