//! Append-only JSONL log of activity events.
//!
//! Each learner gets an `activity.jsonl` file in their directory; every
//! recorded event is one line. Lines are never rewritten.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::activity::ActivityEvent;

/// Get the activity log path inside a learner directory
pub fn activity_log_path(learner_dir: &Path) -> PathBuf {
    learner_dir.join("activity.jsonl")
}

/// Append one event to the log file, creating it if needed.
pub fn append_event(path: &Path, event: &ActivityEvent) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    let json = serde_json::to_string(event)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    writeln!(file, "{}", json)?;

    Ok(())
}

/// Read every event in the log, in file order.
///
/// A missing file is an empty log. Lines that fail to parse, or that belong
/// to a different learner, are skipped with a warning.
pub fn read_events(path: &Path, learner_id: Uuid) -> std::io::Result<Vec<ActivityEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);
    let mut events = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<ActivityEvent>(trimmed) {
            Ok(event) if event.learner_id == learner_id => events.push(event),
            Ok(event) => {
                log::warn!(
                    "Skipping event for learner {} in {} line {}",
                    event.learner_id,
                    path.display(),
                    line_no + 1
                );
            }
            Err(e) => {
                log::warn!("Skipping unreadable line {} in {}: {}", line_no + 1, path.display(), e);
            }
        }
    }

    Ok(events)
}
