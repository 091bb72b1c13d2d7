use chrono::{DateTime, Utc};

use ssat_review_lib::review::{format_delay, Difficulty};

/// ANSI color codes
#[allow(dead_code)]
pub struct Color;

#[allow(dead_code)]
impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const GRAY: &str = "\x1b[90m";
}

pub fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

pub fn difficulty_color(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Hard => Color::RED,
        Difficulty::Medium => Color::YELLOW,
        Difficulty::Easy => Color::GREEN,
        Difficulty::Wait => Color::GRAY,
    }
}

/// "in 4h", "3d ago", "now"
pub fn relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if at > now {
        format!("in {}", format_delay(at - now))
    } else {
        match format_delay(now - at).as_str() {
            "now" => "now".to_string(),
            delay => format!("{} ago", delay),
        }
    }
}

/// Text progress bar, `width` cells for 100%
pub fn progress_bar(percent: f64, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_relative_time() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(relative_time(now + Duration::hours(4), now), "in 4h");
        assert_eq!(relative_time(now - Duration::days(3), now), "3d ago");
        assert_eq!(relative_time(now, now), "now");
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(50.0, 10), "[#####-----]");
        assert_eq!(progress_bar(150.0, 4), "[####]");
    }
}
