//! Derivations over the activity log
//!
//! Streak badge, daily goal ring and calendar view are all computed here from
//! the same event list, so they cannot disagree. Days are calendar days in
//! the given time zone. Events stamped after `now` are ignored.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use super::models::*;
use crate::config::GoalConfig;

fn local_day<Tz: TimeZone>(at: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    at.with_timezone(tz).date_naive()
}

/// Days with at least one event, up to and including `now`'s day
pub fn qualifying_days<Tz: TimeZone>(events: &[ActivityEvent], now: DateTime<Utc>, tz: &Tz) -> BTreeSet<NaiveDate> {
    events
        .iter()
        .filter(|e| e.timestamp <= now)
        .map(|e| local_day(&e.timestamp, tz))
        .collect()
}

/// Consecutive qualifying days ending today, or ending yesterday when today
/// has nothing yet.
fn current_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut check_date = today;
    if !days.contains(&check_date) {
        check_date = check_date - Duration::days(1);
        if !days.contains(&check_date) {
            return 0;
        }
    }

    let mut streak = 0;
    while days.contains(&check_date) {
        streak += 1;
        check_date = check_date - Duration::days(1);
    }
    streak
}

fn longest_streak(days: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;

    for &day in days {
        run = match previous {
            Some(prev) if day - prev == Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(day);
    }
    longest
}

pub fn derive_streak<Tz: TimeZone>(events: &[ActivityEvent], now: DateTime<Utc>, tz: &Tz) -> StreakStatus {
    let days = qualifying_days(events, now, tz);
    let Some(&last_active_day) = days.iter().next_back() else {
        return StreakStatus::empty();
    };

    let today = local_day(&now, tz);
    let current = current_streak(&days, today);
    let is_active = days.contains(&today);

    StreakStatus {
        state: if current > 0 {
            StreakState::ActiveStreak(current)
        } else {
            StreakState::NoStreak
        },
        current_streak: current,
        longest_streak: longest_streak(&days).max(current),
        is_active,
        needs_activity: current > 0 && !is_active,
        last_active_day: Some(last_active_day),
    }
}

fn goal_metric(done: u32, goal: u32) -> GoalMetric {
    // Nothing to do counts as done
    let percent = if goal == 0 {
        100.0
    } else {
        (done as f64 / goal as f64 * 100.0).clamp(0.0, 100.0)
    };
    GoalMetric { done, goal, percent }
}

pub fn daily_progress<Tz: TimeZone>(
    events: &[ActivityEvent],
    goals: &GoalConfig,
    now: DateTime<Utc>,
    tz: &Tz,
) -> DailyProgress {
    let today = local_day(&now, tz);
    let day = activity_calendar(events, today, today, now, tz)
        .pop()
        .unwrap_or_else(|| CalendarDay::empty(today));

    let words = goal_metric(day.words_reviewed, goals.words_reviewed);
    let minutes = goal_metric(day.minutes_studied, goals.minutes_studied);
    let questions = goal_metric(day.questions_answered, goals.questions_answered);

    let overall = ((words.percent + minutes.percent + questions.percent) / 3.0).round() as u32;

    DailyProgress {
        date: today,
        words_reviewed: words,
        minutes_studied: minutes,
        questions_answered: questions,
        overall_percent: overall,
        is_complete: overall == 100,
    }
}

/// Per-day totals for every day in `from..=to`, empty days included
pub fn activity_calendar<Tz: TimeZone>(
    events: &[ActivityEvent],
    from: NaiveDate,
    to: NaiveDate,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Vec<CalendarDay> {
    let mut days: BTreeMap<NaiveDate, CalendarDay> = from
        .iter_days()
        .take_while(|d| *d <= to)
        .map(|d| (d, CalendarDay::empty(d)))
        .collect();

    for event in events.iter().filter(|e| e.timestamp <= now) {
        let Some(day) = days.get_mut(&local_day(&event.timestamp, tz)) else {
            continue;
        };

        day.event_count += 1;
        let counter = match event.kind {
            ActivityKind::WordReviewed => &mut day.words_reviewed,
            ActivityKind::MinuteStudied => &mut day.minutes_studied,
            ActivityKind::QuestionAnswered => &mut day.questions_answered,
            ActivityKind::LessonCompleted => &mut day.lessons_completed,
        };
        *counter = counter.saturating_add(event.quantity);
    }

    days.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use uuid::Uuid;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn reviewed(learner: Uuid, when: DateTime<Utc>) -> ActivityEvent {
        ActivityEvent::once(learner, when, ActivityKind::WordReviewed)
    }

    #[test]
    fn test_no_events() {
        let status = derive_streak(&[], at(1, 12), &Utc);
        assert_eq!(status, StreakStatus::empty());

        let progress = daily_progress(&[], &GoalConfig::default(), at(1, 12), &Utc);
        assert_eq!(progress.overall_percent, 0);
        assert!(!progress.is_complete);
    }

    #[test]
    fn test_streak_grace_until_midnight() {
        let learner = Uuid::new_v4();
        let events = vec![reviewed(learner, at(10, 9)), reviewed(learner, at(11, 20)), reviewed(learner, at(12, 7))];

        // Day D+3, nothing yet today
        let status = derive_streak(&events, at(13, 10), &Utc);
        assert_eq!(status.current_streak, 3);
        assert_eq!(status.state, StreakState::ActiveStreak(3));
        assert!(status.needs_activity);
        assert!(!status.is_active);

        // Day D+4, still nothing
        let status = derive_streak(&events, at(14, 10), &Utc);
        assert_eq!(status.current_streak, 0);
        assert_eq!(status.state, StreakState::NoStreak);
        assert!(!status.needs_activity);
        assert_eq!(status.longest_streak, 3);
        assert_eq!(status.last_active_day, Some(at(12, 0).date_naive()));
    }

    #[test]
    fn test_active_today() {
        let learner = Uuid::new_v4();
        let events = vec![reviewed(learner, at(12, 7)), reviewed(learner, at(13, 8))];

        let status = derive_streak(&events, at(13, 10), &Utc);
        assert_eq!(status.current_streak, 2);
        assert!(status.is_active);
        assert!(!status.needs_activity);
    }

    #[test]
    fn test_longest_streak_survives_reset() {
        let learner = Uuid::new_v4();
        let events: Vec<ActivityEvent> = [1, 2, 3, 4, 8, 9]
            .into_iter()
            .map(|d| reviewed(learner, at(d, 12)))
            .collect();

        let status = derive_streak(&events, at(9, 18), &Utc);
        assert_eq!(status.current_streak, 2);
        assert_eq!(status.longest_streak, 4);
    }

    #[test]
    fn test_future_events_ignored() {
        let learner = Uuid::new_v4();
        let events = vec![reviewed(learner, at(10, 9)), reviewed(learner, at(11, 9))];

        let status = derive_streak(&events, at(10, 12), &Utc);
        assert_eq!(status.current_streak, 1);
        assert_eq!(status.last_active_day, Some(at(10, 0).date_naive()));
    }

    #[test]
    fn test_local_day_boundary() {
        let learner = Uuid::new_v4();
        // 23:00 UTC on the 10th is already the 11th at UTC+2
        let events = vec![reviewed(learner, at(10, 1)), reviewed(learner, at(10, 23))];

        assert_eq!(derive_streak(&events, at(10, 23), &Utc).longest_streak, 1);

        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let status = derive_streak(&events, at(10, 23), &tz);
        assert_eq!(status.current_streak, 2);
        assert!(status.is_active);
    }

    #[test]
    fn test_daily_progress_clamps_and_rounds() {
        let learner = Uuid::new_v4();
        let goals = GoalConfig {
            words_reviewed: 20,
            minutes_studied: 30,
            questions_answered: 10,
        };
        let events = vec![
            ActivityEvent::new(learner, at(5, 8), ActivityKind::WordReviewed, 25),
            ActivityEvent::new(learner, at(5, 9), ActivityKind::MinuteStudied, 10),
            ActivityEvent::new(learner, at(5, 9), ActivityKind::QuestionAnswered, 5),
            // Yesterday does not count
            ActivityEvent::new(learner, at(4, 9), ActivityKind::QuestionAnswered, 5),
        ];

        let progress = daily_progress(&events, &goals, at(5, 12), &Utc);
        assert_eq!(progress.words_reviewed.done, 25);
        assert_eq!(progress.words_reviewed.percent, 100.0);
        assert_eq!(progress.questions_answered.percent, 50.0);
        // (100 + 33.33 + 50) / 3 = 61.1
        assert_eq!(progress.overall_percent, 61);
        assert!(!progress.is_complete);
    }

    #[test]
    fn test_zero_goal_counts_as_met() {
        let learner = Uuid::new_v4();
        let goals = GoalConfig {
            words_reviewed: 1,
            minutes_studied: 0,
            questions_answered: 0,
        };
        let events = vec![reviewed(learner, at(5, 8))];

        let progress = daily_progress(&events, &goals, at(5, 12), &Utc);
        assert_eq!(progress.overall_percent, 100);
        assert!(progress.is_complete);
    }

    #[test]
    fn test_activity_calendar() {
        let learner = Uuid::new_v4();
        let events = vec![
            reviewed(learner, at(2, 8)),
            ActivityEvent::new(learner, at(2, 9), ActivityKind::MinuteStudied, 15),
            ActivityEvent::once(learner, at(4, 9), ActivityKind::LessonCompleted),
            reviewed(learner, at(9, 9)),
        ];

        let calendar = activity_calendar(&events, at(1, 0).date_naive(), at(4, 0).date_naive(), at(5, 0), &Utc);
        assert_eq!(calendar.len(), 4);
        assert!(!calendar[0].qualifies());
        assert_eq!(calendar[1].event_count, 2);
        assert_eq!(calendar[1].minutes_studied, 15);
        assert_eq!(calendar[3].lessons_completed, 1);
    }
}
