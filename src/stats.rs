use crate::models::StudySession;
use crate::planner::Planner;
use crate::pomodoro::SESSION_MODE;
use chrono::{Datelike, Duration, Local, NaiveDate};
use std::collections::BTreeMap;

const RECENT_SESSIONS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub course_count: usize,
    pub note_count: usize,
    /// Active plus completed.
    pub task_count: usize,
    pub completed_task_count: usize,
    pub study_minutes: u64,
    pub pomodoro_sessions: usize,
    /// Newest first.
    pub recent_sessions: Vec<StudySession>,
}

pub fn calculate_statistics(planner: &Planner) -> Statistics {
    let courses = planner.courses();
    let tasks = planner.tasks();
    let sessions = planner.sessions();

    let total_seconds: u64 = sessions.iter().map(|s| s.duration).sum();

    Statistics {
        course_count: courses.len(),
        note_count: courses.values().map(|c| c.notes.len()).sum(),
        task_count: tasks.active.len() + tasks.completed.len(),
        completed_task_count: tasks.completed.len(),
        study_minutes: total_seconds / 60,
        pomodoro_sessions: sessions.iter().filter(|s| s.mode == SESSION_MODE).count(),
        recent_sessions: sessions.iter().rev().take(RECENT_SESSIONS).cloned().collect(),
    }
}

/// Study minutes per local calendar day.
pub fn daily_minutes(sessions: &[StudySession]) -> BTreeMap<NaiveDate, u64> {
    let mut seconds: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for session in sessions {
        let date = session.date.with_timezone(&Local).date_naive();
        *seconds.entry(date).or_default() += session.duration;
    }
    seconds.into_iter().map(|(d, s)| (d, s / 60)).collect()
}

/// Monday of the week containing `day`.
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(day.weekday().num_days_from_monday() as i64)
}

/// Minutes for each day of the week containing `today`, Monday first.
pub fn week_minutes(sessions: &[StudySession], today: NaiveDate) -> Vec<(NaiveDate, u64)> {
    let daily = daily_minutes(sessions);
    let start = week_start(today);
    (0..7)
        .map(|i| {
            let date = start + Duration::days(i);
            (date, daily.get(&date).copied().unwrap_or(0))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;
    use chrono::{TimeZone, Utc};

    fn session(minutes: u64, mode: &str) -> StudySession {
        StudySession {
            date: Utc.with_ymd_and_hms(2024, 1, 3, 12, 0, 0).unwrap(),
            duration: minutes * 60,
            mode: mode.to_string(),
            course: None,
        }
    }

    #[test]
    fn test_statistics_empty() {
        let stats = Planner::default().statistics();
        assert_eq!(stats.course_count, 0);
        assert_eq!(stats.note_count, 0);
        assert_eq!(stats.task_count, 0);
        assert_eq!(stats.study_minutes, 0);
        assert!(stats.recent_sessions.is_empty());
    }

    #[test]
    fn test_statistics_counts() {
        let now = Utc.with_ymd_and_hms(2024, 1, 3, 12, 0, 0).unwrap();
        let mut planner = Planner::default();
        planner.add_course("Bio", None, None, now).unwrap();
        planner.add_course("Chem", None, None, now).unwrap();
        planner.add_freeform_note("Bio", None, "a", now).unwrap();
        planner.add_freeform_note("Chem", None, "b", now).unwrap();
        planner.add_freeform_note("Chem", None, "c", now).unwrap();
        planner.add_task("one", None, now).unwrap();
        planner.add_task("two", None, now).unwrap();
        planner.complete_task(1, now).unwrap();
        planner.record_study_session(session(25, SESSION_MODE));
        planner.record_study_session(session(25, SESSION_MODE));
        planner.record_study_session(StudySession {
            duration: 30,
            ..session(0, "Manual")
        });

        let stats = planner.statistics();
        assert_eq!(stats.course_count, 2);
        assert_eq!(stats.note_count, 3);
        assert_eq!(stats.task_count, 2);
        assert_eq!(stats.completed_task_count, 1);
        // (1500 + 1500 + 30) / 60
        assert_eq!(stats.study_minutes, 50);
        assert_eq!(stats.pomodoro_sessions, 2);
        assert_eq!(stats.recent_sessions[0].mode, "Manual");

        // Pure view: no new dirty state and identical on repeat
        let dirty = planner.dirty_records();
        assert_eq!(planner.statistics(), stats);
        assert_eq!(planner.dirty_records(), dirty);
        assert!(dirty.contains(&Record::Sessions));
    }

    #[test]
    fn test_recent_sessions_capped() {
        let mut planner = Planner::default();
        for i in 0..15 {
            planner.record_study_session(session(i, SESSION_MODE));
        }
        let stats = planner.statistics();
        assert_eq!(stats.recent_sessions.len(), 10);
        assert_eq!(stats.recent_sessions[0].duration, 14 * 60);
    }

    #[test]
    fn test_week_minutes() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(); // Wednesday
        assert_eq!(week_start(today), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

        let sessions = vec![session(25, SESSION_MODE), session(25, SESSION_MODE)];
        let week = week_minutes(&sessions, today);
        assert_eq!(week.len(), 7);
        let total: u64 = week.iter().map(|(_, m)| m).sum();
        assert_eq!(total, 50);
    }
}
