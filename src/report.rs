use crate::models::{Course, Note};
use crate::stats::{week_minutes, Statistics};
use crate::planner::Planner;
use crate::utils::{format_duration, timestamp_label};
use chrono::{DateTime, Local, Utc};
use std::fmt::Write;

pub fn statistics_report(planner: &Planner) -> String {
    let stats = planner.statistics();
    let mut out = String::new();

    let _ = writeln!(out, "CourseMate Statistics");
    let _ = writeln!(out, "=====================");
    write_summary(&mut out, &stats);

    let _ = writeln!(out, "\nThis Week");
    let _ = writeln!(out, "---------");
    let today = Local::now().date_naive();
    for (date, minutes) in week_minutes(planner.sessions(), today) {
        let marker = if date == today { " (Today)" } else { "" };
        let _ = writeln!(
            out,
            "  {} {}{}: {}",
            date.format("%a"),
            date,
            marker,
            format_duration(minutes * 60)
        );
    }

    let _ = writeln!(out, "\nRecent Study Sessions");
    let _ = writeln!(out, "---------------------");
    if stats.recent_sessions.is_empty() {
        let _ = writeln!(out, "  No study sessions recorded yet.");
    }
    for session in &stats.recent_sessions {
        let _ = write!(
            out,
            "  - {} - {} min ({})",
            session.date.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            session.duration / 60,
            session.mode
        );
        if let Some(course) = &session.course {
            let _ = write!(out, " [{course}]");
        }
        out.push('\n');
    }

    out
}

fn write_summary(out: &mut String, stats: &Statistics) {
    let rows = [
        ("Total Courses", stats.course_count.to_string()),
        ("Total Notes Created", stats.note_count.to_string()),
        ("Total Tasks", stats.task_count.to_string()),
        ("Completed Tasks", stats.completed_task_count.to_string()),
        ("Total Study Time", format!("{} minutes", stats.study_minutes)),
        ("Pomodoro Sessions", stats.pomodoro_sessions.to_string()),
    ];
    for (label, value) in rows {
        let _ = writeln!(out, "{:<22}{}", format!("{label}:"), value);
    }
}

/// Plain-text export of one course's notes.
pub fn course_notes(name: &str, course: &Course, now: DateTime<Utc>) -> String {
    let rule = "=".repeat(60);
    let mut out = String::new();

    let _ = writeln!(out, "CourseMate Notes Export");
    let _ = writeln!(out, "Course: {name}");
    if let Some(code) = &course.code {
        let _ = writeln!(out, "Code: {code}");
    }
    if let Some(instructor) = &course.instructor {
        let _ = writeln!(out, "Instructor: {instructor}");
    }
    let _ = writeln!(out, "Exported: {}", timestamp_label(now));
    let _ = writeln!(out, "{rule}\n");

    for (i, note) in course.notes.iter().enumerate() {
        let _ = writeln!(out, "Note {}: {}", i + 1, note.title());
        let _ = writeln!(out, "{}", "-".repeat(60));
        match note {
            Note::Freeform { body, .. } => {
                let _ = writeln!(out, "\n{body}");
            }
            Note::Template { fields, .. } => {
                for field in fields {
                    let _ = writeln!(out, "\n{}:\n{}", field.label, field.text);
                }
            }
        }
        let _ = writeln!(out, "\n{rule}\n");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StudySession;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_course_notes_export() {
        let mut planner = Planner::default();
        planner
            .add_course("Math", Some("MATH200"), None, now())
            .unwrap();
        planner
            .add_freeform_note("Math", Some("Limits"), "epsilon-delta", now())
            .unwrap();
        planner
            .add_template_note(
                "Math",
                "TwoColumn",
                &[("Problem/Question".to_string(), "2x = 4".to_string())],
                now(),
            )
            .unwrap();

        let text = course_notes("Math", planner.course("Math").unwrap(), now());
        assert!(text.contains("Course: Math"));
        assert!(text.contains("Code: MATH200"));
        assert!(text.contains("Note 1: Limits"));
        assert!(text.contains("epsilon-delta"));
        assert!(text.contains("Problem/Question:\n2x = 4"));
        assert!(text.contains("Solution/Answer:\n"));
    }

    #[test]
    fn test_statistics_report() {
        let mut planner = Planner::default();
        planner.add_course("Bio", None, None, now()).unwrap();
        planner.record_study_session(StudySession {
            date: now(),
            duration: 1500,
            mode: "Pomodoro".to_string(),
            course: Some("Bio".to_string()),
        });

        let text = statistics_report(&planner);
        assert!(text.contains("Total Courses:        1"));
        assert!(text.contains("Total Study Time:     25 minutes"));
        assert!(text.contains("25 min (Pomodoro) [Bio]"));
    }

    #[test]
    fn test_statistics_report_empty() {
        let text = statistics_report(&Planner::default());
        assert!(text.contains("No study sessions recorded yet."));
    }
}
