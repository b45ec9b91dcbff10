use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Courses keyed by their unique name.
pub type Courses = BTreeMap<String, Course>;

// Offset-less layouts found in older files, read as local time.
const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"];

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Some(at.with_timezone(&Utc));
    }
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())?;
    let at = match Local.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        // Skipped by a DST jump
        None => naive.and_utc(),
    };
    Some(at)
}

/// Deserialize a timestamp written either as RFC 3339 or without an offset.
///
/// # Errors
///
/// Returns an error if the string matches none of the accepted layouts.
pub fn timestamp_from_str<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_timestamp(&s)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{s}'")))
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(from = "CourseRecord")]
pub struct Course {
    pub code: Option<String>,
    pub instructor: Option<String>,
    pub notes: Vec<Note>,
    /// Per-course tasks written by older versions. Carried through untouched;
    /// the task list proper is global (see [`TaskList`]).
    pub tasks: Vec<Task>,
    pub created_date: DateTime<Utc>,
    /// Seconds of completed Pomodoro work attributed to this course.
    pub total_study_time: u64,
}

impl Course {
    pub fn new(code: Option<String>, instructor: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            code,
            instructor,
            notes: Vec::new(),
            tasks: Vec::new(),
            created_date: now,
            total_study_time: 0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TemplateField {
    pub label: String,
    pub text: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Note {
    Freeform {
        title: String,
        body: String,
        created: DateTime<Utc>,
    },
    Template {
        title: String,
        template: String,
        fields: Vec<TemplateField>,
        created: DateTime<Utc>,
    },
}

impl Note {
    pub fn title(&self) -> &str {
        match self {
            Note::Freeform { title, .. } | Note::Template { title, .. } => title,
        }
    }

    pub fn created(&self) -> DateTime<Utc> {
        match self {
            Note::Freeform { created, .. } | Note::Template { created, .. } => *created,
        }
    }
}

// On-disk course shape. Older files store notes positionally, so notes are
// decoded leniently and legacy ones inherit the course's creation time.
#[derive(Deserialize)]
struct CourseRecord {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    instructor: Option<String>,
    #[serde(default)]
    notes: Vec<NoteRecord>,
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default = "Utc::now", deserialize_with = "timestamp_from_str")]
    created_date: DateTime<Utc>,
    #[serde(default)]
    total_study_time: u64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NoteRecord {
    Tagged(Note),
    Legacy(String, LegacyBody),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LegacyBody {
    Text(String),
    Fields(serde_json::Map<String, serde_json::Value>),
}

impl From<CourseRecord> for Course {
    fn from(record: CourseRecord) -> Self {
        let created_date = record.created_date;
        let notes = record
            .notes
            .into_iter()
            .map(|note| match note {
                NoteRecord::Tagged(note) => note,
                NoteRecord::Legacy(title, LegacyBody::Text(body)) => Note::Freeform {
                    title,
                    body,
                    created: created_date,
                },
                NoteRecord::Legacy(title, LegacyBody::Fields(map)) => {
                    let template = title
                        .split_once(" Note - ")
                        .map(|(prefix, _)| prefix.to_string())
                        .unwrap_or_else(|| "Template".to_string());
                    let fields = map
                        .into_iter()
                        .map(|(label, value)| TemplateField {
                            label,
                            text: match value {
                                serde_json::Value::String(s) => s,
                                other => other.to_string(),
                            },
                        })
                        .collect();
                    Note::Template {
                        title,
                        template,
                        fields,
                        created: created_date,
                    }
                }
            })
            .collect();

        Self {
            code: record.code.filter(|c| !c.trim().is_empty()),
            instructor: record.instructor.filter(|i| !i.trim().is_empty()),
            notes,
            tasks: record.tasks,
            created_date,
            total_study_time: record.total_study_time,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        };
        f.write_str(label)
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" | "h" => Ok(Priority::High),
            "medium" | "m" => Ok(Priority::Medium),
            "low" | "l" => Ok(Priority::Low),
            other => Err(format!("unknown priority '{other}' (expected high, medium or low)")),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(from = "TaskRecord")]
pub struct Task {
    pub task: String,
    pub priority: Priority,
    pub completed: bool,
    pub created_date: DateTime<Utc>,
}

// Some older files store a task as its bare description.
#[derive(Deserialize)]
#[serde(untagged)]
enum TaskRecord {
    Full {
        task: String,
        #[serde(default)]
        priority: Priority,
        #[serde(default)]
        completed: bool,
        #[serde(default = "Utc::now", deserialize_with = "timestamp_from_str")]
        created_date: DateTime<Utc>,
    },
    Text(String),
}

impl From<TaskRecord> for Task {
    fn from(record: TaskRecord) -> Self {
        match record {
            TaskRecord::Full {
                task,
                priority,
                completed,
                created_date,
            } => Self {
                task,
                priority,
                completed,
                created_date,
            },
            TaskRecord::Text(task) => Self {
                task,
                priority: Priority::default(),
                completed: false,
                created_date: Utc::now(),
            },
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CompletedTask {
    pub task: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(deserialize_with = "timestamp_from_str")]
    pub completed_date: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(from = "TaskListRecord")]
pub struct TaskList {
    #[serde(rename = "tasks")]
    pub active: Vec<Task>,
    #[serde(rename = "completed_tasks")]
    pub completed: Vec<CompletedTask>,
}

// Older files hold a flat list of tasks with a `completed` flag.
#[derive(Deserialize)]
#[serde(untagged)]
enum TaskListRecord {
    Split {
        #[serde(default)]
        tasks: Vec<Task>,
        #[serde(default)]
        completed_tasks: Vec<CompletedTask>,
    },
    Flat(Vec<Task>),
}

impl From<TaskListRecord> for TaskList {
    fn from(record: TaskListRecord) -> Self {
        match record {
            TaskListRecord::Split {
                tasks,
                completed_tasks,
            } => Self {
                active: tasks,
                completed: completed_tasks,
            },
            TaskListRecord::Flat(tasks) => {
                let (done, active): (Vec<_>, Vec<_>) =
                    tasks.into_iter().partition(|t| t.completed);
                let completed = done
                    .into_iter()
                    .map(|t| CompletedTask {
                        task: t.task,
                        priority: t.priority,
                        completed_date: t.created_date,
                    })
                    .collect();
                Self { active, completed }
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StudySession {
    #[serde(deserialize_with = "timestamp_from_str")]
    pub date: DateTime<Utc>,
    /// Seconds.
    pub duration: u64,
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
}

/// One independently persisted category of data.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Record {
    Courses,
    Tasks,
    Scratchpad,
    Sessions,
}

impl Record {
    pub const ALL: [Record; 4] = [
        Record::Courses,
        Record::Tasks,
        Record::Scratchpad,
        Record::Sessions,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Record::Courses => "courses.json",
            Record::Tasks => "todo_list.json",
            Record::Scratchpad => "scratchpad.txt",
            Record::Sessions => "study_sessions.json",
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Record::Courses => "courses",
            Record::Tasks => "tasks",
            Record::Scratchpad => "scratchpad",
            Record::Sessions => "study sessions",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32, micro: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_micro_opt(h, min, s, micro)
            .unwrap()
    }

    #[test]
    fn test_legacy_course_notes() {
        let json = r#"{
            "code": "",
            "instructor": "Dr. Lee",
            "notes": [
                ["Cells", "mitochondria are the powerhouse"],
                ["Cornell Note - 2024-01-01 10:00:00", {"Keywords/Cues (Left Column)": "atp", "Summary (Bottom)": ""}]
            ],
            "tasks": [],
            "created_date": "2024-01-01T09:00:00Z",
            "total_study_time": 0
        }"#;

        let course: Course = serde_json::from_str(json).unwrap();
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();

        assert_eq!(course.code, None);
        assert_eq!(course.instructor.as_deref(), Some("Dr. Lee"));
        assert_eq!(course.notes.len(), 2);
        assert_eq!(
            course.notes[0],
            Note::Freeform {
                title: "Cells".to_string(),
                body: "mitochondria are the powerhouse".to_string(),
                created,
            }
        );
        match &course.notes[1] {
            Note::Template {
                template, fields, ..
            } => {
                assert_eq!(template, "Cornell");
                assert_eq!(fields[0].label, "Keywords/Cues (Left Column)");
                assert_eq!(fields[0].text, "atp");
                assert_eq!(fields[1].label, "Summary (Bottom)");
            }
            other => panic!("expected template note, got {other:?}"),
        }
    }

    #[test]
    fn test_flat_task_list() {
        let json = r#"[
            {"task": "Read ch. 1", "priority": "High", "completed": false, "created_date": "2024-01-01T09:00:00Z"},
            {"task": "Lab report", "priority": "Low", "completed": true, "created_date": "2024-01-02T09:00:00Z"}
        ]"#;

        let list: TaskList = serde_json::from_str(json).unwrap();
        assert_eq!(list.active.len(), 1);
        assert_eq!(list.active[0].priority, Priority::High);
        assert_eq!(list.completed.len(), 1);
        assert_eq!(list.completed[0].task, "Lab report");
        assert_eq!(list.completed[0].priority, Priority::Low);
    }

    #[test]
    fn test_offsetless_timestamps_read_as_local() {
        let json = r#"{
            "code": "BIO101",
            "instructor": "",
            "notes": [],
            "tasks": [],
            "created_date": "2024-01-01T09:00:00.123456",
            "total_study_time": 1500
        }"#;
        let course: Course = serde_json::from_str(json).unwrap();
        assert_eq!(
            course.created_date.with_timezone(&Local).naive_local(),
            local(2024, 1, 1, 9, 0, 0, 123_456)
        );

        let sessions: Vec<StudySession> = serde_json::from_str(
            r#"[{"date": "2024-01-01T10:00:00", "duration": 1500, "mode": "Pomodoro"}]"#,
        )
        .unwrap();
        assert_eq!(
            sessions[0].date.with_timezone(&Local).naive_local(),
            local(2024, 1, 1, 10, 0, 0, 0)
        );
        assert_eq!(sessions[0].course, None);
    }

    #[test]
    fn test_rfc3339_timestamps_still_accepted() {
        let session: StudySession = serde_json::from_str(
            r#"{"date": "2024-01-01T10:00:00+02:00", "duration": 60, "mode": "Pomodoro"}"#,
        )
        .unwrap();
        assert_eq!(session.date, Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap());

        assert!(serde_json::from_str::<StudySession>(
            r#"{"date": "yesterday", "duration": 60, "mode": "Pomodoro"}"#
        )
        .is_err());
    }

    #[test]
    fn test_legacy_completed_tasks() {
        let json = r#"{
            "tasks": ["Do homework", "Study"],
            "completed_tasks": [
                {"task": "Read ch. 2", "completed_date": "2024-03-05 14:30:00"}
            ]
        }"#;

        let list: TaskList = serde_json::from_str(json).unwrap();
        assert_eq!(list.active.len(), 2);
        assert_eq!(list.active[0].task, "Do homework");
        assert_eq!(list.active[1].priority, Priority::Medium);
        assert!(!list.active[1].completed);

        let done = &list.completed[0];
        assert_eq!(done.task, "Read ch. 2");
        assert_eq!(done.priority, Priority::Medium);
        assert_eq!(
            done.completed_date.with_timezone(&Local).naive_local(),
            local(2024, 3, 5, 14, 30, 0, 0)
        );
    }

    #[test]
    fn test_course_tasks_as_strings() {
        let json = r#"{"Math": {"notes": [], "tasks": ["Problem set 3", "Review limits"]}}"#;

        let courses: Courses = serde_json::from_str(json).unwrap();
        let math = &courses["Math"];
        assert_eq!(math.tasks.len(), 2);
        assert_eq!(math.tasks[0].task, "Problem set 3");
        assert_eq!(math.tasks[1].priority, Priority::Medium);

        // Carried through in the structured form
        let saved = serde_json::to_value(&courses).unwrap();
        assert_eq!(saved["Math"]["tasks"][1]["task"], "Review limits");
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!("HIGH".parse::<Priority>(), Ok(Priority::High));
        assert_eq!("m".parse::<Priority>(), Ok(Priority::Medium));
        assert!("urgent".parse::<Priority>().is_err());
        assert_eq!(Priority::default(), Priority::Medium);
    }
}
