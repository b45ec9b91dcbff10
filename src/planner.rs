use crate::error::{check_index, Error, Result};
use crate::models::{
    CompletedTask, Course, Courses, Note, Priority, Record, StudySession, Task, TaskList,
    TemplateField,
};
use crate::stats::{calculate_statistics, Statistics};
use crate::templates;
use crate::utils::timestamp_label;
use chrono::{DateTime, Utc};
use std::collections::{btree_map, BTreeSet};
use std::fmt;
use std::slice;
use tracing::{info, warn};

pub const DEFAULT_SCRATCHPAD: &str = "Welcome to CourseMate! Start typing your quick notes here.";

/// In-memory study data and the only place it is mutated.
///
/// Every mutation marks the record category it touched as dirty; the autosave
/// flush clears the flag once that category is durably written.
///
/// Notes and tasks are addressed by position. Removing an item shifts the ones
/// after it, so callers must re-read the sequence before acting on an index.
#[derive(Debug, Clone)]
pub struct Planner {
    courses: Courses,
    tasks: TaskList,
    scratchpad: String,
    sessions: Vec<StudySession>,
    dirty: BTreeSet<Record>,
}

impl Default for Planner {
    fn default() -> Self {
        Self::new(
            Courses::new(),
            TaskList::default(),
            DEFAULT_SCRATCHPAD.to_string(),
            Vec::new(),
        )
    }
}

impl Planner {
    pub fn new(
        courses: Courses,
        tasks: TaskList,
        scratchpad: String,
        sessions: Vec<StudySession>,
    ) -> Self {
        Self {
            courses,
            tasks,
            scratchpad,
            sessions,
            dirty: BTreeSet::new(),
        }
    }

    pub fn courses(&self) -> &Courses {
        &self.courses
    }

    pub fn course(&self, name: &str) -> Result<&Course> {
        self.courses
            .get(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    fn course_mut(&mut self, name: &str) -> Result<&mut Course> {
        self.courses
            .get_mut(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn tasks(&self) -> &TaskList {
        &self.tasks
    }

    pub fn scratchpad(&self) -> &str {
        &self.scratchpad
    }

    pub fn sessions(&self) -> &[StudySession] {
        &self.sessions
    }

    pub fn is_dirty(&self, record: Record) -> bool {
        self.dirty.contains(&record)
    }

    pub fn dirty_records(&self) -> Vec<Record> {
        self.dirty.iter().copied().collect()
    }

    pub fn mark_dirty(&mut self, record: Record) {
        self.dirty.insert(record);
    }

    pub fn mark_clean(&mut self, record: Record) {
        self.dirty.remove(&record);
    }

    pub fn add_course(
        &mut self,
        name: &str,
        code: Option<&str>,
        instructor: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::EmptyName);
        }
        if self.courses.contains_key(name) {
            return Err(Error::DuplicateName(name.to_string()));
        }

        let optional = |value: Option<&str>| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        self.courses.insert(
            name.to_string(),
            Course::new(optional(code), optional(instructor), now),
        );
        self.mark_dirty(Record::Courses);
        info!(course = name, "course added");
        Ok(())
    }

    /// Remove a course together with every note it owns.
    pub fn delete_course(&mut self, name: &str) -> Result<Course> {
        let course = self
            .courses
            .remove(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        self.mark_dirty(Record::Courses);
        info!(course = name, notes = course.notes.len(), "course deleted");
        Ok(course)
    }

    /// Append a freeform note, returning its index in the course.
    pub fn add_freeform_note(
        &mut self,
        course_name: &str,
        title: Option<&str>,
        body: &str,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let course = self.course_mut(course_name)?;
        let body = body.trim();
        if body.is_empty() {
            return Err(Error::EmptyContent);
        }

        let title = match title.map(str::trim).filter(|t| !t.is_empty()) {
            Some(title) => title.to_string(),
            None => format!("Freeform Note - {}", timestamp_label(now)),
        };
        course.notes.push(Note::Freeform {
            title,
            body: body.to_string(),
            created: now,
        });
        let index = course.notes.len() - 1;
        self.mark_dirty(Record::Courses);
        info!(course = course_name, index, "freeform note added");
        Ok(index)
    }

    /// Append a template note built from `(label, text)` pairs.
    ///
    /// Fields are stored in the template's label order; labels with no value
    /// are stored empty.
    pub fn add_template_note(
        &mut self,
        course_name: &str,
        template_id: &str,
        values: &[(String, String)],
        now: DateTime<Utc>,
    ) -> Result<usize> {
        if !self.courses.contains_key(course_name) {
            return Err(Error::NotFound(course_name.to_string()));
        }
        let labels = templates::fields_for(template_id)?;

        if let Some((label, _)) = values
            .iter()
            .find(|(label, _)| !labels.contains(&label.as_str()))
        {
            return Err(Error::UnknownField {
                template: template_id.to_string(),
                label: label.clone(),
            });
        }

        let fields: Vec<TemplateField> = labels
            .iter()
            .map(|label| TemplateField {
                label: label.to_string(),
                text: values
                    .iter()
                    .rev()
                    .find(|(l, _)| l == label)
                    .map(|(_, text)| text.trim().to_string())
                    .unwrap_or_default(),
            })
            .collect();
        if fields.iter().all(|f| f.text.is_empty()) {
            return Err(Error::EmptyContent);
        }

        let course = self.course_mut(course_name)?;
        course.notes.push(Note::Template {
            title: format!("{template_id} Note - {}", timestamp_label(now)),
            template: template_id.to_string(),
            fields,
            created: now,
        });
        let index = course.notes.len() - 1;
        self.mark_dirty(Record::Courses);
        info!(course = course_name, template = template_id, index, "template note added");
        Ok(index)
    }

    pub fn delete_note(&mut self, course_name: &str, index: usize) -> Result<Note> {
        let course = self.course_mut(course_name)?;
        check_index(index, course.notes.len())?;
        let note = course.notes.remove(index);
        self.mark_dirty(Record::Courses);
        info!(course = course_name, index, "note deleted");
        Ok(note)
    }

    /// Case-insensitive search over note titles, bodies and template fields.
    ///
    /// Hits come out ordered by course, then by note order. The returned
    /// iterator is lazy; call again (or clone it) to restart.
    pub fn search_notes(&self, query: &str) -> Result<SearchHits<'_>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::EmptyQuery);
        }
        Ok(SearchHits {
            query: query.to_lowercase(),
            courses: self.courses.iter(),
            current: None,
        })
    }

    pub fn add_task(
        &mut self,
        description: &str,
        priority: Option<Priority>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let description = description.trim();
        if description.is_empty() {
            return Err(Error::EmptyDescription);
        }
        self.tasks.active.push(Task {
            task: description.to_string(),
            priority: priority.unwrap_or_default(),
            completed: false,
            created_date: now,
        });
        self.mark_dirty(Record::Tasks);
        info!(task = description, "task added");
        Ok(())
    }

    /// Move an active task to the completed list.
    pub fn complete_task(&mut self, index: usize, now: DateTime<Utc>) -> Result<()> {
        check_index(index, self.tasks.active.len())?;
        let task = self.tasks.active.remove(index);
        info!(task = %task.task, "task completed");
        self.tasks.completed.push(CompletedTask {
            task: task.task,
            priority: task.priority,
            completed_date: now,
        });
        self.mark_dirty(Record::Tasks);
        Ok(())
    }

    /// Move a completed task back to the tail of the active list.
    pub fn restore_task(&mut self, index: usize, now: DateTime<Utc>) -> Result<()> {
        check_index(index, self.tasks.completed.len())?;
        let record = self.tasks.completed.remove(index);
        info!(task = %record.task, "task restored");
        self.tasks.active.push(Task {
            task: record.task,
            priority: record.priority,
            completed: false,
            created_date: now,
        });
        self.mark_dirty(Record::Tasks);
        Ok(())
    }

    pub fn delete_completed_task(&mut self, index: usize) -> Result<CompletedTask> {
        check_index(index, self.tasks.completed.len())?;
        let record = self.tasks.completed.remove(index);
        self.mark_dirty(Record::Tasks);
        info!(task = %record.task, "completed task deleted");
        Ok(record)
    }

    /// Drop an active task without completing it.
    pub fn remove_task(&mut self, index: usize) -> Result<Task> {
        check_index(index, self.tasks.active.len())?;
        let task = self.tasks.active.remove(index);
        self.mark_dirty(Record::Tasks);
        info!(task = %task.task, "task removed");
        Ok(task)
    }

    /// Append to the study-session log. A session bound to a course also adds
    /// its duration to that course's study time.
    pub fn record_study_session(&mut self, session: StudySession) {
        if let Some(name) = &session.course {
            match self.courses.get_mut(name) {
                Some(course) => {
                    course.total_study_time += session.duration;
                    self.dirty.insert(Record::Courses);
                }
                None => warn!(course = %name, "study session for unknown course"),
            }
        }
        info!(duration = session.duration, mode = %session.mode, "study session recorded");
        self.sessions.push(session);
        self.mark_dirty(Record::Sessions);
    }

    pub fn set_scratchpad(&mut self, text: impl Into<String>) {
        self.scratchpad = text.into();
        self.mark_dirty(Record::Scratchpad);
    }

    pub fn statistics(&self) -> Statistics {
        calculate_statistics(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind<'a> {
    Title,
    Content,
    Field(&'a str),
}

impl fmt::Display for MatchKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchKind::Title => f.write_str("Title match"),
            MatchKind::Content => f.write_str("Content match"),
            MatchKind::Field(label) => write!(f, "Found in {label}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchHit<'a> {
    pub course: &'a str,
    pub title: &'a str,
    pub matched: MatchKind<'a>,
}

#[derive(Debug, Clone)]
pub struct SearchHits<'a> {
    query: String,
    courses: btree_map::Iter<'a, String, Course>,
    current: Option<(&'a str, slice::Iter<'a, Note>)>,
}

impl<'a> Iterator for SearchHits<'a> {
    type Item = SearchHit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((course, notes)) = &mut self.current {
                for note in notes.by_ref() {
                    if let Some(matched) = match_note(note, &self.query) {
                        return Some(SearchHit {
                            course: *course,
                            title: note.title(),
                            matched,
                        });
                    }
                }
            }
            let (name, course) = self.courses.next()?;
            self.current = Some((name.as_str(), course.notes.iter()));
        }
    }
}

fn match_note<'a>(note: &'a Note, query: &str) -> Option<MatchKind<'a>> {
    let hit = |text: &str| text.to_lowercase().contains(query);

    if hit(note.title()) {
        return Some(MatchKind::Title);
    }
    match note {
        Note::Freeform { body, .. } => hit(body).then_some(MatchKind::Content),
        Note::Template { fields, .. } => fields
            .iter()
            .find(|f| hit(&f.text))
            .map(|f| MatchKind::Field(&f.label)),
    }
}
