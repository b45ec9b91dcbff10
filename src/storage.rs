use crate::error::{Error, Result};
use crate::models::{Courses, Record, StudySession, TaskList};
use crate::planner::{Planner, DEFAULT_SCRATCHPAD};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One file per record category inside a data directory.
#[derive(Debug, Clone)]
pub struct Storage {
    dir: PathBuf,
    /// Records whose unreadable file is still in place. Saving them would
    /// destroy data nobody has looked at.
    held: BTreeSet<Record>,
}

/// Everything in one document, for backups.
#[derive(Serialize)]
struct Bundle<'a> {
    exported_at: DateTime<Utc>,
    courses: &'a Courses,
    tasks: &'a TaskList,
    scratchpad: &'a str,
    study_sessions: &'a [StudySession],
}

impl Storage {
    pub fn get_base_dir() -> anyhow::Result<PathBuf> {
        let mut path =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
        path.push(".coursemate");
        if !path.exists() {
            fs::create_dir_all(&path)?;
        }
        Ok(path)
    }

    pub fn new(dir: PathBuf) -> Self {
        if !dir.exists() {
            let _ = fs::create_dir_all(&dir);
        }
        Self {
            dir,
            held: BTreeSet::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, record: Record) -> PathBuf {
        self.dir.join(record.file_name())
    }

    fn read(&self, record: Record) -> Result<Option<String>> {
        match fs::read_to_string(self.path(record)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::CorruptData {
                record,
                reason: e.to_string(),
            }),
        }
    }

    // Write-then-rename: a failed save leaves the previous file intact.
    fn write(&self, record: Record, data: &str) -> Result<()> {
        let path = self.path(record);
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, data)
            .and_then(|()| fs::rename(&tmp_path, &path))
            .map_err(|source| {
                let _ = fs::remove_file(&tmp_path);
                Error::WriteFailed { record, source }
            })?;
        debug!(%record, path = %path.display(), "record saved");
        Ok(())
    }

    fn load_json<T: DeserializeOwned + Default>(&self, record: Record) -> Result<T> {
        match self.read(record)? {
            None => Ok(T::default()),
            Some(data) => serde_json::from_str(&data).map_err(|e| Error::CorruptData {
                record,
                reason: e.to_string(),
            }),
        }
    }

    fn save_json<T: Serialize + ?Sized>(&self, record: Record, value: &T) -> Result<()> {
        let data = serde_json::to_string_pretty(value).map_err(|e| Error::WriteFailed {
            record,
            source: e.into(),
        })?;
        self.write(record, &data)
    }

    pub fn load_courses(&self) -> Result<Courses> {
        self.load_json(Record::Courses)
    }

    pub fn load_tasks(&self) -> Result<TaskList> {
        self.load_json(Record::Tasks)
    }

    pub fn load_sessions(&self) -> Result<Vec<StudySession>> {
        self.load_json(Record::Sessions)
    }

    pub fn load_scratchpad(&self) -> Result<String> {
        Ok(self
            .read(Record::Scratchpad)?
            .unwrap_or_else(|| DEFAULT_SCRATCHPAD.to_string()))
    }

    pub fn is_held(&self, record: Record) -> bool {
        self.held.contains(&record)
    }

    /// Allow held records to be written again. Called when the user saves
    /// explicitly.
    pub fn release_all(&mut self) {
        if !self.held.is_empty() {
            warn!(records = ?self.held, "overwriting unread data on request");
        }
        self.held.clear();
    }

    /// Write the current value of one record category.
    pub fn save(&self, record: Record, planner: &Planner) -> Result<()> {
        if self.is_held(record) {
            return Err(Error::WriteFailed {
                record,
                source: io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!(
                        "{} holds unread data that could not be moved aside; save manually to replace it",
                        self.path(record).display()
                    ),
                ),
            });
        }
        match record {
            Record::Courses => self.save_json(record, planner.courses()),
            Record::Tasks => self.save_json(record, planner.tasks()),
            Record::Scratchpad => self.write(record, planner.scratchpad()),
            Record::Sessions => self.save_json(record, planner.sessions()),
        }
    }

    /// Move an unreadable file aside so later saves cannot overwrite it.
    pub fn quarantine(&self, record: Record, now: DateTime<Utc>) -> io::Result<PathBuf> {
        let path = self.path(record);
        let aside = self.dir.join(format!(
            "{}.corrupt-{}",
            record.file_name(),
            now.format("%Y%m%d%H%M%S")
        ));
        fs::rename(&path, &aside)?;
        warn!(%record, path = %aside.display(), "corrupt data moved aside");
        Ok(aside)
    }

    /// Load every record. A record that cannot be read falls back to its
    /// empty default after being quarantined; the problems are returned so the
    /// caller can show them.
    ///
    /// A file that cannot be moved aside stays where it is and its record is
    /// held: automatic saves refuse to overwrite it.
    pub fn load_planner(&mut self, now: DateTime<Utc>) -> (Planner, Vec<Error>) {
        let mut problems = Vec::new();
        let mut held = BTreeSet::new();
        let mut recover = |record: Record, err: Error| {
            warn!(%record, error = %err, "falling back to empty data");
            if let Err(e) = self.quarantine(record, now) {
                warn!(%record, error = %e, "could not move corrupt data aside");
                held.insert(record);
            }
            problems.push(err);
        };

        let courses = self.load_courses().unwrap_or_else(|e| {
            recover(Record::Courses, e);
            Courses::default()
        });
        let tasks = self.load_tasks().unwrap_or_else(|e| {
            recover(Record::Tasks, e);
            TaskList::default()
        });
        let scratchpad = self.load_scratchpad().unwrap_or_else(|e| {
            recover(Record::Scratchpad, e);
            DEFAULT_SCRATCHPAD.to_string()
        });
        let sessions = self.load_sessions().unwrap_or_else(|e| {
            recover(Record::Sessions, e);
            Vec::new()
        });

        self.held.extend(held);
        (Planner::new(courses, tasks, scratchpad, sessions), problems)
    }

    /// Write all four records into a single JSON document at `path`.
    pub fn export(&self, planner: &Planner, path: &Path, now: DateTime<Utc>) -> io::Result<()> {
        let bundle = Bundle {
            exported_at: now,
            courses: planner.courses(),
            tasks: planner.tasks(),
            scratchpad: planner.scratchpad(),
            study_sessions: planner.sessions(),
        };
        let data = serde_json::to_string_pretty(&bundle)?;
        fs::write(path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Note;
    use anyhow::Result;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 10, 8, 15, 30).unwrap()
    }

    fn sample_planner() -> Planner {
        let mut planner = Planner::default();
        planner
            .add_course("Bio", Some("BIO101"), None, now())
            .unwrap();
        planner
            .add_freeform_note("Bio", Some("Cells"), "mitochondria", now())
            .unwrap();
        planner
            .add_template_note(
                "Bio",
                "Cornell",
                &[
                    ("Summary (Bottom)".to_string(), "energy".to_string()),
                    ("Notes (Right Column)".to_string(), "ATP".to_string()),
                ],
                now() + chrono::Duration::nanoseconds(123_456_789),
            )
            .unwrap();
        planner.add_task("Lab report", None, now()).unwrap();
        planner.add_task("Quiz prep", None, now()).unwrap();
        planner.complete_task(0, now()).unwrap();
        planner.set_scratchpad("remember the quiz");
        planner.record_study_session(StudySession {
            date: now(),
            duration: 1500,
            mode: "Pomodoro".to_string(),
            course: Some("Bio".to_string()),
        });
        planner
    }

    #[test]
    fn test_storage_save_load() -> Result<()> {
        let dir = tempdir()?;
        let mut storage = Storage::new(dir.path().to_path_buf());
        let planner = sample_planner();

        for record in Record::ALL {
            storage.save(record, &planner)?;
        }

        let (loaded, problems) = storage.load_planner(now());
        assert!(problems.is_empty());
        assert_eq!(loaded.courses(), planner.courses());
        assert_eq!(loaded.tasks(), planner.tasks());
        assert_eq!(loaded.scratchpad(), "remember the quiz");
        assert_eq!(loaded.sessions(), planner.sessions());

        let notes = &loaded.course("Bio")?.notes;
        assert!(matches!(&notes[0], Note::Freeform { title, .. } if title == "Cells"));
        assert_eq!(
            notes[1].created(),
            now() + chrono::Duration::nanoseconds(123_456_789)
        );
        assert!(loaded.dirty_records().is_empty());

        Ok(())
    }

    #[test]
    fn test_storage_load_nonexistent() -> Result<()> {
        let dir = tempdir()?;
        let storage = Storage::new(dir.path().join("fresh"));

        assert!(storage.load_courses()?.is_empty());
        assert_eq!(storage.load_tasks()?, TaskList::default());
        assert!(storage.load_sessions()?.is_empty());
        assert_eq!(storage.load_scratchpad()?, DEFAULT_SCRATCHPAD);

        Ok(())
    }

    #[test]
    fn test_corrupt_record_is_quarantined() -> Result<()> {
        let dir = tempdir()?;
        let mut storage = Storage::new(dir.path().to_path_buf());
        fs::write(storage.path(Record::Courses), "{ not json")?;

        assert!(matches!(
            storage.load_courses(),
            Err(Error::CorruptData {
                record: Record::Courses,
                ..
            })
        ));

        let (planner, problems) = storage.load_planner(now());
        assert_eq!(problems.len(), 1);
        assert!(planner.courses().is_empty());

        let aside = dir.path().join("courses.json.corrupt-20240210081530");
        assert_eq!(fs::read_to_string(aside)?, "{ not json");
        assert!(!storage.path(Record::Courses).exists());
        assert!(!storage.is_held(Record::Courses));

        Ok(())
    }

    #[test]
    fn test_unmovable_corrupt_record_is_not_overwritten() -> Result<()> {
        let dir = tempdir()?;
        let mut storage = Storage::new(dir.path().to_path_buf());
        let path = storage.path(Record::Courses);
        fs::write(&path, "{ not json")?;

        // A non-empty directory on the quarantine path makes the rename fail
        let aside = dir.path().join("courses.json.corrupt-20240210081530");
        fs::create_dir(&aside)?;
        fs::write(aside.join("keep"), "")?;

        let (mut planner, problems) = storage.load_planner(now());
        assert_eq!(problems.len(), 1);
        assert!(storage.is_held(Record::Courses));
        assert!(!storage.is_held(Record::Tasks));

        planner.add_course("Chem", None, None, now())?;
        let report = crate::autosave::flush(&mut planner, &storage, false);
        assert!(matches!(
            report.failed.as_slice(),
            [Error::WriteFailed {
                record: Record::Courses,
                ..
            }]
        ));
        assert!(planner.is_dirty(Record::Courses));
        assert_eq!(fs::read_to_string(&path)?, "{ not json");

        storage.release_all();
        storage.save(Record::Courses, &planner)?;
        assert!(storage.load_courses()?.contains_key("Chem"));

        Ok(())
    }

    #[test]
    fn test_failed_write_keeps_previous_file() -> Result<()> {
        let dir = tempdir()?;
        let storage = Storage::new(dir.path().to_path_buf());
        let planner = sample_planner();
        storage.save(Record::Tasks, &planner)?;
        let before = fs::read_to_string(storage.path(Record::Tasks))?;

        // A directory squatting on the temp path makes the write fail
        fs::create_dir(storage.path(Record::Tasks).with_extension("tmp"))?;
        let mut changed = planner.clone();
        changed.add_task("extra", None, now())?;

        assert!(matches!(
            storage.save(Record::Tasks, &changed),
            Err(Error::WriteFailed {
                record: Record::Tasks,
                ..
            })
        ));
        assert_eq!(fs::read_to_string(storage.path(Record::Tasks))?, before);
        assert_eq!(changed.tasks().active.len(), 2);

        Ok(())
    }

    #[test]
    fn test_export_bundle() -> Result<()> {
        let dir = tempdir()?;
        let storage = Storage::new(dir.path().to_path_buf());
        let planner = sample_planner();
        let out = dir.path().join("backup.json");

        storage.export(&planner, &out, now())?;

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(out)?)?;
        assert!(value["courses"]["Bio"]["notes"].is_array());
        assert_eq!(value["tasks"]["completed_tasks"][0]["task"], "Lab report");
        assert_eq!(value["scratchpad"], "remember the quiz");
        assert_eq!(value["study_sessions"][0]["duration"], 1500);
        Ok(())
    }
}
