use crate::error::Error;
use crate::models::Record;
use crate::planner::Planner;
use crate::storage::Storage;
use tracing::{info, warn};

/// Outcome of one flush.
#[derive(Debug, Default)]
pub struct SaveReport {
    pub saved: Vec<Record>,
    pub failed: Vec<Error>,
}

impl SaveReport {
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Write dirty records (every record when `force`) and clear the dirty flag
/// of each one that was written. A record that fails to save stays dirty, so
/// the next periodic flush retries it.
pub fn flush(planner: &mut Planner, storage: &Storage, force: bool) -> SaveReport {
    let records = if force {
        Record::ALL.to_vec()
    } else {
        planner.dirty_records()
    };

    let mut report = SaveReport::default();
    for record in records {
        match storage.save(record, planner) {
            Ok(()) => {
                planner.mark_clean(record);
                report.saved.push(record);
            }
            Err(e) => {
                warn!(%record, error = %e, "save failed");
                report.failed.push(e);
            }
        }
    }
    if !report.saved.is_empty() {
        info!(saved = ?report.saved, forced = force, "flushed");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use chrono::Utc;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_flush_only_dirty() -> Result<()> {
        let dir = tempdir()?;
        let storage = Storage::new(dir.path().to_path_buf());
        let mut planner = Planner::default();
        planner.add_task("Read", None, Utc::now())?;

        let report = flush(&mut planner, &storage, false);
        assert!(report.is_ok());
        assert_eq!(report.saved, vec![Record::Tasks]);
        assert!(planner.dirty_records().is_empty());
        assert!(storage.path(Record::Tasks).exists());
        assert!(!storage.path(Record::Courses).exists());

        // Nothing dirty, nothing written
        let report = flush(&mut planner, &storage, false);
        assert!(report.saved.is_empty());
        Ok(())
    }

    #[test]
    fn test_flush_forced_writes_everything() -> Result<()> {
        let dir = tempdir()?;
        let storage = Storage::new(dir.path().to_path_buf());
        let mut planner = Planner::default();

        let report = flush(&mut planner, &storage, true);
        assert_eq!(report.saved, Record::ALL.to_vec());
        for record in Record::ALL {
            assert!(storage.path(record).exists(), "{record} not written");
        }
        Ok(())
    }

    #[test]
    fn test_failed_record_stays_dirty() -> Result<()> {
        let dir = tempdir()?;
        let storage = Storage::new(dir.path().to_path_buf());
        let mut planner = Planner::default();
        planner.add_course("Bio", None, None, Utc::now())?;
        planner.set_scratchpad("draft");
        fs::create_dir(storage.path(Record::Courses).with_extension("tmp"))?;

        let report = flush(&mut planner, &storage, false);
        assert_eq!(report.saved, vec![Record::Scratchpad]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(planner.dirty_records(), vec![Record::Courses]);
        assert_eq!(planner.course("Bio")?.notes.len(), 0);
        Ok(())
    }
}
