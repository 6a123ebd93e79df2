//! CSV persistence for the computed reports.
//!
//! A single report is written with [`save_report`]. A full run goes through
//! [`ReportBatch`]: every report is first written into a staging directory
//! inside the output directory, and the files are moved over their targets
//! only once all of them were written and every target was checked.

use crate::error::{ReportError, Result};
use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const COMMISSIONS_FILE: &str = "sales_owner_commissions.csv";
pub const CRATE_DISTRIBUTION_FILE: &str = "crate_distribution.csv";
pub const CRATE_TYPE_SHARE_FILE: &str = "crate_type_share.csv";
pub const SALES_PERFORMANCE_FILE: &str = "sales_performance.csv";
pub const TOP_PERFORMERS_FILE: &str = "top_5_performers.csv";
pub const COMPANY_SALESOWNERS_FILE: &str = "final_company_salesowners.csv";
pub const CONTACT_FULL_NAME_FILE: &str = "contact_fullname.csv";
pub const CONTACT_ADDRESS_FILE: &str = "contact_address.csv";

/// What happened to one report file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Written { path: PathBuf, rows: usize },
    /// The report had no rows. No file was written and a file left at `path`
    /// by an earlier run was removed.
    Skipped { path: PathBuf },
}

impl SaveOutcome {
    pub fn path(&self) -> &Path {
        match self {
            SaveOutcome::Written { path, .. } | SaveOutcome::Skipped { path } => path,
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self, SaveOutcome::Written { .. })
    }
}

/// Writes `rows` as CSV with a header row, replacing any existing file and
/// creating parent directories as needed. An empty report removes the file.
pub fn save_report<T: Serialize>(rows: &[T], path: impl AsRef<Path>) -> Result<SaveOutcome> {
    let path = path.as_ref();
    ensure_replaceable(path)?;

    if rows.is_empty() {
        warn!("No rows for {}; skipping write", path.display());
        remove_stale_report(path)?;
        return Ok(SaveOutcome::Skipped {
            path: path.to_path_buf(),
        });
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path).map_err(|e| {
        error!("Could not open {} for writing: {}", path.display(), e);
        e
    })?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!("Saved {} rows to {}", rows.len(), path.display());
    Ok(SaveOutcome::Written {
        path: path.to_path_buf(),
        rows: rows.len(),
    })
}

/// Reads a report written by [`save_report`] back into typed rows.
pub fn read_report<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ReportError::FileNotFound(path.display().to_string()));
    }

    let mut reader = csv::Reader::from_path(path)?;
    reader
        .deserialize()
        .map(|row| {
            row.map_err(|e| ReportError::MalformedCsv {
                path: path.display().to_string(),
                details: e.to_string(),
            })
        })
        .collect()
}

/// The reports of one run, staged until [`ReportBatch::commit`].
pub struct ReportBatch {
    output_dir: PathBuf,
    staging: TempDir,
    staged: Vec<(&'static str, SaveOutcome)>,
}

impl ReportBatch {
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)?;

        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&output_dir)?;
        debug!("Staging reports in {}", staging.path().display());

        Ok(Self {
            output_dir,
            staging,
            staged: Vec::new(),
        })
    }

    /// Writes one report into the staging directory under `file_name`.
    pub fn stage<T: Serialize>(&mut self, rows: &[T], file_name: &'static str) -> Result<()> {
        let outcome = save_report(rows, self.staging.path().join(file_name))?;
        self.staged.push((file_name, outcome));
        Ok(())
    }

    /// Moves every staged report over its target in the output directory and
    /// removes the targets of empty reports. Nothing in the output directory
    /// changes unless every target is a regular file or absent. Dropping the
    /// batch without committing discards the staged files.
    pub fn commit(self) -> Result<Vec<SaveOutcome>> {
        for (file_name, _) in &self.staged {
            ensure_replaceable(&self.output_dir.join(file_name))?;
        }

        let mut outcomes = Vec::with_capacity(self.staged.len());
        for (file_name, staged) in self.staged {
            let target = self.output_dir.join(file_name);
            match staged {
                SaveOutcome::Written { path, rows } => {
                    fs::rename(&path, &target)?;
                    outcomes.push(SaveOutcome::Written { path: target, rows });
                }
                SaveOutcome::Skipped { .. } => {
                    remove_stale_report(&target)?;
                    outcomes.push(SaveOutcome::Skipped { path: target });
                }
            }
        }

        info!(
            "Committed {} reports to {}",
            outcomes.len(),
            self.output_dir.display()
        );
        Ok(outcomes)
    }
}

fn ensure_replaceable(path: &Path) -> Result<()> {
    match fs::metadata(path) {
        Ok(meta) if !meta.is_file() => {
            error!("Report target {} is not a regular file", path.display());
            Err(ReportError::OutputNotAFile(path.display().to_string()))
        }
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn remove_stale_report(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            info!("Removed stale report {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CommissionEntry, TopPerformerEntry};

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(COMMISSIONS_FILE);
        let rows = vec![
            CommissionEntry {
                sales_owner: "Owner1".to_string(),
                total_commission: 138.0,
            },
            CommissionEntry {
                sales_owner: "Owner, With Comma".to_string(),
                total_commission: 45.5,
            },
        ];

        let outcome = save_report(&rows, &path).unwrap();
        assert_eq!(
            outcome,
            SaveOutcome::Written {
                path: path.clone(),
                rows: 2
            }
        );

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("sales_owner,total_commission\n"));

        let back: Vec<CommissionEntry> = read_report(&path).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn test_existing_file_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TOP_PERFORMERS_FILE);
        fs::write(&path, "stale,content\n1,2\n3,4\n5,6\n").unwrap();

        let rows = vec![TopPerformerEntry {
            salesowners: "A".to_string(),
            year_month: "2022-01".to_string(),
            gross_per_salesowner: 10.0,
            gross_rolling_3m: 10.0,
            rank: 1,
        }];
        save_report(&rows, &path).unwrap();

        let back: Vec<TopPerformerEntry> = read_report(&path).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn test_empty_report_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(COMMISSIONS_FILE);

        let outcome = save_report::<CommissionEntry>(&[], &path).unwrap();
        assert!(!outcome.is_written());
        assert_eq!(outcome.path(), path.as_path());
        assert!(!path.exists());
    }

    #[test]
    fn test_empty_report_removes_earlier_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TOP_PERFORMERS_FILE);
        fs::write(&path, "salesowners,year_month\nA,2022-01\n").unwrap();

        let outcome = save_report::<TopPerformerEntry>(&[], &path).unwrap();
        assert_eq!(outcome, SaveOutcome::Skipped { path: path.clone() });
        assert!(!path.exists());
    }

    #[test]
    fn test_save_into_directory_target_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(COMMISSIONS_FILE);
        fs::create_dir(&path).unwrap();

        let err = save_report::<CommissionEntry>(&[], &path).unwrap_err();
        assert!(matches!(err, ReportError::OutputNotAFile(_)));
        assert!(path.is_dir());
    }

    fn commission(owner: &str, total: f64) -> CommissionEntry {
        CommissionEntry {
            sales_owner: owner.to_string(),
            total_commission: total,
        }
    }

    #[test]
    fn test_batch_commit_moves_files_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        fs::write(out.join(TOP_PERFORMERS_FILE), "stale\n").unwrap();

        let mut batch = ReportBatch::new(&out).unwrap();
        batch.stage(&[commission("A", 1.0)], COMMISSIONS_FILE).unwrap();
        batch.stage::<TopPerformerEntry>(&[], TOP_PERFORMERS_FILE).unwrap();
        let outcomes = batch.commit().unwrap();

        assert_eq!(
            outcomes,
            vec![
                SaveOutcome::Written {
                    path: out.join(COMMISSIONS_FILE),
                    rows: 1
                },
                SaveOutcome::Skipped {
                    path: out.join(TOP_PERFORMERS_FILE)
                },
            ]
        );
        let names: Vec<String> = fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec![COMMISSIONS_FILE]);
        let back: Vec<CommissionEntry> = read_report(out.join(COMMISSIONS_FILE)).unwrap();
        assert_eq!(back, vec![commission("A", 1.0)]);
    }

    #[test]
    fn test_batch_commit_leaves_directory_unchanged_on_bad_target() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path();
        fs::write(out.join(COMMISSIONS_FILE), "sales_owner,total_commission\nOld,9.0\n").unwrap();
        fs::write(out.join(TOP_PERFORMERS_FILE), "stale\n").unwrap();
        fs::create_dir(out.join(CRATE_DISTRIBUTION_FILE)).unwrap();

        let mut batch = ReportBatch::new(out).unwrap();
        batch.stage(&[commission("New", 1.0)], COMMISSIONS_FILE).unwrap();
        batch.stage::<TopPerformerEntry>(&[], TOP_PERFORMERS_FILE).unwrap();
        batch.stage(&[commission("New", 1.0)], CRATE_DISTRIBUTION_FILE).unwrap();
        let err = batch.commit().unwrap_err();

        assert!(matches!(err, ReportError::OutputNotAFile(_)));
        assert_eq!(
            fs::read_to_string(out.join(COMMISSIONS_FILE)).unwrap(),
            "sales_owner,total_commission\nOld,9.0\n"
        );
        assert_eq!(fs::read_to_string(out.join(TOP_PERFORMERS_FILE)).unwrap(), "stale\n");
        assert!(out.join(CRATE_DISTRIBUTION_FILE).is_dir());
        assert_eq!(fs::read_dir(out).unwrap().count(), 3);
    }

    #[test]
    fn test_read_missing_report() {
        let err = read_report::<CommissionEntry>("/nonexistent/report.csv").unwrap_err();
        assert!(matches!(err, ReportError::FileNotFound(_)));
    }
}
