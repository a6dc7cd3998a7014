//! The write plan: idempotent, atomic materialization of emitted artifacts.
//!
//! Each planned file is compared byte-for-byte against what is already on
//! disk and skipped when unchanged. Writes go to a temporary file in the
//! target directory and are renamed into place, so a crash or cancellation
//! never leaves a partial file. The manifest is always written last, and
//! only when every table write succeeded.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use tracing::{debug, info};

use trestle_core::error::EngineError;

use crate::projection::TableDefinition;

/// Relative output path for a table artifact.
///
/// `per_table_files` selects the module tree layout; `false` writes a flat
/// directory. Paths always use forward slashes (they also appear in the
/// manifest).
pub fn table_relative_path(table: &TableDefinition, per_table_files: bool) -> String {
    let file = format!("{}.{}.sql", table.schema, table.physical_name);
    if per_table_files {
        format!("Modules/{}/Tables/{}", table.module_sanitized, file)
    } else {
        file
    }
}

/// Relative path of the manifest.
pub const MANIFEST_FILE: &str = "manifest.json";

/// One file the plan intends to materialize.
#[derive(Debug, Clone)]
pub struct PlannedFile {
    pub relative_path: String,
    pub bytes: Vec<u8>,
}

/// Outcome of executing a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub written: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

/// An executable write plan rooted at the output directory.
#[derive(Debug)]
pub struct WritePlan {
    root: PathBuf,
    files: Vec<PlannedFile>,
    manifest: Option<PlannedFile>,
    parallelism: usize,
}

impl WritePlan {
    pub fn new(root: impl Into<PathBuf>, parallelism: usize) -> Self {
        Self {
            root: root.into(),
            files: Vec::new(),
            manifest: None,
            parallelism: parallelism.max(1),
        }
    }

    /// Adds a table (or seed) artifact.
    pub fn add_file(&mut self, relative_path: impl Into<String>, bytes: Vec<u8>) {
        self.files.push(PlannedFile {
            relative_path: relative_path.into(),
            bytes,
        });
    }

    /// Sets the manifest payload, written last.
    pub fn set_manifest(&mut self, bytes: Vec<u8>) {
        self.manifest = Some(PlannedFile {
            relative_path: MANIFEST_FILE.to_owned(),
            bytes,
        });
    }

    /// Planned files, manifest excluded.
    pub fn files(&self) -> &[PlannedFile] {
        &self.files
    }

    /// Executes the plan.
    ///
    /// `cancel` is checked before each per-file write; a mid-file write
    /// always completes. On cancellation the report flags it and the
    /// manifest is not written.
    pub fn execute(&self, cancel: &AtomicBool) -> Result<WriteReport, Vec<EngineError>> {
        let written = AtomicUsize::new(0);
        let skipped = AtomicUsize::new(0);
        let next = AtomicUsize::new(0);
        let errors: Mutex<Vec<EngineError>> = Mutex::new(Vec::new());

        let workers = self.parallelism.min(self.files.len().max(1));
        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let i = next.fetch_add(1, Ordering::SeqCst);
                    if i >= self.files.len() || cancel.load(Ordering::SeqCst) {
                        return;
                    }
                    let file = &self.files[i];
                    match write_if_changed(&self.root, file) {
                        Ok(true) => {
                            written.fetch_add(1, Ordering::SeqCst);
                        }
                        Ok(false) => {
                            skipped.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(e) => {
                            errors.lock().expect("writer mutex poisoned").push(e);
                        }
                    }
                });
            }
        });

        let errors = errors.into_inner().expect("writer mutex poisoned");
        if !errors.is_empty() {
            return Err(errors);
        }

        let mut report = WriteReport {
            written: written.load(Ordering::SeqCst),
            skipped: skipped.load(Ordering::SeqCst),
            cancelled: cancel.load(Ordering::SeqCst),
        };
        if report.cancelled {
            info!(written = report.written, "write plan cancelled before completion");
            return Ok(report);
        }

        if let Some(manifest) = &self.manifest {
            match write_if_changed(&self.root, manifest) {
                Ok(true) => report.written += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => return Err(vec![e]),
            }
        }

        info!(
            written = report.written,
            skipped = report.skipped,
            "write plan complete"
        );
        Ok(report)
    }
}

/// Writes one file atomically, returning `Ok(false)` when the existing
/// bytes already match.
fn write_if_changed(root: &Path, file: &PlannedFile) -> Result<bool, EngineError> {
    let target = root.join(&file.relative_path);

    if let Ok(existing) = fs::read(&target) {
        if existing == file.bytes {
            debug!(path = %file.relative_path, "unchanged, skipped");
            return Ok(false);
        }
    }

    let parent = target
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());
    fs::create_dir_all(&parent)
        .map_err(|e| EngineError::io_write_failed(parent.display().to_string(), &e))?;

    let mut temp = tempfile::NamedTempFile::new_in(&parent)
        .map_err(|e| EngineError::io_write_failed(target.display().to_string(), &e))?;
    std::io::Write::write_all(&mut temp, &file.bytes)
        .map_err(|e| EngineError::io_write_failed(target.display().to_string(), &e))?;
    temp.persist(&target)
        .map_err(|e| EngineError::io_write_failed(target.display().to_string(), &e.error))?;

    debug!(path = %file.relative_path, bytes = file.bytes.len(), "written");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn plan_with(root: &Path, files: &[(&str, &str)]) -> WritePlan {
        let mut plan = WritePlan::new(root, 4);
        for (path, content) in files {
            plan.add_file(*path, content.as_bytes().to_vec());
        }
        plan.set_manifest(b"{}\n".to_vec());
        plan
    }

    #[test]
    fn writes_then_skips_on_rerun() {
        let dir = tempfile::tempdir().unwrap();
        let plan = plan_with(
            dir.path(),
            &[
                ("Modules/Sales/Tables/dbo.A.sql", "CREATE TABLE a;\n"),
                ("Modules/Sales/Tables/dbo.B.sql", "CREATE TABLE b;\n"),
            ],
        );

        let cancel = AtomicBool::new(false);
        let first = plan.execute(&cancel).unwrap();
        assert_eq!(first.written, 3, "two tables plus the manifest");
        assert_eq!(first.skipped, 0);

        let second = plan.execute(&cancel).unwrap();
        assert_eq!(second.written, 0, "second run is a no-op");
        assert_eq!(second.skipped, 3);

        let content = fs::read_to_string(dir.path().join("Modules/Sales/Tables/dbo.A.sql")).unwrap();
        assert_eq!(content, "CREATE TABLE a;\n");
        assert!(dir.path().join("manifest.json").exists());
    }

    #[test]
    fn cancellation_skips_remaining_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let plan = plan_with(dir.path(), &[("dbo.A.sql", "a\n")]);
        let cancel = AtomicBool::new(true);
        let report = plan.execute(&cancel).unwrap();
        assert!(report.cancelled);
        assert_eq!(report.written, 0);
        assert!(!dir.path().join("manifest.json").exists());
    }

    #[test]
    fn changed_bytes_are_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("dbo.A.sql"), "old\n").unwrap();
        let plan = plan_with(dir.path(), &[("dbo.A.sql", "new\n")]);
        let report = plan.execute(&AtomicBool::new(false)).unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(
            fs::read_to_string(dir.path().join("dbo.A.sql")).unwrap(),
            "new\n"
        );
    }

    #[test]
    fn relative_paths_follow_layout() {
        let table = TableDefinition {
            module: "Customer Portal".into(),
            original_module: "Customer Portal".into(),
            module_sanitized: "Customer_Portal".into(),
            schema: "dbo".into(),
            catalog: None,
            physical_name: "CUSTOMER".into(),
            original_physical_name: "CUSTOMER".into(),
            logical_name: "Customer".into(),
            description: None,
            columns: vec![],
            primary_key: None,
            indexes: vec![],
            foreign_keys: vec![],
            triggers: vec![],
        };
        assert_eq!(
            table_relative_path(&table, true),
            "Modules/Customer_Portal/Tables/dbo.CUSTOMER.sql"
        );
        assert_eq!(table_relative_path(&table, false), "dbo.CUSTOMER.sql");
    }
}
