//! Removal of build outputs

use crate::config::Configuration;
use crate::error::BuildError;
use crate::fs::FileSystem;
use crate::scanner;
use crate::Result;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What a clean removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Database that was deleted, if one existed
    pub database: Option<PathBuf>,
    /// Object files that were deleted
    pub objects: Vec<PathBuf>,
}

/// Delete the database and the object of every compilation unit.
///
/// Missing files are skipped. The next build compiles everything.
///
/// # Errors
///
/// Scanning failures and any removal error other than a missing file.
pub fn clean_outputs<F: FileSystem + ?Sized>(fs: &F, config: &Configuration) -> Result<CleanReport> {
    let mut report = CleanReport::default();

    let database = config.resolve(&config.database_path());
    if remove(&database)? {
        report.database = Some(database);
    }

    let mut sources = scanner::scan_sources(fs, config)?;
    sources.sort_unstable();
    for source in sources {
        let object = config.resolve(&config.object_path(&source));
        if !report.objects.contains(&object) && remove(&object)? {
            debug!("Removed {}", object.display());
            report.objects.push(object);
        }
    }

    info!(
        "Removed {} object files{}",
        report.objects.len(),
        if report.database.is_some() { " and the build database" } else { "" }
    );
    Ok(report)
}

fn remove(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(BuildError::Io(path.to_path_buf(), e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OBJECT_EXTENSION;
    use crate::fs::RealFileSystem;
    use tempfile::TempDir;

    #[test]
    fn test_clean_removes_database_and_objects() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("src")).unwrap();
        std::fs::create_dir_all(temp.path().join("obj")).unwrap();
        std::fs::write(temp.path().join("src/a.c"), "").unwrap();
        std::fs::write(temp.path().join("src/b.c"), "").unwrap();
        std::fs::write(temp.path().join("obj/cczel.db"), "#cczel-complete\n").unwrap();
        let a_obj = temp.path().join(format!("obj/a.{OBJECT_EXTENSION}"));
        std::fs::write(&a_obj, "").unwrap();
        std::fs::write(temp.path().join("obj/keep.txt"), "").unwrap();

        let config = Configuration::from_yaml(temp.path(), "include: [src]").unwrap();
        let report = clean_outputs(&RealFileSystem::new(temp.path()), &config).unwrap();

        assert_eq!(report.database, Some(temp.path().join("obj/cczel.db")));
        assert_eq!(report.objects, vec![a_obj.clone()]);
        assert!(!a_obj.exists());
        assert!(temp.path().join("obj/keep.txt").exists());
    }

    #[test]
    fn test_clean_of_clean_tree_is_empty() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("src")).unwrap();
        std::fs::write(temp.path().join("src/a.c"), "").unwrap();

        let config = Configuration::from_yaml(temp.path(), "include: [src]").unwrap();
        let report = clean_outputs(&RealFileSystem::new(temp.path()), &config).unwrap();
        assert_eq!(report, CleanReport::default());
    }
}
