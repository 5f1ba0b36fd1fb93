//! Filesystem capability used by the scanner, graph builder and propagator
//!
//! The core only ever sees canonical tree-relative paths (see
//! [`crate::path`]). [`RealFileSystem`] maps them onto a directory on disk.

use crate::state::ModTime;
use filetime::FileTime;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Kind of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Subdirectory
    Directory,
}

/// One entry of a non-recursive directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// File name (no separators)
    pub name: String,
    /// File or directory
    pub kind: EntryKind,
}

/// Operations the orchestrator needs from the filesystem
pub trait FileSystem {
    /// List the entries of `dir` (canonical directory path, `""` = root).
    /// Order is unspecified.
    fn list_dir(&self, dir: &str) -> io::Result<Vec<DirEntry>>;

    /// Read a whole file as text
    fn read_to_string(&self, path: &str) -> io::Result<String>;

    /// Last modification time of a file
    fn modified(&self, path: &str) -> io::Result<ModTime>;
}

/// [`FileSystem`] backed by the real disk, rooted at the tree root
#[derive(Debug, Clone)]
pub struct RealFileSystem {
    root: PathBuf,
}

impl RealFileSystem {
    /// Create a filesystem view rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Tree root on disk
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a canonical path to a location on disk
    pub fn resolve(&self, path: &str) -> PathBuf {
        crate::path::to_disk(&self.root, path)
    }
}

impl FileSystem for RealFileSystem {
    fn list_dir(&self, dir: &str) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();

        for entry in WalkDir::new(self.resolve(dir))
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
        {
            let entry = entry.map_err(io::Error::from)?;
            let Some(name) = entry.file_name().to_str() else {
                warn!("Skipping non UTF-8 entry {}", entry.path().display());
                continue;
            };

            let file_type = entry.file_type();
            let kind = if file_type.is_dir() {
                EntryKind::Directory
            } else if file_type.is_file() {
                EntryKind::File
            } else if file_type.is_symlink() {
                // Linked files are listed, linked directories are not
                // descended into (they may point back up the tree)
                match std::fs::metadata(entry.path()) {
                    Ok(target) if target.is_file() => EntryKind::File,
                    Ok(_) => {
                        debug!("Not following directory link {}", entry.path().display());
                        continue;
                    }
                    Err(e) => {
                        warn!("Skipping dangling link {}: {}", entry.path().display(), e);
                        continue;
                    }
                }
            } else {
                continue;
            };

            entries.push(DirEntry {
                name: name.to_string(),
                kind,
            });
        }

        Ok(entries)
    }

    fn read_to_string(&self, path: &str) -> io::Result<String> {
        // Sources are not guaranteed to be UTF-8; include paths are ASCII
        let bytes = std::fs::read(self.resolve(path))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn modified(&self, path: &str) -> io::Result<ModTime> {
        let metadata = std::fs::metadata(self.resolve(path))?;
        Ok(FileTime::from_last_modification_time(&metadata).into())
    }
}

#[cfg(test)]
pub(crate) mod memory {
    //! In-memory filesystem for unit tests

    use super::{DirEntry, EntryKind, FileSystem};
    use crate::state::ModTime;
    use std::collections::BTreeMap;
    use std::io;

    #[derive(Debug, Default)]
    pub(crate) struct MemoryFileSystem {
        files: BTreeMap<String, (String, ModTime)>,
    }

    impl MemoryFileSystem {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn with_file(mut self, path: &str, content: &str) -> Self {
            self.write(path, content, 1);
            self
        }

        pub(crate) fn write(&mut self, path: &str, content: &str, ticks: u64) {
            let _ = self.files.insert(
                path.to_string(),
                (content.to_string(), ModTime::from_ticks(ticks)),
            );
        }

        pub(crate) fn touch(&mut self, path: &str, ticks: u64) {
            if let Some(entry) = self.files.get_mut(path) {
                entry.1 = ModTime::from_ticks(ticks);
            }
        }
    }

    impl FileSystem for MemoryFileSystem {
        fn list_dir(&self, dir: &str) -> io::Result<Vec<DirEntry>> {
            let mut entries: Vec<DirEntry> = Vec::new();
            let mut found = dir.is_empty();

            for path in self.files.keys() {
                let Some(rest) = path.strip_prefix(dir) else {
                    continue;
                };
                found = true;
                let entry = match rest.split_once('/') {
                    Some((subdir, _)) => DirEntry {
                        name: subdir.to_string(),
                        kind: EntryKind::Directory,
                    },
                    None => DirEntry {
                        name: rest.to_string(),
                        kind: EntryKind::File,
                    },
                };
                if !entries.contains(&entry) {
                    entries.push(entry);
                }
            }

            if found {
                Ok(entries)
            } else {
                Err(io::Error::new(io::ErrorKind::NotFound, dir.to_string()))
            }
        }

        fn read_to_string(&self, path: &str) -> io::Result<String> {
            self.files
                .get(path)
                .map(|(content, _)| content.clone())
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
        }

        fn modified(&self, path: &str) -> io::Result<ModTime> {
            self.files
                .get(path)
                .map(|(_, time)| *time)
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_real_list_dir() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("src/sub")).unwrap();
        std::fs::write(temp.path().join("src/a.c"), "int a;").unwrap();

        let fs = RealFileSystem::new(temp.path());
        let mut entries = fs.list_dir("src/").unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(
            entries,
            vec![
                DirEntry { name: "a.c".to_string(), kind: EntryKind::File },
                DirEntry { name: "sub".to_string(), kind: EntryKind::Directory },
            ]
        );
    }

    #[test]
    fn test_real_list_missing_dir_fails() {
        let temp = TempDir::new().unwrap();
        let fs = RealFileSystem::new(temp.path());
        assert!(fs.list_dir("nope/").is_err());
    }

    #[test]
    fn test_real_modified_matches_filetime() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("x.h");
        std::fs::write(&file, "").unwrap();
        filetime::set_file_mtime(&file, FileTime::from_unix_time(1_000, 0)).unwrap();

        let fs = RealFileSystem::new(temp.path());
        assert_eq!(
            fs.modified("x.h").unwrap(),
            ModTime::from_ticks(1_000 * 10_000_000)
        );
    }

    #[test]
    fn test_real_read_lossy() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("latin1.c"), b"/* caf\xe9 */\n").unwrap();

        let fs = RealFileSystem::new(temp.path());
        let text = fs.read_to_string("latin1.c").unwrap();
        assert!(text.starts_with("/* caf"));
    }

    #[cfg(unix)]
    #[test]
    fn test_real_list_dir_links() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("src/sub")).unwrap();
        std::fs::write(temp.path().join("src/a.c"), "").unwrap();
        std::os::unix::fs::symlink("../..", temp.path().join("src/sub/up")).unwrap();
        std::os::unix::fs::symlink("../a.c", temp.path().join("src/sub/alias.c")).unwrap();
        std::os::unix::fs::symlink("gone.h", temp.path().join("src/sub/dangling.h")).unwrap();

        let fs = RealFileSystem::new(temp.path());
        let entries = fs.list_dir("src/sub/").unwrap();
        assert_eq!(
            entries,
            vec![DirEntry { name: "alias.c".to_string(), kind: EntryKind::File }]
        );
    }

    #[test]
    fn test_memory_list_dir() {
        let fs = memory::MemoryFileSystem::new()
            .with_file("src/a.c", "")
            .with_file("src/lib/b.c", "")
            .with_file("src/lib/c.c", "");

        let entries = fs.list_dir("src/").unwrap();
        assert_eq!(entries.len(), 2);
        assert!(fs.list_dir("missing/").is_err());
    }
}
