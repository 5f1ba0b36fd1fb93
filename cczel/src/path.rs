//! Tree-relative path normalization
//!
//! Every path the orchestrator tracks is a canonical string relative to the
//! tree root (the directory holding `cczel.yml`):
//! - components are joined with `/`, whatever separator the input used
//! - `.` components are dropped and `..` pops the previous component
//! - directories end with `/`, and the tree root itself is `""`
//!
//! Normalization never touches the filesystem, so two spellings of the same
//! file (`src/./a.h`, `src/sub/../a.h`) map to the same graph node.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Separator used in canonical paths
pub const SEPARATOR: char = '/';

/// Path normalization failures (always fatal for a run)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// `..` would climb above the tree root
    #[error("'{0}' escapes the source tree root")]
    EscapesRoot(String),

    /// Zero-width component (`a//b`, leading separator)
    #[error("'{0}' contains an empty path component")]
    EmptyComponent(String),

    /// Path resolves to the tree root where a file was expected
    #[error("'{0}' does not name a file")]
    NotAFile(String),
}

fn components(input: &str) -> Result<Vec<&str>, PathError> {
    let mut parts: Vec<&str> = input.split(['/', '\\']).collect();
    // A single trailing separator marks a directory
    if parts.len() > 1 && parts.last().is_some_and(|last| last.is_empty()) {
        let _ = parts.pop();
    }

    let mut stack: Vec<&str> = Vec::with_capacity(parts.len());
    for part in parts {
        match part {
            "" => return Err(PathError::EmptyComponent(input.to_string())),
            "." => {}
            ".." => {
                if stack.pop().is_none() {
                    return Err(PathError::EscapesRoot(input.to_string()));
                }
            }
            name => stack.push(name),
        }
    }
    Ok(stack)
}

/// Normalize a path naming a file.
///
/// # Errors
///
/// Fails if the path escapes the root, has an empty component, or collapses
/// to the root itself.
pub fn normalize(input: &str) -> Result<String, PathError> {
    let parts = components(input)?;
    if parts.is_empty() {
        return Err(PathError::NotAFile(input.to_string()));
    }
    Ok(parts.join("/"))
}

/// Normalize a path naming a directory; the result carries a trailing `/`
/// unless it is the tree root (`""`).
///
/// # Errors
///
/// Fails if the path escapes the root or has an empty component.
pub fn normalize_dir(input: &str) -> Result<String, PathError> {
    let parts = components(input)?;
    if parts.is_empty() {
        return Ok(String::new());
    }
    let mut dir = parts.join("/");
    dir.push(SEPARATOR);
    Ok(dir)
}

/// Directory part of a canonical file path, including the trailing `/`.
pub fn parent_dir(path: &str) -> &str {
    match path.rfind(SEPARATOR) {
        Some(index) => &path[..=index],
        None => "",
    }
}

/// Resolve `relative` against the directory containing `including_file`.
///
/// # Errors
///
/// Propagates normalization failures of the joined path.
pub fn resolve_relative(including_file: &str, relative: &str) -> Result<String, PathError> {
    normalize(&format!("{}{}", parent_dir(including_file), relative))
}

/// File name component of a canonical path.
pub fn file_name(path: &str) -> &str {
    match path.rfind(SEPARATOR) {
        Some(index) => &path[index + 1..],
        None => path,
    }
}

/// File name without its last extension (`src/main.c` -> `main`).
pub fn file_stem(path: &str) -> &str {
    let name = file_name(path);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(index) => &name[..index],
    }
}

/// Extension of the file name, if any (`main.cpp` -> `cpp`).
pub fn extension(path: &str) -> Option<&str> {
    let name = file_name(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(index) => Some(&name[index + 1..]),
    }
}

/// Whether a canonical path lies under a canonical directory.
///
/// The root directory (`""`) contains everything.
pub fn is_under(path: &str, dir: &str) -> bool {
    path.starts_with(dir)
}

/// Location of a canonical path below `root` on disk.
pub fn to_disk(root: &Path, canonical: &str) -> PathBuf {
    if canonical.is_empty() {
        root.to_path_buf()
    } else {
        root.join(canonical.trim_end_matches(SEPARATOR))
    }
}

/// Whether a path can be stored as one database record.
///
/// Line breaks would split the record.
pub fn is_recordable(path: &str) -> bool {
    !path.contains(['\n', '\r'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plain() {
        assert_eq!(normalize("src/main.c").unwrap(), "src/main.c");
        assert_eq!(normalize("main.c").unwrap(), "main.c");
    }

    #[test]
    fn test_normalize_dots() {
        assert_eq!(normalize("./src/./main.c").unwrap(), "src/main.c");
        assert_eq!(normalize("src/sub/../main.c").unwrap(), "src/main.c");
        assert_eq!(normalize("a/b/c/../../d.h").unwrap(), "a/d.h");
    }

    #[test]
    fn test_normalize_mixed_separators() {
        assert_eq!(normalize("src\\win\\file.c").unwrap(), "src/win/file.c");
        assert_eq!(normalize("src\\..\\lib/x.h").unwrap(), "lib/x.h");
    }

    #[test]
    fn test_escape_root_is_rejected() {
        assert_eq!(
            normalize("../outside.h"),
            Err(PathError::EscapesRoot("../outside.h".to_string()))
        );
        assert!(matches!(
            normalize("src/../../x.h"),
            Err(PathError::EscapesRoot(_))
        ));
        assert!(matches!(normalize_dir(".."), Err(PathError::EscapesRoot(_))));
    }

    #[test]
    fn test_empty_components_are_rejected() {
        assert!(matches!(
            normalize("src//main.c"),
            Err(PathError::EmptyComponent(_))
        ));
        assert!(matches!(
            normalize("/etc/passwd"),
            Err(PathError::EmptyComponent(_))
        ));
        assert!(matches!(normalize(""), Err(PathError::EmptyComponent(_))));
    }

    #[test]
    fn test_root_is_not_a_file() {
        assert!(matches!(normalize("."), Err(PathError::NotAFile(_))));
        assert!(matches!(normalize("a/.."), Err(PathError::NotAFile(_))));
    }

    #[test]
    fn test_normalize_dir() {
        assert_eq!(normalize_dir("src").unwrap(), "src/");
        assert_eq!(normalize_dir("src/").unwrap(), "src/");
        assert_eq!(normalize_dir("./src/lib/..").unwrap(), "src/");
        assert_eq!(normalize_dir(".").unwrap(), "");
        assert_eq!(normalize_dir("./").unwrap(), "");
    }

    #[test]
    fn test_resolve_relative() {
        assert_eq!(resolve_relative("src/a.c", "b.h").unwrap(), "src/b.h");
        assert_eq!(
            resolve_relative("src/a.c", "../include/c.h").unwrap(),
            "include/c.h"
        );
        assert_eq!(resolve_relative("a.c", "inc/d.h").unwrap(), "inc/d.h");
        assert!(resolve_relative("a.c", "../d.h").is_err());
    }

    #[test]
    fn test_name_helpers() {
        assert_eq!(parent_dir("src/sub/x.c"), "src/sub/");
        assert_eq!(parent_dir("x.c"), "");
        assert_eq!(file_name("src/sub/x.c"), "x.c");
        assert_eq!(file_stem("src/main.cpp"), "main");
        assert_eq!(file_stem("src/archive.tar.gz"), "archive.tar");
        assert_eq!(file_stem(".hidden"), ".hidden");
        assert_eq!(extension("src/main.cpp"), Some("cpp"));
        assert_eq!(extension("Makefile"), None);
    }

    #[test]
    fn test_is_under() {
        assert!(is_under("third_party/zlib/zlib.h", "third_party/"));
        assert!(!is_under("third_party_extra/x.h", "third_party/"));
        assert!(is_under("anything.h", ""));
    }

    #[test]
    fn test_to_disk() {
        let root = Path::new("/work/tree");
        assert_eq!(to_disk(root, ""), PathBuf::from("/work/tree"));
        assert_eq!(to_disk(root, "obj/"), PathBuf::from("/work/tree/obj"));
        assert_eq!(to_disk(root, "src/a.c"), PathBuf::from("/work/tree/src/a.c"));
    }

    #[test]
    fn test_is_recordable() {
        assert!(is_recordable("src/my file.c"));
        assert!(!is_recordable("src/two\nlines.c"));
        assert!(!is_recordable("src/cr\r.h"));
    }
}
