//! Per-entry path vetting (zip slip defense).

use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Why an entry name was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnsafePath {
    Empty,
    NulByte,
    Absolute,
    DriveLetter,
    ParentSegment,
    EscapesRoot,
}

impl fmt::Display for UnsafePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            UnsafePath::Empty => "empty entry name",
            UnsafePath::NulByte => "entry name contains a NUL byte",
            UnsafePath::Absolute => "absolute entry path",
            UnsafePath::DriveLetter => "drive-letter entry path",
            UnsafePath::ParentSegment => "entry path contains '..'",
            UnsafePath::EscapesRoot => "entry resolves outside the workspace",
        };
        f.write_str(text)
    }
}

/// Resolve an archive entry name against `root`.
///
/// Returns the absolute destination path, which is guaranteed to start with
/// `root`. `root` must already be absolute and normalized.
pub fn resolve_entry_path(root: &Path, entry_name: &str) -> Result<PathBuf, UnsafePath> {
    if entry_name.trim().is_empty() {
        return Err(UnsafePath::Empty);
    }
    if entry_name.contains('\0') {
        return Err(UnsafePath::NulByte);
    }
    if entry_name.starts_with('/') || entry_name.starts_with('\\') {
        return Err(UnsafePath::Absolute);
    }
    let bytes = entry_name.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return Err(UnsafePath::DriveLetter);
    }
    // Stricter than a per-segment check: any ".." run is refused.
    if entry_name.contains("..") {
        return Err(UnsafePath::ParentSegment);
    }

    let mut resolved = root.to_path_buf();
    for component in Path::new(entry_name).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => return Err(UnsafePath::ParentSegment),
            Component::RootDir | Component::Prefix(_) => return Err(UnsafePath::Absolute),
        }
    }

    if resolved == root || !resolved.starts_with(root) {
        return Err(UnsafePath::EscapesRoot);
    }
    Ok(resolved)
}

/// Normalize `.` and `..` components without touching the filesystem.
///
/// `..` at the root stays at the root.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> PathBuf {
        PathBuf::from("/sandbox/ws")
    }

    #[test]
    fn test_accepts_nested_relative_entries() {
        let path = resolve_entry_path(&root(), "app/src/Main.java").unwrap();
        assert_eq!(path, PathBuf::from("/sandbox/ws/app/src/Main.java"));

        let path = resolve_entry_path(&root(), "./app/").unwrap();
        assert_eq!(path, PathBuf::from("/sandbox/ws/app"));
    }

    #[test]
    fn test_rejects_traversal_and_absolute_names() {
        let cases = [
            ("", UnsafePath::Empty),
            ("   ", UnsafePath::Empty),
            ("a\0b.java", UnsafePath::NulByte),
            ("/etc/passwd", UnsafePath::Absolute),
            ("\\windows\\system.ini", UnsafePath::Absolute),
            ("C:\\boot.ini", UnsafePath::DriveLetter),
            ("c:relative.java", UnsafePath::DriveLetter),
            ("../../etc/passwd", UnsafePath::ParentSegment),
            ("app/../../x.java", UnsafePath::ParentSegment),
            ("app\\..\\x.java", UnsafePath::ParentSegment),
            (".", UnsafePath::EscapesRoot),
        ];
        for (name, expected) in cases {
            assert_eq!(
                resolve_entry_path(&root(), name),
                Err(expected),
                "entry {:?}",
                name
            );
        }
    }

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(
            normalize_lexically(Path::new("/a/b/../c/./d")),
            PathBuf::from("/a/c/d")
        );
        assert_eq!(normalize_lexically(Path::new("/..")), PathBuf::from("/"));
        assert_eq!(normalize_lexically(Path::new("/tmp/..")), PathBuf::from("/"));
    }
}
