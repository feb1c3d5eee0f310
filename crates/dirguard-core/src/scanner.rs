//! Recursive directory walk producing a metadata snapshot.
//!
//! Only regular files are recorded; directories and symlinks are skipped.
//! Keys are paths relative to the monitored root.

use crate::error::{IntegrityError, Result};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::ops::Index;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Metadata observed for one file during a walk
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetadata {
    pub relative_path: String,
    pub absolute_path: PathBuf,
    pub size: u64,
    /// Seconds since the Unix epoch
    pub mtime: f64,
}

/// One point-in-time observation of the monitored tree, keyed by relative path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    files: BTreeMap<String, FileMetadata>,
    /// Subdirectories the walk could not list, relative to the root.
    unreadable_dirs: Vec<String>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: String, meta: FileMetadata) -> Option<FileMetadata> {
        self.files.insert(path, meta)
    }

    pub fn mark_unreadable(&mut self, dir: impl Into<String>) {
        self.unreadable_dirs.push(dir.into());
    }

    pub fn contains_key(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.files.keys()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The unlisted directory that hides `path`, if any.
    pub fn hidden_by(&self, path: &str) -> Option<&str> {
        self.unreadable_dirs
            .iter()
            .find(|dir| Path::new(path).starts_with(dir.as_str()))
            .map(String::as_str)
    }
}

impl<Q> Index<&Q> for Snapshot
where
    String: Borrow<Q>,
    Q: Ord + ?Sized,
{
    type Output = FileMetadata;

    fn index(&self, path: &Q) -> &FileMetadata {
        &self.files[path]
    }
}

impl FromIterator<(String, FileMetadata)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, FileMetadata)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
            unreadable_dirs: Vec::new(),
        }
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = (&'a String, &'a FileMetadata);
    type IntoIter = std::collections::btree_map::Iter<'a, String, FileMetadata>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

/// Anything that can produce a snapshot of the monitored root.
pub trait SnapshotSource {
    fn snapshot(&self) -> Result<Snapshot>;
}

#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    root: PathBuf,
}

impl DirectoryScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Walk the root and collect every regular file beneath it.
    pub fn scan(&self) -> Result<Snapshot> {
        if !self.root.is_dir() {
            return Err(IntegrityError::DirectoryNotFound(self.root.clone()));
        }
        let root = self
            .root
            .canonicalize()
            .map_err(|_| IntegrityError::DirectoryNotFound(self.root.clone()))?;

        let mut snapshot = Snapshot::new();
        for entry in WalkDir::new(&root).follow_links(false) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    let rel = e
                        .path()
                        .and_then(|p| p.strip_prefix(&root).ok())
                        .map(|p| p.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    if rel.is_empty() {
                        return Err(IntegrityError::read(root.clone(), e.into()));
                    }
                    // Baseline entries under this path must not read as deletions.
                    warn!(path = %rel, error = %e, "cannot list directory");
                    snapshot.mark_unreadable(rel);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let absolute_path = entry.path().to_path_buf();
            let relative_path = match absolute_path.strip_prefix(&root) {
                Ok(rel) => rel.to_string_lossy().into_owned(),
                Err(_) => continue,
            };

            // Keep the file even when stat fails so it is hashed (and reported
            // unreadable) rather than mistaken for a deletion.
            let (size, mtime) = match entry.metadata() {
                Ok(meta) => {
                    let mtime = meta
                        .modified()
                        .ok()
                        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                        .map(|d| d.as_secs_f64())
                        .unwrap_or(0.0);
                    (meta.len(), mtime)
                }
                Err(e) => {
                    warn!(path = %absolute_path.display(), error = %e, "cannot stat file");
                    (0, 0.0)
                }
            };

            snapshot.insert(
                relative_path.clone(),
                FileMetadata {
                    relative_path,
                    absolute_path,
                    size,
                    mtime,
                },
            );
        }

        debug!(root = %root.display(), files = snapshot.len(), "directory scan complete");
        Ok(snapshot)
    }
}

impl SnapshotSource for DirectoryScanner {
    fn snapshot(&self) -> Result<Snapshot> {
        self.scan()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn scan_collects_nested_files_only() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"hello").unwrap();
        fs::create_dir_all(dir.path().join("sub/deeper")).unwrap();
        fs::write(dir.path().join("sub/deeper/b.bin"), b"0123456789").unwrap();
        fs::create_dir_all(dir.path().join("empty")).unwrap();

        let snapshot = DirectoryScanner::new(dir.path()).scan().unwrap();
        assert_eq!(snapshot.len(), 2);

        let a = &snapshot["a.txt"];
        assert_eq!(a.size, 5);
        assert!(a.absolute_path.is_absolute());
        assert!(a.mtime > 0.0);

        let nested_key = Path::new("sub").join("deeper").join("b.bin");
        let b = &snapshot[&*nested_key.to_string_lossy()];
        assert_eq!(b.size, 10);
        assert_eq!(fs::read(&b.absolute_path).unwrap(), b"0123456789");
    }

    #[test]
    fn missing_root_is_fatal() {
        let dir = tempdir().unwrap();
        let err = DirectoryScanner::new(dir.path().join("absent")).scan().unwrap_err();
        assert!(matches!(err, IntegrityError::DirectoryNotFound(_)));
    }

    #[test]
    fn file_root_is_not_a_directory() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        fs::write(&file, b"x").unwrap();
        let err = DirectoryScanner::new(&file).scan().unwrap_err();
        assert!(matches!(err, IntegrityError::DirectoryNotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_tracked() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("real.txt"), b"data").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real.txt"), dir.path().join("link.txt"))
            .unwrap();

        let snapshot = DirectoryScanner::new(dir.path()).scan().unwrap();
        assert_eq!(snapshot.keys().collect::<Vec<_>>(), vec!["real.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn unlistable_subdirectory_is_recorded() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir_all(&locked).unwrap();
        fs::write(locked.join("inner.txt"), b"secret").unwrap();
        fs::write(dir.path().join("open.txt"), b"x").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // root ignores directory permissions
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let snapshot = DirectoryScanner::new(dir.path()).scan();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        let snapshot = snapshot.unwrap();

        assert_eq!(snapshot.keys().collect::<Vec<_>>(), vec!["open.txt"]);
        let inner = Path::new("locked").join("inner.txt");
        assert_eq!(snapshot.hidden_by(&inner.to_string_lossy()), Some("locked"));
        assert_eq!(snapshot.hidden_by("open.txt"), None);
        assert_eq!(snapshot.hidden_by("lockedness.txt"), None);
    }
}
