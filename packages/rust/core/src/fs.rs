//! File-system capability used by the conversion pipeline.
//!
//! The pipeline never touches `std::fs` directly, so include resolution and
//! batch runs can be exercised against [`MemoryFs`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use pbrtjson_shared::{ConvertError, Result};

/// Read/write access to source scenes and output artifacts.
pub trait SceneFs: Send + Sync {
    /// Read a whole UTF-8 file.
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Size of a file in bytes.
    fn file_size(&self, path: &Path) -> Result<u64>;

    /// Write a file, creating parent directories as needed.
    fn write(&self, path: &Path, contents: &str) -> Result<()>;

    /// Copy a file, creating parent directories of `to` as needed.
    fn copy(&self, from: &Path, to: &Path) -> Result<()>;

    /// Immediate children of a directory, sorted.
    fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    fn is_dir(&self, path: &Path) -> bool;

    fn exists(&self, path: &Path) -> bool;
}

/// Lexically normalize a path: drop `.` components and fold `..` where possible.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if can_pop {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// OsFs
// ---------------------------------------------------------------------------

/// The real file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl SceneFs for OsFs {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))
    }

    fn file_size(&self, path: &Path) -> Result<u64> {
        let metadata = std::fs::metadata(path).map_err(|e| ConvertError::io(path, e))?;
        Ok(metadata.len())
    }

    /// Writes to a temp sibling first, then renames over the target.
    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        create_parent(path)?;

        let file_name = path
            .file_name()
            .ok_or_else(|| ConvertError::validation(format!("not a file path: {}", path.display())))?
            .to_string_lossy();
        let temp = path.with_file_name(format!(".{file_name}.tmp"));

        std::fs::write(&temp, contents).map_err(|e| ConvertError::io(&temp, e))?;
        if let Err(e) = std::fs::rename(&temp, path) {
            let _ = std::fs::remove_file(&temp);
            return Err(ConvertError::io(path, e));
        }

        debug!(path = %path.display(), bytes = contents.len(), "wrote file");
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        create_parent(to)?;
        std::fs::copy(from, to).map_err(|e| ConvertError::io(from, e))?;
        debug!(from = %from.display(), to = %to.display(), "copied file");
        Ok(())
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(path).map_err(|e| ConvertError::io(path, e))?;
        let mut paths = Vec::new();
        for entry in entries {
            paths.push(entry.map_err(|e| ConvertError::io(path, e))?.path());
        }
        paths.sort();
        Ok(paths)
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

fn create_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| ConvertError::io(parent, e))
        }
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// MemoryFs
// ---------------------------------------------------------------------------

/// An in-memory file tree for tests and dry runs.
///
/// Directories exist implicitly as prefixes of stored files.
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: Mutex<BTreeMap<PathBuf, String>>,
    writes: Mutex<Vec<PathBuf>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with_file(self, path: impl AsRef<Path>, contents: impl Into<String>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&self, path: impl AsRef<Path>, contents: impl Into<String>) {
        self.files()
            .insert(normalize_path(path.as_ref()), contents.into());
    }

    /// Contents of a stored file.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files().get(&normalize_path(path.as_ref())).cloned()
    }

    /// Paths passed to [`SceneFs::write`], in call order.
    pub fn write_log(&self) -> Vec<PathBuf> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn files(&self) -> MutexGuard<'_, BTreeMap<PathBuf, String>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SceneFs for MemoryFs {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.get(path).ok_or_else(|| {
            ConvertError::io(path, std::io::Error::from(std::io::ErrorKind::NotFound))
        })
    }

    fn file_size(&self, path: &Path) -> Result<u64> {
        self.read_to_string(path).map(|contents| contents.len() as u64)
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        self.insert(path, contents);
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(normalize_path(path));
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        let contents = self.read_to_string(from)?;
        self.insert(to, contents);
        Ok(())
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let dir = normalize_path(path);
        let children: BTreeSet<PathBuf> = self
            .files()
            .keys()
            .filter_map(|file| {
                let rest = file.strip_prefix(&dir).ok()?;
                let first = rest.components().next()?;
                Some(dir.join(first.as_os_str()))
            })
            .collect();

        if children.is_empty() {
            return Err(ConvertError::io(
                path,
                std::io::Error::from(std::io::ErrorKind::NotFound),
            ));
        }
        Ok(children.into_iter().collect())
    }

    fn is_dir(&self, path: &Path) -> bool {
        let dir = normalize_path(path);
        self.files()
            .keys()
            .any(|file| file != &dir && file.starts_with(&dir))
    }

    fn exists(&self, path: &Path) -> bool {
        self.get(path).is_some() || self.is_dir(path)
    }
}
