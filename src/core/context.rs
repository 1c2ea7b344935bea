//! Loading files and directory trees as one-shot conversation context.
//!
//! Everything here is read-only. A loaded [`ContextBundle`] is handed to the
//! active conversation, which folds it into the next prompt and drops it.

use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::core::constants::{IGNORED_DIRS, IGNORED_EXTENSIONS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    File,
    Directory { file_count: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextBundle {
    pub label: String,
    pub payload: String,
    pub kind: ContextKind,
}

impl ContextBundle {
    /// Sentence introducing the payload inside the outgoing prompt.
    pub fn explanation(&self) -> String {
        match self.kind {
            ContextKind::File => {
                format!("The following is the content of the file '{}':", self.label)
            }
            ContextKind::Directory { .. } => format!(
                "The following is the content of the directory {}, one section per file:",
                self.label
            ),
        }
    }
}

#[derive(Debug)]
pub enum ContextError {
    Read { path: PathBuf, source: std::io::Error },
    NotText { path: PathBuf },
    NotADirectory { path: PathBuf },
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextError::Read { path, source } => {
                write!(f, "could not read {}: {}", path.display(), source)
            }
            ContextError::NotText { path } => {
                write!(f, "{} is not a UTF-8 text file", path.display())
            }
            ContextError::NotADirectory { path } => {
                write!(f, "{} is not a directory", path.display())
            }
        }
    }
}

impl StdError for ContextError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ContextError::Read { source, .. } => Some(source),
            _ => None,
        }
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn read_text(path: &Path) -> Result<String, ContextError> {
    let bytes = fs::read(path).map_err(|source| ContextError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|_| ContextError::NotText {
        path: path.to_path_buf(),
    })
}

pub fn is_ignored_dir_name(name: &str) -> bool {
    IGNORED_DIRS.contains(&name)
}

fn has_ignored_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IGNORED_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

fn is_ignored_entry(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && is_ignored_dir_name(&entry.file_name().to_string_lossy())
}

/// Read a single file. Access or decode failures are returned, never partial text.
pub fn load_file(path: &Path) -> Result<ContextBundle, ContextError> {
    let payload = read_text(path)?;
    Ok(ContextBundle {
        label: base_name(path),
        payload,
        kind: ContextKind::File,
    })
}

/// Walk `root` recursively, concatenating every readable text file.
///
/// Ignored directories are pruned and ignored extensions skipped. Files that
/// cannot be read as UTF-8 are left out without failing the walk. Traversal is
/// sorted by file name so the payload is stable for a given tree.
pub fn load_directory(root: &Path) -> Result<ContextBundle, ContextError> {
    let metadata = fs::metadata(root).map_err(|source| ContextError::Read {
        path: root.to_path_buf(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(ContextError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let mut payload = String::new();
    let mut file_count = 0usize;

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_ignored_entry(e))
    {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                debug!(error = %err, "Skipping unreadable entry during context walk");
                continue;
            }
        };

        if !entry.file_type().is_file() || has_ignored_extension(entry.path()) {
            continue;
        }

        let path = entry.path();
        let content = match read_text(path) {
            Ok(content) => content,
            Err(err) => {
                debug!(error = %err, "Skipping file during context walk");
                continue;
            }
        };

        let relative_path = path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        payload.push_str(&format!("--- FILE: {relative_path} ---\n"));
        payload.push_str(&content);
        if !content.ends_with('\n') {
            payload.push('\n');
        }
        file_count += 1;
    }

    Ok(ContextBundle {
        label: format!("'{}' ({} files)", base_name(root), file_count),
        payload,
        kind: ContextKind::Directory { file_count },
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Immediate children of `dir` for the context browser: ignored directories
/// hidden, directories first, then by name.
pub fn list_directory(dir: &Path) -> Result<Vec<BrowserEntry>, ContextError> {
    let read_dir = fs::read_dir(dir).map_err(|source| ContextError::Read {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut entries: Vec<BrowserEntry> = read_dir
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let is_dir = entry.file_type().ok()?.is_dir();
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_dir && is_ignored_dir_name(&name) {
                return None;
            }
            Some(BrowserEntry {
                name,
                path: entry.path(),
                is_dir,
            })
        })
        .collect();

    entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
    Ok(entries)
}
