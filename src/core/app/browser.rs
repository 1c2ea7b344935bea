use std::path::{Path, PathBuf};

use crate::core::context::{list_directory, BrowserEntry, ContextError};
use crate::ui::picker::{PickerItem, PickerState};

/// Modal file browser used to pick context. Navigation is confined to `root`.
#[derive(Debug, Clone)]
pub struct ContextBrowserState {
    root: PathBuf,
    current_dir: PathBuf,
    entries: Vec<BrowserEntry>,
    pub picker: PickerState,
}

fn picker_items(entries: &[BrowserEntry]) -> Vec<PickerItem> {
    entries
        .iter()
        .map(|entry| PickerItem {
            id: entry.path.to_string_lossy().into_owned(),
            label: if entry.is_dir {
                format!("{}/", entry.name)
            } else {
                entry.name.clone()
            },
        })
        .collect()
}

impl ContextBrowserState {
    pub fn open(root: PathBuf) -> Result<Self, ContextError> {
        let entries = list_directory(&root)?;
        let picker = PickerState::new("Attach context", picker_items(&entries), 0);
        Ok(Self {
            current_dir: root.clone(),
            root,
            entries,
            picker,
        })
    }

    pub fn current_dir(&self) -> &Path {
        &self.current_dir
    }

    pub fn entries(&self) -> &[BrowserEntry] {
        &self.entries
    }

    pub fn selected_entry(&self) -> Option<&BrowserEntry> {
        self.entries.get(self.picker.selected)
    }

    pub fn is_at_root(&self) -> bool {
        self.current_dir == self.root
    }

    /// Path of the shown directory relative to the root, for the title bar.
    pub fn display_path(&self) -> String {
        match self.current_dir.strip_prefix(&self.root) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => format!("./{}", rel.to_string_lossy().replace('\\', "/")),
            Err(_) => self.current_dir.display().to_string(),
        }
    }

    fn show(&mut self, dir: PathBuf) -> Result<(), ContextError> {
        let entries = list_directory(&dir)?;
        self.picker = PickerState::new(self.picker.title.clone(), picker_items(&entries), 0);
        self.entries = entries;
        self.current_dir = dir;
        Ok(())
    }

    pub fn enter(&mut self, dir: PathBuf) -> Result<(), ContextError> {
        if !dir.starts_with(&self.root) {
            return Ok(());
        }
        self.show(dir)
    }

    /// Returns false when already at the root.
    pub fn go_to_parent(&mut self) -> Result<bool, ContextError> {
        if self.is_at_root() {
            return Ok(false);
        }
        let Some(parent) = self.current_dir.parent().map(Path::to_path_buf) else {
            return Ok(false);
        };
        let previous = self.current_dir.clone();
        self.show(parent)?;
        if let Some(index) = self.entries.iter().position(|e| e.path == previous) {
            self.picker.selected = index;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().expect("temp dir");
        fs::create_dir_all(dir.path().join("src/nested")).expect("mkdir");
        fs::create_dir_all(dir.path().join(".git")).expect("mkdir");
        fs::write(dir.path().join("README.md"), "readme").expect("write");
        fs::write(dir.path().join("src/lib.rs"), "lib").expect("write");
        dir
    }

    #[test]
    fn opens_at_root_with_dirs_first() {
        let dir = fixture();
        let browser = ContextBrowserState::open(dir.path().to_path_buf()).expect("open");
        let labels: Vec<&str> = browser
            .picker
            .items
            .iter()
            .map(|item| item.label.as_str())
            .collect();
        assert_eq!(labels, vec!["src/", "README.md"]);
        assert_eq!(browser.display_path(), ".");
        assert!(browser.is_at_root());
    }

    #[test]
    fn enter_and_parent_stay_within_root() {
        let dir = fixture();
        let mut browser = ContextBrowserState::open(dir.path().to_path_buf()).expect("open");
        let src = browser.selected_entry().expect("src").path.clone();

        browser.enter(src.clone()).expect("enter");
        assert_eq!(browser.display_path(), "./src");
        assert_eq!(browser.entries().len(), 2);

        assert!(browser.go_to_parent().expect("parent"));
        assert!(browser.is_at_root());
        assert_eq!(browser.selected_entry().map(|e| e.path.clone()), Some(src));
        assert!(!browser.go_to_parent().expect("parent"));
    }

    #[test]
    fn enter_outside_root_is_ignored() {
        let dir = fixture();
        let mut browser =
            ContextBrowserState::open(dir.path().join("src")).expect("open");
        browser.enter(dir.path().to_path_buf()).expect("enter");
        assert!(browser.is_at_root());
    }
}
