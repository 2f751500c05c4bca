// Script catalog: user folders and the scripts inside them

use crate::config::ScriptsConfig;
use crate::errors::CatalogError;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Read-only view over `<base>/<user>/**/*.<ext>`
#[derive(Debug, Clone)]
pub struct ScriptCatalog {
    base_dir: PathBuf,
    extension: String,
}

impl ScriptCatalog {
    pub fn new(base_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let extension: String = extension.into();
        Self {
            base_dir: base_dir.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn from_config(config: &ScriptsConfig) -> Self {
        Self::new(config.scripts_dir.clone(), config.extension.clone())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    fn ensure_base(&self) -> Result<(), CatalogError> {
        if self.base_dir.is_dir() {
            Ok(())
        } else {
            Err(CatalogError::BaseDirMissing(
                self.base_dir.display().to_string(),
            ))
        }
    }

    /// Sorted names of the immediate subdirectories of the base folder
    pub fn user_folders(&self) -> Result<Vec<String>, CatalogError> {
        self.ensure_base()?;
        let mut users = Vec::new();
        for entry in std::fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                users.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        users.sort();
        Ok(users)
    }

    fn user_dir(&self, user: &str) -> Result<PathBuf, CatalogError> {
        let valid = !user.is_empty()
            && user != "."
            && user != ".."
            && !user.contains('/')
            && !user.contains('\\');
        if !valid {
            return Err(CatalogError::InvalidSelection(format!(
                "invalid user folder '{}'",
                user
            )));
        }
        let dir = self.base_dir.join(user);
        if !dir.is_dir() {
            return Err(CatalogError::InvalidSelection(format!(
                "no user folder '{}'",
                user
            )));
        }
        Ok(dir)
    }

    /// Sorted labels (paths relative to the user folder) of every script
    pub fn scripts_for(&self, user: &str) -> Result<Vec<String>, CatalogError> {
        self.ensure_base()?;
        let dir = self.user_dir(user)?;
        let mut labels = Vec::new();
        for entry in WalkDir::new(&dir).follow_links(true) {
            let entry = entry.map_err(|e| CatalogError::FileSystem(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let matches = entry
                .path()
                .extension()
                .map(|ext| ext == self.extension.as_str())
                .unwrap_or(false);
            if !matches {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&dir) {
                labels.push(relative.to_string_lossy().to_string());
            }
        }
        labels.sort();
        Ok(labels)
    }

    /// Absolute path of the script `label` in `user`'s folder.
    ///
    /// Labels must stay inside the user folder: absolute paths and `..`
    /// components are refused.
    pub fn resolve(&self, user: &str, label: &str) -> Result<PathBuf, CatalogError> {
        self.ensure_base()?;
        let dir = self.user_dir(user)?;
        let relative = Path::new(label);
        let escapes = label.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(CatalogError::InvalidSelection(format!(
                "invalid script '{}'",
                label
            )));
        }
        let path = dir.join(relative);
        if !path.is_file() {
            return Err(CatalogError::ScriptNotFound(path.display().to_string()));
        }
        Ok(path)
    }
}
