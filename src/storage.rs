use crate::model::CourseRecord;
use crate::repository::CourseStore;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde_yaml::{Mapping, Value};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const STORE_DIR: &str = ".courseboard";
pub const STORE_FILE: &str = "store.yml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreScope {
    Project,
    Global,
    Explicit,
}

#[derive(Debug, Clone)]
pub struct StoreLocation {
    pub path: PathBuf,
    pub scope: StoreScope,
}

impl StoreScope {
    pub fn label(&self) -> &'static str {
        match self {
            StoreScope::Project => "project",
            StoreScope::Global => "global",
            StoreScope::Explicit => "explicit",
        }
    }
}

/// YAML key-value file holding the course list under a single key.
///
/// Keys other than the course key are left as they were found.
#[derive(Debug, Clone)]
pub struct FileStore {
    location: StoreLocation,
    key: String,
}

impl FileStore {
    pub fn new(location: StoreLocation, key: impl Into<String>) -> Self {
        FileStore {
            location,
            key: key.into(),
        }
    }

    #[cfg(test)]
    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    fn read_document(&self) -> Result<Mapping> {
        if !self.location.path.exists() {
            return Ok(Mapping::new());
        }
        let data = fs::read_to_string(&self.location.path)
            .with_context(|| format!("reading {:?}", self.location.path))?;
        if data.trim().is_empty() {
            return Ok(Mapping::new());
        }
        let document: Mapping = serde_yaml::from_str(&data).context("parsing store file")?;
        Ok(document)
    }
}

impl CourseStore for FileStore {
    fn load(&self) -> Result<Vec<CourseRecord>> {
        let document = self.read_document()?;
        let courses = match document.get(self.key.as_str()) {
            Some(value) => serde_yaml::from_value(value.clone())
                .with_context(|| format!("parsing courses under key {:?}", self.key))?,
            None => Vec::new(),
        };
        debug!(path = ?self.location.path, "read store");
        Ok(courses)
    }

    fn save(&mut self, courses: &[CourseRecord]) -> Result<()> {
        // A corrupt document is replaced rather than blocking every save.
        let mut document = self.read_document().unwrap_or_default();
        let value = serde_yaml::to_value(courses).context("serializing courses")?;
        document.insert(Value::String(self.key.clone()), value);
        if let Some(parent) = self.location.path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
        }
        let serialized = serde_yaml::to_string(&document).context("serializing store")?;
        fs::write(&self.location.path, serialized)
            .with_context(|| format!("writing {:?}", self.location.path))?;
        debug!(path = ?self.location.path, count = courses.len(), "wrote store");
        Ok(())
    }
}

pub fn init_project_store() -> Result<StoreLocation> {
    let cwd = env::current_dir()?;
    let dir = cwd.join(STORE_DIR);
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {} directory", STORE_DIR))?;
    let path = dir.join(STORE_FILE);
    if !path.exists() {
        fs::write(&path, "").with_context(|| format!("writing {:?}", path))?;
    }
    Ok(StoreLocation {
        path,
        scope: StoreScope::Project,
    })
}

pub fn locate_store(start: &Path, explicit: Option<PathBuf>) -> Result<StoreLocation> {
    if let Some(path) = explicit {
        return Ok(StoreLocation {
            path,
            scope: StoreScope::Explicit,
        });
    }
    if let Some(project_path) = find_project_store(start) {
        return Ok(StoreLocation {
            path: project_path,
            scope: StoreScope::Project,
        });
    }
    let global_path = global_store_path()?;
    Ok(StoreLocation {
        path: global_path,
        scope: StoreScope::Global,
    })
}

/// Log file kept next to the store so the TUI never writes to the terminal.
pub fn log_path(location: &StoreLocation) -> PathBuf {
    location
        .path
        .parent()
        .map(|dir| dir.join("courseboard.log"))
        .unwrap_or_else(|| PathBuf::from("courseboard.log"))
}

fn find_project_store(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(STORE_DIR).join(STORE_FILE);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

fn global_store_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "courseboard").context("locating data directory")?;
    Ok(dirs.data_dir().join(STORE_FILE))
}
