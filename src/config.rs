use crate::calendar::LayoutMetrics;
use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_STORE_KEY: &str = "courses";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Key under which the course list lives in the store file.
    pub store_key: String,
    pub layout: LayoutMetrics,
    /// Campus names offered before any course uses them.
    pub campuses: Vec<String>,
    /// Course names offered as filters before any course uses them.
    pub course_names: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            store_key: DEFAULT_STORE_KEY.to_string(),
            layout: LayoutMetrics::default(),
            campuses: Vec::new(),
            course_names: Vec::new(),
        }
    }
}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
        if data.trim().is_empty() {
            return Ok(Settings::default());
        }
        let settings: Settings = serde_yaml::from_str(&data)
            .with_context(|| format!("parsing config file {:?}", path))?;
        if let Some(field) = settings.layout.invalid_field() {
            bail!("invalid layout.{} in {:?}: must be positive", field, path);
        }
        Ok(settings)
    }

    /// Explicit path must exist; the default location is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Settings::from_file(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => {
                debug!(path = ?path, "loading settings");
                Settings::from_file(&path)
            }
            _ => Ok(Settings::default()),
        }
    }

    pub fn merged_names(&self, from_store: Vec<String>) -> Vec<String> {
        merge(&self.course_names, from_store)
    }

    pub fn merged_campuses(&self, from_store: Vec<String>) -> Vec<String> {
        merge(&self.campuses, from_store)
    }
}

fn merge(configured: &[String], from_store: Vec<String>) -> Vec<String> {
    let mut merged = configured.to_vec();
    for value in from_store {
        if !merged.contains(&value) {
            merged.push(value);
        }
    }
    merged
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "courseboard").map(|dirs| dirs.config_dir().join("config.yml"))
}
