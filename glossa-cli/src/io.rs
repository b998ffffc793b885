//! File I/O for native CLI

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use glossa_core::{Annotation, Config, Mode};

use crate::session::{parse_script, Step};

pub fn load_script(path: &Path) -> Result<Vec<Step>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read script: {}", path.display()))?;
    parse_script(&json).with_context(|| format!("In {}", path.display()))
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    Config::from_json(&json).with_context(|| format!("In {}", path.display()))
}

/// Final state of a replayed session
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExport {
    pub exported_at: DateTime<Utc>,
    pub mode: String,
    pub annotations: Vec<Annotation>,
}

impl SessionExport {
    pub fn new(mode: Mode, annotations: Vec<Annotation>) -> Self {
        Self {
            exported_at: Utc::now(),
            mode: mode.to_string(),
            annotations,
        }
    }
}

/// Get the ~/.glossa directory path, creating it if needed
pub fn glossa_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not find home directory")?;
    let glossa_dir = home.join(".glossa");

    if !glossa_dir.exists() {
        fs::create_dir_all(&glossa_dir)
            .with_context(|| format!("Failed to create {}", glossa_dir.display()))?;
    }

    Ok(glossa_dir)
}

/// Write the export to `path`, or to ~/.glossa/session.json
pub fn export_session(export: &SessionExport, path: Option<&Path>) -> Result<PathBuf> {
    let export_path = match path {
        Some(p) => p.to_path_buf(),
        None => glossa_dir()?.join("session.json"),
    };

    let json = serde_json::to_string_pretty(export).context("Failed to serialize session")?;

    fs::write(&export_path, json)
        .with_context(|| format!("Failed to write {}", export_path.display()))?;

    Ok(export_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_format_is_camel_case() {
        let export = SessionExport::new(Mode::Relations, Vec::new());
        let json = serde_json::to_string(&export).unwrap();
        assert!(json.contains("\"exportedAt\""));
        assert!(json.contains("\"mode\":\"RELATIONS\""));
        assert!(json.contains("\"annotations\":[]"));
    }

    #[test]
    fn missing_config_path_uses_defaults() {
        assert_eq!(load_config(None).unwrap(), Config::default());
    }

    #[test]
    fn unreadable_script_names_the_file() {
        let err = load_script(Path::new("/nonexistent/script.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/script.json"));
    }
}
