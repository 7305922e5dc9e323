use std::path::{Path, PathBuf};

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(std::env::temp_dir)
}

/// Application directory (~/.underdog)
pub fn underdog_dir() -> PathBuf {
    home_dir().join(".underdog")
}

/// config.json path
pub fn config_json_path() -> PathBuf {
    underdog_dir().join("config.json")
}

/// User-defined agents directory
pub fn default_agents_dir() -> PathBuf {
    underdog_dir().join("agents")
}

/// Default directory saved dialogs live in
pub fn default_dialogs_dir() -> PathBuf {
    home_dir().join("llm_dialogs")
}

/// Default directory for markdown exports
pub fn default_export_dir() -> PathBuf {
    home_dir().join("llm_exports")
}

/// Ensure a directory exists, returning it
pub fn ensure_dir(path: &Path) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(path)?;
    Ok(path.to_path_buf())
}

/// Append `.json` unless the name already ends with it
pub fn with_json_extension(filename: &str) -> String {
    if filename.ends_with(".json") {
        filename.to_string()
    } else {
        format!("{filename}.json")
    }
}
