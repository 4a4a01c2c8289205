use std::path::{Path, PathBuf};

/// Get the global logwatch data directory (~/.logwatch/data)
fn get_global_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".logwatch")
        .join("data")
}

/// Default archive location, `~/.logwatch/data/logwatch.db`.
///
/// Every monitor and one-shot command in a process shares this archive
/// unless `store.database_path` (or `LOGWATCH_DATABASE_PATH`, applied by
/// the config loader) names another file.
pub fn default_database_path() -> PathBuf {
    get_global_data_dir().join("logwatch.db")
}

fn data_dir_for(database_path: &Path) -> PathBuf {
    database_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Ensure the directory holding `database_path` exists
pub fn ensure_data_dir_for(database_path: &Path) -> std::io::Result<PathBuf> {
    let data_dir = data_dir_for(database_path);
    std::fs::create_dir_all(&data_dir)?;
    Ok(data_dir)
}
