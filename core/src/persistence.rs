/// Whole-file JSON persistence
///
/// Both operations work on the entire value: `load_json` reads the full file,
/// `save_json` rewrites it in place. There is no temp-file rename, so a crash
/// in the middle of a write can leave a truncated file behind.
use crate::error::{Result, SiteError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::debug;

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(SiteError::Io)?;
        }
    }
    Ok(())
}

/// Load a JSON value from `path`, or return `default` if the file is absent.
pub fn load_json<T: DeserializeOwned>(path: &Path, default: T) -> Result<T> {
    ensure_parent_dir(path)?;
    if !path.exists() {
        debug!("No file at {:?}, using default", path);
        return Ok(default);
    }
    let raw = fs::read_to_string(path).map_err(SiteError::Io)?;
    let value = serde_json::from_str(&raw).map_err(SiteError::Serialization)?;
    Ok(value)
}

/// Overwrite `path` with `value` as indented JSON.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value).map_err(SiteError::Serialization)?;
    fs::write(path, json).map_err(SiteError::Io)?;
    debug!("Wrote {:?}", path);
    Ok(())
}
