use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

/// Base sitekit config directory.
///
/// `SITEKIT_HOME` wins; otherwise ~/.config/sitekit/ (%APPDATA%\sitekit on Windows).
pub fn sitekit() -> Result<PathBuf> {
    if let Ok(home) = env::var("SITEKIT_HOME") {
        if !home.trim().is_empty() {
            return Ok(PathBuf::from(home));
        }
    }

    #[cfg(windows)]
    {
        let appdata = env::var("APPDATA").map_err(|_| {
            Error::internal_unexpected(
                "APPDATA environment variable not set on Windows".to_string(),
            )
        })?;
        Ok(PathBuf::from(appdata).join("sitekit"))
    }

    #[cfg(not(windows))]
    {
        let home = env::var("HOME").map_err(|_| {
            Error::internal_unexpected(
                "HOME environment variable not set on Unix-like system".to_string(),
            )
        })?;
        Ok(PathBuf::from(home).join(".config").join("sitekit"))
    }
}

/// Global sitekit.json config file path
pub fn sitekit_json() -> Result<PathBuf> {
    Ok(sitekit()?.join("sitekit.json"))
}

/// Expand `~` and environment references in a user-supplied path.
/// Unknown variables leave the path tilde-expanded only.
pub fn expand(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(path).as_ref()),
    }
}
