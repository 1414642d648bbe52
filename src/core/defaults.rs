use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::context::{HostStrategy, UriOverlay};
use crate::error::{Error, Result};
use crate::paths;

/// Root configuration structure for sitekit.json
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SitekitConfig {
    #[serde(default)]
    pub defaults: Defaults,
}

/// All configurable defaults that can be overridden via sitekit.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    /// Directory holding `<site>.site.yml` alias files.
    #[serde(default = "default_aliases_dir")]
    pub aliases_dir: String,

    #[serde(default = "default_drush_bin")]
    pub drush_bin: String,

    #[serde(default)]
    pub resolve: ResolveConfig,

    #[serde(default)]
    pub context: ContextConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub check: CheckConfig,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            aliases_dir: default_aliases_dir(),
            drush_bin: default_drush_bin(),
            resolve: ResolveConfig::default(),
            context: ContextConfig::default(),
            sync: SyncConfig::default(),
            check: CheckConfig::default(),
        }
    }
}

impl Defaults {
    /// Alias directory with `~` and `$VARS` expanded.
    pub fn aliases_path(&self) -> PathBuf {
        paths::expand(&self.aliases_dir)
    }
}

/// Prompt defaults and duplicate-label policy for target resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveConfig {
    #[serde(default = "default_site")]
    pub default_site: String,

    #[serde(default = "default_environment")]
    pub default_environment: String,

    #[serde(default = "default_sync_from")]
    pub default_sync_from: String,

    /// Fail on duplicate environment labels instead of taking the first match.
    #[serde(default)]
    pub strict_labels: bool,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            default_site: default_site(),
            default_environment: default_environment(),
            default_sync_from: default_sync_from(),
            strict_labels: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default)]
    pub uri_overlay: UriOverlay,

    /// Options for the `@self` base context.
    #[serde(default)]
    pub self_options: Map<String, Value>,

    #[serde(default = "default_host_strategies")]
    pub host_strategies: Vec<HostStrategy>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            uri_overlay: UriOverlay::default(),
            self_options: Map::new(),
            host_strategies: default_host_strategies(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Docroot used when the local alias declares no `root`.
    #[serde(default = "default_docroot")]
    pub docroot: String,

    /// Composer working directory. Defaults to the docroot's parent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_dir: Option<String>,

    /// Dump directory, relative to the docroot.
    #[serde(default = "default_dump_dir")]
    pub dump_dir: String,

    #[serde(default = "default_composer_command")]
    pub composer_command: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            docroot: default_docroot(),
            project_dir: None,
            dump_dir: default_dump_dir(),
            composer_command: default_composer_command(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Key path inside a URL file that holds the URL -> code mapping.
    #[serde(default = "default_url_file_key")]
    pub url_file_key: String,

    #[serde(default = "default_log_entry_count")]
    pub log_entry_count: u32,

    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            url_file_key: default_url_file_key(),
            log_entry_count: default_log_entry_count(),
            max_redirects: default_max_redirects(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_aliases_dir() -> String {
    "drush/sites".to_string()
}

fn default_drush_bin() -> String {
    "drush".to_string()
}

fn default_site() -> String {
    "www".to_string()
}

fn default_environment() -> String {
    "local".to_string()
}

fn default_sync_from() -> String {
    "remote_prod".to_string()
}

fn default_host_strategies() -> Vec<HostStrategy> {
    vec![
        HostStrategy::ContextUri,
        HostStrategy::OptionsUri,
        HostStrategy::Env("SITE_URI".to_string()),
    ]
}

fn default_docroot() -> String {
    "/var/www/docroot".to_string()
}

fn default_dump_dir() -> String {
    "../database_backups".to_string()
}

fn default_composer_command() -> String {
    "composer install --prefer-dist -v -o".to_string()
}

fn default_url_file_key() -> String {
    "urls".to_string()
}

fn default_log_entry_count() -> u32 {
    1000
}

fn default_max_redirects() -> usize {
    10
}

fn default_timeout_secs() -> u64 {
    120
}

// =============================================================================
// Loading functions
// =============================================================================

/// Load the full sitekit.json config.
/// A missing file yields built-in defaults; a malformed one is an error.
pub fn load_config() -> Result<SitekitConfig> {
    let path = paths::sitekit_json()?;
    load_config_from(&path)
}

/// Load defaults from sitekit.json.
pub fn load_defaults() -> Result<Defaults> {
    Ok(load_config()?.defaults)
}

pub fn load_config_from(path: &Path) -> Result<SitekitConfig> {
    if !path.exists() {
        return Ok(SitekitConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("read {}", path.display())))
    })?;

    serde_json::from_str(&content)
        .map_err(|e| Error::config_invalid_json(path.display().to_string(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config_from(Path::new("/nonexistent/sitekit.json")).unwrap();
        assert_eq!(config.defaults.resolve.default_site, "www");
        assert_eq!(config.defaults.sync.dump_dir, "../database_backups");
        assert_eq!(config.defaults.context.uri_overlay, UriOverlay::Options);
        assert_eq!(config.defaults.check.max_redirects, 10);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"defaults": {{"drush_bin": "vendor/bin/drush", "context": {{"uri_overlay": "options-and-context"}}}}}}"#
        )
        .unwrap();

        let config = load_config_from(file.path()).unwrap();
        assert_eq!(config.defaults.drush_bin, "vendor/bin/drush");
        assert_eq!(
            config.defaults.context.uri_overlay,
            UriOverlay::OptionsAndContext
        );
        assert_eq!(config.defaults.context.host_strategies.len(), 3);
        assert_eq!(config.defaults.resolve.default_environment, "local");
    }

    #[test]
    fn aliases_path_expands_home() {
        let defaults = Defaults {
            aliases_dir: "~/sites".to_string(),
            ..Defaults::default()
        };
        assert!(!defaults.aliases_path().to_string_lossy().starts_with('~'));
    }

    #[test]
    fn malformed_file_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = load_config_from(file.path()).unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_json");
    }
}
