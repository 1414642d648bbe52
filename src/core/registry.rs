//! Target registry backed by a directory of site alias files.
//!
//! Each `<site>.site.yml` file maps environment keys to alias records. The
//! alias id is `<site>.<key>`; the display label defaults to the key but may be
//! overridden with `label`, so two aliases can share a label.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::utils::io;

const ALIAS_FILE_SUFFIX: &str = ".site.yml";

/// One registered target endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Alias {
    pub id: String,
    pub site: String,
    pub key: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_env: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
}

impl Alias {
    pub fn new(site: &str, key: &str) -> Self {
        Self {
            id: format!("{}.{}", site, key),
            site: site.to_string(),
            key: key.to_string(),
            label: key.to_string(),
            uri: None,
            site_env: None,
            root: None,
            host: None,
            user: None,
            options: Map::new(),
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn with_uri(mut self, uri: &str) -> Self {
        self.uri = Some(uri.to_string());
        self
    }

    pub fn with_site_env(mut self, site_env: &str) -> Self {
        self.site_env = Some(site_env.to_string());
        self
    }

    pub fn with_root(mut self, root: &str) -> Self {
        self.root = Some(root.to_string());
        self
    }

    /// Name used to address the alias on the drush command line.
    pub fn name(&self) -> String {
        format!("@{}", self.id)
    }

    /// Alias key derived from the id, i.e. everything after the site prefix.
    pub fn environment_key(&self) -> &str {
        self.id
            .split_once('.')
            .map(|(_, key)| key)
            .unwrap_or(&self.key)
    }
}

/// A site's environment as presented for selection.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EnvironmentEntry {
    pub alias_id: String,
    pub label: String,
}

/// Read-only view over registered (site, environment) targets.
pub trait TargetRegistry {
    /// Sites in registration order, without duplicates.
    fn list_sites(&self) -> Vec<String>;

    /// Environments of `site` in registration order.
    fn list_environments(&self, site: &str) -> Vec<EnvironmentEntry>;

    fn alias(&self, alias_id: &str) -> Option<&Alias>;

    /// First alias id under `site` whose label is `label`.
    fn resolve_alias_id(&self, site: &str, label: &str) -> Result<String> {
        let environments = self.list_environments(site);
        environments
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| entry.alias_id.clone())
            .ok_or_else(|| {
                Error::alias_not_found(
                    site,
                    label,
                    environments.into_iter().map(|e| e.label).collect(),
                )
            })
    }
}

#[derive(Debug, Deserialize, Default)]
struct AliasRecord {
    #[serde(default)]
    root: Option<String>,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    user: Option<String>,
    #[serde(default, rename = "site-env")]
    site_env: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    options: Map<String, Value>,
}

/// Registry loaded from `<dir>/<site>.site.yml` files.
#[derive(Debug, Clone, Default)]
pub struct AliasDirectory {
    aliases: Vec<Alias>,
}

impl AliasDirectory {
    /// Load every alias file in `dir`. A missing directory is an empty registry.
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.exists() {
            log_status!("targets", "Alias directory {} does not exist", dir.display());
            return Ok(Self::default());
        }

        let mut aliases = Vec::new();
        for path in alias_files(dir)? {
            let Some(site) = site_from_path(&path) else {
                continue;
            };
            let content = io::read_file(&path, "read alias file")?;
            aliases.extend(parse_alias_file(&site, &content, &path)?);
        }

        Ok(Self { aliases })
    }

    pub fn from_aliases(aliases: Vec<Alias>) -> Self {
        Self { aliases }
    }

    pub fn aliases(&self) -> &[Alias] {
        &self.aliases
    }
}

impl TargetRegistry for AliasDirectory {
    fn list_sites(&self) -> Vec<String> {
        let mut sites: Vec<String> = Vec::new();
        for alias in &self.aliases {
            if !sites.contains(&alias.site) {
                sites.push(alias.site.clone());
            }
        }
        sites
    }

    fn list_environments(&self, site: &str) -> Vec<EnvironmentEntry> {
        self.aliases
            .iter()
            .filter(|alias| alias.site == site)
            .map(|alias| EnvironmentEntry {
                alias_id: alias.id.clone(),
                label: alias.label.clone(),
            })
            .collect()
    }

    fn alias(&self, alias_id: &str) -> Option<&Alias> {
        let alias_id = alias_id.trim_start_matches('@');
        self.aliases.iter().find(|alias| alias.id == alias_id)
    }
}

fn alias_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = dir.join(format!("*{}", ALIAS_FILE_SUFFIX));
    let pattern = pattern.to_string_lossy();
    let entries = glob::glob(&pattern).map_err(|e| {
        Error::config_invalid_value("aliases_dir", Some(pattern.to_string()), e.to_string())
    })?;

    let mut files: Vec<PathBuf> = entries.filter_map(|entry| entry.ok()).collect();
    files.sort();
    Ok(files)
}

fn site_from_path(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    let site = name.strip_suffix(ALIAS_FILE_SUFFIX)?;
    if site.is_empty() {
        None
    } else {
        Some(site.to_string())
    }
}

/// Parse one alias file. Environments keep document order.
pub fn parse_alias_file(site: &str, content: &str, path: &Path) -> Result<Vec<Alias>> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let invalid = |e: String| Error::config_invalid_yaml(path.display().to_string(), e);

    let mapping: serde_yml::Mapping = serde_yml::from_str(content).map_err(|e| invalid(e.to_string()))?;

    let mut aliases = Vec::with_capacity(mapping.len());
    for (key, value) in mapping {
        let key = key
            .as_str()
            .ok_or_else(|| invalid("environment keys must be strings".to_string()))?
            .to_string();
        let record: AliasRecord = if value.is_null() {
            AliasRecord::default()
        } else {
            serde_yml::from_value(value).map_err(|e| invalid(format!("{}: {}", key, e)))?
        };

        let mut alias = Alias::new(site, &key);
        if let Some(label) = record.label.filter(|l| !l.trim().is_empty()) {
            alias.label = label;
        }
        alias.uri = record.uri.filter(|u| !u.is_empty());
        alias.site_env = record.site_env.filter(|s| !s.is_empty());
        alias.root = record.root;
        alias.host = record.host;
        alias.user = record.user;
        alias.options = record.options;
        aliases.push(alias);
    }

    Ok(aliases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const WWW: &str = r#"
local:
  root: /var/www/docroot
  uri: http://www.docksal
  site-env: local
remote_prod:
  host: prod.example.com
  uri: https://www.example.com
  label: production
remote_dev:
  host: dev.example.com
"#;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("www.site.yml"), WWW).unwrap();
        fs::write(dir.path().join("api.site.yml"), "local:\n  root: /srv/api\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        dir
    }

    #[test]
    fn loads_sites_in_file_order() {
        let dir = fixture();
        let registry = AliasDirectory::load(dir.path()).unwrap();
        assert_eq!(registry.list_sites(), vec!["api", "www"]);
    }

    #[test]
    fn environments_keep_document_order() {
        let dir = fixture();
        let registry = AliasDirectory::load(dir.path()).unwrap();
        let labels: Vec<String> = registry
            .list_environments("www")
            .into_iter()
            .map(|e| e.label)
            .collect();
        assert_eq!(labels, vec!["local", "production", "remote_dev"]);
    }

    #[test]
    fn label_resolves_to_alias_id() {
        let dir = fixture();
        let registry = AliasDirectory::load(dir.path()).unwrap();
        assert_eq!(
            registry.resolve_alias_id("www", "production").unwrap(),
            "www.remote_prod"
        );
        let err = registry.resolve_alias_id("www", "remote_prod").unwrap_err();
        assert_eq!(err.code.as_str(), "alias.not_found");
    }

    #[test]
    fn alias_lookup_accepts_at_prefix() {
        let dir = fixture();
        let registry = AliasDirectory::load(dir.path()).unwrap();
        let alias = registry.alias("@www.local").unwrap();
        assert_eq!(alias.site_env.as_deref(), Some("local"));
        assert_eq!(alias.root.as_deref(), Some("/var/www/docroot"));
        assert_eq!(alias.name(), "@www.local");
    }

    #[test]
    fn missing_directory_is_empty() {
        let registry = AliasDirectory::load(Path::new("/nonexistent/drush/sites")).unwrap();
        assert!(registry.list_sites().is_empty());
    }

    #[test]
    fn malformed_file_is_yaml_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad.site.yml"), "- just\n- a list\n").unwrap();
        let err = AliasDirectory::load(dir.path()).unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_yaml");
    }

    #[test]
    fn environment_key_strips_site_prefix() {
        let alias = Alias::new("www", "remote_prod").with_label("production");
        assert_eq!(alias.environment_key(), "remote_prod");
    }
}
