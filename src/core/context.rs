//! Execution contexts: "run as this target".
//!
//! A derived context is always a fresh value built from a base context and an
//! alias. The base is borrowed immutably and never changes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::defaults::Defaults;
use crate::registry::Alias;

/// Environment variable every derived context carries.
pub const SITE_ENVIRONMENT: &str = "SITE_ENVIRONMENT";

const SELF_NAME: &str = "@self";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExecutionContext {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    pub options: Map<String, Value>,
    pub env_vars: BTreeMap<String, String>,
}

/// Where a target's `uri` lands when overlaid.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum UriOverlay {
    /// Only `options.uri`.
    #[default]
    Options,
    /// `options.uri` and the context's own `uri`.
    OptionsAndContext,
}

/// One step in the base-URI fallback chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum HostStrategy {
    Fixed(String),
    ContextUri,
    OptionsUri,
    Env(String),
}

impl ExecutionContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri: None,
            options: Map::new(),
            env_vars: BTreeMap::new(),
        }
    }

    /// The `@self` context: the site the operator is standing in.
    pub fn local(defaults: &Defaults) -> Self {
        let mut context = Self::new(SELF_NAME);
        context.options = defaults.context.self_options.clone();
        context.uri = context
            .options
            .get("uri")
            .and_then(Value::as_str)
            .map(str::to_string);
        context
    }

    /// Context addressing an alias directly, e.g. `@www.remote_prod`.
    pub fn for_alias(alias: &Alias) -> Self {
        let mut context = Self::new(alias.name());
        context.options = alias.options.clone();
        if let Some(uri) = &alias.uri {
            context.uri = Some(uri.clone());
            context
                .options
                .insert("uri".to_string(), Value::String(uri.clone()));
        }
        context
    }

    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }

    pub fn site_environment(&self) -> Option<&str> {
        self.env_vars.get(SITE_ENVIRONMENT).map(String::as_str)
    }
}

/// Derive a context that runs as `alias` on top of `base`.
pub fn build_overlay(base: &ExecutionContext, alias: &Alias, mode: UriOverlay) -> ExecutionContext {
    let mut options = base.options.clone();
    let mut env_vars = base.env_vars.clone();
    let mut uri = base.uri.clone();

    let site_environment = alias
        .site_env
        .clone()
        .unwrap_or_else(|| alias.environment_key().to_string());
    env_vars.insert(SITE_ENVIRONMENT.to_string(), site_environment);

    if let Some(alias_uri) = &alias.uri {
        options.insert("uri".to_string(), Value::String(alias_uri.clone()));
        if mode == UriOverlay::OptionsAndContext {
            uri = Some(alias_uri.clone());
        }
    }

    ExecutionContext {
        name: base.name.clone(),
        uri,
        options,
        env_vars,
    }
}

/// First non-empty host from `strategies`, without a trailing slash.
pub fn resolve_base_uri(context: &ExecutionContext, strategies: &[HostStrategy]) -> Option<String> {
    strategies
        .iter()
        .find_map(|strategy| {
            let candidate = match strategy {
                HostStrategy::Fixed(value) => Some(value.clone()),
                HostStrategy::ContextUri => context.uri.clone(),
                HostStrategy::OptionsUri => context.option_str("uri").map(str::to_string),
                HostStrategy::Env(var) => std::env::var(var).ok(),
            };
            candidate.filter(|value| !value.trim().is_empty())
        })
        .map(|value| value.trim_end_matches('/').to_string())
}
