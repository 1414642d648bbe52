//! Collaborators shared by the workflows for one invocation.

use crate::capability::CapabilityProbe;
use crate::defaults::Defaults;
use crate::error::{Error, Result};
use crate::prompt::Prompter;
use crate::registry::{Alias, TargetRegistry};
use crate::report::Reporter;
use crate::resolver::AliasResolver;
use crate::runner::StepRunner;

pub struct Session<'a> {
    pub registry: &'a dyn TargetRegistry,
    pub prompter: &'a dyn Prompter,
    pub reporter: &'a dyn Reporter,
    pub runner: &'a StepRunner<'a>,
    pub probe: &'a dyn CapabilityProbe,
    pub defaults: &'a Defaults,
    /// Stream step output as it is produced (`--verbose`).
    pub streaming: bool,
}

impl<'a> Session<'a> {
    pub fn resolver(&self) -> AliasResolver<'a> {
        AliasResolver::new(self.registry, self.prompter, self.reporter)
            .strict_labels(self.defaults.resolve.strict_labels)
    }

    pub fn alias(&self, alias_id: &str) -> Result<&'a Alias> {
        self.registry.alias(alias_id).ok_or_else(|| {
            let (site, key) = alias_id
                .trim_start_matches('@')
                .split_once('.')
                .unwrap_or((alias_id, ""));
            Error::alias_not_found(
                site,
                key,
                self.registry
                    .list_environments(site)
                    .into_iter()
                    .map(|e| e.label)
                    .collect(),
            )
        })
    }
}
