//! Turns partial or invalid user input into a validated `Target`.
//!
//! Every value goes through validate-then-prompt: a supplied valid value is
//! accepted as is; a supplied invalid one produces a notice; either way a
//! missing value is asked for interactively.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::prompt::{ChoiceOption, Prompter};
use crate::registry::{EnvironmentEntry, TargetRegistry};
use crate::report::Reporter;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Target {
    pub site: String,
    /// Display label of the environment.
    pub environment: String,
    pub alias_id: String,
}

pub struct AliasResolver<'a> {
    registry: &'a dyn TargetRegistry,
    prompter: &'a dyn Prompter,
    reporter: &'a dyn Reporter,
    strict_labels: bool,
}

impl<'a> AliasResolver<'a> {
    pub fn new(
        registry: &'a dyn TargetRegistry,
        prompter: &'a dyn Prompter,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            registry,
            prompter,
            reporter,
            strict_labels: false,
        }
    }

    pub fn strict_labels(mut self, strict: bool) -> Self {
        self.strict_labels = strict;
        self
    }

    /// Resolve site then environment with the given prompt defaults.
    pub fn resolve(
        &self,
        raw_site: Option<&str>,
        raw_environment: Option<&str>,
        default_site: &str,
        default_environment: &str,
        purpose: &str,
    ) -> Result<Target> {
        let site = self.resolve_site(raw_site, default_site, purpose)?;
        self.resolve_environment(&site, raw_environment, default_environment, purpose)
    }

    pub fn resolve_site(&self, raw: Option<&str>, default: &str, purpose: &str) -> Result<String> {
        let sites = self.registry.list_sites();
        if sites.is_empty() {
            return Err(Error::site_not_found(raw.unwrap_or_default(), Vec::new())
                .with_hint("Add <site>.site.yml files to the aliases directory"));
        }

        if let Some(site) = non_empty(raw) {
            if sites.iter().any(|s| s == site) {
                return Ok(site.to_string());
            }
            self.reporter
                .notice(&format!("Site {} is not an available option.", site));
        }

        let options: Vec<ChoiceOption> = sites
            .iter()
            .map(|s| ChoiceOption::new(s.as_str(), s.as_str()))
            .collect();
        let default = sites.iter().find(|s| *s == default).map(String::as_str);

        self.prompter
            .choice(&format!("Please select the site to {}", purpose), &options, default)
            .filter(|chosen| sites.contains(chosen))
            .ok_or_else(|| {
                Error::validation_invalid_argument("site", "No site selected", None, Some(sites))
            })
    }

    pub fn resolve_environment(
        &self,
        site: &str,
        raw: Option<&str>,
        default: &str,
        purpose: &str,
    ) -> Result<Target> {
        let environments = self.registry.list_environments(site);
        if environments.is_empty() {
            return Err(Error::alias_not_found(site, raw.unwrap_or_default(), Vec::new()));
        }

        if let Some(label) = non_empty(raw) {
            if environments.iter().any(|e| e.label == label) {
                let alias_id = self.alias_for_label(site, label, &environments)?;
                return Ok(target(site, label, alias_id));
            }
            self.reporter.notice(&format!(
                "Environment {} is not an available option for site {}.",
                label, site
            ));
        }

        let options: Vec<ChoiceOption> = environments
            .iter()
            .map(|e| ChoiceOption::new(e.alias_id.as_str(), e.label.as_str()))
            .collect();
        let default = environments
            .iter()
            .find(|e| e.label == default)
            .map(|e| e.alias_id.as_str());

        let chosen = self
            .prompter
            .choice(
                &format!("Please select the environment to {}", purpose),
                &options,
                default,
            )
            .and_then(|alias_id| environments.iter().find(|e| e.alias_id == alias_id))
            .ok_or_else(|| {
                Error::validation_invalid_argument(
                    "environment",
                    format!("No environment selected for site {}", site),
                    None,
                    Some(environments.iter().map(|e| e.label.clone()).collect()),
                )
            })?;

        Ok(target(site, &chosen.label, chosen.alias_id.clone()))
    }

    /// Pick one value from a fixed set, e.g. the `conf` operation.
    /// Matching is case-insensitive; there is no default.
    pub fn resolve_choice(
        &self,
        field: &str,
        raw: Option<&str>,
        allowed: &[ChoiceOption],
        question: &str,
    ) -> Result<String> {
        if let Some(value) = non_empty(raw) {
            if let Some(option) = allowed.iter().find(|o| o.value.eq_ignore_ascii_case(value)) {
                return Ok(option.value.clone());
            }
            self.reporter
                .notice(&format!("{} {} is not an available option.", capitalize(field), value));
        }

        self.prompter
            .choice(question, allowed, None)
            .and_then(|chosen| {
                allowed
                    .iter()
                    .find(|o| o.value.eq_ignore_ascii_case(&chosen))
                    .map(|o| o.value.clone())
            })
            .ok_or_else(|| {
                Error::validation_invalid_argument(
                    field,
                    format!("{} required", capitalize(field)),
                    raw.map(str::to_string),
                    Some(allowed.iter().map(|o| o.value.clone()).collect()),
                )
            })
    }

    fn alias_for_label(
        &self,
        site: &str,
        label: &str,
        environments: &[EnvironmentEntry],
    ) -> Result<String> {
        let matches: Vec<String> = environments
            .iter()
            .filter(|e| e.label == label)
            .map(|e| e.alias_id.clone())
            .collect();

        if matches.len() > 1 {
            if self.strict_labels {
                return Err(Error::validation_invalid_argument(
                    "environment",
                    format!("Label '{}' is ambiguous for site {}", label, site),
                    Some(label.to_string()),
                    Some(matches),
                ));
            }
            log_status!(
                "resolve",
                "Label '{}' matches {} aliases, using {}",
                label,
                matches.len(),
                matches[0]
            );
        }

        self.registry.resolve_alias_id(site, label)
    }
}

fn target(site: &str, label: &str, alias_id: String) -> Target {
    Target {
        site: site.to_string(),
        environment: label.to_string(),
        alias_id,
    }
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Alias, AliasDirectory};
    use std::cell::RefCell;

    /// Answers with a fixed value (or the default when `None`), recording questions.
    struct Scripted {
        answer: Option<&'static str>,
        asked: RefCell<Vec<String>>,
    }

    impl Scripted {
        fn answering(answer: Option<&'static str>) -> Self {
            Self {
                answer,
                asked: RefCell::new(Vec::new()),
            }
        }
    }

    impl Prompter for Scripted {
        fn choice(&self, question: &str, _options: &[ChoiceOption], default: Option<&str>) -> Option<String> {
            self.asked.borrow_mut().push(question.to_string());
            self.answer
                .map(str::to_string)
                .or_else(|| default.map(str::to_string))
        }

        fn confirm(&self, _question: &str) -> bool {
            true
        }
    }

    #[derive(Default)]
    struct Notices(RefCell<Vec<String>>);

    impl Reporter for Notices {
        fn title(&self, _: &str) {}
        fn text(&self, _: &str) {}
        fn notice(&self, text: &str) {
            self.0.borrow_mut().push(text.to_string());
        }
        fn success(&self, _: &str) {}
        fn warning(&self, _: &str) {}
        fn error(&self, _: &str) {}
        fn table(&self, _: &[&str], _: &[Vec<String>]) {}
    }

    fn registry() -> AliasDirectory {
        AliasDirectory::from_aliases(vec![
            Alias::new("www", "local"),
            Alias::new("www", "remote_prod").with_label("production"),
            Alias::new("www", "remote_prod2").with_label("production"),
            Alias::new("api", "local"),
        ])
    }

    #[test]
    fn valid_input_needs_no_prompt() {
        let registry = registry();
        let prompter = Scripted::answering(None);
        let notices = Notices::default();
        let resolver = AliasResolver::new(&registry, &prompter, &notices);

        let target = resolver
            .resolve(Some("www"), Some("local"), "www", "local", "import as")
            .unwrap();
        assert_eq!(target.alias_id, "www.local");
        assert!(prompter.asked.borrow().is_empty());
        assert!(notices.0.borrow().is_empty());
    }

    #[test]
    fn invalid_environment_notices_then_prompts() {
        let registry = registry();
        let prompter = Scripted::answering(Some("www.remote_prod"));
        let notices = Notices::default();
        let resolver = AliasResolver::new(&registry, &prompter, &notices);

        let target = resolver
            .resolve(Some("www"), Some("stage"), "www", "local", "import as")
            .unwrap();
        assert_eq!(target.environment, "production");
        assert_eq!(
            *notices.0.borrow(),
            vec!["Environment stage is not an available option for site www."]
        );
        assert_eq!(prompter.asked.borrow().len(), 1);
    }

    #[test]
    fn missing_input_uses_prompt_defaults() {
        let registry = registry();
        let prompter = Scripted::answering(None);
        let notices = Notices::default();
        let resolver = AliasResolver::new(&registry, &prompter, &notices);

        let target = resolver.resolve(None, None, "www", "local", "sync").unwrap();
        assert_eq!(target.site, "www");
        assert_eq!(target.alias_id, "www.local");
        assert!(notices.0.borrow().is_empty());
    }

    #[test]
    fn duplicate_label_takes_first_registered() {
        let registry = registry();
        let prompter = Scripted::answering(None);
        let notices = Notices::default();
        let resolver = AliasResolver::new(&registry, &prompter, &notices);

        let target = resolver
            .resolve(Some("www"), Some("production"), "www", "local", "sync")
            .unwrap();
        assert_eq!(target.alias_id, "www.remote_prod");
    }

    #[test]
    fn strict_labels_rejects_duplicates() {
        let registry = registry();
        let prompter = Scripted::answering(None);
        let notices = Notices::default();
        let resolver = AliasResolver::new(&registry, &prompter, &notices).strict_labels(true);

        let err = resolver
            .resolve(Some("www"), Some("production"), "www", "local", "sync")
            .unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
        assert_eq!(err.details["tried"][1], "www.remote_prod2");
    }

    #[test]
    fn nothing_chosen_is_validation_error() {
        let registry = registry();
        let prompter = Scripted::answering(None);
        let notices = Notices::default();
        let resolver = AliasResolver::new(&registry, &prompter, &notices);

        // "qa" is not a registered site so there is no default to fall back to
        let err = resolver
            .resolve_site(Some("blog"), "qa", "sync")
            .unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
        assert_eq!(
            *notices.0.borrow(),
            vec!["Site blog is not an available option."]
        );
    }

    #[test]
    fn operation_choice_is_case_insensitive() {
        let registry = registry();
        let prompter = Scripted::answering(None);
        let notices = Notices::default();
        let resolver = AliasResolver::new(&registry, &prompter, &notices);
        let allowed = vec![
            ChoiceOption::new("export", "Export"),
            ChoiceOption::new("import", "Import"),
        ];

        let op = resolver
            .resolve_choice("operation", Some("IMPORT"), &allowed, "Please select an operation to perform")
            .unwrap();
        assert_eq!(op, "import");

        let err = resolver
            .resolve_choice("operation", None, &allowed, "Please select an operation to perform")
            .unwrap_err();
        assert_eq!(err.message, "Operation required");
    }
}
