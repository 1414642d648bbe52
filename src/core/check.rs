//! `check-url`: HTTP response and log-severity health checks.

use serde::Serialize;
use std::path::PathBuf;

use crate::context::{resolve_base_uri, ExecutionContext, HostStrategy};
use crate::defaults::CheckConfig;
use crate::error::{Error, Result, StepFailedDetails};
use crate::health::{
    self, HttpProbe, LogEntry, LogLevel, UrlExpectation, UrlObservation, MISMATCH_HEADERS,
};
use crate::report::Reporter;
use crate::runner::{Operation, StepRunner};
use crate::threshold::{self, ThresholdCheck};

#[derive(Debug, Clone, Default)]
pub struct CheckRequest {
    pub urls: Option<String>,
    pub file: Option<PathBuf>,
    pub file_key: Option<String>,
    pub url_threshold: usize,
    pub log_error_threshold: Option<usize>,
    pub log_warning_threshold: Option<usize>,
    pub fail_500: bool,
    /// Explicit base URI; tried before the configured strategies.
    pub uri: Option<String>,
}

impl CheckRequest {
    fn checks_logs(&self) -> bool {
        self.log_error_threshold.is_some() || self.log_warning_threshold.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_uri: Option<String>,
    pub checked: usize,
    pub url_check: ThresholdCheck,
    pub mismatches: Vec<UrlObservation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_errors: Option<ThresholdCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_warnings: Option<ThresholdCheck>,
}

impl CheckReport {
    /// A failed report becomes `threshold.exceeded` carrying the report.
    pub fn into_result(self) -> Result<Self> {
        if self.passed {
            return Ok(self);
        }

        let mut exceeded = Vec::new();
        if !self.url_check.passed() {
            exceeded.push("HTTP code mismatches");
        }
        if self.log_errors.is_some_and(|c| !c.passed()) {
            exceeded.push("log errors");
        }
        if self.log_warnings.is_some_and(|c| !c.passed()) {
            exceeded.push("log warnings");
        }

        let details = serde_json::to_value(&self)
            .map_err(|e| Error::internal_json(e.to_string(), Some("serialize check report".to_string())))?;
        Err(Error::threshold_exceeded(
            format!("{} exceeded threshold", exceeded.join(" and ")),
            details,
        ))
    }
}

pub struct Checker<'a> {
    pub probe: &'a dyn HttpProbe,
    pub runner: &'a StepRunner<'a>,
    pub reporter: &'a dyn Reporter,
    pub config: &'a CheckConfig,
    pub host_strategies: &'a [HostStrategy],
}

impl Checker<'_> {
    /// Collect expectations: file entries first, then `--urls`.
    pub fn expectations(&self, request: &CheckRequest) -> Result<Vec<UrlExpectation>> {
        let mut expectations = Vec::new();
        if let Some(file) = &request.file {
            let key = request
                .file_key
                .as_deref()
                .unwrap_or(&self.config.url_file_key);
            health::merge_expectations(&mut expectations, health::load_url_file(file, key)?);
        }
        if let Some(urls) = &request.urls {
            health::merge_expectations(&mut expectations, health::parse_url_list(urls)?);
        }
        Ok(expectations)
    }

    pub fn run(&self, context: &ExecutionContext, request: &CheckRequest) -> Result<CheckReport> {
        let expectations = self.expectations(request)?;
        if expectations.is_empty() {
            return Err(Error::validation_missing_argument(vec![
                "urls".to_string(),
                "file".to_string(),
            ])
            .with_hint("Pass --urls='/path|200,...' or --file=urls.yml"));
        }

        let mut strategies = Vec::with_capacity(self.host_strategies.len() + 1);
        if let Some(uri) = &request.uri {
            strategies.push(HostStrategy::Fixed(uri.clone()));
        }
        strategies.extend(self.host_strategies.iter().cloned());
        let base_uri = resolve_base_uri(context, &strategies);

        if request.checks_logs() {
            self.clear_log(context);
        }

        self.reporter.title("Checking URLs");
        let observations = health::observe(
            self.probe,
            &expectations,
            base_uri.as_deref(),
            self.config.max_redirects,
        )?;

        let url_check = threshold::evaluate(
            &observations,
            request.url_threshold,
            UrlObservation::mismatched,
            |o| request.fail_500 && o.server_error(),
        );
        let mismatches: Vec<UrlObservation> =
            observations.iter().filter(|o| o.mismatched()).cloned().collect();
        self.report_urls(&observations, &url_check, request.fail_500);

        let (log_errors, log_warnings) = if request.checks_logs() {
            let entries = self.read_log(context)?;
            self.report_logs(&entries, request)
        } else {
            (None, None)
        };

        let passed = url_check.passed()
            && log_errors.map_or(true, |c| c.passed())
            && log_warnings.map_or(true, |c| c.passed());

        Ok(CheckReport {
            passed,
            base_uri,
            checked: observations.len(),
            url_check,
            mismatches,
            log_errors,
            log_warnings,
        })
    }

    fn report_urls(&self, observations: &[UrlObservation], check: &ThresholdCheck, fail_500: bool) {
        if check.observed_count > 0 {
            self.reporter.warning(&format!(
                "{} HTTP code mismatches found.",
                check.observed_count
            ));
            self.reporter
                .table(&MISMATCH_HEADERS, &health::mismatch_rows(observations));
        }

        if check.hard_fail_triggered && fail_500 {
            self.reporter.error("A URL answered with a server error (5xx).");
        }
        if check.passed() {
            self.reporter.success(&format!(
                "Passed HTTP code check with {} mismatches.",
                check.observed_count
            ));
        } else {
            self.reporter.error("HTTP code mismatches exceeded threshold.");
        }
    }

    fn clear_log(&self, context: &ExecutionContext) {
        let operation = Operation::drush("watchdog:delete")
            .arg("all")
            .option("yes", true);
        let result = self.runner.run(context, &operation, false);
        if !result.success {
            self.reporter.warning(&format!(
                "Could not clear the log before checking (exit {}); counts may include older entries.",
                result.exit_code
            ));
        }
    }

    fn read_log(&self, context: &ExecutionContext) -> Result<Vec<LogEntry>> {
        let operation = Operation::drush("watchdog:show")
            .option("format", "json")
            .option("count", self.config.log_entry_count);
        let result = self.runner.run(context, &operation, false);
        if !result.success {
            return Err(Error::step_failed(StepFailedDetails {
                step: "watchdog-show".to_string(),
                context: context.name.clone(),
                exit_code: result.exit_code,
                stderr: result.error_output,
            }));
        }
        health::parse_log_entries(&result.output)
    }

    fn report_logs(
        &self,
        entries: &[LogEntry],
        request: &CheckRequest,
    ) -> (Option<ThresholdCheck>, Option<ThresholdCheck>) {
        self.reporter.title("Checking logs");
        let never = |_: &LogEntry| false;

        let errors = request.log_error_threshold.map(|limit| {
            threshold::evaluate(entries, limit, |e| e.level() == LogLevel::Error, never)
        });
        let warnings = request.log_warning_threshold.map(|limit| {
            threshold::evaluate(entries, limit, |e| e.level() == LogLevel::Warning, never)
        });

        for (kind, check) in [("error", errors), ("warning", warnings)] {
            let Some(check) = check else { continue };
            if check.passed() {
                self.reporter.success(&format!(
                    "Passed log {} check with {} entries (limit {}).",
                    kind, check.observed_count, check.limit
                ));
            } else {
                self.reporter.error(&format!(
                    "Log {}s exceeded threshold: {} found, {} allowed.",
                    kind, check.observed_count, check.limit
                ));
            }
        }

        (errors, warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{CommandOutput, Invocation, ProcessRunner};
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct Canned(HashMap<&'static str, u16>);

    impl HttpProbe for Canned {
        fn status(&self, url: &str, _max_redirects: usize) -> u16 {
            self.0
                .iter()
                .find(|(suffix, _)| url.ends_with(*suffix))
                .map(|(_, code)| *code)
                .unwrap_or(0)
        }
    }

    struct Watchdog {
        listing: &'static str,
        commands: RefCell<Vec<String>>,
    }

    impl ProcessRunner for Watchdog {
        fn run(&self, invocation: &Invocation, _streaming: bool) -> CommandOutput {
            self.commands.borrow_mut().push(invocation.command.clone());
            CommandOutput {
                stdout: self.listing.to_string(),
                stderr: String::new(),
                success: true,
                exit_code: 0,
            }
        }
    }

    struct Silent;

    impl Reporter for Silent {
        fn title(&self, _: &str) {}
        fn text(&self, _: &str) {}
        fn notice(&self, _: &str) {}
        fn success(&self, _: &str) {}
        fn warning(&self, _: &str) {}
        fn error(&self, _: &str) {}
        fn table(&self, _: &[&str], _: &[Vec<String>]) {}
    }

    fn context() -> ExecutionContext {
        let mut context = ExecutionContext::new("@self");
        context.uri = Some("http://www.docksal".to_string());
        context
    }

    #[test]
    fn log_thresholds_are_independent() {
        let probe = Canned(HashMap::from([("/a", 200)]));
        let watchdog = Watchdog {
            listing: r#"[{"severity":"Error"},{"severity":"Warning"},{"severity":"Warning"}]"#,
            commands: RefCell::new(Vec::new()),
        };
        let runner = StepRunner::new(&watchdog, "drush");
        let config = CheckConfig::default();
        let checker = Checker {
            probe: &probe,
            runner: &runner,
            reporter: &Silent,
            config: &config,
            host_strategies: &[HostStrategy::ContextUri],
        };
        let request = CheckRequest {
            urls: Some("/a".to_string()),
            log_error_threshold: Some(1),
            log_warning_threshold: Some(1),
            ..Default::default()
        };

        let report = checker.run(&context(), &request).unwrap();
        assert!(report.log_errors.unwrap().passed());
        assert!(!report.log_warnings.unwrap().passed());
        assert!(!report.passed);

        let commands = watchdog.commands.borrow();
        assert_eq!(commands[0], "drush @self watchdog:delete all --yes");
        assert_eq!(commands[1], "drush @self watchdog:show --format=json --count=1000");

        let err = report.into_result().unwrap_err();
        assert_eq!(err.code.as_str(), "threshold.exceeded");
        assert_eq!(err.message, "log warnings exceeded threshold");
    }

    #[test]
    fn no_log_threshold_means_no_log_commands() {
        let probe = Canned(HashMap::from([("/a", 200)]));
        let watchdog = Watchdog {
            listing: "",
            commands: RefCell::new(Vec::new()),
        };
        let runner = StepRunner::new(&watchdog, "drush");
        let config = CheckConfig::default();
        let checker = Checker {
            probe: &probe,
            runner: &runner,
            reporter: &Silent,
            config: &config,
            host_strategies: &[HostStrategy::ContextUri],
        };
        let request = CheckRequest {
            urls: Some("/a".to_string()),
            ..Default::default()
        };

        let report = checker.run(&context(), &request).unwrap();
        assert!(report.passed);
        assert_eq!(report.base_uri.as_deref(), Some("http://www.docksal"));
        assert!(watchdog.commands.borrow().is_empty());
    }

    #[test]
    fn explicit_uri_wins_over_context() {
        let probe = Canned(HashMap::from([("/a", 200)]));
        let watchdog = Watchdog {
            listing: "",
            commands: RefCell::new(Vec::new()),
        };
        let runner = StepRunner::new(&watchdog, "drush");
        let config = CheckConfig::default();
        let checker = Checker {
            probe: &probe,
            runner: &runner,
            reporter: &Silent,
            config: &config,
            host_strategies: &[HostStrategy::ContextUri],
        };
        let request = CheckRequest {
            urls: Some("/a".to_string()),
            uri: Some("https://override.test/".to_string()),
            ..Default::default()
        };

        let report = checker.run(&context(), &request).unwrap();
        assert_eq!(report.base_uri.as_deref(), Some("https://override.test"));
    }

    #[test]
    fn empty_url_set_is_missing_argument() {
        let probe = Canned(HashMap::new());
        let watchdog = Watchdog {
            listing: "",
            commands: RefCell::new(Vec::new()),
        };
        let runner = StepRunner::new(&watchdog, "drush");
        let config = CheckConfig::default();
        let checker = Checker {
            probe: &probe,
            runner: &runner,
            reporter: &Silent,
            config: &config,
            host_strategies: &[],
        };
        let err = checker
            .run(&context(), &CheckRequest::default())
            .unwrap_err();
        assert_eq!(err.code.as_str(), "validation.missing_argument");
    }
}
