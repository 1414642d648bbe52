//! Optional-component detection on a target.

use serde_json::Value;

use crate::context::ExecutionContext;
use crate::runner::{Operation, StepRunner};

/// Module gating `import-blocks`/`export-blocks` and the taxonomy steps.
pub const STRUCTURE_SYNC: &str = "structure_sync";
/// Module gating the default content import.
pub const DEFAULT_CONTENT_DEPLOY: &str = "default_content_deploy";

pub trait CapabilityProbe {
    /// Whether `component` is enabled on the context's target. Never fails:
    /// anything short of a positive answer is `false`.
    fn is_enabled(&self, context: &ExecutionContext, component: &str) -> bool;
}

/// Probe backed by `pm-list --status=enabled --format=json`.
pub struct ModuleListProbe<'a> {
    runner: &'a StepRunner<'a>,
}

impl<'a> ModuleListProbe<'a> {
    pub fn new(runner: &'a StepRunner<'a>) -> Self {
        Self { runner }
    }
}

impl CapabilityProbe for ModuleListProbe<'_> {
    fn is_enabled(&self, context: &ExecutionContext, component: &str) -> bool {
        let operation = Operation::drush("pm-list")
            .option("status", "enabled")
            .option("format", "json");

        let result = self.runner.run(context, &operation, false);
        if !result.success {
            log_status!(
                "probe",
                "pm-list failed for {} (exit {}), treating {} as absent",
                context.name,
                result.exit_code,
                component
            );
            return false;
        }

        enabled_in_listing(&result.output, component)
    }
}

/// Key membership in a `pm-list` JSON listing.
pub fn enabled_in_listing(output: &str, component: &str) -> bool {
    match serde_json::from_str::<Value>(output.trim()) {
        Ok(Value::Object(modules)) => modules.contains_key(component),
        Ok(_) => false,
        Err(e) => {
            log_status!("probe", "Unparsable module listing: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{CommandOutput, Invocation, ProcessRunner};

    struct Canned {
        stdout: &'static str,
        exit_code: i32,
    }

    impl ProcessRunner for Canned {
        fn run(&self, _invocation: &Invocation, _streaming: bool) -> CommandOutput {
            CommandOutput {
                stdout: self.stdout.to_string(),
                stderr: String::new(),
                success: self.exit_code == 0,
                exit_code: self.exit_code,
            }
        }
    }

    const LISTING: &str = r#"{"structure_sync":{"status":"Enabled"},"node":{"status":"Enabled"}}"#;

    #[test]
    fn detects_enabled_module() {
        let canned = Canned {
            stdout: LISTING,
            exit_code: 0,
        };
        let runner = StepRunner::new(&canned, "drush");
        let probe = ModuleListProbe::new(&runner);
        let context = ExecutionContext::new("@self");
        assert!(probe.is_enabled(&context, STRUCTURE_SYNC));
        assert!(!probe.is_enabled(&context, DEFAULT_CONTENT_DEPLOY));
    }

    #[test]
    fn failed_listing_means_absent() {
        let canned = Canned {
            stdout: LISTING,
            exit_code: 1,
        };
        let runner = StepRunner::new(&canned, "drush");
        let probe = ModuleListProbe::new(&runner);
        assert!(!probe.is_enabled(&ExecutionContext::new("@self"), STRUCTURE_SYNC));
    }

    #[test]
    fn garbage_listing_means_absent() {
        assert!(!enabled_in_listing("Drush command terminated abnormally", STRUCTURE_SYNC));
        assert!(!enabled_in_listing("[]", STRUCTURE_SYNC));
    }
}
