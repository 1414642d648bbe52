//! Confirmation-gated sequential step execution.
//!
//! A `Pipeline` is a confirmation question plus an ordered list of `Step`s.
//! Steps are data; every workflow feeds its steps through the same `run`.

use serde::Serialize;

use crate::context::ExecutionContext;
use crate::error::{Error, Result, StepFailedDetails};
use crate::prompt::Prompter;
use crate::report::Reporter;
use crate::runner::{Operation, StepResult, StepRunner};

#[derive(Debug, Clone)]
pub struct Step {
    pub name: String,
    pub title: String,
    pub operation: Operation,
    /// Failure aborts the pipeline when set; otherwise warn and continue.
    pub required: bool,
    /// Omitted entirely: no output, no execution.
    pub skip: bool,
    /// Earlier step that must have succeeded for this one to run.
    pub needs: Option<String>,
    pub failure_hint: Option<String>,
    /// Runs under this context instead of the executor's.
    pub context: Option<ExecutionContext>,
}

impl Step {
    pub fn required(name: &str, title: &str, operation: Operation) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            operation,
            required: true,
            skip: false,
            needs: None,
            failure_hint: None,
            context: None,
        }
    }

    pub fn optional(name: &str, title: &str, operation: Operation) -> Self {
        Self {
            required: false,
            ..Self::required(name, title, operation)
        }
    }

    pub fn skip_if(mut self, skip: bool) -> Self {
        self.skip = skip;
        self
    }

    pub fn needs(mut self, step: &str) -> Self {
        self.needs = Some(step.to_string());
        self
    }

    pub fn with_hint(mut self, hint: &str) -> Self {
        self.failure_hint = Some(hint.to_string());
        self
    }

    pub fn in_context(mut self, context: ExecutionContext) -> Self {
        self.context = Some(context);
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Confirming,
    Running,
    Completed,
    Aborted,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Succeeded,
    Failed,
    /// Optional step failed; the pipeline carried on.
    Warned,
    /// Not run because a step it needs did not succeed.
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub name: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub state: PipelineState,
    pub confirmed: bool,
    pub steps: Vec<StepReport>,
    /// Steps omitted by skip flags.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
}

impl PipelineOutcome {
    fn declined() -> Self {
        Self {
            state: PipelineState::Idle,
            confirmed: false,
            steps: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn executed(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.status != StepStatus::Skipped)
            .map(|s| s.name.as_str())
            .collect()
    }

    pub fn report(&self, name: &str) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// An aborted outcome becomes a `step.failed` error naming the failed step.
    pub fn into_result(self) -> Result<Self> {
        if self.state != PipelineState::Aborted {
            return Ok(self);
        }

        let failed = self
            .steps
            .iter()
            .find(|s| s.status == StepStatus::Failed)
            .cloned();

        match failed {
            Some(report) => Err(Error::step_failed(StepFailedDetails {
                step: report.name,
                context: report.context.unwrap_or_default(),
                exit_code: report.exit_code.unwrap_or(-1),
                stderr: report.error_output.unwrap_or_default(),
            })),
            None => Err(Error::internal_unexpected(
                "Pipeline aborted without a failed step",
            )),
        }
    }
}

/// Runs one step. The boundary between the pipeline and process execution.
pub trait StepExecutor {
    fn execute(&self, step: &Step) -> StepResult;

    /// Name of the context the step runs under, for error details.
    fn context_name(&self, step: &Step) -> String;
}

/// Executes steps through a `StepRunner` under a fixed context.
pub struct ContextExecutor<'a> {
    runner: &'a StepRunner<'a>,
    context: &'a ExecutionContext,
    streaming: bool,
}

impl<'a> ContextExecutor<'a> {
    pub fn new(runner: &'a StepRunner<'a>, context: &'a ExecutionContext, streaming: bool) -> Self {
        Self {
            runner,
            context,
            streaming,
        }
    }
}

impl StepExecutor for ContextExecutor<'_> {
    fn execute(&self, step: &Step) -> StepResult {
        let context = step.context.as_ref().unwrap_or(self.context);
        self.runner.run(context, &step.operation, self.streaming)
    }

    fn context_name(&self, step: &Step) -> String {
        step.context
            .as_ref()
            .unwrap_or(self.context)
            .name
            .clone()
    }
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    question: String,
    steps: Vec<Step>,
}

impl Pipeline {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            steps: Vec::new(),
        }
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn extend(&mut self, steps: impl IntoIterator<Item = Step>) {
        self.steps.extend(steps);
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Confirm, then run every non-skipped step in order.
    pub fn run(
        &self,
        prompter: &dyn Prompter,
        executor: &dyn StepExecutor,
        reporter: &dyn Reporter,
    ) -> PipelineOutcome {
        let mut state = PipelineState::Confirming;
        log_status!("pipeline", "{:?}: {}", state, self.question);

        if !prompter.confirm(&self.question) {
            reporter.notice("Nothing was done.");
            return PipelineOutcome::declined();
        }

        state = PipelineState::Running;
        let mut reports: Vec<StepReport> = Vec::with_capacity(self.steps.len());
        let mut skipped = Vec::new();

        for step in &self.steps {
            if step.skip {
                log_status!("pipeline", "Skipping {} by request", step.name);
                skipped.push(step.name.clone());
                continue;
            }

            if let Some(dep) = unmet_dependency(step, &reports) {
                reporter.warning(&format!(
                    "Skipped {}: '{}' did not succeed",
                    step.name, dep
                ));
                reports.push(StepReport {
                    name: step.name.clone(),
                    status: StepStatus::Skipped,
                    exit_code: None,
                    error_output: None,
                    context: None,
                });
                continue;
            }

            reporter.text(&format!("{}...", step.title));
            let result = executor.execute(step);

            if result.success {
                reporter.success(&format!("{}: done", step.title));
                reports.push(StepReport {
                    name: step.name.clone(),
                    status: StepStatus::Succeeded,
                    exit_code: Some(result.exit_code),
                    error_output: None,
                    context: None,
                });
                continue;
            }

            let error_output = result.error_output.trim().to_string();
            let mut report = StepReport {
                name: step.name.clone(),
                status: StepStatus::Failed,
                exit_code: Some(result.exit_code),
                error_output: (!error_output.is_empty()).then(|| error_output.clone()),
                context: Some(executor.context_name(step)),
            };

            if step.required {
                reporter.error(&format!("{}: failed (exit {})", step.title, result.exit_code));
                if !error_output.is_empty() {
                    reporter.error(&error_output);
                }
                reports.push(report);
                state = PipelineState::Aborted;
                break;
            }

            reporter.warning(&format!("{}: failed, continuing", step.title));
            if !error_output.is_empty() {
                reporter.warning(&error_output);
            }
            if let Some(hint) = &step.failure_hint {
                reporter.warning(hint);
            }
            report.status = StepStatus::Warned;
            reports.push(report);
        }

        if state == PipelineState::Running {
            state = PipelineState::Completed;
        }
        log_status!("pipeline", "{:?} after {} step(s)", state, reports.len());

        PipelineOutcome {
            state,
            confirmed: true,
            steps: reports,
            skipped,
        }
    }
}

fn unmet_dependency(step: &Step, reports: &[StepReport]) -> Option<String> {
    let dep = step.needs.as_ref()?;
    let succeeded = reports
        .iter()
        .any(|r| &r.name == dep && r.status == StepStatus::Succeeded);
    (!succeeded).then(|| dep.clone())
}
