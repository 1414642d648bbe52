//! `conf`: import or export configuration as an environment.

use serde::Serialize;

use crate::capability::{CapabilityProbe, DEFAULT_CONTENT_DEPLOY, STRUCTURE_SYNC};
use crate::context::{build_overlay, ExecutionContext};
use crate::error::{Error, Result};
use crate::pipeline::{ContextExecutor, Pipeline, PipelineOutcome, PipelineState, Step};
use crate::prompt::ChoiceOption;
use crate::resolver::Target;
use crate::runner::Operation;
use crate::session::Session;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfOperation {
    Export,
    Import,
}

impl ConfOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfOperation::Export => "export",
            ConfOperation::Import => "import",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ConfOperation::Export => "Export",
            ConfOperation::Import => "Import",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "export" => Some(ConfOperation::Export),
            "import" => Some(ConfOperation::Import),
            _ => None,
        }
    }

    pub fn choices() -> Vec<ChoiceOption> {
        [ConfOperation::Export, ConfOperation::Import]
            .iter()
            .map(|op| ChoiceOption::new(op.as_str(), op.title()))
            .collect()
    }
}

/// Steps for one configuration operation. Optional module steps are decided
/// here, once, by probing `context`.
pub fn conf_steps(
    operation: ConfOperation,
    probe: &dyn CapabilityProbe,
    context: &ExecutionContext,
) -> Vec<Step> {
    let mut steps = vec![Step::required(
        "cache-clear",
        "Clearing cache",
        Operation::drush("cr"),
    )];

    let structure_sync = probe.is_enabled(context, STRUCTURE_SYNC);

    match operation {
        ConfOperation::Export => {
            steps.push(Step::required(
                "config-export",
                "Exporting configuration",
                Operation::drush("config-export").option("yes", true),
            ));
            if structure_sync {
                steps.push(structure_step("export-blocks", "Exporting blocks"));
                steps.push(structure_step("export-taxonomies", "Exporting taxonomies"));
            }
        }
        ConfOperation::Import => {
            steps.push(Step::required(
                "config-import",
                "Importing configuration",
                Operation::drush("config-import").option("yes", true),
            ));
            if structure_sync {
                steps.push(structure_step("import-blocks", "Syncing blocks"));
                steps.push(structure_step("import-taxonomies", "Syncing taxonomies"));
            }
            if probe.is_enabled(context, DEFAULT_CONTENT_DEPLOY) {
                steps.push(
                    Step::optional(
                        "default-content",
                        "Deploying content",
                        Operation::drush("default-content-deploy-import").option("yes", true),
                    )
                    .with_hint("Default content can be re-deployed with default-content-deploy-import"),
                );
            }
        }
    }

    steps
}

fn structure_step(command: &str, title: &str) -> Step {
    Step::optional(command, title, Operation::drush(command).option("choice", "full"))
}

#[derive(Debug, Clone, Default)]
pub struct ConfRequest {
    pub operation: Option<String>,
    pub site: Option<String>,
    pub environment: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfOutcome {
    pub operation: ConfOperation,
    pub target: Target,
    pub context: ExecutionContext,
    #[serde(flatten)]
    pub outcome: PipelineOutcome,
}

pub fn run(session: &Session, request: &ConfRequest) -> Result<ConfOutcome> {
    let resolver = session.resolver();
    let defaults = &session.defaults.resolve;

    let chosen = resolver.resolve_choice(
        "operation",
        request.operation.as_deref(),
        &ConfOperation::choices(),
        "Please select an operation to perform",
    )?;
    let operation = ConfOperation::parse(&chosen)
        .ok_or_else(|| Error::internal_unexpected(format!("Unknown operation '{}'", chosen)))?;

    let target = resolver.resolve(
        request.site.as_deref(),
        request.environment.as_deref(),
        &defaults.default_site,
        &defaults.default_environment,
        &format!("{} as", operation.as_str()),
    )?;

    let alias = session.alias(&target.alias_id)?;
    let base = ExecutionContext::local(session.defaults);
    let context = build_overlay(&base, alias, session.defaults.context.uri_overlay);

    let mut pipeline = Pipeline::new(format!(
        "{} site {} as {} environment?",
        operation.title(),
        target.site,
        target.environment
    ));
    pipeline.extend(conf_steps(operation, session.probe, &context));

    let executor = ContextExecutor::new(session.runner, &context, session.streaming);
    session.reporter.title(&format!(
        "Running {} on site:{} as environment:{}",
        operation.as_str(),
        target.site,
        target.environment
    ));
    let outcome = pipeline
        .run(session.prompter, &executor, session.reporter)
        .into_result()?;

    if outcome.state == PipelineState::Completed {
        session.reporter.success(&format!(
            "Finished {} on site {} as {} environment.",
            operation.as_str(),
            target.site,
            target.environment
        ));
    }

    Ok(ConfOutcome {
        operation,
        target,
        context,
        outcome,
    })
}
