//! `sync`: refresh the local environment from another environment.
//!
//! Composer, database and configuration sections run as one pipeline. The
//! composer and database steps warn and continue; a database step whose
//! prerequisite did not succeed is skipped.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::conf::{conf_steps, ConfOperation};
use crate::context::{build_overlay, ExecutionContext};
use crate::defaults::SyncConfig;
use crate::error::Result;
use crate::pipeline::{ContextExecutor, Pipeline, PipelineOutcome, PipelineState, Step};
use crate::registry::Alias;
use crate::resolver::Target;
use crate::runner::Operation;
use crate::session::Session;
use crate::utils::shell;

const LOCAL_KEY: &str = "local";

#[derive(Debug, Clone, Default)]
pub struct SyncRequest {
    pub site: Option<String>,
    pub from: Option<String>,
    pub as_environment: Option<String>,
    pub dump_dir: Option<String>,
    pub skip_composer: bool,
    pub skip_config: bool,
    pub skip_db_dump: bool,
    pub skip_db_import: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SyncPaths {
    pub docroot: PathBuf,
    pub project_dir: PathBuf,
    pub dump_dir: PathBuf,
    pub dump_file: PathBuf,
}

impl SyncPaths {
    /// Resolve dump and working paths. `dump_dir` from the command line is
    /// trimmed of surrounding slashes and taken relative to the docroot.
    pub fn resolve(
        site: &str,
        from_label: &str,
        local: Option<&Alias>,
        config: &SyncConfig,
        dump_dir: Option<&str>,
    ) -> Self {
        let docroot = PathBuf::from(
            local
                .and_then(|alias| alias.root.clone())
                .unwrap_or_else(|| config.docroot.clone()),
        );

        let project_dir = match &config.project_dir {
            Some(dir) => PathBuf::from(dir),
            None => docroot
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| docroot.clone()),
        };

        let relative = match dump_dir {
            Some(dir) => dir.trim_matches('/').to_string(),
            None => config.dump_dir.clone(),
        };
        let dump_dir = docroot.join(relative);
        let dump_file = dump_dir.join(format!("{}.{}.sql", site, from_label));

        Self {
            docroot,
            project_dir,
            dump_dir,
            dump_file,
        }
    }
}

/// Everything `sync_steps` needs once targets are resolved.
pub struct SyncPlan<'p> {
    pub drush_bin: &'p str,
    pub composer_command: &'p str,
    pub from_alias: String,
    pub local_alias: String,
    pub paths: &'p SyncPaths,
    pub request: &'p SyncRequest,
}

/// Composer and database steps. Configuration steps are appended by the caller.
pub fn sync_steps(plan: &SyncPlan) -> Vec<Step> {
    let paths = plan.paths;
    let request = plan.request;
    let dump_file = shell::quote_path(&paths.dump_file.to_string_lossy());

    vec![
        Step::optional(
            "composer",
            "Installing Composer dependencies",
            Operation::shell(
                plan.composer_command,
                Some(paths.project_dir.to_string_lossy().to_string()),
            ),
        )
        .with_hint("Run with --verbose to see full Composer output")
        .skip_if(request.skip_composer),
        Step::optional(
            "dump-dir",
            "Preparing database dump directory",
            Operation::EnsureWritableDir {
                path: paths.dump_dir.clone(),
            },
        )
        .skip_if(request.skip_db_dump),
        Step::optional(
            "db-dump",
            "Dumping database to file",
            Operation::shell(
                format!(
                    "{} {} sql:dump --gzip > {}",
                    plan.drush_bin, plan.from_alias, dump_file
                ),
                None,
            ),
        )
        .needs("dump-dir")
        .with_hint("Import will use old file if one exists.")
        .skip_if(request.skip_db_dump),
        Step::optional(
            "dump-file",
            "Checking database dump file",
            Operation::RequireFile {
                path: paths.dump_file.clone(),
            },
        )
        .with_hint("Skipping database import.")
        .skip_if(request.skip_db_import),
        Step::optional(
            "db-drop",
            "Dropping local database",
            Operation::drush("sql:drop")
                .on_alias(&plan.local_alias)
                .option("yes", true),
        )
        .needs("dump-file")
        .with_hint("Skipping database import.")
        .skip_if(request.skip_db_import),
        Step::optional(
            "db-import",
            "Importing database from file",
            Operation::shell(
                format!(
                    "gunzip -c {} | {} {} sqlc",
                    dump_file, plan.drush_bin, plan.local_alias
                ),
                Some(paths.docroot.to_string_lossy().to_string()),
            ),
        )
        .needs("db-drop")
        .skip_if(request.skip_db_import),
    ]
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub site: String,
    pub from: Target,
    #[serde(rename = "as")]
    pub as_target: Target,
    pub paths: SyncPaths,
    #[serde(flatten)]
    pub outcome: PipelineOutcome,
}

pub fn run(session: &Session, request: &SyncRequest) -> Result<SyncOutcome> {
    let resolver = session.resolver();
    let defaults = &session.defaults.resolve;

    let site = resolver.resolve_site(request.site.as_deref(), &defaults.default_site, "sync")?;
    let from = resolver.resolve_environment(
        &site,
        request.from.as_deref(),
        &defaults.default_sync_from,
        "import from",
    )?;
    let as_target = resolver.resolve_environment(
        &site,
        request.as_environment.as_deref(),
        &defaults.default_environment,
        "import as",
    )?;

    let local_id = format!("{}.{}", site, LOCAL_KEY);
    let local = session.alias(&local_id)?;
    let as_alias = session.alias(&as_target.alias_id)?;

    let paths = SyncPaths::resolve(
        &site,
        &from.environment,
        Some(local),
        &session.defaults.sync,
        request.dump_dir.as_deref(),
    );
    log_status!("sync", "Dump file {}", paths.dump_file.display());

    let local_context = ExecutionContext::for_alias(local);
    let plan = SyncPlan {
        drush_bin: session.runner.drush_bin(),
        composer_command: &session.defaults.sync.composer_command,
        from_alias: format!("@{}", from.alias_id),
        local_alias: local.name(),
        paths: &paths,
        request,
    };

    let mut pipeline = Pipeline::new(format!(
        "Sync {} from {} and import as {}?",
        site, from.environment, as_target.environment
    ));
    pipeline.extend(sync_steps(&plan));

    // Configuration runs on the local site as the "as" environment. Probing
    // is only worth doing when the section will run.
    if !request.skip_config {
        let config_context =
            build_overlay(&local_context, as_alias, session.defaults.context.uri_overlay);
        let steps = conf_steps(ConfOperation::Import, session.probe, &config_context);
        pipeline.extend(
            steps
                .into_iter()
                .map(|step| step.in_context(config_context.clone())),
        );
    } else {
        pipeline.push(
            Step::required(
                "config",
                "Importing configuration",
                Operation::drush("config-import").option("yes", true),
            )
            .skip_if(true),
        );
    }

    let executor = ContextExecutor::new(session.runner, &local_context, session.streaming);
    session.reporter.title(&format!(
        "Syncing {} from {} and importing as {}",
        site, from.environment, as_target.environment
    ));
    let outcome = pipeline
        .run(session.prompter, &executor, session.reporter)
        .into_result()?;

    if outcome.state == PipelineState::Completed {
        session.reporter.success(&format!(
            "Synced {} from {} as {}.",
            site, from.environment, as_target.environment
        ));
    }

    Ok(SyncOutcome {
        site,
        from,
        as_target,
        paths,
        outcome,
    })
}
