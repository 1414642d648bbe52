use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use sitekit::check::{CheckReport, CheckRequest, Checker};
use sitekit::context::{build_overlay, ExecutionContext, UriOverlay};
use sitekit::health::ReqwestProbe;
use sitekit::resolver::Target;

use super::{CmdResult, GlobalArgs, Runtime};

#[derive(Args)]
pub struct CheckUrlArgs {
    /// URLs to check, comma-separated, with optional desired code: '/a|200,/old|301'
    #[arg(long)]
    pub urls: Option<String>,

    /// YAML file mapping URLs to desired HTTP codes
    #[arg(long, value_name = "PATH", visible_alias = "url-file")]
    pub file: Option<PathBuf>,

    /// Key path inside the URL file (dotted or JSONPath)
    #[arg(long, value_name = "PATH")]
    pub file_key: Option<String>,

    /// Mismatches allowed before the check fails
    #[arg(long, default_value_t = 0)]
    pub url_threshold: usize,

    /// Log errors allowed during the check
    #[arg(long, visible_alias = "watchdog-error-threshold")]
    pub log_error_threshold: Option<usize>,

    /// Log warnings allowed during the check
    #[arg(long, visible_alias = "watchdog-warning-threshold")]
    pub log_warning_threshold: Option<usize>,

    /// Fail on any 5xx response regardless of thresholds
    #[arg(long = "fail-500")]
    pub fail_500: bool,

    /// Check as this site
    #[arg(long)]
    pub site: Option<String>,

    /// Check as this environment label
    #[arg(long = "env")]
    pub environment: Option<String>,

    /// Base URI for relative URLs
    #[arg(long)]
    pub uri: Option<String>,
}

#[derive(Serialize)]
pub struct CheckUrlOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
    #[serde(flatten)]
    pub report: CheckReport,
}

pub fn run(args: CheckUrlArgs, global: &GlobalArgs) -> CmdResult<CheckUrlOutput> {
    let runtime = Runtime::load(global)?;
    let request = CheckRequest {
        urls: args.urls,
        file: args.file,
        file_key: args.file_key,
        url_threshold: args.url_threshold,
        log_error_threshold: args.log_error_threshold,
        log_warning_threshold: args.log_warning_threshold,
        fail_500: args.fail_500,
        uri: args.uri,
    };
    let wants_target = args.site.is_some() || args.environment.is_some();

    let output = runtime.with_session(|session| {
        let defaults = session.defaults;
        let local = ExecutionContext::local(defaults);

        let (target, context) = if wants_target {
            let target = session.resolver().resolve(
                args.site.as_deref(),
                args.environment.as_deref(),
                &defaults.resolve.default_site,
                &defaults.resolve.default_environment,
                "check",
            )?;
            let alias = session.alias(&target.alias_id)?;
            // Probing needs a concrete base URI.
            let context = build_overlay(&local, alias, UriOverlay::OptionsAndContext);
            (Some(target), context)
        } else {
            (None, local)
        };

        let probe = ReqwestProbe::new(defaults.check.timeout_secs);
        let checker = Checker {
            probe: &probe,
            runner: session.runner,
            reporter: session.reporter,
            config: &defaults.check,
            host_strategies: &defaults.context.host_strategies,
        };
        let report = checker.run(&context, &request)?.into_result()?;
        Ok(CheckUrlOutput { target, report })
    })?;

    Ok((output, 0))
}
