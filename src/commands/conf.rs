use clap::Args;

use sitekit::conf::{ConfOutcome, ConfRequest};

use super::{CmdResult, GlobalArgs, Runtime};

#[derive(Args)]
pub struct ConfArgs {
    /// Operation to perform: export or import
    pub operation: Option<String>,
    /// Site to run as (prompted when missing or unknown)
    pub site: Option<String>,
    /// Environment label to run as (prompted when missing or unknown)
    pub environment: Option<String>,
}

pub fn run(args: ConfArgs, global: &GlobalArgs) -> CmdResult<ConfOutcome> {
    let runtime = Runtime::load(global)?;
    let request = ConfRequest {
        operation: args.operation,
        site: args.site,
        environment: args.environment,
    };

    let outcome = runtime.with_session(|session| sitekit::conf::run(session, &request))?;
    Ok((outcome, 0))
}
