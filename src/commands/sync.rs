use clap::Args;

use sitekit::sync::{SyncOutcome, SyncRequest};

use super::{CmdResult, GlobalArgs, Runtime};

#[derive(Args)]
pub struct SyncArgs {
    /// Site to sync
    pub site: Option<String>,
    /// Environment to import from
    pub environment_from: Option<String>,
    /// Environment to import configuration as
    pub environment_as: Option<String>,

    /// Dump directory, relative to the local docroot
    #[arg(long, value_name = "PATH")]
    pub dump_dir: Option<String>,

    /// Skip installing Composer dependencies
    #[arg(long)]
    pub skip_composer: bool,

    /// Skip the configuration import
    #[arg(long)]
    pub skip_config: bool,

    /// Skip dumping the source database
    #[arg(long)]
    pub skip_db_dump: bool,

    /// Skip importing the dump into the local database
    #[arg(long)]
    pub skip_db_import: bool,
}

pub fn run(args: SyncArgs, global: &GlobalArgs) -> CmdResult<SyncOutcome> {
    let runtime = Runtime::load(global)?;
    let request = SyncRequest {
        site: args.site,
        from: args.environment_from,
        as_environment: args.environment_as,
        dump_dir: args.dump_dir,
        skip_composer: args.skip_composer,
        skip_config: args.skip_config,
        skip_db_dump: args.skip_db_dump,
        skip_db_import: args.skip_db_import,
    };

    let outcome = runtime.with_session(|session| sitekit::sync::run(session, &request))?;
    Ok((outcome, 0))
}
