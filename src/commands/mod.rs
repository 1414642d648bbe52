use sitekit::capability::ModuleListProbe;
use sitekit::defaults::{self, Defaults};
use sitekit::prompt::{AssumeYes, Prompter};
use sitekit::registry::AliasDirectory;
use sitekit::report::TerminalReporter;
use sitekit::runner::{LocalProcessRunner, StepRunner};
use sitekit::session::Session;

use crate::tty::TerminalPrompter;

pub type CmdResult<T> = sitekit::Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    pub verbose: bool,
    pub yes: bool,
    pub aliases_dir: Option<String>,
}

/// Host-side collaborators for one invocation.
pub(crate) struct Runtime {
    pub defaults: Defaults,
    pub registry: AliasDirectory,
    reporter: TerminalReporter,
    prompter: TerminalPrompter,
    process: LocalProcessRunner,
    assume_yes: bool,
    verbose: bool,
}

impl Runtime {
    pub fn load(global: &GlobalArgs) -> sitekit::Result<Self> {
        let mut defaults = defaults::load_defaults()?;
        if let Some(dir) = &global.aliases_dir {
            defaults.aliases_dir = dir.clone();
        }
        let registry = AliasDirectory::load(&defaults.aliases_path())?;

        Ok(Self {
            defaults,
            registry,
            reporter: TerminalReporter::new(global.verbose),
            prompter: TerminalPrompter,
            process: LocalProcessRunner::new(),
            assume_yes: global.yes,
            verbose: global.verbose,
        })
    }

    pub fn with_session<T>(&self, f: impl FnOnce(&Session) -> sitekit::Result<T>) -> sitekit::Result<T> {
        let assume_yes = AssumeYes::new(&self.prompter);
        let prompter: &dyn Prompter = if self.assume_yes {
            &assume_yes
        } else {
            &self.prompter
        };
        let runner = StepRunner::new(&self.process, &self.defaults.drush_bin);
        let probe = ModuleListProbe::new(&runner);

        let session = Session {
            registry: &self.registry,
            prompter,
            reporter: &self.reporter,
            runner: &runner,
            probe: &probe,
            defaults: &self.defaults,
            streaming: self.verbose,
        };
        f(&session)
    }
}

pub mod check_url;
pub mod conf;
pub mod sync;
pub mod targets;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (sitekit::Result<serde_json::Value>, i32) {
    crate::tty::status("sitekit is working...");

    match command {
        crate::Commands::Conf(args) => dispatch!(args, global, conf),
        crate::Commands::Sync(args) => dispatch!(args, global, sync),
        crate::Commands::CheckUrl(args) => dispatch!(args, global, check_url),
        crate::Commands::Targets(args) => dispatch!(args, global, targets),
    }
}
