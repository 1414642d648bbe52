use clap::{Parser, Subcommand};

use commands::GlobalArgs;

mod commands;
mod output;
mod tty;

use commands::{check_url, conf, sync, targets};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "sitekit")]
#[command(version = VERSION)]
#[command(about = "Configuration import/export, environment sync and health checks for multi-environment sites")]
struct Cli {
    /// Stream step output as it is produced
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Answer yes to the confirmation question
    #[arg(short = 'y', long, global = true)]
    yes: bool,

    /// Directory holding <site>.site.yml alias files
    #[arg(long, global = true, value_name = "PATH")]
    aliases_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import or export configuration as an environment
    #[command(visible_alias = "kc")]
    Conf(conf::ConfArgs),
    /// Sync the local environment from another environment
    #[command(visible_alias = "ks")]
    Sync(sync::SyncArgs),
    /// Check HTTP response codes and log severities
    #[command(visible_alias = "url-check")]
    CheckUrl(check_url::CheckUrlArgs),
    /// List registered sites and environments
    Targets(targets::TargetsArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let global = GlobalArgs {
        verbose: cli.verbose,
        yes: cli.yes,
        aliases_dir: cli.aliases_dir,
    };

    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    if let Err(e) = output::print_json_result(json_result) {
        eprintln!("{}", e);
        return std::process::ExitCode::from(1);
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
