use clap::Args;
use serde::Serialize;

use sitekit::registry::{Alias, TargetRegistry};

use super::{CmdResult, GlobalArgs, Runtime};

#[derive(Args)]
pub struct TargetsArgs {
    /// Only list this site's environments
    pub site: Option<String>,
}

#[derive(Serialize)]
pub struct TargetsOutput {
    pub aliases_dir: String,
    pub sites: Vec<SiteTargets>,
}

#[derive(Serialize)]
pub struct SiteTargets {
    pub site: String,
    pub environments: Vec<Alias>,
}

pub fn run(args: TargetsArgs, global: &GlobalArgs) -> CmdResult<TargetsOutput> {
    let runtime = Runtime::load(global)?;
    let registry = &runtime.registry;
    let sites = registry.list_sites();

    let selected = match &args.site {
        Some(site) if !sites.contains(site) => {
            return Err(sitekit::Error::site_not_found(site.clone(), sites));
        }
        Some(site) => vec![site.clone()],
        None => sites,
    };

    let sites = selected
        .into_iter()
        .map(|site| SiteTargets {
            environments: registry
                .list_environments(&site)
                .iter()
                .filter_map(|entry| registry.alias(&entry.alias_id).cloned())
                .collect(),
            site,
        })
        .collect();

    Ok((
        TargetsOutput {
            aliases_dir: runtime.defaults.aliases_path().display().to_string(),
            sites,
        },
        0,
    ))
}
