//! Command line arguments of the `bakers-registry` binary.

use std::path::PathBuf;

use argh::FromArgs;
use registry_history::Since;
use registry_primitives::Level;

/// Browse the history of the bakers registry.
#[derive(FromArgs, Debug)]
pub(crate) struct Args {
    #[argh(option, description = "config file (TOML), defaults apply when omitted", short = 'c')]
    pub(crate) config: Option<PathBuf>,

    #[argh(option, description = "node RPC URL, overrides the config file")]
    pub(crate) rpc_url: Option<String>,

    #[argh(subcommand)]
    pub(crate) subc: Subcommand,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
pub(crate) enum Subcommand {
    Log(SubcLog),
    Get(SubcGet),
    All(SubcAll),
    New(SubcNew),
    Plan(SubcPlan),
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(
    subcommand,
    name = "log",
    description = "prints the registry change log, most recent first"
)]
pub(crate) struct SubcLog {
    #[argh(
        option,
        description = "window start, exclusive: level:N, cycle:N or N (default: two cycles back)"
    )]
    pub(crate) since: Option<Since>,

    #[argh(switch, description = "whole history, ignores --since")]
    pub(crate) full: bool,

    #[argh(switch, description = "compare stored records instead of decoded ones")]
    pub(crate) raw: bool,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "get", description = "prints one baker's entry")]
pub(crate) struct SubcGet {
    #[argh(positional, description = "baker address")]
    pub(crate) baker: String,

    #[argh(switch, description = "print the stored record")]
    pub(crate) raw: bool,

    #[argh(option, description = "block level to read at (default head)")]
    pub(crate) level: Option<Level>,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(
    subcommand,
    name = "all",
    description = "prints every registry entry, reconstructed from its full history"
)]
pub(crate) struct SubcAll {
    #[argh(switch, description = "print stored records")]
    pub(crate) raw: bool,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(
    subcommand,
    name = "new",
    description = "prints a default entry to start a registration from"
)]
pub(crate) struct SubcNew {}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(
    subcommand,
    name = "plan",
    description = "compares an entry file with the baker's current entry"
)]
pub(crate) struct SubcPlan {
    #[argh(positional, description = "baker address")]
    pub(crate) baker: String,

    #[argh(positional, description = "entry in display form (.json)")]
    pub(crate) input: PathBuf,
}
