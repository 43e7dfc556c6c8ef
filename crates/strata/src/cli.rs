//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Strata - render, install and track multi-provider module releases
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to strata.yaml config file
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Module template registration
    #[command(subcommand)]
    Module(ModuleCommands),

    /// Release install, update and delete
    #[command(subcommand)]
    Release(ReleaseCommands),

    /// Inspect component records by provider
    #[command(subcommand)]
    Component(ComponentCommands),
}

// Module commands
#[derive(Subcommand, Debug)]
pub enum ModuleCommands {
    /// Register a module version from a template file
    #[command(disable_version_flag = true)]
    Add(ModuleAddArgs),

    /// List registered module versions
    List(ListArgs),
}

#[derive(Args, Debug)]
pub struct ModuleAddArgs {
    /// Module name
    pub name: String,

    /// Module version
    pub version: String,

    /// Template file producing the provider -> components manifest
    #[arg(short, long)]
    pub spec: Utf8PathBuf,
}

// Release commands
#[derive(Subcommand, Debug)]
pub enum ReleaseCommands {
    /// Install a new release
    #[command(disable_version_flag = true)]
    Install(ReleaseArgs),

    /// Update an existing release
    #[command(disable_version_flag = true)]
    Update(ReleaseArgs),

    /// Uninstall every component and delete the release
    Delete(DeleteArgs),

    /// List release names
    List(ListArgs),

    /// Show a release and its components
    Get(GetArgs),
}

#[derive(Args, Debug)]
pub struct ReleaseArgs {
    /// Release name
    pub name: String,

    /// Module name
    #[arg(short, long)]
    pub module: String,

    /// Module version (latest registered when omitted)
    #[arg(long, default_value = "")]
    pub version: String,

    /// YAML file with release values
    #[arg(short = 'f', long)]
    pub values: Option<Utf8PathBuf>,

    /// What to do when a component fails: delete or keep
    #[arg(long)]
    pub on_failure: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Release name
    pub name: String,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Release name
    pub name: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// Component commands
#[derive(Subcommand, Debug)]
pub enum ComponentCommands {
    /// List registered providers
    Providers,

    /// List component names for a provider
    List(ComponentListArgs),

    /// Show one component record
    Get(ComponentGetArgs),
}

#[derive(Args, Debug)]
pub struct ComponentListArgs {
    /// Provider name (e.g. chart, stream)
    pub provider: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ComponentGetArgs {
    /// Provider name (e.g. chart, stream)
    pub provider: String,

    /// Component key (e.g. the helm release name)
    pub key: String,
}
