//! Clap derive structures for the `topo` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// topo -- download monitored entities from a monitoring environment
#[derive(Debug, Parser)]
#[command(
    name = "topo",
    version,
    about = "Download monitored entities from a monitoring environment",
    long_about = "Downloads the entities of every entity type (or a chosen subset)\n\
        from a monitoring environment and writes them as configuration\n\
        records. Entity types are fetched concurrently; properties the\n\
        platform refuses for a type are dropped and the type is retried.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file to read instead of the platform default
    #[arg(long, env = "TOPO_CONFIG", global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Environment profile to use
    #[arg(long = "env", short = 'e', env = "TOPO_ENVIRONMENT", global = true)]
    pub environment: Option<String>,

    /// Environment URL (overrides profile)
    #[arg(long, env = "TOPO_URL", global = true)]
    pub url: Option<String>,

    /// Name of the environment variable holding the API token
    #[arg(long, global = true, value_name = "VAR")]
    pub token_env: Option<String>,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// One type id per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download data from an environment
    #[command(alias = "dl")]
    Download(DownloadArgs),

    /// List the entity types an environment knows about
    Types(TypesArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Download ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DownloadArgs {
    #[command(subcommand)]
    pub command: DownloadCommand,
}

#[derive(Debug, Subcommand)]
pub enum DownloadCommand {
    /// Download entities of all (or the given) entity types
    Entities(EntitiesArgs),
}

#[derive(Debug, Args)]
pub struct EntitiesArgs {
    /// Project name; records are written below <output-folder>/<project>
    #[arg(long)]
    pub project: Option<String>,

    /// Folder to write the project into
    #[arg(long, short = 'o', value_name = "DIR")]
    pub output_folder: Option<PathBuf>,

    /// Only download these entity types (comma-separated)
    #[arg(long, value_delimiter = ',', value_name = "TYPE,...")]
    pub specific_types: Vec<String>,

    /// Window start, in minutes before now
    #[arg(long, value_name = "MINUTES")]
    pub time_from_minutes: Option<i64>,

    /// Window end, in minutes before now
    #[arg(long, value_name = "MINUTES")]
    pub time_to_minutes: Option<i64>,

    /// Entities requested per page
    #[arg(long)]
    pub entity_page_size: Option<i64>,

    /// Max requests in flight
    #[arg(long)]
    pub concurrent_requests: Option<usize>,

    /// Overwrite an existing project folder
    #[arg(long, short = 'f')]
    pub force: bool,
}

// ── Types ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TypesArgs {
    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    pub output: OutputFormat,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
