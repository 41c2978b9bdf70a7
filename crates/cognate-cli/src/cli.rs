use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use cognate_ledger::{SortDirection, SortField};
use cognate_types::{ActionCategory, ActionStatus, ActorType, ReviewStatus, Severity};

#[derive(Parser)]
#[command(
    name = "cogl",
    about = "Cognate Ledger: append, audit, and query a hash-chained event log",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// JSON Lines ledger file
    #[arg(short, long, global = true, default_value = "ledger.jsonl")]
    pub ledger: PathBuf,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// File holding a hex-encoded 32-byte Ed25519 secret key
    #[arg(long, global = true)]
    pub signing_key: Option<PathBuf>,

    #[arg(long, global = true, default_value = "cogl")]
    pub key_id: String,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Record an event from a JSON payload
    Append(AppendArgs),
    /// Verify the hash chain
    Verify(RangeArgs),
    /// Filter, sort, and page through entries
    Query(QueryArgs),
    /// Show one entry
    Show(ShowArgs),
    /// Flag, review, or add notes to an entry
    Annotate(AnnotateArgs),
    /// Counts by category, actor type, and severity
    Stats,
    /// Merkle commitment over a range of entries
    Checkpoint(CheckpointArgs),
}

#[derive(Args)]
pub struct AppendArgs {
    /// Payload file, or `-` for stdin
    pub payload: String,
}

#[derive(Args, Default)]
pub struct RangeArgs {
    #[arg(long)]
    pub from: Option<u64>,
    #[arg(long)]
    pub to: Option<u64>,
}

#[derive(Args, Default)]
pub struct QueryArgs {
    #[arg(long = "actor-type")]
    pub actor_types: Vec<ActorType>,
    #[arg(long = "category")]
    pub categories: Vec<ActionCategory>,
    #[arg(long = "severity")]
    pub severities: Vec<Severity>,
    #[arg(long = "status")]
    pub statuses: Vec<ActionStatus>,
    #[arg(long = "space")]
    pub spaces: Vec<String>,
    #[arg(long = "project")]
    pub projects: Vec<String>,
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    #[arg(long)]
    pub flagged: bool,
    /// RFC 3339 lower bound on `when`
    #[arg(long)]
    pub since: Option<DateTime<Utc>>,
    /// RFC 3339 upper bound on `when`
    #[arg(long)]
    pub until: Option<DateTime<Utc>>,
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long, default_value = "when")]
    pub sort: SortField,
    #[arg(long, default_value = "desc")]
    pub direction: SortDirection,
    #[arg(long, default_value = "1")]
    pub page: u32,
    #[arg(long)]
    pub page_size: Option<u32>,
    /// Continue after this cursor instead of paging by number
    #[arg(long, conflicts_with = "page")]
    pub cursor: Option<String>,
}

#[derive(Args)]
pub struct ShowArgs {
    pub sequence: u64,
}

#[derive(Args)]
pub struct AnnotateArgs {
    pub sequence: u64,
    #[arg(long, conflicts_with = "unflag")]
    pub flag: bool,
    #[arg(long)]
    pub unflag: bool,
    #[arg(long)]
    pub review: Option<ReviewStatus>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Args)]
pub struct CheckpointArgs {
    #[command(flatten)]
    pub range: RangeArgs,
    /// Also print an inclusion proof for this sequence
    #[arg(long)]
    pub prove: Option<u64>,
}
