use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "istate",
    about = "Interactive state provider: load, save and reconcile module state",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show which storage operations the provider supports
    Capabilities,
    /// Open a module session from a handshake fixture
    Load(LoadArgs),
    /// Show how a state file would be stored
    Plan(PlanArgs),
    /// Rewrite sensor-interactive URLs in a state file
    Rewrite(RewriteArgs),
}

#[derive(Args)]
pub struct LoadArgs {
    /// Handshake fixture (JSON)
    #[arg(long)]
    pub handshake: PathBuf,
    /// Answer every conflict prompt with this candidate instead of asking
    #[arg(long)]
    pub choose: Option<Choice>,
    /// Provider configuration (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Launch URL query string, e.g. "interactiveApi=attachment&documentId=..."
    #[arg(long)]
    pub query: Option<String>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum Choice {
    First,
    Second,
}

#[derive(Args)]
pub struct PlanArgs {
    /// State file (JSON)
    pub state: PathBuf,
    /// Provider configuration (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct RewriteArgs {
    /// State file (JSON)
    pub state: PathBuf,
    /// Target host domain
    #[arg(long)]
    pub domain: String,
}
