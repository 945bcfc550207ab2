use clap::{ArgGroup, Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "sharp")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Align a chef-repo branch with a configuration server", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output (and notifications)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Push a branch's cookbooks, data bags, roles and environments to the server
    Align(AlignArgs),

    /// List, show or apply rollback points
    Rollback(RollbackArgs),

    /// Dump roles, environments and data bags from the server
    Backup,

    /// Show the audit log
    History,

    /// List server contexts, or switch to one
    Server(ServerArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Align
// ============================================================================

#[derive(Args, Debug, Clone, Default)]
pub struct AlignArgs {
    /// Branch the working copy must be on
    pub branch: String,

    /// Environment whose cookbook pins are aligned
    pub environment: String,

    /// Align cookbooks
    #[arg(short = 'C', long = "cookbooks-only")]
    pub cookbooks: bool,

    /// Align data bags
    #[arg(short = 'D', long = "databags-only")]
    pub databags: bool,

    /// Align roles
    #[arg(short = 'R', long = "roles-only")]
    pub roles: bool,

    /// Align environments
    #[arg(short = 'N', long = "environments-only")]
    pub environments: bool,

    /// Also propose cookbook downgrades
    #[arg(short = 'f', long = "force-align")]
    pub force: bool,

    /// Write roles and data bag items that only exist on the server into the working copy
    #[arg(short = 'B', long = "dump-remote-only")]
    pub dump_remote_only: bool,
}

// ============================================================================
// Rollback
// ============================================================================

#[derive(Args, Debug, Clone)]
#[command(group(
    ArgGroup::new("action")
        .required(true)
        .args(["list", "to", "show"]),
))]
pub struct RollbackArgs {
    /// List rollback points
    #[arg(long)]
    pub list: bool,

    /// Restore the pins of a rollback point
    #[arg(long, value_name = "IDENTIFIER")]
    pub to: Option<u64>,

    /// Show what a rollback point contains
    #[arg(long, value_name = "IDENTIFIER")]
    pub show: Option<u64>,
}

// ============================================================================
// Server
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Server context to switch to
    pub name: Option<String>,

    /// Print only the active server name
    #[arg(long)]
    pub machine: bool,
}
