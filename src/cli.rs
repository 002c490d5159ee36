use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "i3-xfce")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "i3 window manager integration for the xfce desktop", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbose mode (debug logs and the raw Ansible output)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Install the i3/xfce configuration parts
    Install(ApplyArgs),

    /// Remove the i3/xfce configuration parts
    Uninstall(ApplyArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Install / Uninstall
// ============================================================================

#[derive(Args, Debug, Clone, Default)]
pub struct ApplyArgs {
    /// Part to apply (repeatable, defaults to every available part)
    #[arg(short, long = "parts", value_name = "PART")]
    pub parts: Vec<String>,

    /// Dry run - report what would change without changing it
    #[arg(short, long, visible_alias = "dry-run")]
    pub dryrun: bool,
}
