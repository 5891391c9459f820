use clap::Parser;

pub mod global;
pub mod root_commands;
pub mod subcommands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::Commands;

/// Actor recorded on events when `--actor` is not given.
pub const DEFAULT_ACTOR: &str = "user:cli";

/// Top-level CLI parser for the `brain` binary.
#[derive(Debug, Parser)]
#[command(name = "brain", version, about = "Brain - temporal entity store")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, raw
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project directory holding the records (defaults to the current directory)
    #[arg(short, long, global = true)]
    pub root: Option<String>,

    /// Actor recorded on change events
    #[arg(long, global = true, default_value = DEFAULT_ACTOR)]
    pub actor: String,
}

impl Cli {
    /// Extract ergonomic global flags struct for command handlers.
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            quiet: self.quiet,
            verbose: self.verbose,
            root: self.root.clone(),
            actor: self.actor.clone(),
        }
    }
}
