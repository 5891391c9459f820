use clap::Subcommand;

/// Registry commands.
#[derive(Clone, Debug, Subcommand)]
pub enum RegistryCommands {
    /// Scan every record and rewrite the registry.
    Rebuild,
    /// Counts by type and status from the persisted registry.
    Stats,
}
