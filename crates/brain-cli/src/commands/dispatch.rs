use brain_store::Brain;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;

/// Dispatch a parsed command to the corresponding handler module.
pub fn dispatch(command: Commands, brain: &Brain, flags: &GlobalFlags) -> anyhow::Result<()> {
    match command {
        Commands::Create(args) => commands::entity::create(&args, brain, flags),
        Commands::Show(args) => commands::entity::show(&args, brain, flags),
        Commands::Set(args) => commands::entity::set(&args, brain, flags),
        Commands::Tag(args) => commands::entity::tag(&args, brain, flags),
        Commands::Alias(args) => commands::entity::alias(&args, brain, flags),
        Commands::Status(args) => commands::entity::status(&args, brain, flags),
        Commands::Confidence(args) => commands::entity::confidence(&args, brain, flags),
        Commands::Verify(args) => commands::entity::verify(&args, brain, flags),
        Commands::Relate(args) => commands::relationship::relate(&args, brain, flags),
        Commands::Unrelate(args) => commands::relationship::unrelate(&args, brain, flags),
        Commands::Relationships(args) => commands::relationship::list(&args, brain, flags),
        Commands::Resolve(args) => commands::registry::resolve(&args, brain, flags),
        Commands::Registry { action } => commands::registry::handle(&action, brain, flags),
        Commands::Migrate(args) => commands::migrate::handle(&args, brain, flags),
        Commands::Schema(args) => commands::schema::handle(&args, flags),
    }
}
