use clap::{Args, Subcommand};

use crate::cli::subcommands::RegistryCommands;

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Create a new entity record.
    Create(CreateArgs),
    /// Show an entity by id, slug, or alias.
    Show(ShowArgs),
    /// Set or clear a content field.
    Set(SetArgs),
    /// Add a tag.
    Tag(TagArgs),
    /// Add an alias.
    Alias(AliasArgs),
    /// Add a relationship to another entity.
    Relate(RelateArgs),
    /// End an open relationship.
    Unrelate(UnrelateArgs),
    /// Mark an entity or one of its relationships as verified.
    Verify(VerifyArgs),
    /// Change the lifecycle status.
    Status(StatusArgs),
    /// Set the confidence of an entity or one of its relationships.
    Confidence(ConfidenceArgs),
    /// List relationships with decayed confidence and staleness.
    Relationships(RelationshipsArgs),
    /// Look up a slug or alias in the registry.
    Resolve(ResolveArgs),
    /// Registry maintenance.
    Registry {
        #[command(subcommand)]
        action: RegistryCommands,
    },
    /// Upgrade legacy records and move them into the store layout.
    Migrate(MigrateArgs),
    /// Print JSON schemas.
    Schema(SchemaArgs),
}

#[derive(Clone, Debug, Args)]
pub struct CreateArgs {
    /// Entity type (person, team, squad, project, domain, experiment, system, brand).
    #[arg(value_name = "TYPE")]
    pub kind: String,
    /// Display name; the slug is derived from it.
    pub name: String,
    #[arg(long)]
    pub source: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub alias: Vec<String>,
    #[arg(long)]
    pub tag: Vec<String>,
    /// Profile field as key=value (e.g. role=Engineer).
    #[arg(long)]
    pub field: Vec<String>,
    /// YYYY-MM-DD
    #[arg(long)]
    pub valid_from: Option<String>,
    /// Markdown body.
    #[arg(long)]
    pub body: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct ShowArgs {
    pub reference: String,
    /// Include the Markdown body.
    #[arg(long)]
    pub body: bool,
}

#[derive(Clone, Debug, Args)]
pub struct SetArgs {
    pub reference: String,
    /// Field path, e.g. role, description, links.github, metadata.cost_center.
    pub field: String,
    pub value: Option<String>,
    /// Parse the value as JSON instead of a plain string.
    #[arg(long)]
    pub json: bool,
    /// Remove the field.
    #[arg(long, conflicts_with = "value", required_unless_present = "value")]
    pub unset: bool,
}

#[derive(Clone, Debug, Args)]
pub struct TagArgs {
    pub reference: String,
    pub tag: String,
}

#[derive(Clone, Debug, Args)]
pub struct AliasArgs {
    pub reference: String,
    pub alias: String,
}

#[derive(Clone, Debug, Args)]
pub struct RelateArgs {
    pub reference: String,
    /// Relationship type, e.g. reports-to, member-of, depends-on.
    #[arg(value_name = "TYPE")]
    pub kind: String,
    /// Target id, slug, or alias.
    pub target: String,
    #[arg(long)]
    pub since: Option<String>,
    #[arg(long)]
    pub until: Option<String>,
    #[arg(long)]
    pub role: Option<String>,
    #[arg(long)]
    pub confidence: Option<f64>,
    #[arg(long)]
    pub source: Option<String>,
    /// Also record the inverse edge on the target (e.g. manages for reports-to).
    #[arg(long)]
    pub inverse: bool,
}

#[derive(Clone, Debug, Args)]
pub struct UnrelateArgs {
    pub reference: String,
    #[arg(value_name = "TYPE")]
    pub kind: String,
    pub target: String,
    /// End date (defaults to today).
    #[arg(long)]
    pub until: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct VerifyArgs {
    pub reference: String,
    /// Verify the relationship of this type instead of the entity.
    #[arg(long = "type", requires = "target")]
    pub kind: Option<String>,
    #[arg(long, requires = "kind")]
    pub target: Option<String>,
    /// Verification date (defaults to today).
    #[arg(long)]
    pub on: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct StatusArgs {
    pub reference: String,
    /// active, inactive, archived, or pending.
    pub status: String,
}

#[derive(Clone, Debug, Args)]
pub struct ConfidenceArgs {
    pub reference: String,
    /// New score; clamped into [0, 1].
    #[arg(allow_negative_numbers = true)]
    pub value: f64,
    #[arg(long = "type", requires = "target")]
    pub kind: Option<String>,
    #[arg(long, requires = "kind")]
    pub target: Option<String>,
}

#[derive(Clone, Debug, Args)]
pub struct RelationshipsArgs {
    pub reference: String,
    /// Evaluation date (defaults to today).
    #[arg(long)]
    pub as_of: Option<String>,
    #[arg(long = "type")]
    pub kind: Option<String>,
    /// Only relationships not verified within the threshold.
    #[arg(long)]
    pub stale: bool,
    /// Staleness threshold in days (defaults to the configured value).
    #[arg(long)]
    pub threshold: Option<i64>,
    /// Include relationships that are not active on the evaluation date.
    #[arg(long)]
    pub all: bool,
}

#[derive(Clone, Debug, Args)]
pub struct ResolveArgs {
    pub query: String,
}

#[derive(Clone, Debug, Args)]
pub struct MigrateArgs {
    /// Run every step except writing records back.
    #[arg(long)]
    pub dry_run: bool,
    /// Worker pool size (defaults to the configured value).
    #[arg(long)]
    pub workers: Option<usize>,
    /// Process records one at a time.
    #[arg(long, conflicts_with = "workers")]
    pub sequential: bool,
}

#[derive(Clone, Debug, Args)]
pub struct SchemaArgs {
    /// Schema name; lists every schema when omitted.
    pub name: Option<String>,
}
