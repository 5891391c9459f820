use anyhow::Context;
use brain_core::confidence::{DecayPolicy, today};
use brain_core::entities::{Entity, Relationship};
use brain_core::enums::RelationshipType;
use brain_store::Brain;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::{RelateArgs, RelationshipsArgs, UnrelateArgs};
use crate::commands::shared::{mutation_response, parse_date, parse_optional_date};
use crate::output::output;

/// Handle `brain relate`.
///
/// With `--inverse` the implied edge is also added to the target, so the
/// target must be a stored entity. The target is checked before either
/// record is written.
pub fn relate(args: &RelateArgs, brain: &Brain, flags: &GlobalFlags) -> anyhow::Result<()> {
    let kind = RelationshipType::from(args.kind.as_str());
    if args.inverse && kind.inverse().is_none() {
        anyhow::bail!("relationship type '{kind}' has no inverse");
    }
    let owner = brain.resolve_id(&args.reference)?;
    let target = brain.resolve_id(&args.target)?;

    let mut relationship = Relationship::new(kind, target.clone());
    if let Some(since) = parse_optional_date(args.since.as_deref(), "since")? {
        relationship = relationship.with_since(since);
    }
    if let Some(until) = parse_optional_date(args.until.as_deref(), "until")? {
        relationship = relationship.with_until(until);
    }
    if let Some(role) = &args.role {
        relationship = relationship.with_role(role.clone());
    }
    if let Some(confidence) = args.confidence {
        relationship = relationship.with_confidence(confidence);
    }
    if let Some(source) = &args.source {
        relationship = relationship.with_source(source.clone());
    }
    let inverse = if args.inverse {
        relationship.inverse_for(&owner)
    } else {
        None
    };
    if let Some(inverse) = &inverse {
        let target_record = brain
            .get(&target)
            .with_context(|| format!("--inverse needs a stored target entity ({target})"))?;
        ensure_edge_is_new(&target_record.entity, inverse)?;
    }

    let (record, event) = brain.mutate(&owner, |helper, entity| {
        helper.add_relationship(entity, &flags.actor, relationship)
    })?;
    let mut response = mutation_response(&record.entity, Some(&event));

    if let Some(inverse) = inverse {
        let (target_record, inverse_event) = brain.mutate(&target, |helper, entity| {
            helper.add_relationship(entity, &flags.actor, inverse)
        })?;
        response["inverse"] = mutation_response(&target_record.entity, Some(&inverse_event));
    }
    output(&response, flags.format)
}

/// Fail if `entity` already has an open edge of the same type and target.
fn ensure_edge_is_new(entity: &Entity, edge: &Relationship) -> anyhow::Result<()> {
    if entity.has_open_relationship(&edge.kind, &edge.target) {
        anyhow::bail!(
            "{} already has an open {} relationship to {}",
            entity.id,
            edge.kind,
            edge.target
        );
    }
    Ok(())
}

/// Handle `brain unrelate`.
pub fn unrelate(args: &UnrelateArgs, brain: &Brain, flags: &GlobalFlags) -> anyhow::Result<()> {
    let kind = RelationshipType::from(args.kind.as_str());
    let target = brain.resolve_id(&args.target)?;
    let until = parse_optional_date(args.until.as_deref(), "until")?;

    let (record, event) = brain.mutate(&args.reference, |helper, entity| {
        helper.end_relationship(entity, &flags.actor, &kind, &target, until)
    })?;
    output(&mutation_response(&record.entity, Some(&event)), flags.format)
}

/// Handle `brain relationships`.
pub fn list(args: &RelationshipsArgs, brain: &Brain, flags: &GlobalFlags) -> anyhow::Result<()> {
    let record = brain.get(&args.reference)?;
    let query = RelationshipQuery {
        as_of: match &args.as_of {
            Some(value) => parse_date(value, "as-of")?,
            None => today(),
        },
        threshold_days: args
            .threshold
            .unwrap_or(brain.config().confidence.stale_threshold_days),
        kind: args.kind.as_deref().map(RelationshipType::from),
        stale_only: args.stale,
        include_inactive: args.all,
    };
    let policy = brain.config().confidence.decay_policy();
    let rows = relationship_rows(&record.entity, &query, &policy);

    output(
        &json!({
            "id": record.entity.id,
            "as_of": query.as_of,
            "relationships": rows,
        }),
        flags.format,
    )
}

/// Filters for `brain relationships`.
#[derive(Debug, Clone)]
pub struct RelationshipQuery {
    pub as_of: NaiveDate,
    pub threshold_days: i64,
    pub kind: Option<RelationshipType>,
    pub stale_only: bool,
    pub include_inactive: bool,
}

/// One listed relationship with its derived values.
#[derive(Debug, Serialize)]
pub struct RelationshipRow<'a> {
    #[serde(flatten)]
    pub relationship: &'a Relationship,
    pub active: bool,
    pub stale: bool,
    pub decayed_confidence: f64,
}

/// Evaluate and filter an entity's relationships on `query.as_of`.
pub fn relationship_rows<'a>(
    entity: &'a Entity,
    query: &RelationshipQuery,
    policy: &DecayPolicy,
) -> Vec<RelationshipRow<'a>> {
    let candidates = if query.stale_only {
        entity.stale_relationships(Some(query.as_of), Some(query.threshold_days))
    } else {
        entity.relationships.iter().collect()
    };

    candidates
        .into_iter()
        .filter(|r| query.kind.as_ref().is_none_or(|kind| &r.kind == kind))
        .map(|relationship| RelationshipRow {
            relationship,
            active: relationship.is_active_on(query.as_of),
            stale: relationship.is_stale(Some(query.as_of), Some(query.threshold_days)),
            decayed_confidence: relationship
                .compute_decayed_confidence(Some(query.as_of), policy)
                .value(),
        })
        .filter(|row| query.include_inactive || row.active)
        .collect()
}
