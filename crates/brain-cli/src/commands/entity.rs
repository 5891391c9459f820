use anyhow::Context;
use brain_core::entities::{NewEntity, Profile};
use brain_core::enums::{EntityStatus, EntityType, RelationshipType, Source};
use brain_store::Brain;
use serde_json::{Value, json};

use crate::cli::GlobalFlags;
use crate::cli::root_commands::{
    AliasArgs, ConfidenceArgs, CreateArgs, SetArgs, ShowArgs, StatusArgs, TagArgs, VerifyArgs,
};
use crate::commands::shared::{
    mutation_response, parse_assignment, parse_enum, parse_optional_date,
};
use crate::output::output;

/// Handle `brain create`. Entities created by hand default to the `manual`
/// source.
pub fn create(args: &CreateArgs, brain: &Brain, flags: &GlobalFlags) -> anyhow::Result<()> {
    let kind: EntityType = parse_enum(&args.kind, "type")?;

    let mut profile = Profile::default();
    for assignment in &args.field {
        let (key, value) = parse_assignment(assignment)?;
        let slot = profile.slot_mut(&key).with_context(|| {
            format!(
                "unknown profile field '{key}' (expected one of {})",
                Profile::FIELDS.join(", ")
            )
        })?;
        *slot = Some(value);
    }

    let seed = NewEntity {
        source: args.source.as_deref().map_or(Source::Manual, Source::from),
        description: args.description.clone(),
        profile,
        aliases: args.alias.clone(),
        tags: args.tag.clone(),
        valid_from: parse_optional_date(args.valid_from.as_deref(), "valid-from")?,
        ..NewEntity::named(args.name.clone())
    };
    let record = brain.create(kind, seed, &flags.actor, args.body.as_deref().unwrap_or(""))?;
    let path = brain.store().path_for(&record.entity.id)?;

    output(
        &json!({
            "entity": record.entity,
            "path": path,
        }),
        flags.format,
    )
}

/// Handle `brain show`.
pub fn show(args: &ShowArgs, brain: &Brain, flags: &GlobalFlags) -> anyhow::Result<()> {
    let record = brain.get(&args.reference)?;
    if args.body {
        output(
            &json!({
                "entity": record.entity,
                "body": record.body,
            }),
            flags.format,
        )
    } else {
        output(&record.entity, flags.format)
    }
}

/// Handle `brain set`.
pub fn set(args: &SetArgs, brain: &Brain, flags: &GlobalFlags) -> anyhow::Result<()> {
    let value = if args.unset {
        None
    } else {
        args.value.as_deref().map(|raw| parse_value(raw, args.json)).transpose()?
    };

    let (record, event) = brain.mutate(&args.reference, |helper, entity| {
        helper.update_field(entity, &flags.actor, &args.field, value)
    })?;
    output(&mutation_response(&record.entity, event.as_ref()), flags.format)
}

fn parse_value(raw: &str, as_json: bool) -> anyhow::Result<Value> {
    if as_json {
        serde_json::from_str(raw).with_context(|| format!("value is not valid JSON: {raw}"))
    } else {
        Ok(Value::String(raw.to_string()))
    }
}

/// Handle `brain tag`.
pub fn tag(args: &TagArgs, brain: &Brain, flags: &GlobalFlags) -> anyhow::Result<()> {
    let (record, event) = brain.mutate(&args.reference, |helper, entity| {
        helper.add_tag(entity, &flags.actor, &args.tag)
    })?;
    output(&mutation_response(&record.entity, event.as_ref()), flags.format)
}

/// Handle `brain alias`. Run `brain registry rebuild` afterwards to make the
/// alias resolvable.
pub fn alias(args: &AliasArgs, brain: &Brain, flags: &GlobalFlags) -> anyhow::Result<()> {
    let (record, event) = brain.mutate(&args.reference, |helper, entity| {
        helper.add_alias(entity, &flags.actor, &args.alias)
    })?;
    output(&mutation_response(&record.entity, event.as_ref()), flags.format)
}

/// Handle `brain status`.
pub fn status(args: &StatusArgs, brain: &Brain, flags: &GlobalFlags) -> anyhow::Result<()> {
    let status: EntityStatus = parse_enum(&args.status, "status")?;
    let (record, event) = brain.mutate(&args.reference, |helper, entity| {
        helper.change_status(entity, &flags.actor, status)
    })?;
    output(&mutation_response(&record.entity, event.as_ref()), flags.format)
}

/// Handle `brain confidence`.
pub fn confidence(args: &ConfidenceArgs, brain: &Brain, flags: &GlobalFlags) -> anyhow::Result<()> {
    let edge = relationship_selector(brain, args.kind.as_deref(), args.target.as_deref())?;
    let (record, event) = brain.mutate(&args.reference, |helper, entity| match &edge {
        Some((kind, target)) => {
            helper.update_relationship_confidence(entity, &flags.actor, kind, target, args.value)
        }
        None => helper.set_confidence(entity, &flags.actor, args.value),
    })?;
    output(&mutation_response(&record.entity, Some(&event)), flags.format)
}

/// Handle `brain verify`.
pub fn verify(args: &VerifyArgs, brain: &Brain, flags: &GlobalFlags) -> anyhow::Result<()> {
    let edge = relationship_selector(brain, args.kind.as_deref(), args.target.as_deref())?;
    let on = parse_optional_date(args.on.as_deref(), "on")?;
    let (record, event) = brain.mutate(&args.reference, |helper, entity| {
        let edge = edge.as_ref().map(|(kind, target)| (kind, target.as_str()));
        helper.verify(entity, &flags.actor, edge, on)
    })?;
    output(&mutation_response(&record.entity, Some(&event)), flags.format)
}

/// `--type` and `--target` as a relationship selector, with the target
/// resolved to an entity id.
fn relationship_selector(
    brain: &Brain,
    kind: Option<&str>,
    target: Option<&str>,
) -> anyhow::Result<Option<(RelationshipType, String)>> {
    match (kind, target) {
        (Some(kind), Some(target)) => Ok(Some((
            RelationshipType::from(kind),
            brain.resolve_id(target)?,
        ))),
        _ => Ok(None),
    }
}
