//! Serde roundtrip and JsonSchema validation tests for the record types.

use brain_core::entities::*;
use brain_core::enums::*;
use brain_core::events::*;
use brain_core::registry::*;
use brain_core::responses::*;
use chrono::{NaiveDate, TimeZone, Utc};
use schemars::schema_for;

/// Validate a JSON value against a schemars-generated schema.
fn validate_against_schema(
    schema: &serde_json::Value,
    instance: &serde_json::Value,
) -> Vec<String> {
    let validator = jsonschema::validator_for(schema).expect("schema should be valid");
    validator
        .iter_errors(instance)
        .map(|e| format!("{e}"))
        .collect()
}

macro_rules! roundtrip_and_validate {
    ($name:ident, $ty:ty, $instance:expr) => {
        #[test]
        fn $name() {
            let val: $ty = $instance;

            let json_str = serde_json::to_string_pretty(&val).unwrap();
            let recovered: $ty = serde_json::from_str(&json_str).unwrap();
            assert_eq!(
                recovered,
                val,
                "serde roundtrip failed for {}",
                stringify!($ty)
            );

            let schema = serde_json::to_value(schema_for!($ty)).unwrap();
            let instance = serde_json::to_value(&val).unwrap();
            let errors = validate_against_schema(&schema, &instance);
            assert!(
                errors.is_empty(),
                "Schema validation failed for {}: {:?}",
                stringify!($ty),
                errors
            );
        }
    };
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn jane() -> Entity {
    let seed = NewEntity {
        source: Source::Manual,
        description: Some("Platform tech lead".into()),
        profile: Profile {
            role: Some("Staff Engineer".into()),
            manager: Some("entity/person/bob-jones".into()),
            ..Profile::default()
        },
        aliases: vec!["JS".into()],
        tags: vec!["platform".into()],
        ..NewEntity::named("Jane Smith")
    };
    let mut entity = Entity::create_at(
        EntityType::Person,
        seed,
        "tester",
        Utc.with_ymd_and_hms(2026, 2, 3, 4, 5, 6).unwrap(),
    )
    .unwrap();
    entity.relationships.push(
        Relationship::new("reports-to", "entity/person/bob-jones")
            .with_since(date(2025, 3, 1))
            .with_confidence(0.9)
            .with_source("hr-system"),
    );
    entity.relationships.push(
        Relationship::new("mentors", "entity/person/kim").with_last_verified(date(2026, 1, 10)),
    );
    entity
        .extra
        .insert("favourite_editor".into(), serde_json::json!("helix"));
    entity
}

roundtrip_and_validate!(entity_roundtrip, Entity, jane());

roundtrip_and_validate!(
    team_roundtrip,
    Entity,
    Entity::create(
        EntityType::Team,
        NewEntity {
            source: Source::Custom("okta".into()),
            profile: Profile {
                lead: Some("entity/person/jane-smith".into()),
                ..Profile::default()
            },
            ..NewEntity::named("Platform")
        },
        "tester",
    )
    .unwrap()
);

roundtrip_and_validate!(
    relationship_roundtrip,
    Relationship,
    Relationship::new(RelationshipType::MemberOf, "entity/team/platform")
        .with_since(date(2024, 1, 1))
        .with_until(date(2025, 12, 31))
        .with_role("backend")
        .with_confidence(0.65)
);

roundtrip_and_validate!(
    change_event_roundtrip,
    ChangeEvent,
    create_event(
        "field-update",
        "alice",
        EventOptions::default()
            .with_change(FieldChange::update("role", Some("IC".into()), "Lead".into()))
            .with_message("promotion")
            .with_correlation_id("corr-1"),
    )
    .unwrap()
);

roundtrip_and_validate!(
    field_change_roundtrip,
    FieldChange,
    FieldChange::append("$tags", "infra".into())
);

roundtrip_and_validate!(
    registry_roundtrip,
    Registry,
    Registry::from_entities([&jane()], Utc::now())
);

roundtrip_and_validate!(
    migration_report_roundtrip,
    MigrationReport,
    MigrationReport {
        scanned: 12,
        migrated: 9,
        skipped: 2,
        errors: 1,
        error_details: vec![MigrationFailure {
            path: "people/broken.md".into(),
            message: "permission denied".into(),
        }],
        dry_run: false,
    }
);

#[test]
fn structural_keys_are_prefixed() {
    let json = serde_json::to_value(jane()).unwrap();
    let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
    for key in &keys {
        let structural = key.starts_with('$');
        let content = matches!(
            *key,
            "name" | "description" | "role" | "manager" | "favourite_editor"
        );
        assert!(structural || content, "unexpected key {key}");
    }
    assert_eq!(json["$relationships"][1]["type"], "mentors");
    assert_eq!(json["$confidence"], 0.7);
}

#[test]
fn worked_example_confidence_from_manual_source() {
    let entity = jane();
    assert!((entity.confidence.value() - 0.7).abs() < f64::EPSILON);
    assert_eq!(entity.version, 1);
    assert_eq!(entity.events.len(), 1);
}
