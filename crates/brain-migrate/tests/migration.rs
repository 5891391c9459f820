//! Batch migration over a temporary record root.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use brain_config::BrainConfig;
use brain_core::entities::NewEntity;
use brain_core::enums::{EntityType, EventType, RelationshipType};
use brain_migrate::{MIGRATOR_ACTOR, Migrator};
use brain_store::{Brain, EntityStore};
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;

const JANE: &str = "---\n\
name: Jane Smith\n\
role: Staff Engineer\n\
manager: Bob Jones\n\
team: Platform\n\
aliases: [JS]\n\
source: manual\n\
hire_date: 2021-03-01\n\
---\n\
# Jane\n\
\n\
Works on [[projects/atlas|Atlas]] with [[Kim Lee]].\n";

const PLATFORM: &str = "---\ntitle: Platform Team\nlead: Jane Smith\n---\nOwns the deploy pipeline.\n";

const ATLAS: &str = "No metadata at all, only notes.\n";

fn fixture(workers: usize, dry_run: bool) -> (TempDir, Brain) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = BrainConfig::default();
    config.store.root = dir.path().to_path_buf();
    config.migration.workers = workers;
    config.migration.dry_run = dry_run;
    let brain = Brain::new(config);

    let root = dir.path();
    std::fs::create_dir_all(root.join("people")).unwrap();
    std::fs::create_dir_all(root.join("teams")).unwrap();
    std::fs::create_dir_all(root.join("notes")).unwrap();
    std::fs::write(root.join("people/jane-smith.md"), JANE).unwrap();
    std::fs::write(root.join("teams/platform.md"), PLATFORM).unwrap();
    std::fs::write(root.join("notes/atlas.md"), ATLAS).unwrap();
    std::fs::write(root.join("people/!!!.md"), "---\nname: Nobody\n---\n").unwrap();
    brain
        .create(EntityType::Person, NewEntity::named("Already"), "tester", "")
        .unwrap();

    (dir, brain)
}

fn read(root: &Path, relative: &str) -> String {
    std::fs::read_to_string(root.join(relative)).unwrap()
}

#[rstest]
#[case::sequential(1)]
#[case::pooled(4)]
fn migrates_legacy_records(#[case] workers: usize) {
    let (dir, brain) = fixture(workers, false);
    let progress = AtomicUsize::new(0);

    let report = Migrator::for_brain(&brain)
        .run(dir.path(), &|_| {
            progress.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    assert_eq!(report.scanned, 5);
    assert_eq!(report.migrated, 3);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.errors, 1);
    assert_eq!(report.error_details[0].path, "people/!!!.md");
    assert!(!report.dry_run);
    assert_eq!(progress.load(Ordering::SeqCst), 5);

    let jane = brain.get("entity/person/jane-smith").unwrap();
    assert_eq!(jane.body, "# Jane\n\nWorks on [[projects/atlas|Atlas]] with [[Kim Lee]].\n");
    let entity = jane.entity;
    assert_eq!(entity.version, 1);
    assert_eq!(entity.events.len(), 1);
    assert_eq!(entity.events[0].kind, EventType::EntityCreate);
    assert_eq!(entity.events[0].actor, MIGRATOR_ACTOR);
    assert_eq!(entity.aliases, vec!["JS"]);
    assert_eq!(
        entity.extra.get("hire_date"),
        Some(&serde_json::json!("2021-03-01"))
    );
    assert!(
        entity
            .find_relationship(&RelationshipType::ReportsTo, "entity/person/bob-jones")
            .is_some()
    );
    assert!(
        entity
            .find_relationship(&RelationshipType::MemberOf, "entity/team/platform")
            .is_some()
    );
    assert!(
        entity
            .find_relationship(&RelationshipType::RelatedTo, "entity/project/atlas")
            .is_some()
    );
    assert!(
        entity
            .find_relationship(&RelationshipType::RelatedTo, "entity/unknown/kim-lee")
            .is_some()
    );

    let platform = brain.get("entity/team/platform").unwrap().entity;
    assert_eq!(platform.name, "Platform Team");
    assert_eq!(platform.profile.lead.as_deref(), Some("Jane Smith"));

    // no type anywhere: defaults to project and moves into projects/
    assert!(!dir.path().join("notes/atlas.md").exists());
    let atlas = brain.get("entity/project/atlas").unwrap();
    assert_eq!(atlas.body, ATLAS);
}

#[test]
fn second_run_is_a_no_op() {
    let (dir, brain) = fixture(2, false);
    let migrator = Migrator::for_brain(&brain);
    migrator.run(dir.path(), &|_| {}).unwrap();
    let before = read(dir.path(), "people/jane-smith.md");

    let again = migrator.run(dir.path(), &|_| {}).unwrap();
    assert_eq!(again.migrated, 0);
    assert_eq!(again.skipped, 4);
    assert_eq!(again.errors, 1);
    assert_eq!(read(dir.path(), "people/jane-smith.md"), before);
}

#[test]
fn dry_run_writes_nothing() {
    let (dir, brain) = fixture(1, true);
    let report = Migrator::for_brain(&brain).run(dir.path(), &|_| {}).unwrap();

    assert!(report.dry_run);
    assert_eq!(report.migrated, 3);
    assert_eq!(read(dir.path(), "people/jane-smith.md"), JANE);
    assert_eq!(read(dir.path(), "teams/platform.md"), PLATFORM);
    assert_eq!(read(dir.path(), "notes/atlas.md"), ATLAS);
}

#[test]
fn error_preview_is_capped() {
    let (dir, brain) = fixture(1, false);
    for name in ["!", "@", "#"] {
        std::fs::write(dir.path().join(format!("people/{name}.md")), "x").unwrap();
    }
    let mut config = brain.config().migration.clone();
    config.error_preview = 2;
    let migrator = Migrator::new(config, brain.helper().clone());

    let report = migrator.run(dir.path(), &|_| {}).unwrap();
    assert_eq!(report.errors, 4);
    assert_eq!(report.error_details.len(), 2);
    assert_eq!(report.migrated, 3);
}

#[test]
fn migrated_records_feed_the_registry() {
    let (dir, brain) = fixture(1, false);
    Migrator::for_brain(&brain).run(dir.path(), &|_| {}).unwrap();

    let rebuild = brain.rebuild_registry().unwrap();
    assert_eq!(rebuild.registry.entities.len(), 4);

    let entry = brain.resolve("js").unwrap().unwrap();
    assert_eq!(entry.reference, "entity/person/jane-smith");
    assert_eq!(entry.manager.as_deref(), Some("Bob Jones"));
    let atlas = brain.resolve("atlas").unwrap().unwrap();
    assert_eq!(atlas.reference, "entity/project/atlas");
}

#[test]
fn records_outside_type_directories_are_moved_into_the_store() {
    let (dir, brain) = fixture(2, false);
    let root = dir.path();
    std::fs::create_dir_all(root.join("org/teams/eng")).unwrap();
    std::fs::write(
        root.join("org/teams/eng/platform-eng.md"),
        "---\nname: Platform Eng\naliases: [plat]\n---\n",
    )
    .unwrap();
    std::fs::write(
        root.join("people/api.md"),
        "---\ntype: system\naliases: [gateway]\n---\nPublic API.\n",
    )
    .unwrap();

    let report = Migrator::for_brain(&brain).run(root, &|_| {}).unwrap();
    assert_eq!(report.migrated, 5);
    assert!(!root.join("org/teams/eng/platform-eng.md").exists());
    assert!(!root.join("people/api.md").exists());

    brain.rebuild_registry().unwrap();
    let plat = brain.get("plat").unwrap().entity;
    assert_eq!(plat.id, "entity/team/platform-eng");
    let api = brain.get("gateway").unwrap();
    assert_eq!(api.entity.id, "entity/system/api");
    assert_eq!(api.body, "Public API.\n");
    assert_eq!(
        EntityStore::load_path(&root.join("systems/api.md")).unwrap().entity.id,
        "entity/system/api"
    );
}

#[test]
fn occupied_store_paths_are_reported_not_overwritten() {
    let (dir, brain) = fixture(1, false);
    let root = dir.path();
    std::fs::create_dir_all(root.join("staff")).unwrap();
    let legacy = "---\ntype: person\nname: Already Here\n---\n";
    std::fs::write(root.join("staff/already.md"), legacy).unwrap();
    let existing = read(root, "people/already.md");

    let report = Migrator::for_brain(&brain).run(root, &|_| {}).unwrap();
    assert_eq!(report.errors, 2);
    assert!(
        report
            .error_details
            .iter()
            .any(|failure| failure.path == "staff/already.md" && failure.message.contains("already exists"))
    );
    assert_eq!(read(root, "staff/already.md"), legacy);
    assert_eq!(read(root, "people/already.md"), existing);
}
