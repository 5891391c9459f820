use brain_migrate::Migrator;
use brain_store::Brain;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::MigrateArgs;
use crate::output::output;
use crate::progress::Progress;

/// Handle `brain migrate`.
pub fn handle(args: &MigrateArgs, brain: &Brain, flags: &GlobalFlags) -> anyhow::Result<()> {
    let mut config = brain.config().migration.clone();
    if args.dry_run {
        config.dry_run = true;
    }
    if let Some(workers) = args.workers {
        anyhow::ensure!(workers > 0, "--workers must be at least 1");
        config.workers = workers;
    }
    if args.sequential {
        config.workers = 1;
    }

    let root = brain.config().store.root.as_path();
    let migrator = Migrator::new(config, brain.helper().clone());
    let total = Migrator::discover(root).len();
    let message = if migrator.config().dry_run {
        "migrating (dry run)"
    } else {
        "migrating"
    };
    let progress = Progress::bar(total as u64, message, flags);

    match migrator.run(root, &|_| progress.inc(1)) {
        Ok(report) => {
            progress.finish_ok(&format!(
                "{} migrated, {} skipped, {} errors",
                report.migrated, report.skipped, report.errors
            ));
            output(&report, flags.format)
        }
        Err(error) => {
            progress.finish_err("migration failed");
            Err(error.into())
        }
    }
}
