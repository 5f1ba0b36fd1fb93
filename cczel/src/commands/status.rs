//! Dry run: report what a build would do

use super::CommandError;
use cczel::{plan, Configuration, RealFileSystem};

/// Print changed files and the units a build would compile
pub fn execute(config: &Configuration) -> Result<(), CommandError> {
    let fs = RealFileSystem::new(&config.root);
    let plan = plan(&fs, config)?;

    let mut changed: Vec<&str> = plan
        .state
        .files()
        .filter(|(_, f)| f.is_modified())
        .map(|(_, f)| f.path.as_str())
        .collect();
    changed.sort_unstable();
    let dirty = plan.dirty_sources();

    println!("📋 Status of {}", config.root.display());
    println!("  Sources:       {}", plan.graph.sources);
    println!("  Headers:       {}", plan.graph.headers);
    println!("  Include edges: {}", plan.graph.edges);
    if plan.graph.cycles > 0 {
        println!("  Include cycles: {}", plan.graph.cycles);
    }
    if plan.stale_records > 0 {
        println!("  Stale records: {}", plan.stale_records);
    }
    println!();

    if changed.is_empty() {
        println!("✅ Everything is up to date");
        return Ok(());
    }

    println!("Changed ({}):", changed.len());
    for path in &changed {
        println!("  • {}", path);
    }
    println!();
    println!("Would compile ({}):", dirty.len());
    for path in &dirty {
        println!("  • {}", path);
    }

    Ok(())
}
