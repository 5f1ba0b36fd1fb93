//! Dependency exploration for a single tracked file

use super::CommandError;
use cczel::{dependency_report, plan, Configuration, RealFileSystem};

fn print_list(title: &str, items: &[String]) {
    println!("{} ({}):", title, items.len());
    for item in items.iter().take(50) {
        println!("  • {}", item);
    }
    if items.len() > 50 {
        println!("  ... and {} more", items.len() - 50);
    }
    println!();
}

/// Print what `target` includes, what includes it, and which units it affects
pub fn execute(config: &Configuration, target: &str) -> Result<(), CommandError> {
    let fs = RealFileSystem::new(&config.root);
    let plan = plan(&fs, config)?;
    let report = dependency_report(&plan.state, target)?;

    println!(
        "🔍 {} ({}{})",
        report.path,
        report.kind,
        if report.dirty { ", dirty" } else { "" }
    );
    println!();

    print_list("Includes", &report.includes);
    print_list("Included by", &report.included_by);
    print_list("Affected compilation units", &report.affected_sources);

    if !report.cycles.is_empty() {
        println!("⚠️  Include cycles through {}:", report.path);
        for cycle in report.cycles.iter().take(5) {
            println!("  • {}", cycle.join(" → "));
        }
    }

    Ok(())
}
