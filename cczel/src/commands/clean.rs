//! Remove build outputs

use super::CommandError;
use cczel::{clean_outputs, Configuration, RealFileSystem};

/// Delete the database and the object of every compilation unit
pub fn execute(config: &Configuration) -> Result<(), CommandError> {
    println!("🧹 Cleaning {}", config.resolve(&config.obj_output).display());

    let fs = RealFileSystem::new(&config.root);
    let report = clean_outputs(&fs, config)?;

    println!();
    println!("Removed:");
    println!(
        "  Database:     {}",
        if report.database.is_some() { "yes" } else { "not present" }
    );
    println!("  Object files: {}", report.objects.len());
    println!();
    println!("💡 The next build compiles everything");

    Ok(())
}
