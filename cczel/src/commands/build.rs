//! Incremental build command

use super::CommandError;
use cczel::{
    run_build, BuildExecutor, Configuration, LinkPolicy, ProcessCompiler, ProcessLinker,
    RealFileSystem,
};

/// Run one build; returns whether every compile and the link succeeded
pub async fn execute(
    mut config: Configuration,
    jobs: Option<usize>,
    strict_link: bool,
) -> Result<bool, CommandError> {
    if let Some(jobs) = jobs {
        if jobs == 0 {
            return Err("--jobs must be at least 1".into());
        }
        config.jobs = jobs;
    }
    if strict_link {
        config.link_policy = LinkPolicy::OnSuccess;
    }

    println!("🔨 Building {}", config.root.display());
    println!("  Compiler: {} {}", config.compiler, config.cl_options);
    println!("  Linker:   {} {}", config.linker, config.link_options);
    println!("  Jobs:     {}", config.jobs);
    println!();

    let fs = RealFileSystem::new(&config.root);
    let executor = BuildExecutor::new(
        Box::new(ProcessCompiler::from_config(&config)),
        Box::new(ProcessLinker::from_config(&config)),
        config.jobs,
    )
    .with_link_policy(config.link_policy);

    let report = run_build(&fs, &config, &executor).await?;
    report.display();

    if report.is_success() {
        println!("\n✅ Build complete");
    } else {
        println!("\n❌ Build failed");
    }
    Ok(report.is_success())
}
