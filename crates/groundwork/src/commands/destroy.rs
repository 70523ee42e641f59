use crate::commands::print_report;
use crate::providers::build_registry;
use colored::Colorize;
use groundwork_core::Blueprint;
use groundwork_engine::{Executor, StateManager};
use groundwork_graph::ResourceGraph;
use std::path::Path;

/// Destroy every recorded resource, consumers before producers
pub async fn handle(project_root: &Path, blueprint: &Blueprint, yes: bool) -> anyhow::Result<()> {
    let graph = ResourceGraph::build(&blueprint.resources)?;
    let order = graph.execution_order()?;
    let registry = build_registry(blueprint, project_root)?;

    let manager = StateManager::new(project_root);
    let lock = manager.acquire_lock().await?;
    let mut state = manager.load().await?;

    if state.is_empty() {
        println!("{}", "nothing recorded, nothing to destroy".green());
        lock.release().await?;
        return Ok(());
    }

    if !yes {
        println!(
            "{}",
            "⚠ destroy removes every recorded resource and cannot be undone"
                .red()
                .bold()
        );
        println!("  run again with --yes to proceed");
        lock.release().await?;
        return Ok(());
    }

    println!(
        "{}",
        format!("destroying '{}'...", blueprint.name).yellow().bold()
    );
    println!();

    let executor = Executor::new(registry);
    let report = executor.destroy(&order, &mut state).await?;

    manager.save(&state).await?;
    lock.release().await?;

    print_report(&report);

    if report.is_success() {
        println!();
        println!(
            "{}",
            format!("✓ '{}' destroyed", blueprint.name).green().bold()
        );
        Ok(())
    } else {
        anyhow::bail!("destroy finished with failures");
    }
}
