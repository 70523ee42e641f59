use crate::commands::{print_plan, print_report};
use crate::providers::build_registry;
use colored::Colorize;
use groundwork_core::Blueprint;
use groundwork_engine::{Executor, StateManager, build_plan};
use groundwork_graph::ResourceGraph;
use std::path::Path;

/// Apply the declared configuration
pub async fn handle(project_root: &Path, blueprint: &Blueprint, yes: bool) -> anyhow::Result<()> {
    let graph = ResourceGraph::build(&blueprint.resources)?;
    let order = graph.execution_order()?;
    let registry = build_registry(blueprint, project_root)?;

    let manager = StateManager::new(project_root);
    let lock = manager.acquire_lock().await?;
    let mut state = manager.load().await?;

    let plan = build_plan(blueprint, &order, &registry, &state).await?;

    println!(
        "{}",
        format!("applying '{}'...", blueprint.name).blue().bold()
    );
    println!();
    print_plan(&plan);
    println!();

    if !plan.has_changes {
        println!("{}", "nothing to apply".green());
        lock.release().await?;
        return Ok(());
    }

    if !yes {
        println!(
            "{}",
            "confirmation required: run again with --yes to apply these changes".yellow()
        );
        lock.release().await?;
        return Ok(());
    }

    let executor = Executor::new(registry);
    let report = executor.apply(blueprint, &order, &plan, &mut state).await?;

    manager.save(&state).await?;
    lock.release().await?;

    print_report(&report);

    if report.is_success() {
        println!();
        println!(
            "{}",
            format!("✓ '{}' applied", blueprint.name).green().bold()
        );
        Ok(())
    } else {
        anyhow::bail!("apply finished with failures");
    }
}
