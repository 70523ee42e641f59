use crate::commands::print_plan;
use crate::providers::build_registry;
use colored::Colorize;
use groundwork_core::Blueprint;
use groundwork_engine::{StateManager, build_plan};
use groundwork_graph::ResourceGraph;
use std::path::Path;

/// Show what apply would change
pub async fn handle(project_root: &Path, blueprint: &Blueprint) -> anyhow::Result<()> {
    let graph = ResourceGraph::build(&blueprint.resources)?;
    let order = graph.execution_order()?;
    let registry = build_registry(blueprint, project_root)?;

    let manager = StateManager::new(project_root);
    let state = manager.load().await?;

    println!(
        "{}",
        format!("planning '{}'...", blueprint.name).blue().bold()
    );
    println!();

    let plan = build_plan(blueprint, &order, &registry, &state).await?;
    print_plan(&plan);

    if !plan.has_changes {
        println!();
        println!("{}", "nothing to change".green());
    }
    Ok(())
}
