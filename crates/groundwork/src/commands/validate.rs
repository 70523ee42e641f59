use colored::Colorize;
use groundwork_core::Blueprint;
use groundwork_graph::ResourceGraph;

/// Validate the loaded configuration: duplicate declarations, dangling
/// references and cycles all surface here
pub fn handle(blueprint: &Blueprint) -> anyhow::Result<()> {
    let graph = ResourceGraph::build(&blueprint.resources)?;
    graph.execution_order()?;

    println!(
        "{}",
        format!(
            "✓ configuration valid ({} resources, {} providers)",
            blueprint.resources.len(),
            blueprint.providers.len()
        )
        .green()
    );
    Ok(())
}
