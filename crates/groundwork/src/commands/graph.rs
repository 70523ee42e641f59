use colored::Colorize;
use groundwork_core::Blueprint;
use groundwork_graph::ResourceGraph;

/// Print the execution order with each node's direct dependencies
pub fn handle(blueprint: &Blueprint) -> anyhow::Result<()> {
    let graph = ResourceGraph::build(&blueprint.resources)?;

    println!("{}", format!("project '{}'", blueprint.name).blue().bold());
    println!();
    print!("{}", graph.render()?);
    Ok(())
}
