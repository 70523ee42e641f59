mod commands;
mod providers;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ground")]
#[command(about = "Declare it. Apply it. Infrastructure as a resource graph.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration (parse, references, cycles)
    Validate,
    /// Show the dependency graph in execution order
    Graph,
    /// Show what apply would change
    Plan,
    /// Apply the declared configuration
    Apply {
        /// Skip the confirmation step
        #[arg(short, long)]
        yes: bool,
    },
    /// Destroy every recorded resource
    Destroy {
        /// Skip the confirmation step
        #[arg(short, long)]
        yes: bool,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt::init();

    // Version needs no configuration
    if matches!(cli.command, Commands::Version) {
        println!("groundwork {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let project_root = groundwork_core::find_project_root()?;
    let blueprint = groundwork_core::load_project_from_root(&project_root)?;

    match cli.command {
        Commands::Validate => commands::validate::handle(&blueprint),
        Commands::Graph => commands::graph::handle(&blueprint),
        Commands::Plan => commands::plan::handle(&project_root, &blueprint).await,
        Commands::Apply { yes } => commands::apply::handle(&project_root, &blueprint, yes).await,
        Commands::Destroy { yes } => {
            commands::destroy::handle(&project_root, &blueprint, yes).await
        }
        Commands::Version => unreachable!(),
    }
}
