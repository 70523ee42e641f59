pub mod apply;
pub mod destroy;
pub mod graph;
pub mod plan;
pub mod validate;

use colored::Colorize;
use groundwork_engine::{ActionType, ApplyReport, NodeStatus, Plan};

/// Print a plan's actions and summary
pub fn print_plan(plan: &Plan) {
    for action in &plan.actions {
        let line = match action.action_type {
            ActionType::Create => format!("  {} {}", "+".green(), action.description),
            ActionType::Update => format!("  {} {}", "~".yellow(), action.description),
            ActionType::Delete => format!("  {} {}", "-".red(), action.description),
            ActionType::NoOp => format!("  {} {}", "=".dimmed(), action.description.dimmed()),
        };
        println!("{line}");
    }
    println!();
    println!("{}", plan.summary().to_string().bold());
}

/// Print per-node outcomes of an apply or destroy pass
pub fn print_report(report: &ApplyReport) {
    for outcome in &report.outcomes {
        match outcome.status {
            NodeStatus::Succeeded => {
                println!("  {} {} {}", "✓".green(), outcome.resource, outcome.message);
            }
            NodeStatus::Failed => {
                println!(
                    "  {} {} {}",
                    "✗".red(),
                    outcome.resource,
                    outcome.error.as_deref().unwrap_or("").red()
                );
            }
            NodeStatus::Skipped => {
                println!(
                    "  {} {} {}",
                    "○".yellow(),
                    outcome.resource,
                    format!("skipped: {}", outcome.message).dimmed()
                );
            }
        }
    }
    println!();
    println!(
        "{} succeeded, {} failed, {} skipped ({} ms)",
        report.with_status(NodeStatus::Succeeded).len(),
        report.with_status(NodeStatus::Failed).len(),
        report.with_status(NodeStatus::Skipped).len(),
        report.duration_ms
    );
}
