use crate::utils::Project;
use colored::Colorize;
use terrace_cloud::ResourceGraph;

pub fn handle(project: &Project) -> anyhow::Result<()> {
    println!("{}", "Validating declaration...".blue());
    println!(
        "Declaration: {}",
        project.document.path.display().to_string().cyan()
    );

    let graph = ResourceGraph::build(project.document.to_resources())?;

    println!("{}", "✓ Declaration is valid".green().bold());
    println!();
    println!("Project: {}", project.document.display_name().cyan());
    println!("Resources: {}", graph.len());
    for (i, name) in graph.topological_order().iter().enumerate() {
        let Some(resource) = graph.get(name) else {
            continue;
        };
        let deps = graph
            .dependencies(name)
            .filter(|d| !d.is_empty())
            .map(|d| {
                format!(
                    " <- {}",
                    d.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
                )
            })
            .unwrap_or_default();
        println!("  {}. {} ({}){}", i + 1, name.cyan(), resource.kind, deps.dimmed());
    }
    Ok(())
}
