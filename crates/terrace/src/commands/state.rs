use crate::utils::Project;
use colored::Colorize;
use terrace_cloud::{ResourceStatus, StateStore};

pub async fn handle(project: &Project, json: bool) -> anyhow::Result<()> {
    let records = project.store.load().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    println!(
        "State: {}",
        project.store.state_path().display().to_string().cyan()
    );
    if records.is_empty() {
        println!("{}", "No resources recorded.".dimmed());
        return Ok(());
    }

    for (name, record) in &records {
        let status = match record.status {
            ResourceStatus::Active => record.status.to_string().green(),
            ResourceStatus::Failed => record.status.to_string().red().bold(),
            ResourceStatus::Absent => record.status.to_string().dimmed(),
            _ => record.status.to_string().yellow(),
        };
        println!(
            "  {} ({}) {} {} {}",
            name.cyan(),
            record.kind,
            status,
            record.external_id.as_deref().unwrap_or("-"),
            record.updated_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
        );
        if let Some(message) = &record.message {
            println!("      {}", message.dimmed());
        }
    }
    Ok(())
}
