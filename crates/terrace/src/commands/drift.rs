use crate::utils::Project;
use colored::Colorize;
use terrace_cloud::DriftStatus;

pub async fn handle(project: &Project, json: bool) -> anyhow::Result<()> {
    let reconciler = project.reconciler(None);
    let report = reconciler
        .detect_drift(project.document.to_resources())
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.findings.is_empty() {
        println!("{}", "No applied resources to check.".dimmed());
        return Ok(());
    }

    for finding in &report.findings {
        let status = match &finding.status {
            DriftStatus::InSync => "in sync".green(),
            DriftStatus::Drifted { .. } => "drifted".yellow().bold(),
            DriftStatus::Missing => "missing".red().bold(),
            DriftStatus::Unreadable { .. } => "unreadable".yellow(),
        };
        println!(
            "  {} ({}) [{}] {}",
            finding.name.cyan(),
            finding.kind,
            finding.external_id,
            status
        );
        if let DriftStatus::Unreadable { message } = &finding.status {
            println!("      {}", message.dimmed());
        }
    }

    println!();
    if report.has_drift() {
        println!(
            "{}",
            "Drift detected. Run `terrace apply --refresh` to repair it.".yellow()
        );
    } else {
        println!("{}", "No drift.".green());
    }
    Ok(())
}
