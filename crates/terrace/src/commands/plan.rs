use crate::utils::{self, Project};
use colored::Colorize;
use terrace_cloud::ReconcileOptions;

pub async fn handle(project: &Project, refresh: bool, json: bool) -> anyhow::Result<()> {
    let reconciler = project.reconciler(None);
    let plan = reconciler
        .plan_with(project.document.to_resources(), &ReconcileOptions { refresh })
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    if !plan.has_changes() {
        println!("{}", "No changes. Actual state matches the declaration.".green());
        return Ok(());
    }
    utils::print_plan(&plan);
    Ok(())
}
