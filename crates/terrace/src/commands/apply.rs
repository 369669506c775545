use crate::utils::{self, Project};
use colored::Colorize;
use terrace_cloud::ReconcileOptions;

pub async fn handle(
    project: &Project,
    refresh: bool,
    concurrency: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let lock = project.store.acquire_lock().await?;

    let reconciler = project.reconciler(concurrency);
    utils::cancel_on_ctrl_c(reconciler.cancellation_token());

    let plan = reconciler
        .plan_with(project.document.to_resources(), &ReconcileOptions { refresh })
        .await?;

    if !json {
        if !plan.has_changes() {
            println!("{}", "No changes. Actual state matches the declaration.".green());
        } else {
            println!("{}", "Applying plan...".blue());
            utils::print_plan(&plan);
            println!();
        }
    }

    let report = reconciler.apply(&plan).await?;
    lock.release().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if plan.has_changes() {
        utils::print_report(&report);
    }

    utils::ensure_success(&report)
}
