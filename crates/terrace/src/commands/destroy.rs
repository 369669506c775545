use crate::utils::{self, Project};
use colored::Colorize;
use terrace_cloud::StateStore;

pub async fn handle(project: &Project, yes: bool) -> anyhow::Result<()> {
    let lock = project.store.acquire_lock().await?;

    let reconciler = project.reconciler(None);
    utils::cancel_on_ctrl_c(reconciler.cancellation_token());

    // Reconciling against an empty declaration deletes everything recorded
    let plan = reconciler.plan(Vec::new()).await?;
    if !plan.has_changes() {
        lock.release().await?;
        println!("{}", "Nothing to destroy.".green());
        return Ok(());
    }

    utils::print_plan(&plan);
    if !yes {
        lock.release().await?;
        anyhow::bail!("refusing to destroy without --yes");
    }

    println!();
    println!("{}", "Destroying resources...".red().bold());
    let report = reconciler.apply(&plan).await?;
    lock.release().await?;
    utils::print_report(&report);

    let remaining = project
        .store
        .snapshot()
        .await?
        .values()
        .filter(|r| r.exists())
        .count();
    if remaining > 0 {
        println!("{} resources are still recorded", remaining.to_string().yellow());
    }
    utils::ensure_success(&report)
}
