use anyhow::Context;
use colored::{ColoredString, Colorize};
use std::path::Path;
use std::sync::Arc;
use terrace_cloud::{
    Action, CancellationToken, ExecutionReport, FileStateStore, Outcome, Plan, ProviderRegistry,
    Reconciler, RunStatus,
};
use terrace_cloud_sandbox::SandboxProvider;
use terrace_config::Document;

/// A loaded declaration plus the stores it points at
pub struct Project {
    pub document: Document,
    pub store: Arc<FileStateStore>,
    pub provider: Arc<SandboxProvider>,
}

impl Project {
    pub fn load(file: Option<&Path>) -> anyhow::Result<Self> {
        let path = match file {
            Some(path) => path.to_path_buf(),
            None => terrace_config::find_declaration_file()?,
        };
        let document = terrace_config::load_document(&path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        tracing::debug!("Loaded declaration from {}", path.display());

        let store = Arc::new(FileStateStore::new(document.state_dir()));
        let provider = Arc::new(SandboxProvider::new(document.sandbox_dir()));
        Ok(Self {
            document,
            store,
            provider,
        })
    }

    pub fn reconciler(&self, concurrency: Option<usize>) -> Reconciler {
        let mut config = self.document.settings.executor_config();
        if let Some(concurrency) = concurrency {
            config.concurrency = concurrency;
        }
        let registry = ProviderRegistry::new().with_fallback(self.provider.clone());
        Reconciler::new(registry, self.store.clone(), config)
    }
}

/// Cancel `token` on Ctrl-C.
pub fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!(
                "{}",
                "Interrupted: waiting for in-flight operations to finish...".yellow()
            );
            token.cancel();
        }
    });
}

fn action_symbol(action: Action) -> ColoredString {
    match action {
        Action::Create => "+".green().bold(),
        Action::Update => "~".yellow().bold(),
        Action::Delete => "-".red().bold(),
        Action::NoOp => "=".dimmed(),
    }
}

pub fn print_plan(plan: &Plan) {
    for op in plan.iter() {
        println!("  {} {}", action_symbol(op.action), op.description());
    }
    println!();
    println!("Plan: {}", plan.summary().to_string().bold());
}

pub fn print_report(report: &ExecutionReport) {
    for outcome in &report.outcomes {
        let label = match outcome.outcome {
            Outcome::Succeeded => "ok".green(),
            Outcome::Unchanged => "unchanged".dimmed(),
            Outcome::Failed => "failed".red().bold(),
            Outcome::Skipped => "skipped".yellow(),
            Outcome::Cancelled => "cancelled".yellow(),
        };
        let mut line = format!(
            "  {} {} ({}) {}",
            action_symbol(outcome.action),
            outcome.target.cyan(),
            outcome.action,
            label
        );
        if let Some(id) = &outcome.external_id {
            line.push_str(&format!(" [{}]", id));
        }
        if outcome.attempts > 1 {
            line.push_str(&format!(" after {} attempts", outcome.attempts));
        }
        println!("{}", line);
        if let Some(message) = &outcome.message {
            println!("      {}", message.dimmed());
        }
    }

    println!();
    let summary = report.summary();
    let summary = match report.status {
        RunStatus::Success => summary.green().bold(),
        RunStatus::Partial | RunStatus::Cancelled => summary.yellow().bold(),
        RunStatus::Failed => summary.red().bold(),
    };
    println!("{} ({} ms)", summary, report.duration_ms);
}

/// Error for runs that did not fully succeed
pub fn ensure_success(report: &ExecutionReport) -> anyhow::Result<()> {
    if report.is_success() {
        Ok(())
    } else {
        anyhow::bail!("run finished with status {}", report.status)
    }
}
