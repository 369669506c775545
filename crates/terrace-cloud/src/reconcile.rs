//! Reconciliation driver
//!
//! One run: build the graph, load prior state, plan, apply. Validation
//! happens first so an invalid declaration never reaches a provider.

use crate::drift::{self, DriftReport};
use crate::error::Result;
use crate::executor::{Executor, ExecutorConfig};
use crate::graph::ResourceGraph;
use crate::plan::Plan;
use crate::planner;
use crate::provider::ProviderRegistry;
use crate::report::ExecutionReport;
use crate::resource::Resource;
use crate::state::StateStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    /// Detect drift first and fold it into prior state before planning
    pub refresh: bool,
}

pub struct Reconciler {
    registry: ProviderRegistry,
    store: Arc<dyn StateStore>,
    config: ExecutorConfig,
    cancel: CancellationToken,
}

impl Reconciler {
    pub fn new(
        registry: ProviderRegistry,
        store: Arc<dyn StateStore>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            registry,
            store,
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels runs started by this reconciler
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Converge actual state to `declared`.
    pub async fn run(&self, declared: Vec<Resource>) -> Result<ExecutionReport> {
        self.run_with(declared, &ReconcileOptions::default()).await
    }

    pub async fn run_with(
        &self,
        declared: Vec<Resource>,
        options: &ReconcileOptions,
    ) -> Result<ExecutionReport> {
        let plan = self.plan_with(declared, options).await?;
        self.apply(&plan).await
    }

    /// Plan without touching any provider.
    pub async fn plan(&self, declared: Vec<Resource>) -> Result<Plan> {
        self.plan_with(declared, &ReconcileOptions::default()).await
    }

    /// Plan; with `refresh` the adapters are read to detect drift first.
    pub async fn plan_with(
        &self,
        declared: Vec<Resource>,
        options: &ReconcileOptions,
    ) -> Result<Plan> {
        let graph = ResourceGraph::build(declared)?;
        let mut prior = self.store.load().await?;

        if options.refresh {
            let report = drift::detect_drift(&graph, &prior, &self.registry).await;
            if report.has_drift() {
                tracing::info!("Folding drift into prior state before planning");
            }
            report.fold_into(&mut prior);
        }

        Ok(planner::plan(&graph, &prior))
    }

    /// Execute an already computed plan.
    pub async fn apply(&self, plan: &Plan) -> Result<ExecutionReport> {
        let executor = Executor::new(self.registry.clone(), self.store.clone(), self.config.clone())
            .with_cancellation(self.cancel.clone());
        executor.apply(plan).await
    }

    pub async fn detect_drift(&self, declared: Vec<Resource>) -> Result<DriftReport> {
        let graph = ResourceGraph::build(declared)?;
        let prior = self.store.load().await?;
        Ok(drift::detect_drift(&graph, &prior, &self.registry).await)
    }
}
