//! Plan execution
//!
//! The executor is a data-flow scheduler: an operation is dispatched once
//! every operation it waits for has reached a terminal outcome, and at most
//! `concurrency` provider operations run at the same time. Independent
//! branches of the graph proceed in parallel; a failure only cascades to the
//! operations that depend on it.
//!
//! For each operation the in-flight status is written to the state store
//! before the provider is called and the terminal record is written after,
//! so a crash mid-run is visible on resume.

use crate::error::{CloudError, ProviderError, Result};
use crate::plan::{Action, Operation, Plan};
use crate::provider::{ProviderAdapter, ProviderRegistry, RetryConfig};
use crate::reference;
use crate::report::{ExecutionReport, Outcome, ResourceOutcome};
use crate::resource::Properties;
use crate::retry::{RetryDecision, RetryState};
use crate::state::{ActualStateRecord, ResourceStatus, StateStore};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Tuning for an apply
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum provider operations in flight
    pub concurrency: usize,

    pub retry: RetryConfig,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            retry: RetryConfig::default(),
        }
    }
}

pub struct Executor {
    registry: ProviderRegistry,
    store: Arc<dyn StateStore>,
    config: ExecutorConfig,
    cancel: CancellationToken,
}

/// State shared with operation tasks
struct Shared {
    registry: ProviderRegistry,
    store: Arc<dyn StateStore>,
    retry: RetryConfig,
    /// Logical name → external id, for resolving `${name.id}`
    ids: RwLock<HashMap<String, String>>,
}

struct TaskOutcome {
    outcome: Outcome,
    attempts: u32,
    external_id: Option<String>,
    message: Option<String>,
}

impl Executor {
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

    /// Stop dispatching when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Apply `plan`, returning per-operation outcomes.
    ///
    /// Provider failures are reported in the outcome list. A state store
    /// failure stops dispatch, lets in-flight operations drain and is
    /// returned as an error.
    pub async fn apply(&self, plan: &Plan) -> Result<ExecutionReport> {
        let start = Instant::now();
        let ops = &plan.operations;
        let n = ops.len();
        let concurrency = self.config.concurrency.max(1);

        let (predecessors, successors) = wait_graph(ops);
        let mut remaining: Vec<usize> = predecessors.iter().map(|p| p.len()).collect();
        let mut blocked: Vec<Option<String>> = vec![None; n];
        let mut outcomes: Vec<Option<ResourceOutcome>> = vec![None; n];
        let mut ready: BTreeSet<usize> = (0..n).filter(|i| remaining[*i] == 0).collect();

        let shared = Arc::new(Shared {
            registry: self.registry.clone(),
            store: self.store.clone(),
            retry: self.config.retry.clone(),
            ids: RwLock::new(
                ops.iter()
                    .filter_map(|op| {
                        op.external_id()
                            .filter(|_| op.prior.as_ref().is_some_and(|r| r.exists()))
                            .map(|id| (op.target.clone(), id.to_string()))
                    })
                    .collect(),
            ),
        });

        let mut join_set: JoinSet<(usize, Result<TaskOutcome>)> = JoinSet::new();
        let mut fatal: Option<CloudError> = None;
        let mut cancelled = false;

        loop {
            if !cancelled && self.cancel.is_cancelled() {
                cancelled = true;
                tracing::warn!("Cancellation requested; draining {} in-flight operations", join_set.len());
            }

            while fatal.is_none() && !cancelled && join_set.len() < concurrency {
                let Some(i) = ready.pop_first() else {
                    break;
                };
                let op = &ops[i];

                if let Some(root) = blocked[i].clone() {
                    tracing::warn!("Skipping {}: dependency '{}' failed", op.target, root);
                    if op.prior.is_none() {
                        let record = ActualStateRecord::new(&op.kind);
                        if let Err(e) = shared.store.record_transition(&op.target, record).await {
                            fatal = Some(e);
                            continue;
                        }
                    }
                    outcomes[i] = Some(resource_outcome(
                        op,
                        TaskOutcome {
                            outcome: Outcome::Skipped,
                            attempts: 0,
                            external_id: op.external_id().map(str::to_string),
                            message: Some(format!("dependency '{}' failed", root)),
                        },
                    ));
                    release(i, Some(root), &successors, &mut remaining, &mut blocked, &mut ready);
                    continue;
                }

                if op.action == Action::NoOp {
                    match refresh_unchanged(&shared, op).await {
                        Ok(done) => {
                            outcomes[i] = Some(resource_outcome(op, done));
                            release(i, None, &successors, &mut remaining, &mut blocked, &mut ready);
                        }
                        Err(e) => fatal = Some(e),
                    }
                    continue;
                }

                tracing::debug!("Dispatching {} ({})", op.target, op.action);
                let task_shared = shared.clone();
                let task_op = op.clone();
                join_set.spawn(async move { (i, run_operation(task_shared, task_op).await) });
            }

            if join_set.is_empty() {
                break;
            }

            tokio::select! {
                joined = join_set.join_next() => {
                    let Some(joined) = joined else { continue };
                    match joined {
                        Ok((i, Ok(done))) => {
                            let failed_root = (done.outcome == Outcome::Failed)
                                .then(|| ops[i].target.clone());
                            outcomes[i] = Some(resource_outcome(&ops[i], done));
                            release(i, failed_root, &successors, &mut remaining, &mut blocked, &mut ready);
                        }
                        Ok((i, Err(e))) => {
                            tracing::error!("State store failure while applying {}: {}", ops[i].target, e);
                            fatal.get_or_insert(e);
                        }
                        Err(e) => {
                            fatal.get_or_insert(CloudError::Task(e.to_string()));
                        }
                    }
                }
                _ = self.cancel.cancelled(), if !cancelled => {
                    cancelled = true;
                    tracing::warn!("Cancellation requested; draining {} in-flight operations", join_set.len());
                }
            }
        }

        if let Some(e) = fatal {
            return Err(e);
        }

        let outcomes = outcomes
            .into_iter()
            .zip(ops)
            .map(|(done, op)| {
                done.unwrap_or_else(|| {
                    resource_outcome(
                        op,
                        TaskOutcome {
                            outcome: Outcome::Cancelled,
                            attempts: 0,
                            external_id: op.external_id().map(str::to_string),
                            message: Some("not dispatched: run cancelled".to_string()),
                        },
                    )
                })
            })
            .collect();

        let report = ExecutionReport::new(outcomes, start.elapsed().as_millis() as u64);
        tracing::info!("Apply finished: {}", report.summary());
        Ok(report)
    }
}

/// Which operations each operation waits for, and the reverse.
///
/// Creates, updates and no-ops wait for the operations of their graph
/// dependencies. A delete waits for every other operation on a resource
/// that was recorded as depending on it.
fn wait_graph(ops: &[Operation]) -> (Vec<Vec<usize>>, Vec<Vec<usize>>) {
    let index: HashMap<&str, usize> = ops
        .iter()
        .enumerate()
        .map(|(i, op)| (op.target.as_str(), i))
        .collect();

    let mut predecessors = vec![Vec::new(); ops.len()];
    for (i, op) in ops.iter().enumerate() {
        if op.action == Action::Delete {
            continue;
        }
        for dep in &op.depends_on {
            if let Some(&j) = index.get(dep.as_str()) {
                if ops[j].action != Action::Delete {
                    predecessors[i].push(j);
                }
            }
        }
    }
    for (j, op) in ops.iter().enumerate() {
        let recorded = op.prior.as_ref().map(|r| r.depends_on.as_slice());
        let on_record = if op.action == Action::Delete {
            Some(op.depends_on.as_slice())
        } else {
            recorded
        };
        for dep in on_record.unwrap_or_default() {
            if let Some(&i) = index.get(dep.as_str()) {
                if ops[i].action == Action::Delete && !predecessors[i].contains(&j) {
                    predecessors[i].push(j);
                }
            }
        }
    }

    let mut successors = vec![Vec::new(); ops.len()];
    for (i, preds) in predecessors.iter().enumerate() {
        for &p in preds {
            successors[p].push(i);
        }
    }
    (predecessors, successors)
}

/// Mark `i` terminal and make successors ready. `failed_root` names the
/// failure that successors inherit.
fn release(
    i: usize,
    failed_root: Option<String>,
    successors: &[Vec<usize>],
    remaining: &mut [usize],
    blocked: &mut [Option<String>],
    ready: &mut BTreeSet<usize>,
) {
    for &s in &successors[i] {
        if let Some(root) = &failed_root {
            blocked[s].get_or_insert_with(|| root.clone());
        }
        remaining[s] -= 1;
        if remaining[s] == 0 {
            ready.insert(s);
        }
    }
}

fn resource_outcome(op: &Operation, done: TaskOutcome) -> ResourceOutcome {
    ResourceOutcome {
        target: op.target.clone(),
        kind: op.kind.clone(),
        action: op.action,
        outcome: done.outcome,
        attempts: done.attempts,
        external_id: done.external_id,
        message: done.message,
    }
}

/// No provider call; only refresh recorded dependencies if they changed.
async fn refresh_unchanged(shared: &Shared, op: &Operation) -> Result<TaskOutcome> {
    if let Some(prior) = &op.prior {
        if prior.depends_on != op.depends_on {
            let mut record = prior.transition(prior.status);
            record.depends_on = op.depends_on.clone();
            shared.store.record_transition(&op.target, record).await?;
        }
    }
    Ok(TaskOutcome {
        outcome: Outcome::Unchanged,
        attempts: 0,
        external_id: op.external_id().map(str::to_string),
        message: None,
    })
}

async fn run_operation(shared: Arc<Shared>, op: Operation) -> Result<TaskOutcome> {
    let base = op
        .prior
        .clone()
        .unwrap_or_else(|| ActualStateRecord::new(&op.kind));

    if op.action == Action::Delete && op.external_id().is_none() {
        tracing::info!("{} was never created; clearing record", op.target);
        shared.store.record_transition(&op.target, absent_record(&base)).await?;
        return Ok(TaskOutcome {
            outcome: Outcome::Succeeded,
            attempts: 0,
            external_id: None,
            message: None,
        });
    }

    let adapter = match shared.registry.resolve(&op.kind) {
        Ok(adapter) => adapter,
        Err(e) => return fail(&shared, &op, base, e, 0).await,
    };

    let properties = if op.action == Action::Delete {
        op.properties.clone()
    } else {
        let ids = shared.ids.read().await;
        match reference::resolve(&op.properties, |name| ids.get(name).cloned()) {
            Ok(resolved) => resolved,
            Err(missing) => {
                drop(ids);
                let e = ProviderError::permanent(format!(
                    "unresolved reference to '{}': it has no external id",
                    missing
                ));
                return fail(&shared, &op, base, e, 0).await;
            }
        }
    };

    let in_flight = match op.action {
        Action::Create => ResourceStatus::Creating,
        Action::Update => ResourceStatus::Updating,
        _ => ResourceStatus::Deleting,
    };
    let mut marker = base.transition(in_flight);
    if op.action != Action::Delete {
        marker.depends_on = pending_depends_on(&base, &op);
    }
    shared.store.record_transition(&op.target, marker).await?;

    tracing::info!("{} {} ({})", op.action, op.target, op.kind);
    let mut retry = RetryState::new(shared.retry.clone());
    let result = loop {
        retry.begin_attempt();
        match invoke(adapter.as_ref(), &op, &properties).await {
            Ok(id) => break Ok(id),
            Err(e) => match retry.on_failure(e) {
                RetryDecision::RetryAfter(delay) => {
                    tracing::warn!(
                        "{} of {} failed transiently (attempt {}), retrying in {:?}",
                        op.action,
                        op.target,
                        retry.attempts(),
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::GiveUp(e) => break Err(e),
            },
        }
    };

    match result {
        Ok(external_id) => {
            let record = match (&external_id, op.action) {
                (Some(id), Action::Create | Action::Update) => ActualStateRecord {
                    external_id: Some(id.clone()),
                    kind: op.kind.clone(),
                    checksum: op.checksum.clone(),
                    status: ResourceStatus::Active,
                    message: None,
                    depends_on: op.depends_on.clone(),
                    properties,
                    updated_at: chrono::Utc::now(),
                },
                _ => absent_record(&base),
            };
            shared.store.record_transition(&op.target, record).await?;

            let mut ids = shared.ids.write().await;
            match &external_id {
                Some(id) => ids.insert(op.target.clone(), id.clone()),
                None => ids.remove(&op.target),
            };
            drop(ids);

            tracing::info!("{} {} succeeded", op.action, op.target);
            Ok(TaskOutcome {
                outcome: Outcome::Succeeded,
                attempts: retry.attempts(),
                external_id,
                message: None,
            })
        }
        Err(e) => fail(&shared, &op, base, e, retry.attempts()).await,
    }
}

/// One provider call for `op`. Returns the external id afterwards.
async fn invoke(
    adapter: &dyn ProviderAdapter,
    op: &Operation,
    properties: &Properties,
) -> std::result::Result<Option<String>, ProviderError> {
    match (op.action, op.external_id()) {
        (Action::Update, Some(id)) => {
            adapter.update(&op.kind, id, properties).await?;
            Ok(Some(id.to_string()))
        }
        (Action::Delete, Some(id)) => {
            adapter.delete(&op.kind, id).await?;
            Ok(None)
        }
        (Action::Delete, None) => Ok(None),
        _ => adapter.create(&op.kind, properties).await.map(Some),
    }
}

async fn fail(
    shared: &Shared,
    op: &Operation,
    base: ActualStateRecord,
    error: ProviderError,
    attempts: u32,
) -> Result<TaskOutcome> {
    tracing::warn!("{} of {} failed: {}", op.action, op.target, error.message());
    let mut record = base.transition(ResourceStatus::Failed);
    record.message = Some(error.message().to_string());
    if op.action != Action::Delete {
        record.depends_on = pending_depends_on(&base, op);
    }
    shared.store.record_transition(&op.target, record).await?;

    Ok(TaskOutcome {
        outcome: Outcome::Failed,
        attempts,
        external_id: op.external_id().map(str::to_string),
        message: Some(error.message().to_string()),
    })
}

/// Old and new dependencies of a change that has not succeeded yet
fn pending_depends_on(base: &ActualStateRecord, op: &Operation) -> Vec<String> {
    let merged: BTreeSet<&String> = base.depends_on.iter().chain(&op.depends_on).collect();
    merged.into_iter().cloned().collect()
}

fn absent_record(base: &ActualStateRecord) -> ActualStateRecord {
    ActualStateRecord {
        external_id: None,
        checksum: None,
        properties: Properties::new(),
        depends_on: Vec::new(),
        ..base.transition(ResourceStatus::Absent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ResourceGraph;
    use crate::planner;
    use crate::provider::ProviderResult;
    use crate::resource::Resource;
    use crate::state::{MemoryStateStore, StateSnapshot};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Records calls; creates fail for kinds listed in `broken`.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        broken: Vec<String>,
        flaky: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl ProviderAdapter for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn create(&self, kind: &str, properties: &Properties) -> ProviderResult<String> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.calls.lock().unwrap().push(format!("create:{}", kind));
            if self.flaky.load(Ordering::SeqCst) > 0 {
                self.flaky.fetch_sub(1, Ordering::SeqCst);
                return Err(ProviderError::transient("rate limited"));
            }
            if self.broken.iter().any(|b| b == kind) {
                return Err(ProviderError::permanent(format!("{} is broken", kind)));
            }
            let suffix = properties
                .get("ref")
                .and_then(|v| v.as_str())
                .map(|r| format!("<{}>", r))
                .unwrap_or_default();
            Ok(format!("id-{}{}", kind, suffix))
        }

        async fn read(&self, _kind: &str, _id: &str) -> ProviderResult<Option<Properties>> {
            Ok(None)
        }

        async fn update(&self, kind: &str, _id: &str, _p: &Properties) -> ProviderResult<()> {
            self.calls.lock().unwrap().push(format!("update:{}", kind));
            Ok(())
        }

        async fn delete(&self, kind: &str, _id: &str) -> ProviderResult<()> {
            self.calls.lock().unwrap().push(format!("delete:{}", kind));
            Ok(())
        }
    }

    fn setup(
        resources: Vec<Resource>,
        provider: Arc<Recorder>,
        config: ExecutorConfig,
    ) -> (Plan, Executor, Arc<MemoryStateStore>) {
        let graph = ResourceGraph::build(resources).unwrap();
        let plan = planner::plan(&graph, &StateSnapshot::new());
        let store = Arc::new(MemoryStateStore::new());
        let registry = ProviderRegistry::new().with_fallback(provider);
        let executor = Executor::new(registry, store.clone(), config);
        (plan, executor, store)
    }

    fn quick(concurrency: usize) -> ExecutorConfig {
        ExecutorConfig {
            concurrency,
            retry: RetryConfig::immediate(3),
        }
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let provider = Arc::new(Recorder {
            delay: Duration::from_millis(20),
            ..Recorder::default()
        });
        let resources = (0..6).map(|i| Resource::new(format!("r{i}"), format!("k{i}"))).collect();
        let (plan, executor, _) = setup(resources, provider.clone(), quick(2));

        let report = executor.apply(&plan).await.unwrap();
        assert!(report.is_success());
        assert_eq!(provider.max_in_flight.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_chain_runs_serially_in_order() {
        let provider = Arc::new(Recorder::default());
        let resources = vec![
            Resource::new("c", "kc").depends_on("b"),
            Resource::new("b", "kb").depends_on("a"),
            Resource::new("a", "ka"),
        ];
        let (plan, executor, _) = setup(resources, provider.clone(), quick(8));

        executor.apply(&plan).await.unwrap();
        assert_eq!(
            *provider.calls.lock().unwrap(),
            vec!["create:ka", "create:kb", "create:kc"]
        );
    }

    #[tokio::test]
    async fn test_transient_errors_retried() {
        let provider = Arc::new(Recorder {
            flaky: AtomicUsize::new(2),
            ..Recorder::default()
        });
        let (plan, executor, store) =
            setup(vec![Resource::new("a", "ka")], provider.clone(), quick(1));

        let report = executor.apply(&plan).await.unwrap();
        let a = report.get("a").unwrap();
        assert_eq!(a.outcome, Outcome::Succeeded);
        assert_eq!(a.attempts, 3);
        assert_eq!(
            store.snapshot().await.unwrap()["a"].status,
            ResourceStatus::Active
        );
    }

    #[tokio::test]
    async fn test_retry_exhaustion_fails_operation() {
        let provider = Arc::new(Recorder {
            flaky: AtomicUsize::new(10),
            ..Recorder::default()
        });
        let (plan, executor, store) =
            setup(vec![Resource::new("a", "ka")], provider.clone(), quick(1));

        let report = executor.apply(&plan).await.unwrap();
        let a = report.get("a").unwrap();
        assert_eq!(a.outcome, Outcome::Failed);
        assert_eq!(a.attempts, 3);
        assert!(a.message.as_deref().unwrap().contains("gave up after 3 attempts"));

        let record = &store.snapshot().await.unwrap()["a"];
        assert_eq!(record.status, ResourceStatus::Failed);
        assert!(record.message.is_some());
    }

    #[tokio::test]
    async fn test_references_resolved_from_dependencies() {
        let provider = Arc::new(Recorder::default());
        let resources = vec![
            Resource::new("vpc", "network.vpc"),
            Resource::new("db", "database.cluster")
                .with_property("ref", serde_json::json!("${vpc.id}")),
        ];
        let (plan, executor, store) = setup(resources, provider, quick(4));

        let report = executor.apply(&plan).await.unwrap();
        assert_eq!(
            report.get("db").unwrap().external_id.as_deref(),
            Some("id-database.cluster<id-network.vpc>")
        );
        let db = &store.snapshot().await.unwrap()["db"];
        assert_eq!(db.properties["ref"], serde_json::json!("id-network.vpc"));
        assert_eq!(db.depends_on, vec!["vpc"]);
    }

    #[tokio::test]
    async fn test_pre_cancelled_run_dispatches_nothing() {
        let provider = Arc::new(Recorder::default());
        let (plan, executor, store) = setup(
            vec![Resource::new("a", "ka"), Resource::new("b", "kb")],
            provider.clone(),
            quick(4),
        );
        let token = CancellationToken::new();
        token.cancel();
        let executor = executor.with_cancellation(token);

        let report = executor.apply(&plan).await.unwrap();
        assert_eq!(report.status, crate::report::RunStatus::Cancelled);
        assert_eq!(report.count(Outcome::Cancelled), 2);
        assert!(provider.calls.lock().unwrap().is_empty());
        assert!(store.snapshot().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_fatal() {
        let provider = Arc::new(Recorder::default());
        let graph = ResourceGraph::build(vec![
            Resource::new("a", "ka"),
            Resource::new("b", "kb").depends_on("a"),
        ])
        .unwrap();
        let plan = planner::plan(&graph, &StateSnapshot::new());
        // Allows the in-flight marker for "a" and nothing else
        let store = Arc::new(MemoryStateStore::new().failing_after(1));
        let executor = Executor::new(
            ProviderRegistry::new().with_fallback(provider.clone()),
            store,
            quick(1),
        );

        let err = executor.apply(&plan).await.unwrap_err();
        assert!(matches!(err, CloudError::StateStore(_)));
        assert_eq!(*provider.calls.lock().unwrap(), vec!["create:ka"]);
    }

    #[tokio::test]
    async fn test_missing_adapter_fails_without_retry() {
        let graph = ResourceGraph::build(vec![Resource::new("a", "unknown.kind")]).unwrap();
        let plan = planner::plan(&graph, &StateSnapshot::new());
        let store = Arc::new(MemoryStateStore::new());
        let executor = Executor::new(ProviderRegistry::new(), store, quick(1));

        let report = executor.apply(&plan).await.unwrap();
        let a = report.get("a").unwrap();
        assert_eq!(a.outcome, Outcome::Failed);
        assert_eq!(a.attempts, 0);
        assert!(a.message.as_deref().unwrap().contains("unknown.kind"));
    }

    #[test]
    fn test_wait_graph_for_deletes_is_reversed() {
        let op = |target: &str, action: Action, deps: &[&str]| Operation {
            target: target.to_string(),
            kind: "k".to_string(),
            action,
            properties: Properties::new(),
            checksum: None,
            depends_on: deps.iter().map(|d| d.to_string()).collect(),
            prior: None,
        };
        let ops = vec![
            op("keep", Action::Create, &[]),
            op("b", Action::Delete, &["a"]),
            op("a", Action::Delete, &[]),
        ];
        let (pred, succ) = wait_graph(&ops);
        assert!(pred[0].is_empty());
        assert!(pred[1].is_empty());
        assert_eq!(pred[2], vec![1]);
        assert_eq!(succ[1], vec![2]);
    }

    #[test]
    fn test_delete_waits_for_operations_on_recorded_dependents() {
        let op = |target: &str, action: Action, prior_deps: &[&str]| Operation {
            target: target.to_string(),
            kind: "k".to_string(),
            action,
            properties: Properties::new(),
            checksum: None,
            depends_on: Vec::new(),
            prior: Some(
                ActualStateRecord::new("k")
                    .with_status(ResourceStatus::Active)
                    .with_external_id(format!("{}-1", target))
                    .with_depends_on(prior_deps.iter().map(|d| d.to_string()).collect()),
            ),
        };
        let ops = vec![
            op("sg", Action::Update, &["vpc"]),
            op("log", Action::NoOp, &["vpc"]),
            op("other", Action::Create, &[]),
            op("vpc", Action::Delete, &[]),
        ];
        let (pred, succ) = wait_graph(&ops);
        assert!(pred[0].is_empty());
        assert_eq!(pred[3], vec![0, 1]);
        assert_eq!(succ[0], vec![3]);
        assert!(succ[2].is_empty());
    }
}
