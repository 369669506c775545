//! Terrace reconciliation core
//!
//! Converges the actual state of a set of cloud resources toward a declared
//! desired state. Provider specifics live behind [`ProviderAdapter`]; this
//! crate owns ordering, diffing, bookkeeping and failure handling.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                   terrace CLI                    │
//! │         (validate / plan / apply / drift)         │
//! └─────────────────┬───────────────────────────────┘
//!                   │ Vec<Resource>
//! ┌─────────────────▼───────────────────────────────┐
//! │                 terrace-cloud                    │
//! │  ┌──────────┐  ┌──────────┐  ┌──────────────┐   │
//! │  │  Graph   │─▶│ Planner  │─▶│   Executor   │   │
//! │  └──────────┘  └────▲─────┘  └──┬────────┬──┘   │
//! │                     │           │        │      │
//! │               ┌─────┴───────────▼┐       │      │
//! │               │   State Store    │       │      │
//! │               └──────────────────┘       │      │
//! │  ┌───────────────────────────────────────▼──┐   │
//! │  │    trait ProviderAdapter { ... }         │   │
//! │  └──────────────────────────────────────────┘   │
//! └───────────────────────┬─────────────────────────┘
//!                         │
//!                 ┌───────▼───────┐
//!                 │    sandbox    │
//!                 │   provider    │
//!                 └───────────────┘
//! ```

pub mod drift;
pub mod error;
pub mod executor;
pub mod graph;
pub mod plan;
pub mod planner;
pub mod provider;
pub mod reconcile;
pub mod reference;
pub mod report;
pub mod resource;
pub mod retry;
pub mod state;

// Re-exports
pub use drift::{DriftFinding, DriftReport, DriftStatus, detect_drift};
pub use error::{CloudError, ProviderError, Result, ValidationError};
pub use executor::{Executor, ExecutorConfig};
pub use graph::ResourceGraph;
pub use plan::{Action, Operation, Plan, PlanSummary};
pub use provider::{ProviderAdapter, ProviderRegistry, ProviderResult, RetryConfig};
pub use reconcile::{ReconcileOptions, Reconciler};
pub use report::{ExecutionReport, Outcome, ResourceOutcome, RunStatus};
pub use resource::{Properties, Resource};
pub use retry::{RetryDecision, RetryState};
pub use state::{
    ActualStateRecord, FileStateStore, MemoryStateStore, ResourceStatus, StateLock, StateSnapshot,
    StateStore,
};
pub use tokio_util::sync::CancellationToken;
