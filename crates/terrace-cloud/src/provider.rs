//! Provider adapter interface
//!
//! A provider adapter is the capability set the engine drives for one or
//! more resource kinds. Adapters are selected by kind tag through a
//! [`ProviderRegistry`]; the core never inspects properties itself.

use crate::error::ProviderError;
use crate::resource::Properties;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Cloud provider capability set
///
/// Every call is fallible with a transient or permanent [`ProviderError`].
/// Transient errors are retried by the executor.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Returns the provider name (e.g., "sandbox")
    fn name(&self) -> &str;

    /// Create a resource and return its external identifier
    async fn create(&self, kind: &str, properties: &Properties) -> ProviderResult<String>;

    /// Read current properties, or `None` if the resource no longer exists
    async fn read(&self, kind: &str, external_id: &str) -> ProviderResult<Option<Properties>>;

    /// Converge an existing resource to `properties`
    async fn update(
        &self,
        kind: &str,
        external_id: &str,
        properties: &Properties,
    ) -> ProviderResult<()>;

    /// Delete a resource. Deleting something already gone should succeed.
    async fn delete(&self, kind: &str, external_id: &str) -> ProviderResult<()>;
}

/// Kind tag → adapter dispatch table
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    adapters: BTreeMap<String, Arc<dyn ProviderAdapter>>,
    fallback: Option<Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter for a kind. Replaces any existing registration.
    pub fn register(&mut self, kind: impl Into<String>, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(kind.into(), adapter);
    }

    pub fn with_adapter(mut self, kind: impl Into<String>, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.register(kind, adapter);
        self
    }

    /// Adapter used for kinds without an explicit registration
    pub fn with_fallback(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.fallback = Some(adapter);
        self
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters
            .get(kind)
            .cloned()
            .or_else(|| self.fallback.clone())
    }

    /// Like [`get`](Self::get), but a missing adapter is a permanent error.
    pub fn resolve(&self, kind: &str) -> ProviderResult<Arc<dyn ProviderAdapter>> {
        self.get(kind).ok_or_else(|| {
            ProviderError::permanent(format!("no provider registered for kind '{}'", kind))
        })
    }

    /// Registered kinds
    pub fn kinds(&self) -> Vec<&str> {
        self.adapters.keys().map(|k| k.as_str()).collect()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("kinds", &self.kinds())
            .field("fallback", &self.fallback.as_ref().map(|a| a.name().to_string()))
            .finish()
    }
}

/// Retry configuration for provider operations
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,

    /// Initial delay between retries
    pub initial_delay: Duration,

    /// Maximum delay between retries
    pub max_delay: Duration,

    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// No waiting between attempts; handy for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}
