use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use terrace_cloud::{
    ExecutorConfig, MemoryStateStore, Properties, ProviderAdapter, ProviderError,
    ProviderRegistry, ProviderResult, Reconciler, Resource, RetryConfig,
};

/// In-memory cloud with scripted failures.
///
/// Every call is logged as `<op>:<kind>` before any scripted fault applies,
/// so failed attempts show up in `calls()`. Slowed calls are logged after
/// their delay, so the log follows completion order.
#[derive(Default)]
pub struct ScriptedProvider {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    live: BTreeMap<String, (String, Properties)>,
    next_id: u64,
    calls: Vec<String>,
    faults: HashMap<String, VecDeque<ProviderError>>,
    delays: HashMap<String, Duration>,
}

impl Inner {
    fn enter(&mut self, op: &str, kind: &str) -> ProviderResult<()> {
        let key = format!("{}:{}", op, kind);
        self.calls.push(key.clone());
        match self.faults.get_mut(&key).and_then(|q| q.pop_front()) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[allow(dead_code)]
impl ScriptedProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail the next `times` calls of `op` on `kind` with `error`.
    pub fn fail(&self, op: &str, kind: &str, error: ProviderError, times: usize) {
        let mut inner = self.inner.lock().unwrap();
        let queue = inner.faults.entry(format!("{}:{}", op, kind)).or_default();
        queue.extend(std::iter::repeat_n(error, times));
    }

    /// Delay every call of `op` on `kind` by `delay`.
    pub fn slow(&self, op: &str, kind: &str, delay: Duration) {
        let mut inner = self.inner.lock().unwrap();
        inner.delays.insert(format!("{}:{}", op, kind), delay);
    }

    async fn pause(&self, op: &str, kind: &str) {
        let delay = self
            .inner
            .lock()
            .unwrap()
            .delays
            .get(&format!("{}:{}", op, kind))
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    /// Kinds of the resources that currently exist
    pub fn live_kinds(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.live.values().map(|(kind, _)| kind.clone()).collect()
    }

    pub fn properties_of(&self, kind: &str) -> Option<Properties> {
        let inner = self.inner.lock().unwrap();
        inner
            .live
            .values()
            .find(|(k, _)| k == kind)
            .map(|(_, p)| p.clone())
    }

    /// Change a property behind the engine's back.
    pub fn tamper(&self, kind: &str, key: &str, value: serde_json::Value) {
        let mut inner = self.inner.lock().unwrap();
        if let Some((_, props)) = inner.live.values_mut().find(|(k, _)| k == kind) {
            props.insert(key.to_string(), value);
        }
    }

    /// Remove a resource behind the engine's back.
    pub fn vanish(&self, kind: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.live.retain(|_, (k, _)| k != kind);
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn create(&self, kind: &str, properties: &Properties) -> ProviderResult<String> {
        self.pause("create", kind).await;
        let mut inner = self.inner.lock().unwrap();
        inner.enter("create", kind)?;
        inner.next_id += 1;
        let id = format!("{}-{}", kind, inner.next_id);
        inner
            .live
            .insert(id.clone(), (kind.to_string(), properties.clone()));
        Ok(id)
    }

    async fn read(&self, kind: &str, external_id: &str) -> ProviderResult<Option<Properties>> {
        let mut inner = self.inner.lock().unwrap();
        inner.enter("read", kind)?;
        Ok(inner.live.get(external_id).map(|(_, p)| p.clone()))
    }

    async fn update(
        &self,
        kind: &str,
        external_id: &str,
        properties: &Properties,
    ) -> ProviderResult<()> {
        self.pause("update", kind).await;
        let mut inner = self.inner.lock().unwrap();
        inner.enter("update", kind)?;
        match inner.live.get_mut(external_id) {
            Some((_, props)) => {
                *props = properties.clone();
                Ok(())
            }
            None => Err(ProviderError::permanent(format!("{} not found", external_id))),
        }
    }

    async fn delete(&self, kind: &str, external_id: &str) -> ProviderResult<()> {
        self.pause("delete", kind).await;
        let mut inner = self.inner.lock().unwrap();
        inner.enter("delete", kind)?;
        inner.live.remove(external_id);
        Ok(())
    }
}

pub fn reconciler(provider: Arc<ScriptedProvider>, store: Arc<MemoryStateStore>) -> Reconciler {
    Reconciler::new(
        ProviderRegistry::new().with_fallback(provider),
        store,
        ExecutorConfig {
            concurrency: 4,
            retry: RetryConfig::immediate(3),
        },
    )
}

/// Resource `name` of kind `svc.<name>`
pub fn svc(name: &str, deps: &[&str]) -> Resource {
    let mut resource = Resource::new(name, format!("svc.{}", name))
        .with_property("size", serde_json::json!(1));
    for dep in deps {
        resource = resource.depends_on(*dep);
    }
    resource
}
