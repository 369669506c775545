//! Sandbox provider implementation

use crate::client::{Fault, SandboxClient, SandboxObject};
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use terrace_cloud::{Properties, ProviderAdapter, ProviderResult};

/// Simulated cloud backed by a directory
///
/// Accepts any resource kind and stores properties verbatim; it implements
/// no service semantics.
pub struct SandboxProvider {
    client: SandboxClient,
}

impl SandboxProvider {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            client: SandboxClient::new(root),
        }
    }

    pub fn with_latency(self, latency: Duration) -> Self {
        Self {
            client: self.client.with_latency(latency),
        }
    }

    pub fn root(&self) -> &Path {
        self.client.root()
    }

    /// Everything currently provisioned in the sandbox
    pub async fn objects(&self) -> Result<Vec<SandboxObject>> {
        self.client.list().await
    }

    /// Script failures for upcoming calls.
    pub async fn inject(&self, op: &str, kind: &str, faults: &[Fault]) -> Result<()> {
        self.client.inject(op, kind, faults).await
    }
}

#[async_trait]
impl ProviderAdapter for SandboxProvider {
    fn name(&self) -> &str {
        "sandbox"
    }

    async fn create(&self, kind: &str, properties: &Properties) -> ProviderResult<String> {
        tracing::info!("Creating {} in sandbox", kind);
        let object = self.client.create(kind, properties).await?;
        Ok(object.id)
    }

    async fn read(&self, kind: &str, external_id: &str) -> ProviderResult<Option<Properties>> {
        let object = self.client.get(kind, external_id).await?;
        Ok(object.map(|o| o.properties))
    }

    async fn update(
        &self,
        kind: &str,
        external_id: &str,
        properties: &Properties,
    ) -> ProviderResult<()> {
        tracing::info!("Updating {} {} in sandbox", kind, external_id);
        self.client.update(kind, external_id, properties).await?;
        Ok(())
    }

    async fn delete(&self, kind: &str, external_id: &str) -> ProviderResult<()> {
        tracing::info!("Deleting {} {} from sandbox", kind, external_id);
        if !self.client.delete(kind, external_id).await? {
            tracing::debug!("{} {} was already gone", kind, external_id);
        }
        Ok(())
    }
}
