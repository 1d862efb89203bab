//! Cluster server version discovery

use crate::context::CallContext;
use crate::error::StoreError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Version discovery offered by a coordination backend.
#[async_trait]
pub trait ServerVersion: Send + Sync {
    /// The server's git version, e.g. `v1.31.0`.
    async fn server_version(&self, ctx: &CallContext) -> Result<String, StoreError>;
}

#[async_trait]
impl<S: ServerVersion + ?Sized> ServerVersion for Arc<S> {
    async fn server_version(&self, ctx: &CallContext) -> Result<String, StoreError> {
        (**self).server_version(ctx).await
    }
}

/// Ask `source` for the server version, `None` when discovery fails.
pub async fn discover_server_version(ctx: &CallContext, source: &dyn ServerVersion) -> Option<String> {
    match ctx.run(source.server_version(ctx)).await {
        Ok(version) => {
            debug!(version = %version, "Discovered server version");
            Some(version)
        }
        Err(err) => {
            warn!(error = %err, "Server version discovery failed");
            None
        }
    }
}
