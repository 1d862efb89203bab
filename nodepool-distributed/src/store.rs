//! Coordination backend capability

use crate::context::CallContext;
use crate::error::StoreError;
use crate::lease::{Lease, LeaseKey};
use async_trait::async_trait;
use std::sync::Arc;

/// Lease storage offered by a coordination backend.
///
/// Every method is one remote round trip. Implementations may fail with
/// [`StoreError::Transient`] regardless of the logical outcome.
///
/// A backend that supports optimistic concurrency rejects `update` with
/// [`StoreError::Conflict`] when `lease.resource_version` no longer matches
/// the stored record. One that does not simply overwrites.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Read a lease, [`StoreError::NotFound`] when absent.
    async fn get(&self, ctx: &CallContext, key: &LeaseKey) -> Result<Lease, StoreError>;

    /// Create a lease, [`StoreError::AlreadyExists`] when present.
    async fn create(&self, ctx: &CallContext, lease: Lease) -> Result<Lease, StoreError>;

    /// Replace a lease as a whole object.
    async fn update(&self, ctx: &CallContext, lease: Lease) -> Result<Lease, StoreError>;

    /// Remove a lease, [`StoreError::NotFound`] when absent.
    async fn delete(&self, ctx: &CallContext, key: &LeaseKey) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: LeaseStore + ?Sized> LeaseStore for Arc<S> {
    async fn get(&self, ctx: &CallContext, key: &LeaseKey) -> Result<Lease, StoreError> {
        (**self).get(ctx, key).await
    }

    async fn create(&self, ctx: &CallContext, lease: Lease) -> Result<Lease, StoreError> {
        (**self).create(ctx, lease).await
    }

    async fn update(&self, ctx: &CallContext, lease: Lease) -> Result<Lease, StoreError> {
        (**self).update(ctx, lease).await
    }

    async fn delete(&self, ctx: &CallContext, key: &LeaseKey) -> Result<(), StoreError> {
        (**self).delete(ctx, key).await
    }
}
