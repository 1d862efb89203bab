//! Lease-based distributed locks

use crate::clock::{Clock, SystemClock};
use crate::context::{CallContext, guarded};
use crate::error::{CoordinationError, ErrorKind, Operation, Result, Step};
use crate::lease::{Lease, LeaseKey};
use crate::store::LeaseStore;
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Lock primitives over a [`LeaseStore`].
///
/// Each call is a fresh read (and possibly a write) against the store; no
/// lease state is cached between calls and nothing is retried. Two return
/// shapes must not be confused: `Ok(false)` means the lease is held by
/// someone and still live, `Err(_)` means the operation failed.
#[derive(Clone)]
pub struct LockManager {
    store: Arc<dyn LeaseStore>,
    clock: Arc<dyn Clock>,
}

impl LockManager {
    /// Create a lock manager using the system clock.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use nodepool_distributed::{CallContext, LockManager, MemoryLeaseStore};
    /// use std::sync::Arc;
    /// use std::time::Duration;
    ///
    /// # tokio_test::block_on(async {
    /// let manager = LockManager::new(Arc::new(MemoryLeaseStore::new()));
    /// let ctx = CallContext::new();
    ///
    /// let acquired = manager
    ///     .acquire_lease(&ctx, "job-7", "default", "worker-1", Duration::from_secs(10))
    ///     .await?;
    /// assert!(acquired);
    /// # Ok::<(), nodepool_distributed::CoordinationError>(())
    /// # }).unwrap();
    /// ```
    pub fn new(store: Arc<dyn LeaseStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used for liveness decisions and renew times.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Unconditionally create a lease held by `holder`.
    ///
    /// No liveness check is made; an existing record yields an
    /// `AlreadyExists` error.
    pub async fn create_lease(
        &self,
        ctx: &CallContext,
        name: &str,
        namespace: &str,
        holder: &str,
        ttl: Duration,
    ) -> Result<bool> {
        let op = Operation::CreateLease;
        let key = lease_key(name, namespace)?;
        require_holder(holder)?;
        let ttl_seconds = ttl_seconds(ttl)?;

        let target = key.to_string();
        let lease = Lease::new(key, holder, ttl_seconds, self.now());
        guarded(ctx, op, &target, Step::Create, self.store.create(ctx, lease)).await?;

        info!(lease = %target, holder, ttl_seconds, "Created lease");
        Ok(true)
    }

    /// Try to take the lease for `holder`.
    ///
    /// - absent: created for `holder`, `Ok(true)`
    /// - live (renewed less than `ttl` ago): untouched, `Ok(false)`, even
    ///   when `holder` is the current holder
    /// - expired: overwritten with `holder`, `ttl` and a fresh renew time,
    ///   `Ok(true)`
    ///
    /// The expired path is a plain read followed by an update. Whether two
    /// callers racing on the same expired lease can both win depends on the
    /// store honouring `resource_version` on update.
    pub async fn acquire_lease(
        &self,
        ctx: &CallContext,
        name: &str,
        namespace: &str,
        holder: &str,
        ttl: Duration,
    ) -> Result<bool> {
        let op = Operation::AcquireLease;
        let key = lease_key(name, namespace)?;
        require_holder(holder)?;
        let ttl_seconds = ttl_seconds(ttl)?;
        let target = key.to_string();

        match guarded(ctx, op, &target, Step::Get, self.store.get(ctx, &key)).await {
            Ok(mut lease) => {
                let now = self.now();
                if lease.is_live(now, TimeDelta::seconds(i64::from(ttl_seconds))) {
                    debug!(
                        lease = %target,
                        holder,
                        current = lease.holder_identity.as_deref().unwrap_or(""),
                        "Lease still live, not acquired"
                    );
                    return Ok(false);
                }

                let previous = lease.renew(holder, ttl_seconds, now);
                guarded(ctx, op, &target, Step::Update, self.store.update(ctx, lease)).await?;

                info!(
                    lease = %target,
                    holder,
                    previous = previous.as_deref().unwrap_or(""),
                    ttl_seconds,
                    "Acquired expired lease"
                );
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                let lease = Lease::new(key, holder, ttl_seconds, self.now());
                guarded(ctx, op, &target, Step::Create, self.store.create(ctx, lease)).await?;

                info!(lease = %target, holder, ttl_seconds, "Acquired new lease");
                Ok(true)
            }
            Err(err) => Err(err),
        }
    }

    /// Clear the holder of an existing lease.
    ///
    /// Renew time and duration are kept. Releasing an already released lease
    /// succeeds; releasing a missing one fails with `NotFound`.
    pub async fn release_lease(&self, ctx: &CallContext, name: &str, namespace: &str) -> Result<()> {
        let op = Operation::ReleaseLease;
        let key = lease_key(name, namespace)?;
        let target = key.to_string();

        let mut lease = guarded(ctx, op, &target, Step::Get, self.store.get(ctx, &key)).await?;
        let previous = lease.holder_identity.take();
        guarded(ctx, op, &target, Step::Update, self.store.update(ctx, lease)).await?;

        info!(
            lease = %target,
            previous = previous.as_deref().unwrap_or(""),
            "Released lease"
        );
        Ok(())
    }

    /// Remove the lease record entirely.
    pub async fn delete_lease(&self, ctx: &CallContext, name: &str, namespace: &str) -> Result<()> {
        let op = Operation::DeleteLease;
        let key = lease_key(name, namespace)?;
        let target = key.to_string();

        guarded(ctx, op, &target, Step::Delete, self.store.delete(ctx, &key)).await?;

        info!(lease = %target, "Deleted lease");
        Ok(())
    }

    /// Read the current lease record.
    pub async fn get_lease(&self, ctx: &CallContext, name: &str, namespace: &str) -> Result<Lease> {
        let key = lease_key(name, namespace)?;
        let target = key.to_string();
        guarded(ctx, Operation::GetLease, &target, Step::Get, self.store.get(ctx, &key)).await
    }
}

fn lease_key(name: &str, namespace: &str) -> Result<LeaseKey> {
    if name.is_empty() {
        return Err(CoordinationError::InvalidArgument("lease name is empty".to_string()));
    }
    if namespace.is_empty() {
        return Err(CoordinationError::InvalidArgument(format!(
            "namespace of lease {} is empty",
            name
        )));
    }
    Ok(LeaseKey::new(name, namespace))
}

fn require_holder(holder: &str) -> Result<()> {
    if holder.is_empty() {
        return Err(CoordinationError::InvalidArgument("holder identity is empty".to_string()));
    }
    Ok(())
}

/// Whole seconds of `ttl`, which must fit the record's int32 field.
fn ttl_seconds(ttl: Duration) -> Result<i32> {
    match i32::try_from(ttl.as_secs()) {
        Ok(0) => Err(CoordinationError::InvalidArgument(
            "lease ttl must be at least one second".to_string(),
        )),
        Ok(seconds) => Ok(seconds),
        Err(_) => Err(CoordinationError::InvalidArgument(format!(
            "lease ttl of {}s exceeds {}s",
            ttl.as_secs(),
            i32::MAX
        ))),
    }
}

/// A lock bound to one lease name, namespace and holder.
#[derive(Clone)]
pub struct LeaseLock {
    manager: LockManager,
    name: String,
    namespace: String,
    holder: String,
    ttl: Duration,
}

impl LeaseLock {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn acquire(&self, ctx: &CallContext) -> Result<bool> {
        self.manager
            .acquire_lease(ctx, &self.name, &self.namespace, &self.holder, self.ttl)
            .await
    }

    pub async fn create(&self, ctx: &CallContext) -> Result<bool> {
        self.manager
            .create_lease(ctx, &self.name, &self.namespace, &self.holder, self.ttl)
            .await
    }

    pub async fn release(&self, ctx: &CallContext) -> Result<()> {
        self.manager.release_lease(ctx, &self.name, &self.namespace).await
    }

    pub async fn delete(&self, ctx: &CallContext) -> Result<()> {
        self.manager.delete_lease(ctx, &self.name, &self.namespace).await
    }

    /// Whether the stored record currently names this lock's holder.
    ///
    /// This only inspects the record; it says nothing about liveness.
    pub async fn is_recorded_holder(&self, ctx: &CallContext) -> Result<bool> {
        let lease = self.manager.get_lease(ctx, &self.name, &self.namespace).await?;
        Ok(lease.holder_identity.as_deref() == Some(self.holder.as_str()))
    }
}

/// Lease lock builder
pub struct LockBuilder {
    name: String,
    namespace: String,
    holder: String,
    ttl: Duration,
}

impl LockBuilder {
    /// Create new lock builder
    pub fn new(name: impl Into<String>, holder: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: "default".to_string(),
            holder: holder.into(),
            ttl: Duration::from_secs(15),
        }
    }

    /// Set namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set TTL
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Build the lock
    pub fn build(self, manager: LockManager) -> LeaseLock {
        LeaseLock {
            manager,
            name: self.name,
            namespace: self.namespace,
            holder: self.holder,
            ttl: self.ttl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::StoreError;
    use crate::memory::{MemoryLeaseStore, StoreOp};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn setup() -> (LockManager, MemoryLeaseStore, ManualClock) {
        let store = MemoryLeaseStore::new();
        let clock = ManualClock::new(t0());
        let manager = LockManager::new(Arc::new(store.clone())).with_clock(Arc::new(clock.clone()));
        (manager, store, clock)
    }

    #[test]
    fn test_lock_builder() {
        let builder = LockBuilder::new("test-lock", "replica-0")
            .with_namespace("kube-system")
            .with_ttl(Duration::from_secs(60));

        assert_eq!(builder.name, "test-lock");
        assert_eq!(builder.namespace, "kube-system");
        assert_eq!(builder.ttl, Duration::from_secs(60));

        let lock = builder.build(LockManager::new(Arc::new(MemoryLeaseStore::new())));
        assert_eq!(lock.name(), "test-lock");
        assert_eq!(lock.namespace(), "kube-system");
        assert_eq!(lock.holder(), "replica-0");
        assert_eq!(lock.ttl(), Duration::from_secs(60));
    }

    #[test]
    fn test_ttl_seconds_bounds() {
        assert_eq!(ttl_seconds(Duration::from_millis(5_900)).unwrap(), 5);
        assert!(ttl_seconds(Duration::from_millis(999)).is_err());
        assert!(ttl_seconds(Duration::from_secs(i32::MAX as u64 + 1)).is_err());
    }

    #[tokio::test]
    async fn test_acquire_absent_creates_lease() {
        let (manager, store, _clock) = setup();
        let ctx = CallContext::new();

        let acquired = manager
            .acquire_lease(&ctx, "job-7", "default", "worker-1", Duration::from_secs(10))
            .await
            .unwrap();
        assert!(acquired);

        let lease = store.snapshot(&LeaseKey::new("job-7", "default")).unwrap();
        assert_eq!(lease.holder_identity.as_deref(), Some("worker-1"));
        assert_eq!(lease.lease_duration_seconds, 10);
        assert_eq!(lease.renew_time, Some(t0()));
    }

    #[tokio::test]
    async fn test_create_existing_fails_already_exists() {
        let (manager, _store, _clock) = setup();
        let ctx = CallContext::new();
        let ttl = Duration::from_secs(5);

        assert!(manager.create_lease(&ctx, "L", "default", "A", ttl).await.unwrap());

        let err = manager.create_lease(&ctx, "L", "default", "B", ttl).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(err.operation(), Some(Operation::CreateLease));
    }

    #[tokio::test]
    async fn test_invalid_arguments_never_reach_store() {
        let (manager, store, _clock) = setup();
        let ctx = CallContext::new();
        let ttl = Duration::from_secs(5);

        let cases = [
            manager.acquire_lease(&ctx, "", "default", "A", ttl).await,
            manager.acquire_lease(&ctx, "L", "", "A", ttl).await,
            manager.acquire_lease(&ctx, "L", "default", "", ttl).await,
            manager.acquire_lease(&ctx, "L", "default", "A", Duration::ZERO).await,
            manager.create_lease(&ctx, "L", "default", "", ttl).await,
        ];
        for result in cases {
            assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidArgument);
        }
        assert!(manager.release_lease(&ctx, "", "default").await.is_err());
        assert!(manager.delete_lease(&ctx, "L", "").await.is_err());

        assert!(store.operations().is_empty());
    }

    #[tokio::test]
    async fn test_get_error_other_than_not_found_is_not_treated_as_absent() {
        let (manager, store, _clock) = setup();
        let ctx = CallContext::new();
        store.fail_next(StoreOp::Get, StoreError::Transient("etcd unavailable".into()));

        let err = manager
            .acquire_lease(&ctx, "L", "default", "A", Duration::from_secs(5))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transient);
        assert_eq!(store.operations(), vec![StoreOp::Get]);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_lease_lock_handle() {
        let (manager, _store, clock) = setup();
        let ctx = CallContext::new();
        let lock = LockBuilder::new("pool-lock", "replica-0")
            .with_ttl(Duration::from_secs(5))
            .build(manager.clone());
        let rival = LockBuilder::new("pool-lock", "replica-1")
            .with_ttl(Duration::from_secs(5))
            .build(manager);

        assert!(lock.acquire(&ctx).await.unwrap());
        assert!(lock.is_recorded_holder(&ctx).await.unwrap());
        assert!(!rival.acquire(&ctx).await.unwrap());

        clock.advance(TimeDelta::seconds(5));
        assert!(rival.acquire(&ctx).await.unwrap());
        assert!(!lock.is_recorded_holder(&ctx).await.unwrap());

        rival.release(&ctx).await.unwrap();
        rival.delete(&ctx).await.unwrap();
        assert!(lock.is_recorded_holder(&ctx).await.unwrap_err().is_not_found());
    }
}
