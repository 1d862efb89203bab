//! Integration tests for nodepool-distributed lease locks

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use nodepool_distributed::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

const NS: &str = "default";

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

fn manager_for(store: &MemoryLeaseStore, clock: &ManualClock) -> LockManager {
    LockManager::new(Arc::new(store.clone())).with_clock(Arc::new(clock.clone()))
}

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

// =============================================================================
// Acquire
// =============================================================================

#[tokio::test]
async fn test_live_lease_rejects_other_holder_then_expires() {
    let store = MemoryLeaseStore::new();
    let clock = ManualClock::new(t0());
    let manager = manager_for(&store, &clock);
    let ctx = CallContext::new();
    let key = LeaseKey::new("L", NS);

    store.insert(Lease::new(key.clone(), "A", 5, t0()));
    let before = store.snapshot(&key).unwrap();

    clock.set(t0() + TimeDelta::seconds(2));
    assert!(!manager.acquire_lease(&ctx, "L", NS, "B", secs(5)).await.unwrap());
    assert_eq!(store.snapshot(&key).unwrap(), before);
    assert_eq!(store.write_count(), 0);

    clock.set(t0() + TimeDelta::seconds(6));
    assert!(manager.acquire_lease(&ctx, "L", NS, "B", secs(5)).await.unwrap());

    let after = store.snapshot(&key).unwrap();
    assert_eq!(after.holder_identity.as_deref(), Some("B"));
    assert_eq!(after.renew_time, Some(t0() + TimeDelta::seconds(6)));
    assert_eq!(after.lease_duration_seconds, 5);
}

#[tokio::test]
async fn test_new_lease_then_second_worker_rejected() {
    let store = MemoryLeaseStore::new();
    let clock = ManualClock::new(t0());
    let manager = manager_for(&store, &clock);
    let ctx = CallContext::new();

    assert!(manager.acquire_lease(&ctx, "job-7", NS, "worker-1", secs(10)).await.unwrap());

    clock.advance(TimeDelta::seconds(9));
    assert!(!manager.acquire_lease(&ctx, "job-7", NS, "worker-2", secs(10)).await.unwrap());

    let lease = manager.get_lease(&ctx, "job-7", NS).await.unwrap();
    assert_eq!(lease.holder_identity.as_deref(), Some("worker-1"));
}

#[tokio::test]
async fn test_current_holder_cannot_renew_while_live() {
    // A live lease refuses its own holder too; keep-alive protocols must
    // track ownership themselves instead of re-acquiring.
    let store = MemoryLeaseStore::new();
    let clock = ManualClock::new(t0());
    let manager = manager_for(&store, &clock);
    let ctx = CallContext::new();

    assert!(manager.acquire_lease(&ctx, "L", NS, "A", secs(5)).await.unwrap());
    let before = store.snapshot(&LeaseKey::new("L", NS)).unwrap();

    clock.advance(TimeDelta::seconds(4));
    assert!(!manager.acquire_lease(&ctx, "L", NS, "A", secs(5)).await.unwrap());
    assert_eq!(store.snapshot(&LeaseKey::new("L", NS)).unwrap(), before);

    clock.advance(TimeDelta::seconds(1));
    assert!(manager.acquire_lease(&ctx, "L", NS, "A", secs(5)).await.unwrap());
}

#[tokio::test]
async fn test_liveness_uses_callers_ttl() {
    let store = MemoryLeaseStore::new();
    let clock = ManualClock::new(t0());
    let manager = manager_for(&store, &clock);
    let ctx = CallContext::new();

    store.insert(Lease::new(LeaseKey::new("L", NS), "A", 30, t0()));
    clock.advance(TimeDelta::seconds(10));

    // Stored duration is 30s, but the caller asks with 5s.
    assert!(manager.acquire_lease(&ctx, "L", NS, "B", secs(5)).await.unwrap());
}

#[tokio::test]
async fn test_lease_without_renew_time_is_claimable() {
    let store = MemoryLeaseStore::new();
    let clock = ManualClock::new(t0());
    let manager = manager_for(&store, &clock);
    let ctx = CallContext::new();

    let mut lease = Lease::new(LeaseKey::new("L", NS), "A", 5, t0());
    lease.renew_time = None;
    store.insert(lease);

    assert!(manager.acquire_lease(&ctx, "L", NS, "B", secs(5)).await.unwrap());
}

#[tokio::test]
async fn test_recently_released_lease_is_still_live() {
    let store = MemoryLeaseStore::new();
    let clock = ManualClock::new(t0());
    let manager = manager_for(&store, &clock);
    let ctx = CallContext::new();

    assert!(manager.acquire_lease(&ctx, "L", NS, "A", secs(5)).await.unwrap());
    manager.release_lease(&ctx, "L", NS).await.unwrap();

    clock.advance(TimeDelta::seconds(1));
    assert!(!manager.acquire_lease(&ctx, "L", NS, "B", secs(5)).await.unwrap());

    clock.advance(TimeDelta::seconds(4));
    assert!(manager.acquire_lease(&ctx, "L", NS, "B", secs(5)).await.unwrap());
}

#[tokio::test]
async fn test_update_failure_on_expired_lease_is_an_error() {
    let store = MemoryLeaseStore::new();
    let clock = ManualClock::new(t0());
    let manager = manager_for(&store, &clock);
    let ctx = CallContext::new();
    let key = LeaseKey::new("L", NS);

    store.insert(Lease::new(key.clone(), "A", 5, t0()));
    let before = store.snapshot(&key).unwrap();
    clock.advance(TimeDelta::seconds(6));
    store.fail_next(StoreOp::Update, StoreError::Transient("connection reset".into()));

    let err = manager.acquire_lease(&ctx, "L", NS, "B", secs(5)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transient);
    assert!(matches!(
        err,
        CoordinationError::Store {
            op: Operation::AcquireLease,
            step: Step::Update,
            ..
        }
    ));
    assert_eq!(store.snapshot(&key).unwrap(), before);
}

// =============================================================================
// Concurrent acquirers
// =============================================================================

async fn race_on_expired(mode: ConcurrencyMode) -> (MemoryLeaseStore, Vec<Result<bool>>) {
    let store = MemoryLeaseStore::new()
        .with_mode(mode)
        .with_get_barrier(Arc::new(Barrier::new(2)));
    let clock = ManualClock::new(t0());
    store.insert(Lease::new(LeaseKey::new("L", NS), "A", 5, t0()));
    clock.advance(TimeDelta::seconds(6));

    let manager = manager_for(&store, &clock);
    let ctx = CallContext::new();

    let (b, c) = tokio::join!(
        manager.acquire_lease(&ctx, "L", NS, "B", secs(5)),
        manager.acquire_lease(&ctx, "L", NS, "C", secs(5)),
    );
    (store, vec![b, c])
}

#[tokio::test]
async fn test_race_without_conditional_write_has_two_winners() {
    let (store, results) = race_on_expired(ConcurrencyMode::LastWriteWins).await;

    // Both callers believe they hold the lock.
    for result in &results {
        assert!(matches!(result, Ok(true)));
    }

    let holder = store
        .snapshot(&LeaseKey::new("L", NS))
        .unwrap()
        .holder_identity
        .unwrap();
    assert!(holder == "B" || holder == "C");
}

#[tokio::test]
async fn test_race_with_resource_version_has_exactly_one_winner() {
    let (store, results) = race_on_expired(ConcurrencyMode::ResourceVersion).await;

    let winners: Vec<usize> = results
        .iter()
        .enumerate()
        .filter(|(_, r)| matches!(r, Ok(true)))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(winners.len(), 1);

    let loser = &results[1 - winners[0]];
    assert!(loser.as_ref().unwrap_err().is_conflict());

    let expected = ["B", "C"][winners[0]];
    let lease = store.snapshot(&LeaseKey::new("L", NS)).unwrap();
    assert_eq!(lease.holder_identity.as_deref(), Some(expected));
}

#[tokio::test]
async fn test_race_on_absent_lease_has_exactly_one_winner() {
    let store = MemoryLeaseStore::new().with_get_barrier(Arc::new(Barrier::new(2)));
    let clock = ManualClock::new(t0());
    let manager = manager_for(&store, &clock);
    let ctx = CallContext::new();

    let (b, c) = tokio::join!(
        manager.acquire_lease(&ctx, "L", NS, "B", secs(5)),
        manager.acquire_lease(&ctx, "L", NS, "C", secs(5)),
    );

    let outcomes = [b, c];
    assert_eq!(outcomes.iter().filter(|r| matches!(r, Ok(true))).count(), 1);
    assert!(
        outcomes
            .iter()
            .any(|r| matches!(r, Err(e) if e.kind() == ErrorKind::AlreadyExists))
    );
}

// =============================================================================
// Release / Delete
// =============================================================================

#[tokio::test]
async fn test_release_clears_holder_and_keeps_timing() {
    let store = MemoryLeaseStore::new();
    let clock = ManualClock::new(t0());
    let manager = manager_for(&store, &clock);
    let ctx = CallContext::new();

    assert!(manager.create_lease(&ctx, "L", NS, "A", secs(5)).await.unwrap());
    clock.advance(TimeDelta::seconds(3));

    manager.release_lease(&ctx, "L", NS).await.unwrap();
    let lease = store.snapshot(&LeaseKey::new("L", NS)).unwrap();
    assert_eq!(lease.holder_identity, None);
    assert_eq!(lease.renew_time, Some(t0()));
    assert_eq!(lease.lease_duration_seconds, 5);

    // Second release clears an already empty holder.
    manager.release_lease(&ctx, "L", NS).await.unwrap();
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_release_after_delete_is_not_found() {
    let store = MemoryLeaseStore::new();
    let clock = ManualClock::new(t0());
    let manager = manager_for(&store, &clock);
    let ctx = CallContext::new();

    manager.create_lease(&ctx, "L", NS, "A", secs(5)).await.unwrap();
    manager.release_lease(&ctx, "L", NS).await.unwrap();
    manager.delete_lease(&ctx, "L", NS).await.unwrap();

    assert!(manager.get_lease(&ctx, "L", NS).await.unwrap_err().is_not_found());

    let err = manager.release_lease(&ctx, "L", NS).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(
        err,
        CoordinationError::Store {
            op: Operation::ReleaseLease,
            step: Step::Get,
            ..
        }
    ));

    let err = manager.delete_lease(&ctx, "L", NS).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "delete_lease default/L: delete failed: not found: lease default/L");
}

#[tokio::test]
async fn test_release_update_failure_propagates() {
    let store = MemoryLeaseStore::new();
    let clock = ManualClock::new(t0());
    let manager = manager_for(&store, &clock);
    let ctx = CallContext::new();

    manager.create_lease(&ctx, "L", NS, "A", secs(5)).await.unwrap();
    store.fail_next(StoreOp::Update, StoreError::Conflict("modified".into()));

    let err = manager.release_lease(&ctx, "L", NS).await.unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(
        store.snapshot(&LeaseKey::new("L", NS)).unwrap().holder_identity.as_deref(),
        Some("A")
    );
}

#[tokio::test]
async fn test_released_and_deleted_leases_can_be_reacquired() {
    let store = MemoryLeaseStore::new();
    let clock = ManualClock::new(t0());
    let manager = manager_for(&store, &clock);
    let ctx = CallContext::new();

    manager.acquire_lease(&ctx, "L", NS, "A", secs(5)).await.unwrap();
    manager.release_lease(&ctx, "L", NS).await.unwrap();
    clock.advance(TimeDelta::seconds(5));
    assert!(manager.acquire_lease(&ctx, "L", NS, "B", secs(5)).await.unwrap());

    manager.delete_lease(&ctx, "L", NS).await.unwrap();
    assert!(manager.create_lease(&ctx, "L", NS, "C", secs(5)).await.unwrap());
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test]
async fn test_cancelled_context_makes_no_store_calls() {
    let store = MemoryLeaseStore::new();
    let clock = ManualClock::new(t0());
    let manager = manager_for(&store, &clock);

    let token = CancellationToken::new();
    let ctx = CallContext::with_cancellation(token.child_token());
    token.cancel();

    let err = manager.acquire_lease(&ctx, "L", NS, "A", secs(5)).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(store.operations().is_empty());
    assert!(store.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_deadline_during_update_leaves_lease_untouched() {
    let store = MemoryLeaseStore::new().with_latency(Duration::from_millis(100));
    let clock = ManualClock::new(t0());
    let manager = manager_for(&store, &clock);
    let key = LeaseKey::new("L", NS);

    store.insert(Lease::new(key.clone(), "A", 5, t0()));
    let before = store.snapshot(&key).unwrap();
    clock.advance(TimeDelta::seconds(6));

    let ctx = CallContext::new().with_timeout(Duration::from_millis(150));
    let err = manager.acquire_lease(&ctx, "L", NS, "B", secs(5)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(err.store_error(), Some(&StoreError::DeadlineExceeded));
    assert_eq!(store.snapshot(&key).unwrap(), before);
    assert_eq!(store.operations(), vec![StoreOp::Get]);
}
