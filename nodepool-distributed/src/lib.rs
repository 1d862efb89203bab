//! Distributed coordination for the node-pool manager
//!
//! This crate provides the lease-based lock primitives that controller
//! replicas use to agree on who owns a named resource, plus node annotation
//! patching over the same backend abstraction.
//!
//! ## Features
//!
//! - **Lease Locks** - create / acquire / release / delete over a [`LeaseStore`]
//! - **Injectable Backends** - [`LeaseStore`] and [`NodeStore`] traits with
//!   in-memory implementations
//! - **Server Version** - [`ServerVersion`] discovery, `None` on failure
//! - **Testable Time** - [`Clock`] with a [`ManualClock`] for tests
//! - **Cancellation** - every call takes a [`CallContext`]
//!
//! There is no renewal loop and no retrying; callers call
//! [`LockManager::acquire_lease`] on their own schedule.
//!
//! ## Quick Start
//!
//! ```rust
//! use nodepool_distributed::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let store = Arc::new(MemoryLeaseStore::new());
//! let manager = LockManager::new(store);
//! let ctx = CallContext::new().with_timeout(Duration::from_secs(5));
//!
//! let lock = LockBuilder::new("nodepool-controller", "replica-0")
//!     .with_namespace("kube-system")
//!     .with_ttl(Duration::from_secs(15))
//!     .build(manager);
//!
//! if lock.acquire(&ctx).await? {
//!     // Critical section
//!     lock.release(&ctx).await?;
//! }
//! # Ok::<(), CoordinationError>(())
//! # }).unwrap();
//! ```
//!
//! ## Concurrent acquirers
//!
//! Acquiring an expired lease reads the record and writes it back. The
//! manager always sends back the `resource_version` it read. A backend that
//! rejects stale versions ([`ConcurrencyMode::ResourceVersion`]) lets exactly
//! one racing caller win; one that does not
//! ([`ConcurrencyMode::LastWriteWins`]) can report success to several.

pub mod clock;
pub mod context;
pub mod discovery;
pub mod error;
pub mod lease;
pub mod lock;
pub mod memory;
pub mod node;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::CallContext;
pub use discovery::{ServerVersion, discover_server_version};
pub use error::{CoordinationError, ErrorKind, Operation, Result, Step, StoreError};
pub use lease::{Lease, LeaseKey};
pub use lock::{LeaseLock, LockBuilder, LockManager};
pub use memory::{
    ConcurrencyMode, MemoryLeaseStore, MemoryNodeStore, StaticServerVersion, StoreOp,
};
pub use node::{Node, NodeAnnotator, NodeMetadata, NodeStore, annotations_patch};
pub use store::LeaseStore;
pub use tokio_util::sync::CancellationToken;
