// nodepool - coordination primitives for the kube node-pool manager
//
// Re-exports the lease lock and node annotation layer, the NodePool schema
// and, behind features, configuration, logging and version reporting.

// Re-export core functionality
pub use nodepool_distributed::*;

pub use nodepool_api as api;

// Re-export optional crates
#[cfg(feature = "config")]
pub use nodepool_config;

#[cfg(feature = "log")]
pub use nodepool_log;

#[cfg(feature = "version")]
pub use nodepool_version;

/// Build a [`LeaseLock`] whose namespace, holder and ttl come from settings.
#[cfg(feature = "config")]
pub fn lock_from_settings(
    name: impl Into<String>,
    settings: &nodepool_config::LeaseSettings,
    manager: LockManager,
) -> LeaseLock {
    LockBuilder::new(name, settings.holder_identity.clone())
        .with_namespace(settings.namespace.clone())
        .with_ttl(settings.ttl())
        .build(manager)
}

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        CallContext, CancellationToken, Clock, CoordinationError, ErrorKind, Lease, LeaseKey,
        LeaseLock, LeaseStore, LockBuilder, LockManager, NodeAnnotator, NodeStore, SystemClock,
    };
}
