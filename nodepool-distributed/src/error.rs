//! Error types for lease and node coordination

use std::fmt;
use thiserror::Error;

/// Errors reported by a coordination backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("rejected by backend: {0}")]
    Rejected(String),

    #[error("transient backend error: {0}")]
    Transient(String),

    #[error("cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl StoreError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            StoreError::Conflict(_) => ErrorKind::Conflict,
            StoreError::Rejected(_) => ErrorKind::InvalidArgument,
            StoreError::Transient(_) => ErrorKind::Transient,
            StoreError::Cancelled | StoreError::DeadlineExceeded => ErrorKind::Cancelled,
        }
    }
}

/// Error taxonomy shared by every coordination operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    Conflict,
    InvalidArgument,
    Transient,
    Cancelled,
}

/// Operation that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateLease,
    AcquireLease,
    ReleaseLease,
    DeleteLease,
    GetLease,
    PatchAnnotations,
    GetNode,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CreateLease => "create_lease",
            Operation::AcquireLease => "acquire_lease",
            Operation::ReleaseLease => "release_lease",
            Operation::DeleteLease => "delete_lease",
            Operation::GetLease => "get_lease",
            Operation::PatchAnnotations => "patch_annotations",
            Operation::GetNode => "get_node",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend call within an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Get,
    Create,
    Update,
    Delete,
    Patch,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::Get => "get",
            Step::Create => "create",
            Step::Update => "update",
            Step::Delete => "delete",
            Step::Patch => "patch",
        })
    }
}

/// Errors returned by [`LockManager`](crate::LockManager) and
/// [`NodeAnnotator`](crate::NodeAnnotator).
#[derive(Debug, Error)]
pub enum CoordinationError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{op} {target}: {step} failed: {source}")]
    Store {
        op: Operation,
        target: String,
        step: Step,
        #[source]
        source: StoreError,
    },
}

impl CoordinationError {
    pub(crate) fn store(op: Operation, target: impl Into<String>, step: Step, source: StoreError) -> Self {
        CoordinationError::Store {
            op,
            target: target.into(),
            step,
            source,
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoordinationError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            CoordinationError::Store { source, .. } => source.kind(),
        }
    }

    /// The backend error, if this error came from a store call.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            CoordinationError::Store { source, .. } => Some(source),
            CoordinationError::InvalidArgument(_) => None,
        }
    }

    /// The operation that failed, if a store call was involved.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            CoordinationError::Store { op, .. } => Some(*op),
            CoordinationError::InvalidArgument(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancelled
    }
}

pub type Result<T> = std::result::Result<T, CoordinationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_kinds() {
        assert_eq!(StoreError::NotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(StoreError::Rejected("x".into()).kind(), ErrorKind::InvalidArgument);
        assert_eq!(StoreError::DeadlineExceeded.kind(), ErrorKind::Cancelled);
        assert_eq!(StoreError::Cancelled.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_wrapped_error_display() {
        let err = CoordinationError::store(
            Operation::ReleaseLease,
            "default/pool-lock",
            Step::Update,
            StoreError::Transient("connection reset".into()),
        );

        assert_eq!(
            err.to_string(),
            "release_lease default/pool-lock: update failed: transient backend error: connection reset"
        );
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert_eq!(err.operation(), Some(Operation::ReleaseLease));
        assert!(std::error::Error::source(&err).is_some());
    }
}
