//! Error types for access resolution.
//!
//! Everything except [`AccessError::Storage`] is an expected outcome the web layer turns into a
//! 4xx response. `Storage` means the backing store failed and maps to a generic 5xx.
use http::StatusCode;

/// Unified error type for the access resolver.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError<E> {
    /// Principal neither owns the resource nor holds a sufficient grant.
    #[error("access denied")]
    AccessDenied,
    /// Operation is reserved for the resource's owner.
    #[error("only the owner may do this")]
    NotOwner,
    /// Owner tried to share with themselves.
    #[error("cannot share a resource with its owner")]
    SelfShare,
    /// Share target does not exist.
    #[error("target principal not found")]
    TargetNotFound,
    /// Resource does not exist.
    #[error("resource not found")]
    ResourceNotFound,
    /// The backing store failed.
    #[error("storage error: {0}")]
    Storage(#[source] E),
}

impl<E> AccessError<E> {
    /// Check if this is a hard failure rather than an authorization outcome.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Check if this is a permission denial (either flavour).
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::AccessDenied | Self::NotOwner)
    }

    /// Status for mutation endpoints.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AccessDenied | Self::NotOwner => StatusCode::FORBIDDEN,
            Self::ResourceNotFound => StatusCode::NOT_FOUND,
            Self::SelfShare | Self::TargetNotFound => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Status for the owner-only share screen: every authorization failure looks like a missing
    /// resource, so non-owners (editors included) cannot confirm it exists.
    pub fn concealed_status_code(&self) -> StatusCode {
        match self {
            Self::AccessDenied | Self::NotOwner | Self::ResourceNotFound => StatusCode::NOT_FOUND,
            other => other.status_code(),
        }
    }

    /// Message safe to show the end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::AccessDenied | Self::NotOwner => "Insufficient permissions to perform this action",
            Self::SelfShare => "Cannot share a task with yourself",
            Self::TargetNotFound => "Target user not found",
            Self::ResourceNotFound => "Not Found",
            Self::Storage(_) => "Something went wrong",
        }
    }

    /// Convert the storage error type, keeping every other variant.
    pub fn map_storage<F>(self, f: impl FnOnce(E) -> F) -> AccessError<F> {
        match self {
            Self::AccessDenied => AccessError::AccessDenied,
            Self::NotOwner => AccessError::NotOwner,
            Self::SelfShare => AccessError::SelfShare,
            Self::TargetNotFound => AccessError::TargetNotFound,
            Self::ResourceNotFound => AccessError::ResourceNotFound,
            Self::Storage(e) => AccessError::Storage(f(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;

    type Err = AccessError<io::Error>;

    #[test]
    fn mutation_statuses() {
        assert_eq!(Err::AccessDenied.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(Err::NotOwner.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(Err::ResourceNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(Err::SelfShare.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(Err::TargetNotFound.status_code(), StatusCode::BAD_REQUEST);
        let storage = Err::Storage(io::Error::new(io::ErrorKind::Other, "db down"));
        assert_eq!(storage.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn share_screen_conceals_existence() {
        assert_eq!(Err::AccessDenied.concealed_status_code(), StatusCode::NOT_FOUND);
        assert_eq!(Err::NotOwner.concealed_status_code(), StatusCode::NOT_FOUND);
        assert_eq!(Err::ResourceNotFound.concealed_status_code(), StatusCode::NOT_FOUND);
        assert_eq!(Err::SelfShare.concealed_status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn storage_is_the_only_hard_failure() {
        let storage = Err::Storage(io::Error::new(io::ErrorKind::Other, "db down"));
        assert!(storage.is_storage());
        assert!(storage.to_string().contains("db down"));
        assert!(storage.source().is_some());
        assert_eq!(storage.user_message(), "Something went wrong");
        for e in [Err::AccessDenied, Err::NotOwner, Err::SelfShare, Err::TargetNotFound] {
            assert!(!e.is_storage());
            assert!(e.source().is_none());
        }
    }

    #[test]
    fn denial_message_mentions_permissions() {
        assert!(Err::NotOwner.user_message().contains("Insufficient permissions"));
        assert!(Err::AccessDenied.is_denied());
        assert!(!Err::ResourceNotFound.is_denied());
    }

    #[test]
    fn map_storage_keeps_outcomes() {
        let e: AccessError<&str> = AccessError::Storage("boom");
        assert_eq!(e.map_storage(str::len), AccessError::Storage(4));
        let e: AccessError<&str> = AccessError::SelfShare;
        assert_eq!(e.map_storage(str::len), AccessError::<usize>::SelfShare);
    }
}
