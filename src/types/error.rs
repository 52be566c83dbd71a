use std::fmt;
use std::sync::Arc;

use anyhow::Error;
use thiserror::Error;

/// Code of the composite error returned when at least one candidate failed.
pub const BATCH_DELETE_INCOMPLETE_CODE: &str = "BatchedDeleteIncomplete";
pub const BATCH_DELETE_INCOMPLETE_MESSAGE: &str = "some objects have failed to be deleted.";

/// Used when a DeleteObjects per-key error carries no code.
pub const DEFAULT_KEY_ERROR_CODE: &str = "DeleteBatchError";
/// Used when a DeleteObjects per-key error carries no message.
pub const DEFAULT_KEY_ERROR_MESSAGE: &str = "failed to delete";

/// Application-level error types for s3purge-rs.
///
/// ## Exit Codes
///
/// Each variant maps to an exit code (via `exit_code()`):
/// - 0: Cancelled
/// - 1: General errors (AwsSdk, Io, Incomplete)
/// - 2: Configuration errors (InvalidConfig, InvalidUri)
/// - 3: Partial failure (some objects could not be deleted)
#[derive(Error, Debug, PartialEq)]
pub enum S3purgeError {
    /// AWS SDK error.
    #[error("AWS SDK error: {0}")]
    AwsSdk(String),

    /// Configuration error.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid S3 URI format.
    #[error("Invalid S3 URI: {0}")]
    InvalidUri(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Operation cancelled by user.
    #[error("Operation cancelled by user")]
    Cancelled,

    /// Some objects could not be confirmed deleted.
    #[error("Partial failure: {failed} objects failed")]
    PartialFailure { failed: u64 },

    /// Every attempted object was deleted, but listing or a post-delete
    /// hook failed.
    #[error("Purge incomplete: {errors} errors")]
    Incomplete { errors: u64 },
}

impl S3purgeError {
    pub fn exit_code(&self) -> i32 {
        match self {
            S3purgeError::Cancelled => 0,
            S3purgeError::InvalidConfig(_) | S3purgeError::InvalidUri(_) => 2,
            S3purgeError::PartialFailure { .. } => 3,
            _ => 1,
        }
    }
}

/// Error code and message reported by S3, either for a whole API call or
/// for one key of a DeleteObjects response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct RemoteError {
    pub code: String,
    pub message: String,
}

impl RemoteError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Where a per-candidate failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The candidate source could not produce further items.
    Iteration,
    /// A DeleteObjects call failed outright.
    Transport,
    /// The call succeeded but the server reported the key as not deleted.
    PerKey,
    /// A post-delete hook returned an error.
    Hook,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Iteration => "iteration failure",
            FailureKind::Transport => "transport failure",
            FailureKind::PerKey => "per-key failure",
            FailureKind::Hook => "hook failure",
        };
        f.write_str(name)
    }
}

/// One candidate that could not be confirmed deleted.
///
/// Iteration failures carry neither container nor key. Transport failures
/// of the same batch share one underlying error.
#[derive(Debug, Clone)]
pub struct CandidateError {
    kind: FailureKind,
    error: Arc<Error>,
    container: Option<String>,
    key: Option<String>,
}

impl CandidateError {
    pub(crate) fn iteration(error: Error) -> Self {
        Self {
            kind: FailureKind::Iteration,
            error: Arc::new(error),
            container: None,
            key: None,
        }
    }

    pub(crate) fn transport(error: Arc<Error>, container: &str, key: &str) -> Self {
        Self {
            kind: FailureKind::Transport,
            error,
            container: Some(container.to_string()),
            key: Some(key.to_string()),
        }
    }

    pub(crate) fn per_key(remote_error: RemoteError, container: &str, key: Option<String>) -> Self {
        Self {
            kind: FailureKind::PerKey,
            error: Arc::new(Error::new(remote_error)),
            container: Some(container.to_string()),
            key,
        }
    }

    pub(crate) fn hook(error: Error, container: &str, key: &str) -> Self {
        Self {
            kind: FailureKind::Hook,
            error: Arc::new(error),
            container: Some(container.to_string()),
            key: Some(key.to_string()),
        }
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn container(&self) -> Option<&str> {
        self.container.as_deref()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn error(&self) -> &Error {
        &self.error
    }

    /// Returns true if both errors point at the same underlying error value.
    pub fn shares_error_with(&self, other: &CandidateError) -> bool {
        Arc::ptr_eq(&self.error, &other.error)
    }

    /// S3 error code carried by the underlying error, if any.
    pub fn code(&self) -> Option<&str> {
        self.error
            .downcast_ref::<RemoteError>()
            .map(|remote| remote.code.as_str())
    }

    pub fn is_cancelled(&self) -> bool {
        is_cancelled_error(&self.error)
    }
}

impl fmt::Display for CandidateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to perform batch operation on {:?} to {:?}:\n{:#}",
            self.key.as_deref().unwrap_or_default(),
            self.container.as_deref().unwrap_or_default(),
            self.error,
        )
    }
}

impl std::error::Error for CandidateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let source: &(dyn std::error::Error + Send + Sync + 'static) = (*self.error).as_ref();
        Some(source)
    }
}

/// Aggregate of every [`CandidateError`] collected by one
/// [`BatchDeleter::delete_all`](crate::BatchDeleter::delete_all) call,
/// in the order the failures were detected.
#[derive(Debug, Clone)]
pub struct BatchDeleteError {
    code: String,
    message: String,
    errors: Vec<CandidateError>,
}

impl BatchDeleteError {
    pub(crate) fn new(errors: Vec<CandidateError>) -> Self {
        Self {
            code: BATCH_DELETE_INCOMPLETE_CODE.to_string(),
            message: BATCH_DELETE_INCOMPLETE_MESSAGE.to_string(),
            errors,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn errors(&self) -> &[CandidateError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<CandidateError> {
        self.errors
    }

    pub fn is_cancelled(&self) -> bool {
        self.errors.iter().any(CandidateError::is_cancelled)
    }
}

impl fmt::Display for BatchDeleteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        for error in &self.errors {
            write!(f, "\ncaused by: {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BatchDeleteError {}

/// Check if an anyhow::Error wraps a cancellation error.
pub fn is_cancelled_error(e: &Error) -> bool {
    if let Some(err) = e.downcast_ref::<S3purgeError>() {
        return *err == S3purgeError::Cancelled;
    }
    false
}

/// Extract the exit code from an anyhow::Error, defaulting to 1.
pub fn exit_code_from_error(e: &Error) -> i32 {
    if let Some(err) = e.downcast_ref::<S3purgeError>() {
        return err.exit_code();
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn is_cancelled_error_test() {
        assert!(is_cancelled_error(&anyhow!(S3purgeError::Cancelled)));
        assert!(!is_cancelled_error(&anyhow!(S3purgeError::Io(
            "test".to_string()
        ))));
        assert!(!is_cancelled_error(&anyhow!("generic error")));
    }

    #[test]
    fn is_cancelled_error_through_context() {
        let e = anyhow!("listing aborted").context(S3purgeError::Cancelled);
        assert!(is_cancelled_error(&e));
    }

    #[test]
    fn exit_codes() {
        assert_eq!(S3purgeError::Cancelled.exit_code(), 0);
        assert_eq!(S3purgeError::AwsSdk("x".to_string()).exit_code(), 1);
        assert_eq!(S3purgeError::Io("x".to_string()).exit_code(), 1);
        assert_eq!(S3purgeError::InvalidConfig("x".to_string()).exit_code(), 2);
        assert_eq!(S3purgeError::InvalidUri("x".to_string()).exit_code(), 2);
        assert_eq!(S3purgeError::PartialFailure { failed: 4 }.exit_code(), 3);
        assert_eq!(S3purgeError::Incomplete { errors: 1 }.exit_code(), 1);
    }

    #[test]
    fn exit_code_from_anyhow() {
        assert_eq!(exit_code_from_error(&anyhow!(S3purgeError::Cancelled)), 0);
        assert_eq!(
            exit_code_from_error(
                &anyhow!("3 keys failed").context(S3purgeError::PartialFailure { failed: 3 })
            ),
            3
        );
        assert_eq!(exit_code_from_error(&anyhow!("unknown error")), 1);
    }

    #[test]
    fn error_display_messages() {
        assert_eq!(
            S3purgeError::AwsSdk("timeout".to_string()).to_string(),
            "AWS SDK error: timeout"
        );
        assert_eq!(
            S3purgeError::PartialFailure { failed: 5 }.to_string(),
            "Partial failure: 5 objects failed"
        );
        assert_eq!(
            RemoteError::new("AccessDenied", "Access Denied").to_string(),
            "AccessDenied: Access Denied"
        );
    }

    #[test]
    fn candidate_error_code_from_remote_error() {
        let e = CandidateError::per_key(
            RemoteError::new("AccessDenied", "Access Denied"),
            "bucket",
            Some("key".to_string()),
        );
        assert_eq!(e.kind(), FailureKind::PerKey);
        assert_eq!(e.code(), Some("AccessDenied"));
        assert_eq!(e.container(), Some("bucket"));
        assert_eq!(e.key(), Some("key"));
        assert!(!e.is_cancelled());
    }

    #[test]
    fn iteration_error_has_no_location() {
        let e = CandidateError::iteration(anyhow!("list failed"));
        assert_eq!(e.kind(), FailureKind::Iteration);
        assert!(e.container().is_none());
        assert!(e.key().is_none());
        assert!(e.code().is_none());
    }

    #[test]
    fn transport_errors_share_source() {
        let shared = Arc::new(anyhow!("connection reset"));
        let a = CandidateError::transport(shared.clone(), "bucket", "a");
        let b = CandidateError::transport(shared, "bucket", "b");
        let c = CandidateError::transport(Arc::new(anyhow!("connection reset")), "bucket", "c");
        assert!(a.shares_error_with(&b));
        assert!(!a.shares_error_with(&c));
    }

    #[test]
    fn candidate_error_display() {
        let e = CandidateError::hook(anyhow!("hook exploded"), "bucket", "dir/key");
        assert_eq!(
            e.to_string(),
            "failed to perform batch operation on \"dir/key\" to \"bucket\":\nhook exploded"
        );
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn batch_delete_error_display_lists_causes() {
        let error = BatchDeleteError::new(vec![
            CandidateError::iteration(anyhow!("list failed")),
            CandidateError::per_key(
                RemoteError::new(DEFAULT_KEY_ERROR_CODE, DEFAULT_KEY_ERROR_MESSAGE),
                "bucket",
                Some("k".to_string()),
            ),
        ]);

        assert_eq!(error.code(), BATCH_DELETE_INCOMPLETE_CODE);
        assert_eq!(error.message(), BATCH_DELETE_INCOMPLETE_MESSAGE);
        assert_eq!(error.errors().len(), 2);

        let display = error.to_string();
        assert!(
            display.starts_with("BatchedDeleteIncomplete: some objects have failed to be deleted.")
        );
        assert!(display.contains(
            "caused by: failed to perform batch operation on \"\" to \"\":\nlist failed"
        ));
        assert!(display.contains("DeleteBatchError: failed to delete"));
    }

    #[test]
    fn batch_delete_error_detects_cancellation() {
        let error = BatchDeleteError::new(vec![CandidateError::iteration(anyhow!(
            S3purgeError::Cancelled
        ))]);
        assert!(error.is_cancelled());
        assert_eq!(error.into_errors().len(), 1);
    }
}
