/// A cancellation token used to stop a running purge.
///
/// This is a type alias for [`tokio_util::sync::CancellationToken`]. Pass the
/// token to [`BatchDeleter::new`](crate::BatchDeleter::new) and call
/// [`cancel()`](tokio_util::sync::CancellationToken::cancel) on it to abort the
/// in-flight remote call and stop starting new batches (e.g., in a Ctrl+C handler).
pub type PipelineCancellationToken = tokio_util::sync::CancellationToken;

/// Create a new [`PipelineCancellationToken`].
///
/// # Example
///
/// ```
/// use s3purge_rs::create_pipeline_cancellation_token;
///
/// let token = create_pipeline_cancellation_token();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// ```
pub fn create_pipeline_cancellation_token() -> PipelineCancellationToken {
    tokio_util::sync::CancellationToken::new()
}
