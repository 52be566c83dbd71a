//! Bulk delete engine.
//!
//! [`BatchDeleter::delete_all`] drains a [`CandidateSource`], groups the
//! candidates with a [`BatchAssembler`] and executes every emitted batch with
//! one DeleteObjects call as soon as it is emitted:
//!
//! ```text
//! CandidateSource → BatchAssembler → delete_batch() → post-delete hooks
//! ```
//!
//! Everything runs sequentially on the calling task. Failures never stop the
//! run (except an iteration failure, which stops pulling candidates); they are
//! collected as [`CandidateError`]s and returned together in one
//! [`BatchDeleteError`].

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use tracing::{debug, error, info, warn};

use crate::assembler::{BatchAssembler, MAX_BATCH_SIZE, PendingBatch};
use crate::classifier::{ErrorClass, ErrorClassifier, StrictClassifier};
use crate::config::Config;
use crate::source::CandidateSource;
use crate::storage::Storage;
use crate::types::error::{
    BatchDeleteError, CandidateError, DEFAULT_KEY_ERROR_CODE, DEFAULT_KEY_ERROR_MESSAGE,
    RemoteError, S3purgeError,
};
use crate::types::token::PipelineCancellationToken;
use crate::types::{
    BatchRequest, DeletionCandidate, DeletionStatsReport, KeyError, RequestOption, SharedFlags,
};


/// Deletes candidates in DeleteObjects batches and aggregates failures.
pub struct BatchDeleter {
    target: Storage,
    max_batch_size: usize,
    classifier: Box<dyn ErrorClassifier>,
    request_options: Vec<RequestOption>,
    cancellation_token: PipelineCancellationToken,
    dry_run: bool,
    stats_report: Arc<DeletionStatsReport>,
}

impl BatchDeleter {
    /// Deleter with batch size 1000 that reports every failure.
    ///
    /// DeleteObjects accepts at most 1000 keys, so that is also the upper
    /// bound of [`with_max_batch_size`](Self::with_max_batch_size).
    pub fn new(target: Storage, cancellation_token: PipelineCancellationToken) -> Self {
        Self {
            target,
            max_batch_size: MAX_BATCH_SIZE,
            classifier: Box::new(StrictClassifier),
            request_options: Vec::new(),
            cancellation_token,
            dry_run: false,
            stats_report: Arc::new(DeletionStatsReport::new()),
        }
    }

    /// Deleter using the batch size and dry-run setting of `config`.
    pub fn from_config(
        target: Storage,
        config: &Config,
        cancellation_token: PipelineCancellationToken,
    ) -> Self {
        Self::new(target, cancellation_token)
            .with_max_batch_size(config.batch_size as usize)
            .with_dry_run(config.dry_run)
    }

    /// Set the number of keys per DeleteObjects call.
    ///
    /// Values outside `1..=1000` are clamped into that range (S3 rejects
    /// larger requests) and a warning is logged.
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size.clamp(1, MAX_BATCH_SIZE);
        if self.max_batch_size != max_batch_size {
            warn!(
                requested = max_batch_size,
                batch_size = self.max_batch_size,
                "batch size out of range, clamped."
            );
        }
        self
    }

    pub fn with_classifier<C>(mut self, classifier: C) -> Self
    where
        C: ErrorClassifier + 'static,
    {
        self.classifier = Box::new(classifier);
        self
    }

    /// Register an option applied to the shared flags of every candidate
    /// before it is assembled into a batch.
    pub fn with_request_option<F>(mut self, option: F) -> Self
    where
        F: Fn(&mut SharedFlags) + Send + Sync + 'static,
    {
        self.request_options.push(Box::new(option));
        self
    }

    /// In dry-run mode no DeleteObjects call is sent; every batch is treated
    /// as fully deleted and hooks still run.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    pub fn stats_report(&self) -> Arc<DeletionStatsReport> {
        self.stats_report.clone()
    }

    /// Delete every candidate produced by `source`.
    ///
    /// Batches hold at most [`max_batch_size`](Self::max_batch_size) keys,
    /// which never exceeds 1000. A batch is sent as soon as it is full.
    ///
    /// Returns `Ok(())` when every candidate was confirmed deleted (or its
    /// failure was classified as ignorable) and every hook succeeded.
    /// Otherwise returns one [`BatchDeleteError`] listing each failure in
    /// the order it was detected.
    pub async fn delete_all<S>(&self, source: &mut S) -> Result<(), BatchDeleteError>
    where
        S: CandidateSource + ?Sized,
    {
        let mut assembler = BatchAssembler::new(self.max_batch_size);
        let mut errors = Vec::new();
        let mut interrupted = false;

        loop {
            if self.cancellation_token.is_cancelled() {
                interrupted = true;
                break;
            }
            if !source.advance().await {
                break;
            }

            let Some(mut candidate) = source.current() else {
                continue;
            };
            self.apply_request_options(&mut candidate);

            if let Some(batch) = assembler.push(candidate) {
                self.execute_batch(batch, &mut errors).await;
            }
        }

        if let Some(batch) = assembler.finish() {
            self.execute_batch(batch, &mut errors).await;
        }

        if let Some(e) = source.take_last_error() {
            warn!(error = format!("{e:#}"), "candidate iteration failed.");
            errors.push(CandidateError::iteration(e));
        } else if interrupted && !errors.iter().any(CandidateError::is_cancelled) {
            errors.push(CandidateError::iteration(anyhow!(S3purgeError::Cancelled)));
        }

        let stats = self.stats_report.snapshot();
        debug!(
            batches = stats.batches,
            deleted = stats.deleted,
            failed = stats.failed,
            error_count = errors.len(),
            "batch deletion finished."
        );

        if errors.is_empty() {
            Ok(())
        } else {
            Err(BatchDeleteError::new(errors))
        }
    }

    fn apply_request_options(&self, candidate: &mut DeletionCandidate) {
        for option in &self.request_options {
            option(&mut candidate.shared_flags);
        }
    }

    async fn execute_batch(&self, batch: PendingBatch, errors: &mut Vec<CandidateError>) {
        let PendingBatch { request, hooks } = batch;
        let batch_size = request.len();

        self.stats_report.increment_batches();
        debug!(
            bucket = request.container,
            batch_size = batch_size,
            dry_run = self.dry_run,
            "executing DeleteObjects batch."
        );

        let mut failed_members: HashSet<(Option<String>, Option<String>)> = HashSet::new();
        let mut failed_count = 0;

        match self.send_batch(&request).await {
            Err(e) => match self.classifier.classify_call_error(&e) {
                ErrorClass::Ignorable => {
                    debug!(
                        bucket = request.container,
                        batch_size = batch_size,
                        error = format!("{e:#}"),
                        "ignoring DeleteObjects call failure."
                    );
                }
                ErrorClass::Fatal => {
                    error!(
                        bucket = request.container,
                        batch_size = batch_size,
                        error = format!("{e:#}"),
                        "DeleteObjects call failed for {} objects.",
                        batch_size,
                    );
                    let shared = Arc::new(e);
                    for member in &request.members {
                        errors.push(CandidateError::transport(
                            shared.clone(),
                            &request.container,
                            &member.key,
                        ));
                    }
                    failed_count = batch_size;
                }
            },
            Ok(key_errors) => {
                for key_error in key_errors {
                    if self.classifier.classify_key_error(&key_error) == ErrorClass::Ignorable {
                        debug!(
                            bucket = request.container,
                            key = key_error.key,
                            version_id = key_error.version_id,
                            code = key_error.code,
                            "ignoring DeleteObjects key failure."
                        );
                        continue;
                    }

                    failed_members.insert((key_error.key.clone(), key_error.version_id.clone()));
                    failed_count += 1;
                    errors.push(self.key_failure(&request, key_error));
                }
            }
        }

        let failed_count = failed_count.min(batch_size);
        self.stats_report.add_deleted((batch_size - failed_count) as u64);
        self.stats_report.add_failed(failed_count as u64);

        if failed_count < batch_size {
            for member in &request.members {
                let key = Some(member.key.clone());
                let failed = failed_members.contains(&(key.clone(), member.version_id.clone()))
                    || failed_members.contains(&(key, None));
                if !failed {
                    info!(
                        bucket = request.container,
                        key = member.key,
                        version_id = member.version_id,
                        dry_run = self.dry_run,
                        "deleted."
                    );
                }
            }
        }

        for (member, hook) in request.members.iter().zip(hooks) {
            let Some(hook) = hook else {
                continue;
            };
            if let Err(e) = hook() {
                warn!(
                    bucket = request.container,
                    key = member.key,
                    error = format!("{e:#}"),
                    "post-delete hook failed."
                );
                errors.push(CandidateError::hook(e, &request.container, &member.key));
            }
        }
    }

    /// One DeleteObjects call, raced against cancellation.
    async fn send_batch(&self, request: &BatchRequest) -> Result<Vec<KeyError>> {
        if self.cancellation_token.is_cancelled() {
            return Err(anyhow!(S3purgeError::Cancelled));
        }
        if self.dry_run {
            return Ok(Vec::new());
        }

        tokio::select! {
            result = self.target.delete_batch(request) => result,
            _ = self.cancellation_token.cancelled() => {
                debug!(bucket = request.container, "DeleteObjects call cancelled.");
                Err(anyhow!(S3purgeError::Cancelled))
            }
        }
    }

    fn key_failure(&self, request: &BatchRequest, key_error: KeyError) -> CandidateError {
        let code = key_error
            .code
            .unwrap_or_else(|| DEFAULT_KEY_ERROR_CODE.to_string());
        let message = key_error
            .message
            .unwrap_or_else(|| DEFAULT_KEY_ERROR_MESSAGE.to_string());

        warn!(
            bucket = request.container,
            key = key_error.key,
            version_id = key_error.version_id,
            code = code,
            message = message,
            "S3 DeleteObjects partial failure for key '{}': {} ({}).",
            key_error.key.as_deref().unwrap_or_default(),
            code,
            message,
        );

        CandidateError::per_key(
            RemoteError::new(code, message),
            &request.container,
            key_error.key,
        )
    }
}
