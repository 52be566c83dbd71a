use std::collections::VecDeque;

use anyhow::{Error, anyhow};
use async_trait::async_trait;
use tracing::{debug, trace};

use crate::source::CandidateSource;
use crate::storage::Storage;
use crate::types::error::S3purgeError;
use crate::types::token::PipelineCancellationToken;
use crate::types::{
    ContinuationToken, DeletionCandidate, ListPage, ListingMode, ObjectEntry, SharedFlags,
};

const DEFAULT_MAX_KEYS: i32 = 1000;

/// Candidate source backed by a paginated remote listing.
///
/// Pages are fetched lazily: the next page is requested only when the
/// buffered one is used up. A fetch failure ends the sequence and is kept
/// for [`take_last_error`](CandidateSource::take_last_error). Pages that are
/// empty but still carry a continuation token are skipped.
pub struct PaginatedCandidateSource {
    target: Storage,
    container: String,
    prefix: String,
    mode: ListingMode,
    max_keys: i32,
    shared_flags: SharedFlags,
    cancellation_token: PipelineCancellationToken,

    buffer: VecDeque<ObjectEntry>,
    current: Option<DeletionCandidate>,
    next_token: Option<ContinuationToken>,
    started: bool,
    finished: bool,
    last_error: Option<Error>,
}

impl PaginatedCandidateSource {
    pub fn new(
        target: Storage,
        container: impl Into<String>,
        prefix: impl Into<String>,
        cancellation_token: PipelineCancellationToken,
    ) -> Self {
        Self {
            target,
            container: container.into(),
            prefix: prefix.into(),
            mode: ListingMode::default(),
            max_keys: DEFAULT_MAX_KEYS,
            shared_flags: SharedFlags::default(),
            cancellation_token,
            buffer: VecDeque::new(),
            current: None,
            next_token: None,
            started: false,
            finished: false,
            last_error: None,
        }
    }

    pub fn with_mode(mut self, mode: ListingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Page size requested from the listing API. Non-positive values fall
    /// back to the default of 1000.
    pub fn with_max_keys(mut self, max_keys: i32) -> Self {
        self.max_keys = if max_keys > 0 {
            max_keys
        } else {
            DEFAULT_MAX_KEYS
        };
        self
    }

    /// Flags copied into every produced candidate.
    pub fn with_shared_flags(mut self, shared_flags: SharedFlags) -> Self {
        self.shared_flags = shared_flags;
        self
    }

    fn has_more_pages(&self) -> bool {
        !self.started || self.next_token.is_some()
    }

    fn fail(&mut self, error: Error) {
        self.finished = true;
        self.next_token = None;
        self.last_error = Some(error);
    }

    async fn fetch_page(&mut self) -> Result<ListPage, Error> {
        let token = self.next_token.take();

        tokio::select! {
            result = self.target.list_page(
                &self.container,
                &self.prefix,
                self.mode,
                self.max_keys,
                token,
            ) => result,
            _ = self.cancellation_token.cancelled() => {
                debug!(bucket = self.container, "listing cancelled.");
                Err(anyhow!(S3purgeError::Cancelled))
            }
        }
    }

    fn make_candidate(&self, entry: ObjectEntry) -> DeletionCandidate {
        DeletionCandidate {
            container: self.container.clone(),
            key: entry.key,
            version_id: entry.version_id,
            shared_flags: self.shared_flags.clone(),
            post_hook: None,
        }
    }
}

#[async_trait]
impl CandidateSource for PaginatedCandidateSource {
    async fn advance(&mut self) -> bool {
        self.current = None;
        if self.finished {
            return false;
        }

        while self.buffer.is_empty() {
            if !self.has_more_pages() {
                self.finished = true;
                return false;
            }

            match self.fetch_page().await {
                Ok(page) => {
                    self.started = true;
                    trace!(
                        bucket = self.container,
                        prefix = self.prefix,
                        item_count = page.items.len(),
                        has_next = page.next_token.is_some(),
                        "listing page fetched."
                    );
                    self.buffer.extend(page.items);
                    self.next_token = page.next_token;
                }
                Err(e) => {
                    self.fail(e);
                    return false;
                }
            }
        }

        let entry = self.buffer.pop_front();
        self.current = entry.map(|entry| self.make_candidate(entry));
        self.current.is_some()
    }

    fn current(&mut self) -> Option<DeletionCandidate> {
        self.current.take()
    }

    fn take_last_error(&mut self) -> Option<Error> {
        self.last_error.take()
    }
}
