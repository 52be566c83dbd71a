//! Parity-aware grouping of deletion candidates into DeleteObjects batches.
//!
//! A batch is bounded by the batch size and by parity: every member must
//! target the same bucket with the same request-level flags (MFA token,
//! request payer). The first candidate of a batch defines its flags. A
//! parity break flushes the open batch even when it is not full, so a
//! batch of one can be emitted when flags alternate.

use tracing::trace;

use crate::types::{BatchRequest, DeletionCandidate, PostDeleteHook};

/// Maximum objects per batch DeleteObjects API call (S3 limit).
pub const MAX_BATCH_SIZE: usize = 1000;

/// A batch ready to be executed: the request plus the hooks of its members.
///
/// `hooks[i]` belongs to `request.members[i]`.
pub struct PendingBatch {
    pub request: BatchRequest,
    pub hooks: Vec<Option<PostDeleteHook>>,
}

impl PendingBatch {
    fn open(candidate: DeletionCandidate) -> Self {
        let mut batch = PendingBatch {
            request: BatchRequest::new(candidate.container.clone(), candidate.shared_flags.clone()),
            hooks: Vec::new(),
        };
        batch.append(candidate);
        batch
    }

    fn append(&mut self, candidate: DeletionCandidate) {
        self.request.members.push(candidate.entry());
        self.hooks.push(candidate.post_hook);
    }

    pub fn len(&self) -> usize {
        self.request.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.request.members.is_empty()
    }
}

/// Turns a stream of candidates into a stream of batches.
///
/// Holds at most one open batch, never full. [`push`](Self::push) returns a
/// batch once it fills up or when the incoming candidate cannot join it;
/// [`finish`](Self::finish) returns whatever is left.
pub struct BatchAssembler {
    max_batch_size: usize,
    open: Option<PendingBatch>,
}

impl BatchAssembler {
    /// `max_batch_size` is clamped to `1..=MAX_BATCH_SIZE`.
    pub fn new(max_batch_size: usize) -> Self {
        Self {
            max_batch_size: max_batch_size.clamp(1, MAX_BATCH_SIZE),
            open: None,
        }
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    pub fn open_len(&self) -> usize {
        self.open.as_ref().map_or(0, PendingBatch::len)
    }

    /// Add a candidate, returning a batch when one is ready to send.
    ///
    /// A batch is returned as soon as it reaches the batch size, or when
    /// the incoming candidate breaks parity with the open batch. The open
    /// batch is never full between calls, so at most one batch comes back.
    pub fn push(&mut self, candidate: DeletionCandidate) -> Option<PendingBatch> {
        let parity = self.open.as_ref().map(|open| {
            candidate.has_parity(&open.request.container, &open.request.shared_flags)
        });

        match parity {
            Some(false) => {
                trace!(batch_size = self.open_len(), "parity break, flushing open batch.");
                return self.open.replace(PendingBatch::open(candidate));
            }
            Some(true) => {
                if let Some(open) = self.open.as_mut() {
                    open.append(candidate);
                }
            }
            None => self.open = Some(PendingBatch::open(candidate)),
        }

        if self.open_len() < self.max_batch_size {
            return None;
        }
        trace!(batch_size = self.max_batch_size, "batch full, flushing.");
        self.open.take()
    }

    pub fn finish(&mut self) -> Option<PendingBatch> {
        self.open.take().filter(|batch| !batch.is_empty())
    }
}
