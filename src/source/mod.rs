//! Candidate sources for the batch deleter.
//!
//! A source is a pull-based, single-pass sequence of [`DeletionCandidate`]s:
//!
//! ```text
//! CandidateSource → BatchAssembler → BatchDeleter
//! ```
//!
//! [`StaticCandidateSource`] walks a pre-built list; [`PaginatedCandidateSource`]
//! fetches listing pages from the target storage on demand.

use anyhow::Error;
use async_trait::async_trait;

use crate::types::DeletionCandidate;

pub mod paginated;

pub use paginated::PaginatedCandidateSource;

/// Pull-based sequence of deletion candidates.
///
/// `advance` moves to the next candidate and returns false once the
/// sequence is exhausted or has failed; a failed sequence reports its error
/// through `take_last_error`. Sources are not restartable.
#[async_trait]
pub trait CandidateSource: Send {
    async fn advance(&mut self) -> bool;

    /// Move the current candidate out of the source.
    ///
    /// Returns `None` before the first `advance`, after exhaustion, or when
    /// the current candidate has already been taken.
    fn current(&mut self) -> Option<DeletionCandidate>;

    fn take_last_error(&mut self) -> Option<Error>;
}

/// Candidate source over a fixed, ordered list. Never fails on its own.
pub struct StaticCandidateSource {
    remaining: std::vec::IntoIter<DeletionCandidate>,
    current: Option<DeletionCandidate>,
}

impl StaticCandidateSource {
    pub fn new(candidates: Vec<DeletionCandidate>) -> Self {
        Self {
            remaining: candidates.into_iter(),
            current: None,
        }
    }

    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }
}

impl From<Vec<DeletionCandidate>> for StaticCandidateSource {
    fn from(candidates: Vec<DeletionCandidate>) -> Self {
        Self::new(candidates)
    }
}

#[async_trait]
impl CandidateSource for StaticCandidateSource {
    async fn advance(&mut self) -> bool {
        self.current = self.remaining.next();
        self.current.is_some()
    }

    fn current(&mut self) -> Option<DeletionCandidate> {
        self.current.take()
    }

    fn take_last_error(&mut self) -> Option<Error> {
        None
    }
}
