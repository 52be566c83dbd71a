use std::fmt;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use aws_sdk_s3::types::RequestPayer;

pub mod error;
pub mod token;

/// Side effect executed once after the deletion attempt of its candidate,
/// whether or not the object was actually deleted.
pub type PostDeleteHook = Box<dyn FnOnce() -> Result<()> + Send>;

/// Batch-wide request option applied to every candidate's shared flags
/// before the candidate is assembled into a batch.
pub type RequestOption = Box<dyn Fn(&mut SharedFlags) + Send + Sync>;

/// Request-level fields of a DeleteObjects call.
///
/// Two candidates can only travel in the same batch when these flags are
/// identical (and they target the same bucket).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedFlags {
    /// `x-amz-mfa` header value: serial number and token separated by a space.
    pub mfa: Option<String>,
    pub request_payer: Option<RequestPayer>,
}

impl SharedFlags {
    pub fn new(mfa: Option<String>, request_payer: Option<RequestPayer>) -> Self {
        Self { mfa, request_payer }
    }
}

/// Key and optional version id of one object, as listed or as sent in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectEntry {
    pub key: String,
    pub version_id: Option<String>,
}

impl ObjectEntry {
    pub fn new(key: impl Into<String>, version_id: Option<String>) -> Self {
        Self {
            key: key.into(),
            version_id,
        }
    }
}

/// One object to delete, together with its optional post-attempt hook.
///
/// A candidate is moved (never shared) from its source into the batch
/// assembler and finally into the deleter, which consumes the hook.
pub struct DeletionCandidate {
    pub container: String,
    pub key: String,
    pub version_id: Option<String>,
    pub shared_flags: SharedFlags,
    pub post_hook: Option<PostDeleteHook>,
}

impl DeletionCandidate {
    pub fn new(container: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            key: key.into(),
            version_id: None,
            shared_flags: SharedFlags::default(),
            post_hook: None,
        }
    }

    pub fn with_version_id(mut self, version_id: impl Into<String>) -> Self {
        self.version_id = Some(version_id.into());
        self
    }

    pub fn with_shared_flags(mut self, shared_flags: SharedFlags) -> Self {
        self.shared_flags = shared_flags;
        self
    }

    pub fn with_post_hook<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.post_hook = Some(Box::new(hook));
        self
    }

    pub fn entry(&self) -> ObjectEntry {
        ObjectEntry::new(self.key.clone(), self.version_id.clone())
    }

    /// Whether this candidate may share a DeleteObjects call with a batch
    /// built for `container` and `shared_flags`.
    pub fn has_parity(&self, container: &str, shared_flags: &SharedFlags) -> bool {
        self.container == container && &self.shared_flags == shared_flags
    }
}

impl Debug for DeletionCandidate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeletionCandidate")
            .field("container", &self.container)
            .field("key", &self.key)
            .field("version_id", &self.version_id)
            .field("shared_flags", &self.shared_flags)
            .field("post_hook", &self.post_hook.as_ref().map(|_| "<hook>"))
            .finish()
    }
}

/// Members of one DeleteObjects call. All members share `container` and
/// `shared_flags`; the assembler never lets `members` exceed its batch size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub container: String,
    pub shared_flags: SharedFlags,
    pub members: Vec<ObjectEntry>,
}

impl BatchRequest {
    pub fn new(container: impl Into<String>, shared_flags: SharedFlags) -> Self {
        Self {
            container: container.into(),
            shared_flags,
            members: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// A key the server reported as not deleted in an otherwise successful
/// DeleteObjects response. `code` and `message` are kept as sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyError {
    pub key: Option<String>,
    pub version_id: Option<String>,
    pub code: Option<String>,
    pub message: Option<String>,
}

/// Which listing API backs a paginated candidate source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListingMode {
    /// ListObjectsV2: current objects only.
    #[default]
    Objects,
    /// ListObjectVersions: every version and delete marker.
    Versions,
}

/// Opaque position in a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContinuationToken {
    Objects(String),
    Versions {
        key_marker: String,
        version_id_marker: Option<String>,
    },
}

/// One page returned by the remote listing capability.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub items: Vec<ObjectEntry>,
    pub next_token: Option<ContinuationToken>,
}

/// S3 storage path specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoragePath {
    S3 { bucket: String, prefix: String },
}

/// Point-in-time copy of [`DeletionStatsReport`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionStats {
    pub batches: u64,
    pub deleted: u64,
    pub failed: u64,
}

/// Counters updated by the deleter while it runs.
#[derive(Debug, Default)]
pub struct DeletionStatsReport {
    batches: AtomicU64,
    deleted: AtomicU64,
    failed: AtomicU64,
}

impl DeletionStatsReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_batches(&self) {
        self.batches.fetch_add(1, Ordering::SeqCst);
    }

    pub fn add_deleted(&self, count: u64) {
        self.deleted.fetch_add(count, Ordering::SeqCst);
    }

    pub fn add_failed(&self, count: u64) {
        self.failed.fetch_add(count, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> DeletionStats {
        DeletionStats {
            batches: self.batches.load(Ordering::SeqCst),
            deleted: self.deleted.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}
