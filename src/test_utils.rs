//! Shared test utilities for the s3purge library crate.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use crate::config::Config;
use crate::storage::StorageTrait;
use crate::types::{BatchRequest, ContinuationToken, KeyError, ListPage, ListingMode, StoragePath};

/// Initialise a dummy tracing subscriber for tests.
///
/// Uses `try_init` so that only the first call in a process actually
/// installs the subscriber; subsequent calls are silently ignored.
pub(crate) fn init_dummy_tracing_subscriber() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("dummy=trace")
        .try_init();
}

/// Create a [`Config`] targeting `s3://test-bucket/prefix/`.
pub(crate) fn make_test_config() -> Config {
    Config {
        target: StoragePath::S3 {
            bucket: "test-bucket".to_string(),
            prefix: "prefix/".to_string(),
        },
        ..Config::default()
    }
}

/// Calls recorded by [`MockStorage`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StorageCall {
    ListPage {
        container: String,
        prefix: String,
        mode: ListingMode,
        max_keys: i32,
        token: Option<ContinuationToken>,
    },
    DeleteBatch(BatchRequest),
    DeleteBucket(String),
}

pub(crate) enum ListResponse {
    Page(ListPage),
    Error(anyhow::Error),
    /// Never completes.
    Pending,
}

pub(crate) enum DeleteResponse {
    KeyErrors(Vec<KeyError>),
    Error(anyhow::Error),
    /// Never completes.
    Pending,
}

/// Scripted storage. Responses are consumed in order; once a script runs
/// out, listings return an empty final page and deletes succeed.
#[derive(Clone, Default)]
pub(crate) struct MockStorage {
    calls: Arc<Mutex<Vec<StorageCall>>>,
    list_responses: Arc<Mutex<VecDeque<ListResponse>>>,
    delete_responses: Arc<Mutex<VecDeque<DeleteResponse>>>,
    delete_bucket_error: Arc<Mutex<Option<anyhow::Error>>>,
}

impl MockStorage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_list_response(self, response: ListResponse) -> Self {
        self.list_responses.lock().unwrap().push_back(response);
        self
    }

    pub(crate) fn with_delete_response(self, response: DeleteResponse) -> Self {
        self.delete_responses.lock().unwrap().push_back(response);
        self
    }

    pub(crate) fn with_delete_bucket_error(self, error: anyhow::Error) -> Self {
        *self.delete_bucket_error.lock().unwrap() = Some(error);
        self
    }

    pub(crate) fn calls(&self) -> Vec<StorageCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn delete_batches(&self) -> Vec<BatchRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StorageCall::DeleteBatch(request) => Some(request),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl StorageTrait for MockStorage {
    async fn list_page(
        &self,
        container: &str,
        prefix: &str,
        mode: ListingMode,
        max_keys: i32,
        token: Option<ContinuationToken>,
    ) -> Result<ListPage> {
        self.calls.lock().unwrap().push(StorageCall::ListPage {
            container: container.to_string(),
            prefix: prefix.to_string(),
            mode,
            max_keys,
            token,
        });

        let response = self.list_responses.lock().unwrap().pop_front();
        match response {
            Some(ListResponse::Page(page)) => Ok(page),
            Some(ListResponse::Error(e)) => Err(e),
            Some(ListResponse::Pending) => std::future::pending().await,
            None => Ok(ListPage::default()),
        }
    }

    async fn delete_batch(&self, request: &BatchRequest) -> Result<Vec<KeyError>> {
        self.calls
            .lock()
            .unwrap()
            .push(StorageCall::DeleteBatch(request.clone()));

        let response = self.delete_responses.lock().unwrap().pop_front();
        match response {
            Some(DeleteResponse::KeyErrors(errors)) => Ok(errors),
            Some(DeleteResponse::Error(e)) => Err(e),
            Some(DeleteResponse::Pending) => std::future::pending().await,
            None => Ok(Vec::new()),
        }
    }

    async fn delete_bucket(&self, container: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(StorageCall::DeleteBucket(container.to_string()));

        match self.delete_bucket_error.lock().unwrap().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
