//! Shared integration test infrastructure for s3purge-rs.
//!
//! Provides `InMemoryStorage`, a `StorageTrait` implementation that behaves
//! like a small S3 endpoint: paginated listing, DeleteObjects with per-key
//! failures, and DeleteBucket that refuses non-empty buckets.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use s3purge_rs::storage::{Storage, StorageTrait};
use s3purge_rs::types::error::RemoteError;
use s3purge_rs::types::{
    BatchRequest, ContinuationToken, KeyError, ListPage, ListingMode, ObjectEntry,
};

type Entry = (String, Option<String>);

#[derive(Default)]
struct Inner {
    buckets: BTreeMap<String, BTreeSet<Entry>>,
    denied_keys: HashSet<String>,
    failing_delete_calls: usize,
    delete_call_sizes: Vec<usize>,
    list_call_count: usize,
}

#[derive(Clone, Default)]
pub struct InMemoryStorage {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn boxed(&self) -> Storage {
        Box::new(self.clone())
    }

    pub fn create_bucket(&self, bucket: &str) {
        self.inner
            .lock()
            .unwrap()
            .buckets
            .entry(bucket.to_string())
            .or_default();
    }

    pub fn put_object(&self, bucket: &str, key: &str) {
        self.insert(bucket, key, None);
    }

    pub fn put_object_version(&self, bucket: &str, key: &str, version_id: &str) {
        self.insert(bucket, key, Some(version_id.to_string()));
    }

    pub fn put_objects(&self, bucket: &str, prefix: &str, count: usize) {
        for i in 0..count {
            self.put_object(bucket, &format!("{prefix}{i:05}"));
        }
    }

    /// Deletes of `key` are answered with a per-key `AccessDenied`.
    pub fn deny_key(&self, key: &str) {
        self.inner
            .lock()
            .unwrap()
            .denied_keys
            .insert(key.to_string());
    }

    /// The next `count` DeleteObjects calls fail as a whole.
    pub fn fail_next_delete_calls(&self, count: usize) {
        self.inner.lock().unwrap().failing_delete_calls = count;
    }

    pub fn bucket_exists(&self, bucket: &str) -> bool {
        self.inner.lock().unwrap().buckets.contains_key(bucket)
    }

    pub fn object_count(&self, bucket: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .buckets
            .get(bucket)
            .map_or(0, BTreeSet::len)
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .buckets
            .get(bucket)
            .map(|entries| entries.iter().map(|(key, _)| key.clone()).collect())
            .unwrap_or_default()
    }

    pub fn delete_call_sizes(&self) -> Vec<usize> {
        self.inner.lock().unwrap().delete_call_sizes.clone()
    }

    pub fn list_call_count(&self) -> usize {
        self.inner.lock().unwrap().list_call_count
    }

    fn insert(&self, bucket: &str, key: &str, version_id: Option<String>) {
        self.inner
            .lock()
            .unwrap()
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert((key.to_string(), version_id));
    }
}

#[async_trait]
impl StorageTrait for InMemoryStorage {
    async fn list_page(
        &self,
        container: &str,
        prefix: &str,
        mode: ListingMode,
        max_keys: i32,
        token: Option<ContinuationToken>,
    ) -> Result<ListPage> {
        let mut inner = self.inner.lock().unwrap();
        inner.list_call_count += 1;

        let entries = inner.buckets.get(container).ok_or_else(|| {
            anyhow!(RemoteError::new(
                "NoSuchBucket",
                "The specified bucket does not exist"
            ))
        })?;

        let max_keys = max_keys.max(1) as usize;
        let matching = entries.iter().filter(|(key, _)| key.starts_with(prefix));

        let mut items: Vec<ObjectEntry> = match (mode, token) {
            (ListingMode::Objects, token) => {
                let after = match token {
                    Some(ContinuationToken::Objects(last_key)) => Some(last_key),
                    None => None,
                    Some(other) => return Err(anyhow!("unexpected token {other:?}")),
                };
                let keys: BTreeSet<&String> = matching
                    .map(|(key, _)| key)
                    .filter(|key| after.as_ref().is_none_or(|after| *key > after))
                    .collect();
                keys.into_iter()
                    .take(max_keys + 1)
                    .map(|key| ObjectEntry::new(key.clone(), None))
                    .collect()
            }
            (ListingMode::Versions, token) => {
                let after: Option<Entry> = match token {
                    Some(ContinuationToken::Versions {
                        key_marker,
                        version_id_marker,
                    }) => Some((key_marker, version_id_marker)),
                    None => None,
                    Some(other) => return Err(anyhow!("unexpected token {other:?}")),
                };
                matching
                    .filter(|entry| after.as_ref().is_none_or(|after| *entry > after))
                    .take(max_keys + 1)
                    .map(|(key, version_id)| ObjectEntry::new(key.clone(), version_id.clone()))
                    .collect()
            }
        };

        let truncated = items.len() > max_keys;
        items.truncate(max_keys);

        let next_token = match (truncated, items.last()) {
            (true, Some(last)) => Some(match mode {
                ListingMode::Objects => ContinuationToken::Objects(last.key.clone()),
                ListingMode::Versions => ContinuationToken::Versions {
                    key_marker: last.key.clone(),
                    version_id_marker: last.version_id.clone(),
                },
            }),
            _ => None,
        };

        Ok(ListPage { items, next_token })
    }

    async fn delete_batch(&self, request: &BatchRequest) -> Result<Vec<KeyError>> {
        let mut inner = self.inner.lock().unwrap();
        inner.delete_call_sizes.push(request.len());

        if inner.failing_delete_calls > 0 {
            inner.failing_delete_calls -= 1;
            return Err(anyhow!("dispatch failure: connection reset"));
        }

        let denied_keys = inner.denied_keys.clone();
        let Some(entries) = inner.buckets.get_mut(&request.container) else {
            return Err(anyhow!(RemoteError::new(
                "NoSuchBucket",
                "The specified bucket does not exist"
            )));
        };

        let mut errors = Vec::new();
        for member in &request.members {
            if denied_keys.contains(&member.key) {
                errors.push(KeyError {
                    key: Some(member.key.clone()),
                    version_id: member.version_id.clone(),
                    code: Some("AccessDenied".to_string()),
                    message: Some("Access Denied".to_string()),
                });
                continue;
            }

            match &member.version_id {
                Some(_) => {
                    entries.remove(&(member.key.clone(), member.version_id.clone()));
                }
                None => entries.retain(|(key, _)| key != &member.key),
            }
        }

        Ok(errors)
    }

    async fn delete_bucket(&self, container: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let is_empty = inner.buckets.get(container).map(BTreeSet::is_empty);
        match is_empty {
            None => Err(anyhow!(RemoteError::new(
                "NoSuchBucket",
                "The specified bucket does not exist"
            ))),
            Some(false) => Err(anyhow!(RemoteError::new(
                "BucketNotEmpty",
                "The bucket you tried to delete is not empty"
            ))),
            Some(true) => {
                inner.buckets.remove(container);
                Ok(())
            }
        }
    }
}
