//! Bucket operations behind capability checks and the path sandbox.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::GateConfig;
use crate::guard::{AuthorizationGuard, RequestContext};
use crate::sandbox::{PathSandbox, is_folder_key};
use crate::types::{
    Capability, FolderListing, ListingEntry, ObjectPage, ObjectSummary, SessionIdentity,
};
use crate::{GateError, Result};

/// Key-based object storage. Keys are returned decoded.
pub trait ObjectStore {
    /// One page of objects whose key starts with `prefix`.
    fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> Result<ObjectPage>;

    /// Zero-byte object; with a key ending in `/` this is a folder marker.
    fn put_empty_object(&self, bucket: &str, key: &str) -> Result<()>;

    fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for &T {
    fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> Result<ObjectPage> {
        (**self).list_objects(bucket, prefix, continuation_token)
    }

    fn put_empty_object(&self, bucket: &str, key: &str) -> Result<()> {
        (**self).put_empty_object(bucket, key)
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        (**self).delete_object(bucket, key)
    }
}

/// Who is asking, and for which request.
#[derive(Debug, Clone, Copy)]
pub struct Caller<'a> {
    pub identity: &'a SessionIdentity,
    pub request: &'a RequestContext,
}

impl<'a> Caller<'a> {
    pub fn new(identity: &'a SessionIdentity, request: &'a RequestContext) -> Self {
        Self { identity, request }
    }
}

#[derive(Debug)]
pub struct BucketBrowser<S> {
    store: S,
    bucket: String,
    sandbox: PathSandbox,
    guard: AuthorizationGuard,
}

impl<S: ObjectStore> BucketBrowser<S> {
    pub fn new(store: S, bucket: impl Into<String>, sandbox: PathSandbox) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            sandbox,
            guard: AuthorizationGuard::new(),
        }
    }

    pub fn from_config(config: &GateConfig, store: S) -> Result<Self> {
        Ok(Self::new(
            store,
            config.bucket()?,
            PathSandbox::from_config(config),
        ))
    }

    #[must_use]
    pub fn sandbox(&self) -> &PathSandbox {
        &self.sandbox
    }

    /// Every object under `prefix`, following continuation tokens.
    pub fn list_all(&self, prefix: &str) -> Result<Vec<ObjectSummary>> {
        let mut objects = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self
                .store
                .list_objects(&self.bucket, prefix, token.as_deref())?;
            tracing::debug!(
                target = "casgate::bucket",
                prefix,
                keys = page.objects.len(),
                "listed page"
            );
            objects.extend(page.objects);
            match page.next_continuation_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        Ok(objects)
    }

    /// Direct files and subfolders of the folder at browse path `path`.
    pub fn list_folder(&self, caller: Caller<'_>, path: &str) -> Result<FolderListing> {
        self.guard
            .require(caller.identity, Capability::ListFiles, caller.request)?;
        let prefix = self.sandbox.to_backend_key(path, true)?;

        let mut folders = BTreeSet::new();
        let mut files = Vec::new();
        for object in self.list_all(&prefix)? {
            let Some(relative) = object.key.strip_prefix(prefix.as_str()) else {
                continue;
            };
            if relative.is_empty() {
                continue;
            }
            match relative.split_once('/') {
                Some((folder, _)) => {
                    folders.insert(format!("{folder}/"));
                }
                None => files.push(ListingEntry {
                    key: relative.to_string(),
                    size: object.size,
                    last_modified: object.last_modified,
                }),
            }
        }

        Ok(FolderListing {
            folders: folders
                .into_iter()
                .map(|key| ListingEntry {
                    key,
                    size: 0,
                    last_modified: None,
                })
                .collect(),
            files,
        })
    }

    /// Creates a folder marker at browse path `path`. Returns the key.
    pub fn create_folder(&self, caller: Caller<'_>, path: &str) -> Result<String> {
        self.guard
            .require(caller.identity, Capability::CreateFolder, caller.request)?;
        let key = self.sandbox.to_backend_key(path, true)?;
        self.sandbox.ensure_mutable(&key)?;
        self.store.put_empty_object(&self.bucket, &key)?;
        tracing::info!(
            target = "casgate::bucket",
            principal = caller.identity.principal(),
            %key,
            "created folder"
        );
        Ok(key)
    }

    /// Deletes an empty folder.
    pub fn delete_folder(&self, caller: Caller<'_>, path: &str) -> Result<()> {
        self.guard
            .require(caller.identity, Capability::RemoveFolder, caller.request)?;
        let key = self.sandbox.to_backend_key(path, true)?;
        self.sandbox.ensure_mutable(&key)?;
        if !self.is_folder_empty(&key)? {
            tracing::warn!(
                target = "casgate::bucket",
                principal = caller.identity.principal(),
                %key,
                "refusing to delete a non-empty folder"
            );
            return Err(GateError::FolderNotEmpty { key: key.into() });
        }
        self.store.delete_object(&self.bucket, &key)?;
        tracing::info!(
            target = "casgate::bucket",
            principal = caller.identity.principal(),
            %key,
            "deleted folder"
        );
        Ok(())
    }

    pub fn delete_file(&self, caller: Caller<'_>, path: &str) -> Result<()> {
        self.guard
            .require(caller.identity, Capability::RemoveFile, caller.request)?;
        let key = self.sandbox.to_backend_key(path, false)?;
        self.sandbox.ensure_mutable(&key)?;
        if is_folder_key(&key) {
            return Err(GateError::PathViolation {
                path: path.into(),
                reason: "expected a file, got a folder".into(),
            });
        }
        self.store.delete_object(&self.bucket, &key)?;
        tracing::info!(
            target = "casgate::bucket",
            principal = caller.identity.principal(),
            %key,
            "deleted file"
        );
        Ok(())
    }

    /// A folder is empty when nothing but its own marker lives under it.
    pub fn is_folder_empty(&self, folder_key: &str) -> Result<bool> {
        let mut token: Option<String> = None;
        loop {
            let page = self
                .store
                .list_objects(&self.bucket, folder_key, token.as_deref())?;
            if page.objects.iter().any(|object| object.key != folder_key) {
                return Ok(false);
            }
            match page.next_continuation_token {
                Some(next) => token = Some(next),
                None => return Ok(true),
            }
        }
    }
}

/// Sorted in-memory store with configurable page size.
#[derive(Debug)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<(String, String), u64>>,
    page_size: usize,
    listed: Mutex<Vec<String>>,
    put: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::with_page_size(1000)
    }
}

impl MemoryObjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            page_size: page_size.max(1),
            listed: Mutex::new(Vec::new()),
            put: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    pub fn insert(&self, bucket: &str, key: &str, size: u64) {
        lock(&self.objects).insert((bucket.to_string(), key.to_string()), size);
    }

    #[must_use]
    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        lock(&self.objects).contains_key(&(bucket.to_string(), key.to_string()))
    }

    /// Prefixes passed to `list_objects`, one entry per page requested.
    #[must_use]
    pub fn listed_prefixes(&self) -> Vec<String> {
        lock(&self.listed).clone()
    }

    /// Keys passed to `put_empty_object`, in call order.
    #[must_use]
    pub fn put_keys(&self) -> Vec<String> {
        lock(&self.put).clone()
    }

    /// Keys passed to `delete_object`, in call order.
    #[must_use]
    pub fn deleted_keys(&self) -> Vec<String> {
        lock(&self.deleted).clone()
    }

    /// Total calls of any kind made against the store.
    #[must_use]
    pub fn call_count(&self) -> usize {
        lock(&self.listed).len() + lock(&self.put).len() + lock(&self.deleted).len()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<&str>,
    ) -> Result<ObjectPage> {
        lock(&self.listed).push(prefix.to_string());
        let objects = lock(&self.objects);
        let mut matching = objects
            .iter()
            .filter(|((b, key), _)| b == bucket && key.starts_with(prefix))
            .filter(|((_, key), _)| continuation_token.is_none_or(|after| key.as_str() > after))
            .map(|((_, key), size)| ObjectSummary::new(key.clone(), *size));

        let page: Vec<ObjectSummary> = matching.by_ref().take(self.page_size).collect();
        let next_continuation_token = if matching.next().is_some() {
            page.last().map(|last| last.key.clone())
        } else {
            None
        };
        Ok(ObjectPage {
            objects: page,
            next_continuation_token,
        })
    }

    fn put_empty_object(&self, bucket: &str, key: &str) -> Result<()> {
        lock(&self.put).push(key.to_string());
        self.insert(bucket, key, 0);
        Ok(())
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        lock(&self.deleted).push(key.to_string());
        lock(&self.objects).remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
