use std::collections::HashMap;
use std::error::Error as StdError;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use filament_verify::{Fingerprint, verify_file};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{CacheEntry, CacheKey, CacheStore, Commit, Error, Result};

pub const STAGING_DIR: &str = ".staging";
pub const REMOTE_DIR: &str = "remote";
pub const BUFFERS_DIR: &str = "buffers";

type SharedFailure = Arc<dyn StdError + Send + Sync>;

#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    /// Re-hash cached files with exact fingerprints before reporting a hit.
    pub verify_hits: bool,
}

/// Outcome broadcast to callers waiting on someone else's reservation.
#[derive(Clone)]
enum Settle {
    Pending,
    Committed(CacheEntry),
    Failed(SharedFailure),
    Abandoned,
}

struct Inner {
    root:     PathBuf,
    store:    Arc<dyn CacheStore>,
    options:  CacheOptions,
    inflight: Mutex<HashMap<CacheKey, watch::Sender<Settle>>>,
    claims:   Mutex<HashMap<String, CacheKey>>,
}

/// Deduplicating content cache rooted at a directory.
///
/// Cloning is cheap and every clone shares the same in-flight registry.
#[derive(Clone)]
pub struct ContentCache {
    inner: Arc<Inner>,
}

pub enum Lookup {
    Hit(CacheEntry),
    Miss(Reservation),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> { mutex.lock().unwrap_or_else(PoisonError::into_inner) }

impl ContentCache {
    /// Prepare the directory layout under `root` and discard staging leftovers from
    /// interrupted runs.
    pub fn open(
        root: impl Into<PathBuf>,
        store: Arc<dyn CacheStore>,
        options: CacheOptions,
    ) -> Result<Self> {
        let root = root.into();
        filament_fs::ensure_dir(root.join(REMOTE_DIR))?;
        filament_fs::ensure_dir(root.join(BUFFERS_DIR))?;
        let swept = filament_fs::sweep_dir(root.join(STAGING_DIR))?;
        if swept > 0 {
            info!(count = swept, root = %root.display(), "removed leftover staging files");
        }
        filament_fs::ensure_dir(root.join(STAGING_DIR))?;

        Ok(Self {
            inner: Arc::new(Inner {
                root,
                store,
                options,
                inflight: Mutex::new(HashMap::new()),
                claims: Mutex::new(HashMap::new()),
            }),
        })
    }

    pub fn root(&self) -> &Path { &self.inner.root }

    pub fn staging_dir(&self) -> PathBuf { self.inner.root.join(STAGING_DIR) }

    pub fn remote_dir(&self) -> PathBuf { self.inner.root.join(REMOTE_DIR) }

    pub fn buffers_dir(&self) -> PathBuf { self.inner.root.join(BUFFERS_DIR) }

    pub fn store(&self) -> &Arc<dyn CacheStore> { &self.inner.store }

    /// Read the persisted entry for `key` without reserving or validating it.
    pub fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>> { self.inner.store.get(key) }

    /// Number of keys with an outstanding reservation.
    pub fn in_flight(&self) -> usize { lock(&self.inner.inflight).len() }

    /// Return the committed entry for `key`, or the exclusive right to populate it.
    ///
    /// When another caller already holds the reservation this waits for it to settle:
    /// a commit is returned as a hit, an abort as [`Error::PeerFailed`], and a reservation
    /// dropped without settling sends the caller back through the lookup.
    pub async fn lookup_or_reserve(&self, key: &CacheKey) -> Result<Lookup> { self.lookup(key, false).await }

    /// Like [`ContentCache::lookup_or_reserve`], but an intact entry that carries an ETag is
    /// handed back inside a reservation (see [`Reservation::previous`]) so the caller can
    /// revalidate it with the origin.
    pub async fn lookup_for_revalidation(&self, key: &CacheKey) -> Result<Lookup> { self.lookup(key, true).await }

    async fn lookup(&self, key: &CacheKey, revalidate: bool) -> Result<Lookup> {
        loop {
            let waiter = {
                let mut inflight = lock(&self.inner.inflight);
                match inflight.get(key) {
                    Some(tx) => Some(tx.subscribe()),
                    None => {
                        let (tx, _) = watch::channel(Settle::Pending);
                        inflight.insert(key.clone(), tx);
                        None
                    }
                }
            };

            let Some(mut rx) = waiter else {
                let reservation = Reservation::new(Arc::clone(&self.inner), key.clone());
                return self.resolve_owned(reservation, revalidate).await;
            };

            debug!(%key, "waiting on in-flight reservation");
            let outcome = match rx.wait_for(|s| !matches!(s, Settle::Pending)).await {
                Ok(settled) => (*settled).clone(),
                Err(_) => Settle::Abandoned,
            };
            match outcome {
                Settle::Committed(entry) => return Ok(Lookup::Hit(entry)),
                Settle::Failed(failure) => return Err(Error::PeerFailed(failure)),
                Settle::Abandoned | Settle::Pending => {
                    debug!(%key, "reservation abandoned, retrying lookup");
                }
            }
        }
    }

    async fn resolve_owned(&self, mut reservation: Reservation, revalidate: bool) -> Result<Lookup> {
        let key = reservation.key.clone();
        let Some(entry) = self.inner.store.get(&key)? else {
            return Ok(Lookup::Miss(reservation));
        };

        if self.is_intact(&entry).await? {
            if revalidate && entry.etag.is_some() {
                reservation.previous = Some(entry);
                return Ok(Lookup::Miss(reservation));
            }
            reservation.settle(Settle::Committed(entry.clone()));
            return Ok(Lookup::Hit(entry));
        }

        warn!(%key, path = %entry.local_path.display(), "cached file missing or altered, discarding entry");
        self.inner.store.remove(&key)?;
        reservation.reuse_path = Some(entry.local_path);
        Ok(Lookup::Miss(reservation))
    }

    async fn is_intact(&self, entry: &CacheEntry) -> Result<bool> {
        let metadata = match tokio::fs::metadata(&entry.local_path).await {
            Ok(metadata) => metadata,
            Err(_) => return Ok(false),
        };
        if !metadata.is_file() || metadata.len() != entry.size {
            return Ok(false);
        }
        if !self.inner.options.verify_hits || !matches!(entry.fingerprint, Fingerprint::Exact { .. }) {
            return Ok(true);
        }

        let path = entry.local_path.clone();
        let expected = entry.fingerprint.clone();
        let verified = tokio::task::spawn_blocking(move || verify_file(&path, &expected)).await?;
        Ok(verified.is_ok())
    }
}

/// Exclusive right to populate one cache key.
///
/// Settle it with [`Reservation::commit`], [`Reservation::keep_previous`] or
/// [`Reservation::abort`]. Dropping it unsettled (for example when the owning task is
/// cancelled) releases the key and wakes waiters so one of them can take over.
pub struct Reservation {
    inner:      Arc<Inner>,
    key:        CacheKey,
    previous:   Option<CacheEntry>,
    reuse_path: Option<PathBuf>,
    claimed:    Option<String>,
    settled:    bool,
}

impl Reservation {
    fn new(inner: Arc<Inner>, key: CacheKey) -> Self {
        Self {
            inner,
            key,
            previous: None,
            reuse_path: None,
            claimed: None,
            settled: false,
        }
    }

    pub fn key(&self) -> &CacheKey { &self.key }

    /// The intact entry being revalidated, if this reservation came from
    /// [`ContentCache::lookup_for_revalidation`].
    pub fn previous(&self) -> Option<&CacheEntry> { self.previous.as_ref() }

    pub fn staging_dir(&self) -> PathBuf { self.inner.root.join(STAGING_DIR) }

    /// Allocate the final location for `file_name` under the remote directory.
    ///
    /// The plain name is used when nobody else holds it. A name held by another key, either
    /// claimed in this process or already present on disk, is retried with `-<short key>`
    /// inserted before the extension. A path this key already occupied (the entry being
    /// revalidated, or one whose file went missing) is claimed again as is.
    pub fn claim_path(&mut self, file_name: &str) -> Result<PathBuf> {
        let dir = self.inner.root.join(REMOTE_DIR);
        let mut claims = lock(&self.inner.claims);

        let known = self
            .previous
            .as_ref()
            .map(|entry| entry.local_path.clone())
            .or_else(|| self.reuse_path.clone());
        if let Some(path) = known
            && let Some(name) = path.file_name().map(|name| name.to_string_lossy().into_owned())
        {
            let held_elsewhere = claims.get(&name).is_some_and(|owner| owner != &self.key);
            if !held_elsewhere {
                claims.insert(name.clone(), self.key.clone());
                self.claimed = Some(name);
                return Ok(path);
            }
        }

        if let Some(name) = &self.claimed {
            return Ok(dir.join(name));
        }

        for candidate in [file_name.to_string(), with_suffix(file_name, self.key.short())] {
            match claims.get(&candidate) {
                Some(owner) if owner == &self.key => {}
                Some(_) => continue,
                None if dir.join(&candidate).exists() => continue,
                None => {}
            }
            claims.insert(candidate.clone(), self.key.clone());
            self.claimed = Some(candidate.clone());
            return Ok(dir.join(candidate));
        }

        Err(Error::NamingConflict {
            name: file_name.to_string(),
            key:  self.key.clone(),
        })
    }

    /// Persist the entry and publish it to every waiter.
    ///
    /// `commit.local_path` must already hold the complete file. If the entry cannot be
    /// persisted that file is removed and the reservation stays open, so the caller can
    /// [`abort`](Reservation::abort) it with its own error.
    pub fn commit(&mut self, commit: Commit) -> Result<CacheEntry> {
        let entry = CacheEntry {
            key:         self.key.clone(),
            url:         commit.url,
            local_path:  commit.local_path,
            fingerprint: commit.fingerprint,
            size:        commit.size,
            etag:        commit.etag,
            created_at:  Utc::now(),
        };
        if let Err(error) = self.inner.store.set(&entry) {
            warn!(key = %entry.key, path = %entry.local_path.display(), %error, "cache entry not persisted, removing file");
            if let Err(e) = std::fs::remove_file(&entry.local_path) {
                warn!(path = %entry.local_path.display(), error = %e, "failed to remove unpersisted file");
            }
            return Err(error);
        }
        info!(key = %entry.key, path = %entry.local_path.display(), size = entry.size, "cache entry committed");
        self.settle(Settle::Committed(entry.clone()));
        Ok(entry)
    }

    /// Confirm the entry under revalidation is still current.
    ///
    /// Returns `None` (and releases the key) when there is no previous entry.
    pub fn keep_previous(mut self) -> Option<CacheEntry> {
        let entry = self.previous.take()?;
        self.settle(Settle::Committed(entry.clone()));
        Some(entry)
    }

    /// Release the key after a terminal failure. Current waiters receive `reason`; later
    /// lookups start a fresh reservation.
    pub fn abort(mut self, reason: SharedFailure) {
        debug!(key = %self.key, %reason, "reservation aborted");
        self.settle(Settle::Failed(reason));
    }

    fn settle(&mut self, outcome: Settle) {
        if self.settled {
            return;
        }
        self.settled = true;

        if !matches!(outcome, Settle::Committed(_))
            && let Some(name) = self.claimed.take()
        {
            let mut claims = lock(&self.inner.claims);
            if claims.get(&name) == Some(&self.key) {
                claims.remove(&name);
            }
        }

        let sender = lock(&self.inner.inflight).remove(&self.key);
        if let Some(sender) = sender {
            sender.send_replace(outcome);
        }
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.settled {
            debug!(key = %self.key, "reservation dropped unsettled");
            self.settle(Settle::Abandoned);
        }
    }
}

fn with_suffix(file_name: &str, suffix: &str) -> String {
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}-{}{}", &file_name[..dot], suffix, &file_name[dot..]),
        _ => format!("{file_name}-{suffix}"),
    }
}
