use std::path::Path;
use std::sync::Arc;

use filament_fs::StagedFile;
use filament_store::{CacheEntry, Commit, ContentCache, Lookup, Reservation};
use filament_verify::{ExactAccumulator, Fingerprint};
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::{Error, FailureReason, Result};
use crate::http::{HttpClient, HttpRequest, HttpResponse};
use crate::metrics::{FetchMetrics, MetricsSnapshot};
use crate::naming::NamePlan;
use crate::request::AcquisitionRequest;
use crate::retry::{StatusClass, classify_status, retry_delay};
use crate::sniff::{SNIFF_LEN, sniff_extension};
use crate::FetchConfig;

/// A cached file produced by [`Coordinator::acquire`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acquired {
    pub entry:      CacheEntry,
    /// `true` when no body was transferred for this call.
    pub from_cache: bool,
}

/// Downloads remote files into a [`ContentCache`].
///
/// - at most one transfer per cache key, however many callers ask concurrently
/// - at most `max_concurrent_downloads` transfers at once; a permit is held for one attempt
///   and released while backing off
/// - bodies are hashed while streaming into the staging directory and only moved into place
///   once complete, so readers never observe a partial file
///
/// Dropping the future returned by [`Coordinator::acquire`] cancels the transfer, removes
/// the staged file, and releases the key for the next caller.
pub struct Coordinator<C> {
    shared: Arc<Shared<C>>,
}

struct Shared<C> {
    client:  C,
    cache:   ContentCache,
    config:  FetchConfig,
    permits: Semaphore,
    metrics: FetchMetrics,
}

impl<C> Clone for Coordinator<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

enum Download {
    NotModified,
    Complete(Completed),
}

struct Completed {
    staged:      StagedFile,
    fingerprint: Fingerprint,
    size:        u64,
    head:        Vec<u8>,
    etag:        Option<String>,
}

enum AttemptError {
    Transient(FailureReason),
    Fatal(Error),
}

impl<C: HttpClient> Coordinator<C> {
    pub fn new(client: C, cache: ContentCache, config: FetchConfig) -> Self {
        let config = config.normalized();
        let permits = Semaphore::new(config.max_concurrent_downloads);
        Self {
            shared: Arc::new(Shared {
                client,
                cache,
                config,
                permits,
                metrics: FetchMetrics::default(),
            }),
        }
    }

    pub fn client(&self) -> &C { &self.shared.client }

    pub fn cache(&self) -> &ContentCache { &self.shared.cache }

    pub fn config(&self) -> &FetchConfig { &self.shared.config }

    pub fn metrics(&self) -> MetricsSnapshot { self.shared.metrics.snapshot() }

    /// Make the resource behind `request` available as a cached local file.
    #[instrument(skip_all, fields(url = request.url()))]
    pub async fn acquire(&self, request: &AcquisitionRequest) -> Result<Acquired> {
        let url = request.url();
        let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl {
            url:    url.to_string(),
            reason: e.to_string(),
        })?;
        let plan = NamePlan::new(&parsed, request.name_override(), request.extension_override());
        let key = request.cache_key();

        let cache = &self.shared.cache;
        let lookup = if self.shared.config.revalidate {
            cache.lookup_for_revalidation(&key).await
        } else {
            cache.lookup_or_reserve(&key).await
        };
        let mut reservation = match lookup.map_err(|e| Error::cache(url, e))? {
            Lookup::Hit(entry) => {
                debug!(%key, path = %entry.local_path.display(), "cache hit");
                self.shared.metrics.record_hit();
                return Ok(Acquired {
                    entry,
                    from_cache: true,
                });
            }
            Lookup::Miss(reservation) => reservation,
        };

        let etag = reservation.previous().and_then(|entry| entry.etag.clone());
        let staging_dir = reservation.staging_dir();
        let download = match self.download(request, &staging_dir, etag.as_deref()).await {
            Ok(Download::Complete(completed)) => completed,
            Ok(Download::NotModified) => {
                return match reservation.keep_previous() {
                    Some(entry) => {
                        info!(%key, "origin reports not modified, keeping cached copy");
                        self.shared.metrics.record_hit();
                        Ok(Acquired {
                            entry,
                            from_cache: true,
                        })
                    }
                    None => Err(Error::Network {
                        url:      url.to_string(),
                        attempts: 1,
                        reason:   FailureReason::Status(304),
                    }),
                };
            }
            Err(error) => return Err(self.fail(reservation, error)),
        };

        let size = download.size;
        let commit = match place(&mut reservation, url, &plan, download) {
            Ok(commit) => commit,
            Err(error) => return Err(self.fail(reservation, error)),
        };
        let entry = match reservation.commit(commit) {
            Ok(entry) => entry,
            Err(error) => return Err(self.fail(reservation, Error::cache(url, error))),
        };
        self.shared.metrics.record_completed(size);
        Ok(Acquired {
            entry,
            from_cache: false,
        })
    }

    fn fail(&self, reservation: Reservation, error: Error) -> Error {
        warn!(key = %reservation.key(), %error, "acquisition failed");
        self.shared.metrics.record_failed();
        reservation.abort(Arc::new(error.clone()));
        error
    }

    async fn download(
        &self,
        request: &AcquisitionRequest,
        staging_dir: &Path,
        etag: Option<&str>,
    ) -> Result<Download> {
        let config = &self.shared.config;
        let mut headers = request.http_headers();
        if let Some(etag) = etag {
            headers.push(("If-None-Match".to_string(), etag.to_string()));
        }
        let http_request = HttpRequest {
            url: request.url().to_string(),
            headers,
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = {
                let _permit = self.shared.permits.acquire().await.map_err(|_| Error::Network {
                    url:      http_request.url.clone(),
                    attempts: attempt,
                    reason:   FailureReason::Transport("download coordinator closed".into()),
                })?;
                let _active = self.shared.metrics.start_attempt();
                self.attempt(&http_request, staging_dir, attempt, etag.is_some()).await
            };

            match result {
                Ok(download) => return Ok(download),
                Err(AttemptError::Fatal(error)) => return Err(error),
                Err(AttemptError::Transient(reason)) if attempt < config.max_attempts => {
                    let delay = retry_delay(attempt - 1, config.backoff_base_duration());
                    warn!(url = %http_request.url, attempt, %reason, ?delay, "transient failure, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(AttemptError::Transient(reason)) => {
                    return Err(Error::Network {
                        url: http_request.url.clone(),
                        attempts: attempt,
                        reason,
                    });
                }
            }
        }
    }

    async fn attempt(
        &self,
        request: &HttpRequest,
        staging_dir: &Path,
        attempt: u32,
        conditional: bool,
    ) -> std::result::Result<Download, AttemptError> {
        let config = &self.shared.config;
        let url = request.url.as_str();
        debug!(url, attempt, "requesting");

        let connect_timeout = config.connect_timeout_duration();
        let response = match timeout(connect_timeout, self.shared.client.get(request.clone())).await {
            Err(_) => {
                return Err(AttemptError::Transient(FailureReason::ConnectTimeout {
                    after: connect_timeout,
                }));
            }
            Ok(Err(e)) => return Err(AttemptError::Transient(FailureReason::Transport(e.to_string()))),
            Ok(Ok(response)) => response,
        };

        match classify_status(response.status) {
            StatusClass::Success => {}
            StatusClass::NotModified if conditional => return Ok(Download::NotModified),
            StatusClass::Transient => return Err(AttemptError::Transient(FailureReason::Status(response.status))),
            StatusClass::Auth => {
                return Err(AttemptError::Fatal(Error::Auth {
                    url:    url.to_string(),
                    status: response.status,
                }));
            }
            StatusClass::NotModified | StatusClass::Fatal => {
                return Err(AttemptError::Fatal(Error::Network {
                    url:      url.to_string(),
                    attempts: attempt,
                    reason:   FailureReason::Status(response.status),
                }));
            }
        }

        self.stream_body(url, response, staging_dir).await.map(Download::Complete)
    }

    /// Tee the body into a staged file and the fingerprint accumulator.
    async fn stream_body(
        &self,
        url: &str,
        response: HttpResponse,
        staging_dir: &Path,
    ) -> std::result::Result<Completed, AttemptError> {
        let stall_timeout = self.shared.config.stall_timeout_duration();
        let staged = StagedFile::new_in(staging_dir).map_err(|e| AttemptError::Fatal(Error::fs(url, e)))?;
        let io_error = |e| AttemptError::Fatal(Error::io(url, staged.path(), e));

        let mut file = tokio::fs::File::create(staged.path()).await.map_err(io_error)?;
        let mut accumulator = ExactAccumulator::new();
        let mut head = Vec::with_capacity(SNIFF_LEN);
        let mut body = response.body;

        loop {
            let next = match timeout(stall_timeout, body.next()).await {
                Ok(next) => next,
                Err(_) => {
                    return Err(AttemptError::Transient(FailureReason::Stalled {
                        after: stall_timeout,
                    }));
                }
            };
            let Some(chunk) = next else { break };
            let chunk = chunk.map_err(|e| AttemptError::Transient(FailureReason::Transport(e.to_string())))?;

            if head.len() < SNIFF_LEN {
                let take = (SNIFF_LEN - head.len()).min(chunk.len());
                head.extend_from_slice(&chunk[..take]);
            }
            accumulator.update(&chunk);
            file.write_all(&chunk).await.map_err(io_error)?;
        }

        file.flush().await.map_err(io_error)?;
        file.sync_all().await.map_err(io_error)?;
        drop(file);

        let size = accumulator.len();
        if let Some(expected) = response.content_length
            && expected != size
        {
            return Err(AttemptError::Transient(FailureReason::Transport(format!(
                "body ended after {size} of {expected} bytes"
            ))));
        }

        debug!(url, size, "body received");
        Ok(Completed {
            staged,
            fingerprint: accumulator.finalize(),
            size,
            head,
            etag: response.etag,
        })
    }
}

/// Move a finished download to its final name and describe it for the cache.
fn place(reservation: &mut Reservation, url: &str, plan: &NamePlan, download: Completed) -> Result<Commit> {
    let sniffed = if plan.needs_sniff() {
        sniff_extension(&download.head)
    } else {
        None
    };
    let file_name = plan.file_name(sniffed);
    let destination = reservation.claim_path(&file_name).map_err(|e| Error::cache(url, e))?;
    let local_path = download.staged.commit(&destination).map_err(|e| Error::fs(url, e))?;

    Ok(Commit {
        url: url.to_string(),
        local_path,
        fingerprint: download.fingerprint,
        size: download.size,
        etag: download.etag,
    })
}
