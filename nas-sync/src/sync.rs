//! Batch upload of photos to the NAS
//!
//! The orchestrator filters the photo set by policy, pushes each photo
//! through the selected transport and tallies the outcome. Per-item failures
//! never abort the batch. The last-sync timestamp is written once, after the
//! batch, and only when at least one photo made it.

use crate::models::{NasConfig, Photo, SyncFailure, SyncResult};
use crate::state::SyncStateStore;
use crate::transport::NasTransport;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Progress callback: `(processed, total)`
pub type ProgressFn<'a> = &'a (dyn Fn(usize, usize) + Send + Sync);

/// Tuning knobs for a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Maximum uploads in flight; 1 processes photos strictly in input order
    pub concurrency: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

/// Photos a batch will transfer under the configured policy
pub fn select_photos<'a>(photos: &'a [Photo], config: &NasConfig) -> Vec<&'a Photo> {
    photos
        .iter()
        .filter(|p| !config.sync_favorites_only || p.is_favorite)
        .collect()
}

struct Tally<'a> {
    result: SyncResult,
    total: usize,
    on_progress: Option<ProgressFn<'a>>,
}

impl<'a> Tally<'a> {
    fn new(total: usize, on_progress: Option<ProgressFn<'a>>) -> Self {
        Self {
            result: SyncResult::default(),
            total,
            on_progress,
        }
    }

    fn record(&mut self, photo_id: &str, outcome: Result<(), String>) {
        match outcome {
            Ok(()) => self.result.successful += 1,
            Err(reason) => {
                self.result.failed += 1;
                self.result.failures.push(SyncFailure {
                    photo_id: photo_id.to_string(),
                    reason,
                });
            }
        }
        if let Some(callback) = self.on_progress {
            callback(self.result.processed(), self.total);
        }
    }
}

/// Drives one sync batch against a NAS
pub struct NasSyncService {
    transport: Arc<dyn NasTransport>,
    state: SyncStateStore,
    options: SyncOptions,
}

impl NasSyncService {
    pub fn new(transport: Arc<dyn NasTransport>, state: SyncStateStore) -> Self {
        Self {
            transport,
            state,
            options: SyncOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> &SyncStateStore {
        &self.state
    }

    pub async fn test_connection(&self, config: &NasConfig) -> bool {
        match self.transport.check_connection(config).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("NAS connection test failed: {}", e);
                false
            }
        }
    }

    /// Uploads one photo; `false` on any failure
    pub async fn upload_photo(&self, photo: &Photo, config: &NasConfig) -> bool {
        self.transport.upload(photo, config).await.is_ok()
    }

    pub async fn sync_to_nas(
        &self,
        photos: &[Photo],
        config: &NasConfig,
        on_progress: Option<ProgressFn<'_>>,
    ) -> SyncResult {
        self.sync_with_cancel(photos, config, on_progress, &CancellationToken::new())
            .await
    }

    /// Like [`sync_to_nas`](Self::sync_to_nas), but stops starting new
    /// uploads once `cancel` fires. A cancelled batch never updates the
    /// last-sync timestamp.
    pub async fn sync_with_cancel(
        &self,
        photos: &[Photo],
        config: &NasConfig,
        on_progress: Option<ProgressFn<'_>>,
        cancel: &CancellationToken,
    ) -> SyncResult {
        let selected = select_photos(photos, config);
        log::info!(
            "Syncing {} of {} photos to {}",
            selected.len(),
            photos.len(),
            config.host
        );

        let mut tally = Tally::new(selected.len(), on_progress);
        if self.options.concurrency <= 1 {
            self.run_sequential(&selected, config, &mut tally, cancel).await;
        } else {
            self.run_pooled(&selected, config, &mut tally, cancel).await;
        }

        let mut result = tally.result;
        result.cancelled = cancel.is_cancelled() && result.processed() < selected.len();

        if result.cancelled {
            log::warn!(
                "Sync cancelled after {} of {} photos",
                result.processed(),
                selected.len()
            );
        } else if result.successful > 0 {
            self.state.set_last_sync_time(Utc::now());
        }

        log::info!(
            "Sync finished: {} uploaded, {} failed",
            result.successful,
            result.failed
        );
        result
    }

    async fn run_sequential(
        &self,
        photos: &[&Photo],
        config: &NasConfig,
        tally: &mut Tally<'_>,
        cancel: &CancellationToken,
    ) {
        for photo in photos {
            if cancel.is_cancelled() {
                break;
            }
            let outcome = self
                .transport
                .upload(photo, config)
                .await
                .map_err(|e| e.to_string());
            tally.record(&photo.id, outcome);
        }
    }

    /// At most `concurrency` uploads in flight. Progress is reported from
    /// this task as uploads complete, so the count only ever grows.
    async fn run_pooled(
        &self,
        photos: &[&Photo],
        config: &NasConfig,
        tally: &mut Tally<'_>,
        cancel: &CancellationToken,
    ) {
        let limit = self.options.concurrency;
        let mut join_set = JoinSet::new();
        let mut in_flight: HashMap<tokio::task::Id, String> = HashMap::new();

        for photo in photos {
            while join_set.len() >= limit {
                join_next(&mut join_set, &mut in_flight, tally).await;
            }
            if cancel.is_cancelled() {
                break;
            }

            let transport = self.transport.clone();
            let photo = (*photo).clone();
            let config = config.clone();
            let photo_id = photo.id.clone();
            let handle = join_set.spawn(async move {
                let outcome = transport
                    .upload(&photo, &config)
                    .await
                    .map_err(|e| e.to_string());
                (photo.id, outcome)
            });
            in_flight.insert(handle.id(), photo_id);
        }

        while !join_set.is_empty() {
            join_next(&mut join_set, &mut in_flight, tally).await;
        }
    }
}

type UploadOutcome = (String, Result<(), String>);

async fn join_next(
    join_set: &mut JoinSet<UploadOutcome>,
    in_flight: &mut HashMap<tokio::task::Id, String>,
    tally: &mut Tally<'_>,
) {
    match join_set.join_next_with_id().await {
        Some(Ok((id, (photo_id, outcome)))) => {
            in_flight.remove(&id);
            tally.record(&photo_id, outcome);
        }
        Some(Err(e)) => {
            let photo_id = in_flight.remove(&e.id()).unwrap_or_default();
            log::error!("Upload task for photo {} died: {}", photo_id, e);
            tally.record(&photo_id, Err(format!("upload task failed: {}", e)));
        }
        None => {}
    }
}
