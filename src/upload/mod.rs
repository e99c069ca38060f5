//! Bulk asset upload pipeline.
//!
//! A job runs in three phases:
//!
//! 1. reserve one imageset slot per asset (a single call, before any upload)
//! 2. process chunks on a bounded pool of worker threads; each chunk fetches
//!    its signed destinations in one batch, uploads its assets one by one and
//!    registers the results at the chunk's reserved offset
//! 3. once every chunk is done, ask the imageset to fill whatever slots are
//!    still empty with placeholders
//!
//! Only a failed reservation aborts the job. Chunk and asset failures are
//! logged and leave empty slots behind for the healing phase.
//!
//! Failed assets are reported as `null` entries so the completion payload
//! always has one entry per reserved slot and later entries keep their
//! positions.

pub mod discover;
pub mod plan;
pub mod remote;
pub mod storage;

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;
use uuid::Uuid;

use crate::api::CONCURRENCY;
use crate::error::{Error, Result};

pub use discover::{discover, DiscoverOptions, Discovery};
pub use plan::{chunk_size, plan, Chunk};
pub use remote::{ImagesetApi, RemoteImageset};
pub use storage::{Backend, SignedUrlUploader, StorageClientUploader, Uploader};

/// A file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub mime: String,
}

/// What gets registered in an imageset slot for a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    #[serde(rename = "blob_id")]
    pub asset_id: Uuid,
    pub name: String,
    pub size: u64,
    #[serde(rename = "mimetype")]
    pub mime: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStatus {
    /// Results were registered with the imageset.
    Reported,
    /// No destinations could be obtained; nothing was uploaded.
    BrokerFailed,
    /// Uploads ran but registering them failed.
    ReportFailed,
}

/// How one chunk ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkOutcome {
    pub start_offset: u64,
    pub count: usize,
    pub uploaded: usize,
    pub status: ChunkStatus,
}

impl ChunkOutcome {
    /// Slots this chunk actually filled.
    pub fn registered(&self) -> usize {
        match self.status {
            ChunkStatus::Reported => self.uploaded,
            _ => 0,
        }
    }
}

/// Terminal state of a job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSummary {
    /// Slots reserved, one per discovered asset.
    pub allocated: u64,
    /// First reserved slot.
    pub offset: u64,
    pub chunks: usize,
    /// Slots filled with an uploaded asset.
    pub registered: usize,
    /// Whether the empty-slot replacement ran successfully.
    pub healed: bool,
}

impl JobSummary {
    /// Reserved slots left without an uploaded asset.
    pub fn missing(&self) -> u64 {
        self.allocated - self.registered as u64
    }
}

/// Receives chunk completions as they happen. Never affects the job.
pub trait ProgressObserver {
    fn started(&self, _chunks: usize, _assets: usize) {}
    fn chunk_finished(&self, outcome: &ChunkOutcome);
    fn finished(&self, _summary: &JobSummary) {}
}

/// Observer that ignores everything.
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn chunk_finished(&self, _outcome: &ChunkOutcome) {}
}

/// Runs upload jobs against one imageset through one storage backend.
pub struct Pipeline<'a> {
    api: &'a dyn ImagesetApi,
    uploader: &'a dyn Uploader,
    concurrency: usize,
}

impl<'a> Pipeline<'a> {
    pub fn new(api: &'a dyn ImagesetApi, uploader: &'a dyn Uploader) -> Self {
        Pipeline {
            api,
            uploader,
            concurrency: CONCURRENCY,
        }
    }

    /// Caps the number of chunks in flight at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Uploads `assets` into the imageset in order.
    ///
    /// Returns an error only when slots could not be reserved; every other
    /// failure is folded into the returned summary.
    pub fn run(&self, assets: &[Asset], observer: &dyn ProgressObserver) -> Result<JobSummary> {
        let total = assets.len() as u64;
        if total == 0 {
            tracing::warn!("no images found to upload");
            return Ok(JobSummary::default());
        }

        let new_size = self
            .api
            .extend(total)
            .map_err(|e| Error::Allocation(Box::new(e)))?;
        let offset = new_size.checked_sub(total).ok_or_else(|| {
            Error::Allocation(Box::new(Error::Storage(format!(
                "imageset size {new_size} is smaller than the {total} slots reserved"
            ))))
        })?;
        tracing::info!(total, offset, "reserved imageset slots");

        let chunks = plan(assets, offset);
        let mut summary = JobSummary {
            allocated: total,
            offset,
            chunks: chunks.len(),
            ..JobSummary::default()
        };
        observer.started(chunks.len(), assets.len());

        let (job_tx, job_rx) = crossbeam_channel::bounded::<Chunk<'_>>(chunks.len());
        for chunk in &chunks {
            if job_tx.send(*chunk).is_err() {
                break;
            }
        }
        drop(job_tx);

        let (done_tx, done_rx) = crossbeam_channel::unbounded::<ChunkOutcome>();
        let workers = self.concurrency.min(chunks.len());
        std::thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let done_tx = done_tx.clone();
                scope.spawn(move || {
                    for chunk in job_rx.iter() {
                        if done_tx.send(self.process_chunk(&chunk)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(done_tx);

            for outcome in done_rx.iter() {
                summary.registered += outcome.registered();
                observer.chunk_finished(&outcome);
            }
        });

        summary.healed = match self.api.replace_empties() {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "replacing empty slots failed");
                tracing::warn!(
                    missing = summary.missing(),
                    "imageset may contain unfilled slots"
                );
                false
            }
        };
        tracing::info!(
            registered = summary.registered,
            missing = summary.missing(),
            healed = summary.healed,
            "upload finished"
        );
        observer.finished(&summary);
        Ok(summary)
    }

    fn process_chunk(&self, chunk: &Chunk<'_>) -> ChunkOutcome {
        let mut outcome = ChunkOutcome {
            start_offset: chunk.start_offset,
            count: chunk.count(),
            uploaded: 0,
            status: ChunkStatus::Reported,
        };

        let ids: Vec<Uuid> = chunk.assets.iter().map(|_| Uuid::new_v4()).collect();
        let destinations = match self.api.signed_destinations(&ids) {
            Ok(destinations) => destinations,
            Err(e) => {
                tracing::error!(
                    start = chunk.start_offset,
                    count = chunk.count(),
                    error = %e,
                    "could not get upload destinations, skipping chunk"
                );
                outcome.status = ChunkStatus::BrokerFailed;
                return outcome;
            }
        };

        let images: Vec<Option<UploadResult>> = chunk
            .assets
            .iter()
            .zip(&ids)
            .map(|(asset, id)| match self.upload_asset(asset, *id, &destinations) {
                Ok(result) => Some(result),
                Err(e) => {
                    tracing::error!(path = %asset.path.display(), error = %e, "upload failed");
                    None
                }
            })
            .collect();
        outcome.uploaded = images.iter().flatten().count();

        if let Err(e) = self.api.complete_bulk(chunk.start_offset, &images) {
            tracing::error!(
                start = chunk.start_offset,
                error = %e,
                "registering uploaded images failed"
            );
            outcome.status = ChunkStatus::ReportFailed;
        }
        outcome
    }

    fn upload_asset(
        &self,
        asset: &Asset,
        id: Uuid,
        destinations: &HashMap<Uuid, String>,
    ) -> Result<UploadResult> {
        let destination = destinations
            .get(&id)
            .ok_or(Error::MissingDestination(id))?;
        self.uploader.upload(asset, destination)?;
        Ok(UploadResult {
            asset_id: id,
            name: asset.name.clone(),
            size: asset.size,
            mime: asset.mime.clone(),
        })
    }
}
