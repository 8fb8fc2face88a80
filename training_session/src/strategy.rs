use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};
use trainer_client::{ChunkUpload, FileUpload, TrainerApi};
use trainer_config::UploadMode;
use trainer_types::MachineRef;

use crate::chunking::ChunkPlan;
use crate::config::SessionConfig;
use crate::errors::{Result, TrainingSessionError};
use crate::source::SourceFile;

/// Receives upload progress as an integer percentage after every acknowledged request.
pub trait UploadProgress: Send + Sync {
    fn on_progress(&self, percent: u8);
}

impl<F: Fn(u8) + Send + Sync> UploadProgress for F {
    fn on_progress(&self, percent: u8) {
        self(percent)
    }
}

/// What a successful upload hands over to the polling stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub tracking_id: String,
    pub model_id: Option<String>,
    pub upload_id: Option<String>,
    /// Number of requests the upload took.
    pub requests: u64,
}

/// A way of getting a training file to the backend and a training job started.
#[async_trait]
pub trait UploadStrategy: Send + Sync {
    fn mode(&self) -> UploadMode;

    async fn upload(
        &self,
        api: &dyn TrainerApi,
        target: &MachineRef,
        source: &SourceFile,
        progress: &dyn UploadProgress,
    ) -> Result<UploadOutcome>;
}

pub fn strategy_for(config: &SessionConfig) -> Arc<dyn UploadStrategy> {
    match config.upload_mode {
        UploadMode::Chunked => Arc::new(ChunkedUpload::new(config.chunk_size, config.max_file_size)),
        UploadMode::WholeFile => Arc::new(WholeFileUpload::new(config.max_file_size)),
    }
}

/// Sends the file as sequential fixed-size chunks to `/api/model-train/chunk`.
///
/// Each chunk is only sent after the previous one was acknowledged; the first failure ends
/// the upload.  Files over `max_file_size` are rejected before the first request.
#[derive(Debug, Clone)]
pub struct ChunkedUpload {
    chunk_size: u64,
    max_file_size: u64,
}

impl ChunkedUpload {
    pub fn new(chunk_size: u64, max_file_size: u64) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            max_file_size,
        }
    }
}

#[async_trait]
impl UploadStrategy for ChunkedUpload {
    fn mode(&self) -> UploadMode {
        UploadMode::Chunked
    }

    async fn upload(
        &self,
        api: &dyn TrainerApi,
        target: &MachineRef,
        source: &SourceFile,
        progress: &dyn UploadProgress,
    ) -> Result<UploadOutcome> {
        source.check_uploadable(self.max_file_size)?;

        let plan = ChunkPlan::new(source.size(), self.chunk_size);
        info!(file = source.name(), size = source.size(), chunks = plan.total_chunks(), %target, "starting chunked upload");

        let mut upload_id: Option<String> = None;
        let mut finished = None;

        for chunk in plan.chunks() {
            let data = source.read_range(chunk.range.clone()).await?;
            let request = ChunkUpload {
                target: target.clone(),
                filename: source.name().to_string(),
                content_type: source.content_type().to_string(),
                chunk_index: chunk.index,
                is_last: chunk.is_last,
                upload_id: upload_id.clone(),
                data,
            };

            let response = api
                .upload_chunk(request)
                .await
                .map_err(|e| TrainingSessionError::ChunkUploadFailed {
                    chunk_index: chunk.index,
                    message: e.to_string(),
                })?;

            if let Some(id) = response.upload_id.filter(|id| !id.is_empty()) {
                upload_id = Some(id);
            }
            if chunk.is_last {
                finished = Some((response.tracking_id, response.model_id));
            }

            debug!(chunk = chunk.index, upload_id = ?upload_id, "chunk acknowledged");
            progress.on_progress(plan.progress_percent(chunk.index));
        }

        let (tracking_id, model_id) = finished.unwrap_or_default();
        let tracking_id = tracking_id
            .filter(|id| !id.is_empty())
            .ok_or(TrainingSessionError::MissingTrackingId)?;

        Ok(UploadOutcome {
            tracking_id,
            model_id: model_id.filter(|id| !id.is_empty()),
            upload_id,
            requests: plan.total_chunks(),
        })
    }
}

/// Sends the whole file as the raw body of `/api/model-train/start`.
#[derive(Debug, Clone, Copy)]
pub struct WholeFileUpload {
    max_file_size: u64,
}

impl WholeFileUpload {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }
}

#[async_trait]
impl UploadStrategy for WholeFileUpload {
    fn mode(&self) -> UploadMode {
        UploadMode::WholeFile
    }

    async fn upload(
        &self,
        api: &dyn TrainerApi,
        target: &MachineRef,
        source: &SourceFile,
        progress: &dyn UploadProgress,
    ) -> Result<UploadOutcome> {
        source.check_uploadable(self.max_file_size)?;

        info!(file = source.name(), size = source.size(), %target, "starting whole-file upload");
        let data = source.read_all().await?;
        let response = api
            .start_training(FileUpload {
                target: target.clone(),
                filename: source.name().to_string(),
                content_type: source.content_type().to_string(),
                data,
            })
            .await
            .map_err(|e| TrainingSessionError::ChunkUploadFailed {
                chunk_index: 0,
                message: e.to_string(),
            })?;

        let tracking_id = response
            .tracking_id
            .filter(|id| !id.is_empty())
            .ok_or(TrainingSessionError::MissingTrackingId)?;
        progress.on_progress(100);

        Ok(UploadOutcome {
            tracking_id,
            model_id: response.model_id.filter(|id| !id.is_empty()),
            upload_id: None,
            requests: 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use trainer_client::MemoryTrainerApi;

    use super::*;

    const MIB: u64 = 1024 * 1024;
    const LIMIT: u64 = 25 * MIB;

    fn target() -> MachineRef {
        MachineRef::Id("42".into())
    }

    #[tokio::test]
    async fn chunked_upload_sends_ordered_chunks_and_reports_progress() {
        let api = MemoryTrainerApi::new();
        api.set_model_id(Some("model-3"));
        let source = SourceFile::from_bytes("sensors.csv", vec![7u8; (5 * MIB / 2) as usize]);
        let seen = Mutex::new(Vec::new());

        let outcome = ChunkedUpload::new(MIB, LIMIT)
            .upload(&api, &target(), &source, &|p: u8| seen.lock().push(p))
            .await
            .unwrap();

        let chunks = api.chunks();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.iter().map(|c| c.len as u64).collect::<Vec<_>>(), vec![MIB, MIB, MIB / 2]);
        assert_eq!(chunks.iter().map(|c| c.chunk_index).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(chunks.iter().map(|c| c.is_last).collect::<Vec<_>>(), vec![false, false, true]);
        assert_eq!(chunks[0].upload_id, None);
        assert_eq!(chunks[1].upload_id.as_deref(), Some("upload-1"));
        assert_eq!(chunks[2].upload_id.as_deref(), Some("upload-1"));
        assert_eq!(chunks[0].content_type, "text/csv");

        assert_eq!(*seen.lock(), vec![33, 67, 100]);
        assert_eq!(outcome.tracking_id, "track-1");
        assert_eq!(outcome.model_id.as_deref(), Some("model-3"));
        assert_eq!(outcome.requests, 3);
    }

    #[tokio::test]
    async fn chunk_failure_stops_the_sequence() {
        let api = MemoryTrainerApi::new();
        api.reject_chunk(1, 500, "");
        let source = SourceFile::from_bytes("sensors.csv", vec![1u8; 10]);
        let seen = Mutex::new(Vec::new());

        let err = ChunkedUpload::new(3, LIMIT)
            .upload(&api, &target(), &source, &|p: u8| seen.lock().push(p))
            .await
            .unwrap_err();

        assert!(matches!(err, TrainingSessionError::ChunkUploadFailed { chunk_index: 1, .. }));
        assert_eq!(err.to_string(), "Upload failed (500)");
        assert_eq!(api.chunks().len(), 2);
        assert_eq!(*seen.lock(), vec![25]);
    }

    #[tokio::test]
    async fn missing_tracking_id_is_fatal() {
        let api = MemoryTrainerApi::new();
        api.set_tracking_id(None);
        let source = SourceFile::from_bytes("sensors.csv", vec![1u8; 4]);

        let err = ChunkedUpload::new(MIB, LIMIT)
            .upload(&api, &target(), &source, &|_: u8| {})
            .await
            .unwrap_err();
        assert!(matches!(err, TrainingSessionError::MissingTrackingId));
        assert_eq!(api.chunks().len(), 1);
    }

    #[tokio::test]
    async fn whole_file_upload_is_one_request() {
        let api = MemoryTrainerApi::new();
        let source = SourceFile::from_bytes("sensors.csv", vec![1u8; (3 * MIB) as usize]);
        let seen = Mutex::new(Vec::new());

        let config = SessionConfig::default().with_upload_mode(UploadMode::WholeFile);
        let strategy = strategy_for(&config);
        assert_eq!(strategy.mode(), UploadMode::WholeFile);

        let outcome = strategy
            .upload(&api, &target(), &source, &|p: u8| seen.lock().push(p))
            .await
            .unwrap();

        assert_eq!(outcome.requests, 1);
        assert!(api.chunks().is_empty());
        let uploads = api.whole_file_uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].data.len() as u64, 3 * MIB);
        assert_eq!(*seen.lock(), vec![100]);
    }

    #[tokio::test]
    async fn empty_sources_never_reach_the_network() {
        let api = MemoryTrainerApi::new();
        let source = SourceFile::from_bytes("sensors.csv", Vec::new());
        let strategies: [Arc<dyn UploadStrategy>; 2] =
            [Arc::new(ChunkedUpload::new(MIB, LIMIT)), Arc::new(WholeFileUpload::new(LIMIT))];
        for strategy in strategies {
            let err = strategy.upload(&api, &target(), &source, &|_: u8| {}).await.unwrap_err();
            assert!(matches!(err, TrainingSessionError::EmptyFile));
        }
        assert!(api.chunks().is_empty());
        assert!(api.whole_file_uploads().is_empty());
    }

    #[tokio::test]
    async fn oversize_sources_never_reach_the_network() {
        let api = MemoryTrainerApi::new();
        let source = SourceFile::from_bytes("sensors.csv", vec![0u8; (LIMIT + 1) as usize]);
        let seen = Mutex::new(Vec::new());

        let chunked = SessionConfig::default();
        let whole = SessionConfig::default().with_upload_mode(UploadMode::WholeFile);
        for config in [chunked, whole] {
            let err = strategy_for(&config)
                .upload(&api, &target(), &source, &|p: u8| seen.lock().push(p))
                .await
                .unwrap_err();
            assert!(matches!(err, TrainingSessionError::FileTooLarge { size, limit } if size == LIMIT + 1 && limit == LIMIT));
        }

        assert!(api.chunks().is_empty());
        assert!(api.whole_file_uploads().is_empty());
        assert!(seen.lock().is_empty());
    }
}
