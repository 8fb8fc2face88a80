use bytes::Bytes;
use serde_json::Value;
use trainer_types::{
    ChunkUploadResponse, InferenceRequest, Machine, MachineRef, MachineSummary, NewMachine, StartTrainingResponse,
    TrainingStatusResponse,
};

use crate::error::Result;

/// One part of a chunked upload.
#[derive(Debug, Clone)]
pub struct ChunkUpload {
    pub target: MachineRef,
    pub filename: String,
    pub content_type: String,
    pub chunk_index: u64,
    pub is_last: bool,
    /// Server-issued id of the upload run; `None` for the first chunk.
    pub upload_id: Option<String>,
    pub data: Bytes,
}

/// A whole file sent in one request.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub target: MachineRef,
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

/// The REST surface of the training backend.
///
/// Every method maps to exactly one request; no method retries.
#[async_trait::async_trait]
pub trait TrainerApi: Send + Sync {
    async fn upload_chunk(&self, chunk: ChunkUpload) -> Result<ChunkUploadResponse>;

    async fn start_training(&self, upload: FileUpload) -> Result<StartTrainingResponse>;

    async fn training_status(&self, tracking_id: &str) -> Result<TrainingStatusResponse>;

    /// Returns the server's response body untouched.
    async fn run_inference(&self, request: &InferenceRequest) -> Result<Value>;

    async fn list_machines(&self) -> Result<Vec<Machine>>;

    async fn create_machine(&self, machine: &NewMachine) -> Result<Machine>;

    async fn delete_machine(&self, machine_id: &str) -> Result<()>;

    async fn machines_data(&self) -> Result<Vec<MachineSummary>>;

    /// Starts (`enable == true`) or stops the inference gateway for a machine name.
    async fn set_inference_gateway(&self, name: &str, enable: bool) -> Result<()>;
}
