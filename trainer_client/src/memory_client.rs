use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tracing::debug;
use trainer_types::{
    ChunkUploadResponse, InferenceRequest, Machine, MachineRef, MachineSummary, NewMachine, StartTrainingResponse,
    TrainingStatusResponse, parse_machines_data,
};

use crate::error::{Result, TrainerClientError};
use crate::interface::{ChunkUpload, FileUpload, TrainerApi};

/// A chunk request as the in-memory backend received it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedChunk {
    pub target: MachineRef,
    pub filename: String,
    pub content_type: String,
    pub chunk_index: u64,
    pub is_last: bool,
    pub upload_id: Option<String>,
    pub len: usize,
}

/// One scripted answer of the status endpoint.
#[derive(Debug, Clone)]
pub enum ScriptedStatus {
    Respond(TrainingStatusResponse),
    /// Non-success status with the given body.
    Reject { status: u16, body: String },
    /// No response at all.
    Unreachable(String),
}

impl ScriptedStatus {
    pub fn status(status: &str, progress: Option<f64>) -> Self {
        Self::Respond(TrainingStatusResponse {
            status: Some(status.to_string()),
            progress,
            ..Default::default()
        })
    }

    pub fn completed(result: Value) -> Self {
        Self::Respond(TrainingStatusResponse {
            status: Some("completed".to_string()),
            result: Some(result),
            ..Default::default()
        })
    }

    pub fn failed(error: Option<&str>) -> Self {
        Self::Respond(TrainingStatusResponse {
            status: Some("failed".to_string()),
            error: error.map(|e| Value::String(e.to_string())),
            ..Default::default()
        })
    }
}

struct Inner {
    machines: Vec<Machine>,
    next_machine_id: u64,
    machines_data: Value,
    gateway_calls: Vec<(String, bool)>,

    chunks: Vec<RecordedChunk>,
    whole_file_uploads: Vec<FileUpload>,
    upload_id: String,
    tracking_id: Option<String>,
    model_id: Option<String>,
    chunk_rejection: Option<(u64, u16, String)>,

    status_script: VecDeque<ScriptedStatus>,
    last_status: Option<ScriptedStatus>,
    status_calls: Vec<String>,
    status_delay: Duration,

    inference_requests: Vec<InferenceRequest>,
    inference_response: std::result::Result<Value, (u16, String)>,
}

/// A scriptable in-process stand-in for the training backend.
///
/// Records every request it receives; responses are configured through the `set_*` and
/// `push_*` methods, which may be called while the client is in use.
pub struct MemoryTrainerApi {
    inner: Mutex<Inner>,
}

impl Default for MemoryTrainerApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTrainerApi {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                machines: Vec::new(),
                next_machine_id: 1,
                machines_data: json!([]),
                gateway_calls: Vec::new(),
                chunks: Vec::new(),
                whole_file_uploads: Vec::new(),
                upload_id: "upload-1".to_string(),
                tracking_id: Some("track-1".to_string()),
                model_id: None,
                chunk_rejection: None,
                status_script: VecDeque::new(),
                last_status: None,
                status_calls: Vec::new(),
                status_delay: Duration::ZERO,
                inference_requests: Vec::new(),
                inference_response: Ok(json!({"prediction": "ok"})),
            }),
        }
    }

    pub fn with_machine(self, id: &str, name: &str) -> Self {
        self.inner.lock().machines.push(Machine {
            id: id.to_string(),
            name: name.to_string(),
            image_url: None,
            latest_model_id: None,
            latest_model_status: None,
        });
        self
    }

    pub fn set_machines(&self, machines: Vec<Machine>) {
        self.inner.lock().machines = machines;
    }

    pub fn set_machines_data(&self, body: Value) {
        self.inner.lock().machines_data = body;
    }

    /// The tracking id returned with the last chunk (or whole-file upload); `None` omits it.
    pub fn set_tracking_id(&self, tracking_id: Option<&str>) {
        self.inner.lock().tracking_id = tracking_id.map(str::to_string);
    }

    pub fn set_model_id(&self, model_id: Option<&str>) {
        self.inner.lock().model_id = model_id.map(str::to_string);
    }

    /// Rejects the chunk with the given index with `status` and `body`.
    pub fn reject_chunk(&self, chunk_index: u64, status: u16, body: &str) {
        self.inner.lock().chunk_rejection = Some((chunk_index, status, body.to_string()));
    }

    pub fn push_status(&self, status: ScriptedStatus) {
        self.inner.lock().status_script.push_back(status);
    }

    /// Delay applied to each status request before it is answered.
    pub fn set_status_delay(&self, delay: Duration) {
        self.inner.lock().status_delay = delay;
    }

    pub fn set_inference_response(&self, response: Value) {
        self.inner.lock().inference_response = Ok(response);
    }

    pub fn reject_inference(&self, status: u16, body: &str) {
        self.inner.lock().inference_response = Err((status, body.to_string()));
    }

    pub fn chunks(&self) -> Vec<RecordedChunk> {
        self.inner.lock().chunks.clone()
    }

    pub fn whole_file_uploads(&self) -> Vec<FileUpload> {
        self.inner.lock().whole_file_uploads.clone()
    }

    pub fn status_calls(&self) -> Vec<String> {
        self.inner.lock().status_calls.clone()
    }

    pub fn inference_requests(&self) -> Vec<InferenceRequest> {
        self.inner.lock().inference_requests.clone()
    }

    pub fn gateway_calls(&self) -> Vec<(String, bool)> {
        self.inner.lock().gateway_calls.clone()
    }

    pub fn machines(&self) -> Vec<Machine> {
        self.inner.lock().machines.clone()
    }
}

#[async_trait]
impl TrainerApi for MemoryTrainerApi {
    async fn upload_chunk(&self, chunk: ChunkUpload) -> Result<ChunkUploadResponse> {
        let mut inner = self.inner.lock();
        inner.chunks.push(RecordedChunk {
            target: chunk.target.clone(),
            filename: chunk.filename.clone(),
            content_type: chunk.content_type.clone(),
            chunk_index: chunk.chunk_index,
            is_last: chunk.is_last,
            upload_id: chunk.upload_id.clone(),
            len: chunk.data.len(),
        });

        if let Some((index, status, body)) = &inner.chunk_rejection
            && *index == chunk.chunk_index
        {
            return Err(TrainerClientError::from_status("Upload", *status, body));
        }

        let mut response = ChunkUploadResponse {
            upload_id: Some(inner.upload_id.clone()),
            ..Default::default()
        };
        if chunk.is_last {
            response.tracking_id = inner.tracking_id.clone();
            response.model_id = inner.model_id.clone();
        }
        Ok(response)
    }

    async fn start_training(&self, upload: FileUpload) -> Result<StartTrainingResponse> {
        let mut inner = self.inner.lock();
        if let Some((0, status, body)) = &inner.chunk_rejection {
            return Err(TrainerClientError::from_status("Upload", *status, body));
        }
        inner.whole_file_uploads.push(upload);
        Ok(StartTrainingResponse {
            tracking_id: inner.tracking_id.clone(),
            model_id: inner.model_id.clone(),
        })
    }

    async fn training_status(&self, tracking_id: &str) -> Result<TrainingStatusResponse> {
        let (delay, scripted) = {
            let mut inner = self.inner.lock();
            inner.status_calls.push(tracking_id.to_string());
            let next = match inner.status_script.pop_front() {
                Some(s) => s,
                None => inner
                    .last_status
                    .clone()
                    .unwrap_or_else(|| ScriptedStatus::status("running", None)),
            };
            inner.last_status = Some(next.clone());
            (inner.status_delay, next)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        debug!(tracking_id, ?scripted, "memory backend status");
        match scripted {
            ScriptedStatus::Respond(response) => Ok(response),
            ScriptedStatus::Reject { status, body } => {
                Err(TrainerClientError::from_status("Training status", status, &body))
            },
            ScriptedStatus::Unreachable(message) => Err(TrainerClientError::transport("Training status", message)),
        }
    }

    async fn run_inference(&self, request: &InferenceRequest) -> Result<Value> {
        let mut inner = self.inner.lock();
        inner.inference_requests.push(request.clone());
        match &inner.inference_response {
            Ok(value) => Ok(value.clone()),
            Err((status, body)) => Err(TrainerClientError::from_status("Inference", *status, body)),
        }
    }

    async fn list_machines(&self) -> Result<Vec<Machine>> {
        Ok(self.inner.lock().machines.clone())
    }

    async fn create_machine(&self, machine: &NewMachine) -> Result<Machine> {
        let mut inner = self.inner.lock();
        if inner.machines.iter().any(|m| m.name == machine.name) {
            return Err(TrainerClientError::from_status(
                "Add machine",
                409,
                &json!({"detail": format!("Machine {} already exists", machine.name)}).to_string(),
            ));
        }

        let created = Machine {
            id: format!("m-{}", inner.next_machine_id),
            name: machine.name.clone(),
            image_url: machine.image_url.clone(),
            latest_model_id: None,
            latest_model_status: None,
        };
        inner.next_machine_id += 1;
        inner.machines.push(created.clone());
        Ok(created)
    }

    async fn delete_machine(&self, machine_id: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        let before = inner.machines.len();
        inner.machines.retain(|m| m.id != machine_id);
        if inner.machines.len() == before {
            return Err(TrainerClientError::from_status("Delete machine", 404, ""));
        }
        Ok(())
    }

    async fn machines_data(&self) -> Result<Vec<MachineSummary>> {
        let body = self.inner.lock().machines_data.clone();
        Ok(parse_machines_data(&body)?)
    }

    async fn set_inference_gateway(&self, name: &str, enable: bool) -> Result<()> {
        self.inner.lock().gateway_calls.push((name.to_string(), enable));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn chunk(index: u64, is_last: bool) -> ChunkUpload {
        ChunkUpload {
            target: MachineRef::Id("7".into()),
            filename: "data.csv".into(),
            content_type: "text/csv".into(),
            chunk_index: index,
            is_last,
            upload_id: None,
            data: Bytes::from_static(b"a,b\n1,2\n"),
        }
    }

    #[tokio::test]
    async fn tracking_id_only_on_last_chunk() {
        let api = MemoryTrainerApi::new();
        api.set_model_id(Some("model-9"));

        let first = api.upload_chunk(chunk(0, false)).await.unwrap();
        assert_eq!(first.upload_id.as_deref(), Some("upload-1"));
        assert_eq!(first.tracking_id, None);

        let last = api.upload_chunk(chunk(1, true)).await.unwrap();
        assert_eq!(last.tracking_id.as_deref(), Some("track-1"));
        assert_eq!(last.model_id.as_deref(), Some("model-9"));
        assert_eq!(api.chunks().len(), 2);
    }

    #[tokio::test]
    async fn rejected_chunk_carries_server_message() {
        let api = MemoryTrainerApi::new();
        api.reject_chunk(1, 400, "bad chunk");

        assert!(api.upload_chunk(chunk(0, false)).await.is_ok());
        let err = api.upload_chunk(chunk(1, true)).await.unwrap_err();
        assert_eq!(err.to_string(), "bad chunk");
    }

    #[tokio::test]
    async fn status_script_repeats_last_entry() {
        let api = MemoryTrainerApi::new();
        api.push_status(ScriptedStatus::status("running", Some(10.0)));
        api.push_status(ScriptedStatus::Unreachable("reset".into()));

        assert_eq!(api.training_status("t").await.unwrap().progress, Some(10.0));
        assert!(api.training_status("t").await.unwrap_err().is_transport());
        assert!(api.training_status("t").await.unwrap_err().is_transport());
        assert_eq!(api.status_calls(), vec!["t", "t", "t"]);
    }

    #[tokio::test]
    async fn machine_registry_round_trip() {
        let api = MemoryTrainerApi::new().with_machine("m-0", "Atlas-01");
        let created = api
            .create_machine(&NewMachine {
                name: "Helix-07".into(),
                image_url: None,
            })
            .await
            .unwrap();
        assert_eq!(created.id, "m-1");

        let dup = api
            .create_machine(&NewMachine {
                name: "Helix-07".into(),
                image_url: None,
            })
            .await
            .unwrap_err();
        assert_eq!(dup.status(), Some(409));

        api.delete_machine("m-0").await.unwrap();
        assert_eq!(api.list_machines().await.unwrap().len(), 1);
        assert_eq!(api.delete_machine("m-0").await.unwrap_err().to_string(), "Delete machine failed (404)");
    }
}
