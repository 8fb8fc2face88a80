use serde_json::Value;
use trainer_types::TrainingStatus;

use crate::poller::PollEvent;
use crate::source::SourceFile;

pub const MSG_UPLOADING: &str = "Uploading...";
pub const MSG_TRAINING_STARTED: &str = "Training started...";
pub const MSG_UPLOAD_COMPLETE: &str = "Upload complete. Waiting for training...";
pub const MSG_TRAINING_FAILED: &str = "Training failed";
pub const MSG_POLLING_ERROR: &str = "Error polling status";
pub const MSG_POLLING_CANCELLED: &str = "Status polling stopped";

/// Where the status-polling state machine of a machine stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PollState {
    #[default]
    Idle,
    Polling,
    Completed,
    Failed,
    /// A status request failed; polling must be restarted explicitly.
    Halted,
    Cancelled,
}

/// Everything known about one machine's upload, training job and inference.
#[derive(Debug, Clone, Default)]
pub struct MachineState {
    pub file: Option<SourceFile>,
    pub file_error: Option<String>,
    pub uploading: bool,
    pub progress: u8,
    pub upload_id: Option<String>,
    pub tracking_id: Option<String>,
    pub training_status: Option<TrainingStatus>,
    pub poll_state: PollState,
    pub status_message: String,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub inference_input: String,
    pub inference_result: Option<Value>,
    pub inference_error: Option<String>,
    pub running_inference: bool,
    pub model_id: Option<String>,
    pub deleting: bool,
}

/// Everything that can happen to a [`MachineState`].
#[derive(Debug, Clone)]
pub enum StateEvent {
    /// The registry reported a model for the machine.
    Seeded { model_id: String, status: Option<String> },
    FileCleared,
    FileRejected { message: String },
    FileSelected(SourceFile),
    FileMissing,
    UploadStarted,
    UploadProgress(u8),
    TrainingStarted { tracking_id: String, model_id: Option<String> },
    UploadFinished { upload_id: Option<String> },
    UploadFailed { message: String },
    PollingStarted { tracking_id: String },
    Poll(PollEvent),
    PollingCancelled,
    InferenceInputChanged(String),
    InferenceStarted,
    InferenceSucceeded(Value),
    InferenceFailed(String),
    DeleteStarted,
    DeleteFinished,
}

/// A reported progress of zero still updates the bar but is left out of the text.
fn status_message(status: &TrainingStatus, progress: Option<u8>) -> String {
    match progress {
        Some(p) if p > 0 => format!("Status: {status} ({p}%)"),
        _ => format!("Status: {status}"),
    }
}

impl MachineState {
    /// A fresh state, seeded with the model the registry reports for the machine.
    pub fn seeded(model_id: Option<&str>, status: Option<&str>) -> Self {
        let mut state = Self::default();
        if let Some(model_id) = model_id.filter(|m| !m.is_empty()) {
            state.apply(StateEvent::Seeded {
                model_id: model_id.to_string(),
                status: status.map(str::to_string),
            });
        }
        state
    }

    pub fn reduce(mut self, event: StateEvent) -> Self {
        self.apply(event);
        self
    }

    pub fn apply(&mut self, event: StateEvent) {
        match event {
            StateEvent::Seeded { model_id, status } => {
                self.model_id = Some(model_id);
                let status = status.filter(|s| !s.trim().is_empty());
                self.training_status = Some(TrainingStatus::from_server(status.as_deref().unwrap_or("completed")));
            },
            StateEvent::FileCleared => {
                self.file = None;
                self.file_error = None;
            },
            StateEvent::FileRejected { message } => {
                self.file = None;
                self.file_error = Some(message);
            },
            StateEvent::FileSelected(file) => {
                self.file = Some(file);
                self.file_error = None;
                self.progress = 0;
                self.error = None;
                self.result = None;
                self.status_message.clear();
                self.inference_result = None;
                self.inference_error = None;
                self.upload_id = None;
            },
            StateEvent::FileMissing => {
                self.file_error = Some("Select a CSV file first.".to_string());
            },
            StateEvent::UploadStarted => {
                self.uploading = true;
                self.progress = 0;
                self.status_message = MSG_UPLOADING.to_string();
                self.error = None;
            },
            StateEvent::UploadProgress(p) => {
                self.progress = p.min(100);
            },
            StateEvent::TrainingStarted { tracking_id, model_id } => {
                self.tracking_id = Some(tracking_id);
                self.training_status = Some(TrainingStatus::Running);
                self.status_message = MSG_TRAINING_STARTED.to_string();
                if model_id.is_some() {
                    self.model_id = model_id;
                }
            },
            StateEvent::UploadFinished { upload_id } => {
                self.uploading = false;
                self.upload_id = upload_id;
                self.status_message = MSG_UPLOAD_COMPLETE.to_string();
            },
            StateEvent::UploadFailed { message } => {
                self.uploading = false;
                self.error = Some(message);
                self.status_message.clear();
            },
            StateEvent::PollingStarted { tracking_id } => {
                self.tracking_id = Some(tracking_id);
                self.poll_state = PollState::Polling;
            },
            StateEvent::Poll(event) => self.apply_poll(event),
            StateEvent::PollingCancelled => {
                if self.poll_state == PollState::Polling {
                    self.poll_state = PollState::Cancelled;
                    self.status_message = MSG_POLLING_CANCELLED.to_string();
                }
            },
            StateEvent::InferenceInputChanged(input) => {
                self.inference_input = input;
                self.inference_error = None;
                self.inference_result = None;
            },
            StateEvent::InferenceStarted => {
                self.running_inference = true;
                self.inference_error = None;
                self.inference_result = None;
            },
            StateEvent::InferenceSucceeded(result) => {
                self.running_inference = false;
                self.inference_result = Some(result);
            },
            StateEvent::InferenceFailed(message) => {
                self.running_inference = false;
                self.inference_error = Some(message);
            },
            StateEvent::DeleteStarted => self.deleting = true,
            StateEvent::DeleteFinished => self.deleting = false,
        }
    }

    fn apply_poll(&mut self, event: PollEvent) {
        match event {
            PollEvent::Progress { status, progress } => {
                self.status_message = status_message(&status, progress);
                if let Some(p) = progress {
                    self.progress = p;
                }
                self.training_status = Some(status);
                self.poll_state = PollState::Polling;
            },
            PollEvent::Completed {
                result,
                model_id,
                progress,
            } => {
                self.status_message = status_message(&TrainingStatus::Completed, progress);
                self.training_status = Some(TrainingStatus::Completed);
                self.result = Some(result);
                if model_id.is_some() {
                    self.model_id = model_id;
                }
                self.progress = 100;
                self.poll_state = PollState::Completed;
            },
            PollEvent::Failed { error } => {
                self.training_status = Some(TrainingStatus::Failed);
                self.status_message = MSG_TRAINING_FAILED.to_string();
                self.error = Some(error);
                self.poll_state = PollState::Failed;
            },
            PollEvent::Halted { error } => {
                self.status_message = MSG_POLLING_ERROR.to_string();
                self.error = Some(error);
                self.poll_state = PollState::Halted;
            },
        }
    }

    pub fn is_polling(&self) -> bool {
        self.poll_state == PollState::Polling
    }
}
