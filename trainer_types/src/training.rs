use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::lenient::{opt_string_or_number, value_message};

/// Response of `POST /api/model-train/chunk`.
///
/// `trackingId` (and possibly `modelId`) are only present once the final chunk is accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkUploadResponse {
    #[serde(default, deserialize_with = "opt_string_or_number", skip_serializing_if = "Option::is_none")]
    pub upload_id: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number", skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number", skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

/// Response of `POST /api/model-train/start`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTrainingResponse {
    #[serde(default, deserialize_with = "opt_string_or_number", skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number", skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

/// Server-reported state of a training job.
///
/// Anything that is not `completed` or `failed` is treated as still in progress.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrainingStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Other(String),
}

impl TrainingStatus {
    pub fn from_server(status: &str) -> Self {
        match status.trim() {
            "pending" => Self::Pending,
            "running" => Self::Running,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Other(s) => s.as_str(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl Display for TrainingStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response of `GET /api/model-train/status/{trackingId}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingStatusResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Usually a string, but some services report a structured error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(default, deserialize_with = "opt_string_or_number", skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number", skip_serializing_if = "Option::is_none")]
    pub trained_model_id: Option<String>,
}

impl TrainingStatusResponse {
    /// A missing or empty status reads as "unknown", which keeps the job in progress.
    pub fn training_status(&self) -> TrainingStatus {
        match self.status.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => TrainingStatus::from_server(s),
            _ => TrainingStatus::Other("unknown".to_string()),
        }
    }

    /// Reported progress rounded and clamped to 0..=100.
    pub fn progress_percent(&self) -> Option<u8> {
        let p = self.progress.filter(|p| p.is_finite())?;
        Some(p.round().clamp(0.0, 100.0) as u8)
    }

    /// The failure message, if the server sent a non-empty one.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().and_then(value_message)
    }

    pub fn resolved_model_id(&self) -> Option<&str> {
        self.model_id
            .as_deref()
            .or(self.trained_model_id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

/// Body of `POST /api/model-inference`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceRequest {
    pub model_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub payload: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn status_strings_map_to_variants() {
        assert_eq!(TrainingStatus::from_server("completed"), TrainingStatus::Completed);
        assert_eq!(TrainingStatus::from_server("failed"), TrainingStatus::Failed);
        assert_eq!(TrainingStatus::from_server("queued"), TrainingStatus::Other("queued".into()));
        assert!(TrainingStatus::Completed.is_terminal());
        assert!(!TrainingStatus::Running.is_terminal());
        assert!(!TrainingStatus::Other("queued".into()).is_terminal());
    }

    #[test]
    fn status_response_defaults() {
        let resp: TrainingStatusResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(resp.training_status(), TrainingStatus::Other("unknown".into()));
        assert_eq!(resp.progress_percent(), None);
        assert_eq!(resp.resolved_model_id(), None);
    }

    #[test]
    fn status_response_fields() {
        let resp: TrainingStatusResponse = serde_json::from_value(json!({
            "status": "running",
            "progress": 55.4,
            "trainedModelId": "m-7",
        }))
        .unwrap();
        assert_eq!(resp.training_status(), TrainingStatus::Running);
        assert_eq!(resp.progress_percent(), Some(55));
        assert_eq!(resp.resolved_model_id(), Some("m-7"));

        let over: TrainingStatusResponse = serde_json::from_value(json!({"progress": 140})).unwrap();
        assert_eq!(over.progress_percent(), Some(100));
    }

    #[test]
    fn zero_progress_is_reported() {
        let resp: TrainingStatusResponse = serde_json::from_value(json!({"status": "running", "progress": 0})).unwrap();
        assert_eq!(resp.progress_percent(), Some(0));
    }

    #[test]
    fn numeric_ids_are_accepted() {
        let resp: TrainingStatusResponse = serde_json::from_value(json!({"status": "completed", "modelId": 7})).unwrap();
        assert_eq!(resp.resolved_model_id(), Some("7"));

        let resp: TrainingStatusResponse = serde_json::from_value(json!({"trainedModelId": 8})).unwrap();
        assert_eq!(resp.resolved_model_id(), Some("8"));

        let chunk: ChunkUploadResponse = serde_json::from_value(json!({"uploadId": 12345})).unwrap();
        assert_eq!(chunk.upload_id.as_deref(), Some("12345"));

        let last: ChunkUploadResponse =
            serde_json::from_value(json!({"uploadId": "u-1", "trackingId": 99, "modelId": 5})).unwrap();
        assert_eq!(last.tracking_id.as_deref(), Some("99"));
        assert_eq!(last.model_id.as_deref(), Some("5"));

        let start: StartTrainingResponse = serde_json::from_value(json!({"trackingId": 100})).unwrap();
        assert_eq!(start.tracking_id.as_deref(), Some("100"));
    }

    #[test]
    fn structured_errors_become_messages() {
        let resp: TrainingStatusResponse =
            serde_json::from_value(json!({"status": "failed", "error": {"msg": "bad csv"}})).unwrap();
        assert_eq!(resp.error_message().as_deref(), Some("bad csv"));

        let resp: TrainingStatusResponse = serde_json::from_value(json!({"status": "failed", "error": " oom "})).unwrap();
        assert_eq!(resp.error_message().as_deref(), Some("oom"));

        let resp: TrainingStatusResponse = serde_json::from_value(json!({"status": "failed", "error": ""})).unwrap();
        assert_eq!(resp.error_message(), None);
    }

    #[test]
    fn inference_request_uses_camel_case() {
        let req = InferenceRequest {
            model_id: "m-1".into(),
            machine_id: Some("42".into()),
            name: None,
            payload: "1,2,3".into(),
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"modelId": "m-1", "machineId": "42", "payload": "1,2,3"})
        );
    }
}
