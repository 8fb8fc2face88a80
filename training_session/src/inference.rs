use serde_json::Value;
use tracing::info;
use trainer_client::TrainerApi;
use trainer_types::{InferenceRequest, MachineRef};

use crate::errors::{Result, TrainingSessionError};

/// Runs one inference call against `model_id` for the given machine.
///
/// Fails with [`TrainingSessionError::NoModelAvailable`] before any request when there is no model.
pub async fn invoke_inference(
    api: &dyn TrainerApi,
    target: &MachineRef,
    model_id: Option<&str>,
    payload: &str,
) -> Result<Value> {
    let model_id = model_id
        .filter(|m| !m.trim().is_empty())
        .ok_or(TrainingSessionError::NoModelAvailable)?;

    let (machine_id, name) = match target {
        MachineRef::Id(id) => (Some(id.clone()), None),
        MachineRef::Name(name) => (None, Some(name.clone())),
    };
    let request = InferenceRequest {
        model_id: model_id.to_string(),
        machine_id,
        name,
        payload: payload.to_string(),
    };

    info!(model_id, %target, "running inference");
    api.run_inference(&request)
        .await
        .map_err(|e| TrainingSessionError::InferenceFailed(e.to_string()))
}
