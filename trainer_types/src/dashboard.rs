use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// One machine as shown on the dashboard, normalized from `/api/machines-data/all`.
///
/// The machines-data service has shipped several field spellings over time, so the summary
/// is assembled from whichever of them is present rather than derived with serde.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineSummary {
    pub name: String,
    pub status: String,
    pub last_inference_results: Option<Vec<f64>>,
    pub training_progress: Option<f64>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MachinesDataError {
    #[error("Invalid machines response format.")]
    InvalidFormat,
}

impl MachineSummary {
    /// Builds a summary from one raw item; items without a usable name are dropped.
    pub fn from_value(item: &Value) -> Option<Self> {
        let obj = item.as_object()?;

        let name = first_non_empty_str(obj, &["name", "machine_name", "machineName"])?;
        let status = first_non_empty_str(obj, &["status", "state"]).unwrap_or_else(|| "unknown".to_string());

        let last_inference_results = first_present(obj, &["last_inference_results", "lastInferenceResults", "lastInference"])
            .and_then(normalize_results);

        let training_progress = first_present(obj, &["training_progress", "trainingProgress", "progress", "training"])
            .and_then(Value::as_f64)
            .filter(|p| p.is_finite())
            .map(|p| p.clamp(0.0, 100.0));

        Some(Self {
            name,
            status,
            last_inference_results,
            training_progress,
        })
    }

    pub fn is_training(&self) -> bool {
        self.status.to_ascii_lowercase().contains("training")
    }
}

/// Parses the whole `/api/machines-data/all` body: a bare list or `{"machines": [...]}`.
pub fn parse_machines_data(body: &Value) -> Result<Vec<MachineSummary>, MachinesDataError> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(obj) => obj
            .get("machines")
            .and_then(Value::as_array)
            .ok_or(MachinesDataError::InvalidFormat)?,
        _ => return Err(MachinesDataError::InvalidFormat),
    };

    Ok(items.iter().filter_map(MachineSummary::from_value).collect())
}

fn first_non_empty_str(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

// Null counts as absent so that a later alias can still supply the value.
fn first_present<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| obj.get(*k)).find(|v| !v.is_null())
}

fn normalize_results(value: &Value) -> Option<Vec<f64>> {
    match value {
        Value::Array(items) => {
            let numbers: Vec<f64> = items.iter().filter_map(Value::as_f64).collect();
            (!numbers.is_empty()).then_some(numbers)
        },
        Value::Number(n) => n.as_f64().map(|n| vec![n]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn normalizes_aliases() {
        let summary = MachineSummary::from_value(&json!({
            "machine_name": "  Helix-07 ",
            "state": "inference on",
            "lastInferenceResults": [120, "n/a", 98.5],
            "trainingProgress": 180,
        }))
        .unwrap();

        assert_eq!(summary.name, "Helix-07");
        assert_eq!(summary.status, "inference on");
        assert_eq!(summary.last_inference_results, Some(vec![120.0, 98.5]));
        assert_eq!(summary.training_progress, Some(100.0));
        assert!(!summary.is_training());
    }

    #[test]
    fn defaults_and_single_values() {
        let summary = MachineSummary::from_value(&json!({
            "name": "Atlas-01",
            "lastInference": 36,
            "progress": -4,
        }))
        .unwrap();

        assert_eq!(summary.status, "unknown");
        assert_eq!(summary.last_inference_results, Some(vec![36.0]));
        assert_eq!(summary.training_progress, Some(0.0));
    }

    #[test]
    fn drops_nameless_items_and_empty_series() {
        assert!(MachineSummary::from_value(&json!({"name": "   "})).is_none());
        assert!(MachineSummary::from_value(&json!("Atlas")).is_none());

        let summary = MachineSummary::from_value(&json!({"name": "A", "last_inference_results": ["x"]})).unwrap();
        assert_eq!(summary.last_inference_results, None);
    }

    #[test]
    fn parses_both_body_shapes() {
        let wrapped = json!({"machines": [{"name": "A", "status": "training"}, {"status": "orphan"}]});
        let parsed = parse_machines_data(&wrapped).unwrap();
        assert_eq!(parsed.len(), 1);
        assert!(parsed[0].is_training());

        let bare = json!([{"name": "B"}]);
        assert_eq!(parse_machines_data(&bare).unwrap()[0].name, "B");

        assert_eq!(parse_machines_data(&json!({"items": []})), Err(MachinesDataError::InvalidFormat));
        assert_eq!(parse_machines_data(&json!(3)), Err(MachinesDataError::InvalidFormat));
    }
}
