use serde::{Deserialize, Serialize};

use crate::lenient::{opt_string_or_number, string_or_number};

/// A machine registered through `/api/models`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number", skip_serializing_if = "Option::is_none")]
    pub latest_model_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_model_status: Option<String>,
}

/// `GET /api/models` returns either a bare list or `{"machines": [...]}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MachineListResponse {
    Wrapped { machines: Vec<Machine> },
    Bare(Vec<Machine>),
}

impl MachineListResponse {
    pub fn into_machines(self) -> Vec<Machine> {
        match self {
            Self::Wrapped { machines } | Self::Bare(machines) => machines,
        }
    }
}

/// Body of `POST /api/models`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMachine {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// `POST /api/models` answers with either `{"machine": {...}}` or the machine itself.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NewMachineResponse {
    Wrapped { machine: Machine },
    Bare(Machine),
}

impl NewMachineResponse {
    pub fn into_machine(self) -> Machine {
        match self {
            Self::Wrapped { machine } | Self::Bare(machine) => machine,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn list_accepts_both_shapes() {
        let wrapped: MachineListResponse =
            serde_json::from_value(json!({"machines": [{"id": 1, "name": "Atlas-01"}]})).unwrap();
        let bare: MachineListResponse = serde_json::from_value(json!([
            {"id": "7", "name": "Helix-07", "latestModelId": "m-3", "latestModelStatus": "running"}
        ]))
        .unwrap();

        let wrapped = wrapped.into_machines();
        assert_eq!(wrapped[0].id, "1");
        assert_eq!(wrapped[0].name, "Atlas-01");

        let bare = bare.into_machines();
        assert_eq!(bare[0].latest_model_id.as_deref(), Some("m-3"));
        assert_eq!(bare[0].latest_model_status.as_deref(), Some("running"));
    }

    #[test]
    fn numeric_model_ids_are_accepted() {
        let machine: Machine = serde_json::from_value(json!({"id": 1, "name": "a", "latestModelId": 3})).unwrap();
        assert_eq!(machine.id, "1");
        assert_eq!(machine.latest_model_id.as_deref(), Some("3"));

        let machine: Machine = serde_json::from_value(json!({"id": 2, "name": "b", "latestModelId": null})).unwrap();
        assert_eq!(machine.latest_model_id, None);
    }

    #[test]
    fn new_machine_skips_missing_image() {
        let body = NewMachine {
            name: "Kestrel-03".into(),
            image_url: None,
        };
        assert_eq!(serde_json::to_value(&body).unwrap(), json!({"name": "Kestrel-03"}));
    }

    #[test]
    fn created_machine_accepts_both_shapes() {
        let wrapped: NewMachineResponse =
            serde_json::from_value(json!({"machine": {"id": 3, "name": "A", "imageUrl": "http://x/y.png"}})).unwrap();
        let bare: NewMachineResponse = serde_json::from_value(json!({"id": 4, "name": "B"})).unwrap();
        assert_eq!(wrapped.into_machine().image_url.as_deref(), Some("http://x/y.png"));
        assert_eq!(bare.into_machine().id, "4");
    }
}
