//! Deserializers for fields the backend services do not type consistently.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Deserialize)]
#[serde(untagged)]
enum Id {
    Text(String),
    Number(serde_json::Number),
}

impl Id {
    fn into_string(self) -> String {
        match self {
            Id::Text(s) => s,
            Id::Number(n) => n.to_string(),
        }
    }
}

/// Ids are opaque; some services issue them as integers.
pub(crate) fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Id::deserialize(deserializer)?.into_string())
}

pub(crate) fn opt_string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Id>::deserialize(deserializer)?.map(Id::into_string))
}

/// A displayable message from a loosely typed error value.
///
/// Strings are trimmed, objects use their `detail`, `message`, `msg` or `error` string field,
/// anything else is shown as JSON.  Null and blank strings have no message.
pub(crate) fn value_message(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        },
        Value::Object(map) => ["detail", "message", "msg", "error"]
            .iter()
            .filter_map(|k| map.get(*k))
            .find_map(|v| match v {
                Value::String(_) => value_message(v),
                _ => None,
            })
            .or_else(|| Some(value.to_string())),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Deserialize)]
    struct Ids {
        #[serde(deserialize_with = "string_or_number")]
        id: String,
        #[serde(default, deserialize_with = "opt_string_or_number")]
        other: Option<String>,
    }

    #[test]
    fn ids_accept_strings_and_numbers() {
        let ids: Ids = serde_json::from_value(json!({"id": 17, "other": "abc"})).unwrap();
        assert_eq!((ids.id.as_str(), ids.other.as_deref()), ("17", Some("abc")));

        let ids: Ids = serde_json::from_value(json!({"id": "x", "other": 4})).unwrap();
        assert_eq!(ids.other.as_deref(), Some("4"));

        let ids: Ids = serde_json::from_value(json!({"id": "x", "other": null})).unwrap();
        assert_eq!(ids.other, None);
        let ids: Ids = serde_json::from_value(json!({"id": "x"})).unwrap();
        assert_eq!(ids.other, None);

        assert!(serde_json::from_value::<Ids>(json!({"id": [1]})).is_err());
    }

    #[test]
    fn messages_from_loose_values() {
        assert_eq!(value_message(&json!("  bad csv ")).as_deref(), Some("bad csv"));
        assert_eq!(value_message(&json!("   ")), None);
        assert_eq!(value_message(&Value::Null), None);
        assert_eq!(value_message(&json!({"msg": "bad csv"})).as_deref(), Some("bad csv"));
        assert_eq!(value_message(&json!({"code": 3})).as_deref(), Some(r#"{"code":3}"#));
        assert_eq!(value_message(&json!(42)).as_deref(), Some("42"));
    }
}
