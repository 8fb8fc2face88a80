use serde::Deserialize;

use crate::lenient::value_message;

/// The JSON error shape returned by the backend services (`{"detail": ...}` from the
/// python services, `{"message": ...}` from the gateway).
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<serde_json::Value>,
}

impl ErrorBody {
    /// The first non-empty message field, if any.
    pub fn message(&self) -> Option<String> {
        [&self.detail, &self.message]
            .into_iter()
            .flatten()
            .find_map(|v| match v {
                serde_json::Value::Object(_) => Some(v.to_string()),
                _ => value_message(v),
            })
    }

    /// Extract a user-facing message from a raw error response body: the JSON `detail` or
    /// `message` field when present, otherwise the trimmed body text, otherwise `None`.
    pub fn extract(body: &str) -> Option<String> {
        if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body)
            && let Some(message) = parsed.message()
        {
            return Some(message);
        }

        let trimmed = body.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_detail_then_message_then_text() {
        assert_eq!(ErrorBody::extract(r#"{"detail": "bad csv"}"#).as_deref(), Some("bad csv"));
        assert_eq!(ErrorBody::extract(r#"{"message": "no such machine"}"#).as_deref(), Some("no such machine"));
        assert_eq!(ErrorBody::extract(r#"{"detail": "", "message": "fallback"}"#).as_deref(), Some("fallback"));
        assert_eq!(ErrorBody::extract("  gateway exploded \n").as_deref(), Some("gateway exploded"));
    }

    #[test]
    fn json_without_known_fields_is_shown_verbatim() {
        assert_eq!(ErrorBody::extract(r#"{"error": "x"}"#).as_deref(), Some(r#"{"error": "x"}"#));
    }

    #[test]
    fn structured_detail_is_serialized() {
        let body = r#"{"detail": [{"loc": ["body", "name"], "msg": "field required"}]}"#;
        let message = ErrorBody::extract(body).unwrap();
        assert!(message.contains("field required"));
    }

    #[test]
    fn empty_body_has_no_message() {
        assert_eq!(ErrorBody::extract(""), None);
        assert_eq!(ErrorBody::extract("   "), None);
    }
}
