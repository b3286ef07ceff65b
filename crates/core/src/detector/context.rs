use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Caller-supplied request metadata. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Context {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub request_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub source: Option<String>,
    pub additional_data: Map<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_data(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.additional_data.insert(key.to_string(), value.into());
        self
    }

    /// Request count reported by an upstream rate counter, if any.
    pub fn request_count(&self) -> Option<f64> {
        self.additional_data
            .get("requestCount")
            .or_else(|| self.additional_data.get("request_count"))
            .and_then(Value::as_f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_count_accepts_both_spellings() {
        assert_eq!(Context::new().with_data("requestCount", 5).request_count(), Some(5.0));
        assert_eq!(Context::new().with_data("request_count", 7).request_count(), Some(7.0));
        assert_eq!(Context::new().with_data("requestCount", "x").request_count(), None);
        assert_eq!(Context::new().request_count(), None);
    }

    #[test]
    fn test_deserialize_partial_context() {
        let ctx: Context = serde_json::from_str(r#"{"user_id": "u1"}"#).unwrap();
        assert_eq!(ctx.user_id.as_deref(), Some("u1"));
        assert!(ctx.additional_data.is_empty());
    }
}
