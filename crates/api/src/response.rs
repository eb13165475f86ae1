//! Success envelope: `{"success": true, "message"?: ..., <key>: ...}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug)]
pub struct Envelope {
    status: StatusCode,
    body: Map<String, Value>,
}

impl Envelope {
    fn with_status(status: StatusCode) -> Self {
        let mut body = Map::new();
        body.insert("success".into(), Value::Bool(true));
        Self { status, body }
    }

    /// 200 OK.
    pub fn ok() -> Self {
        Self::with_status(StatusCode::OK)
    }

    /// 201 Created.
    pub fn created() -> Self {
        Self::with_status(StatusCode::CREATED)
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.body.insert("message".into(), Value::String(message.into()));
        self
    }

    /// Adds `key: value` to the body.
    pub fn with<T: Serialize>(mut self, key: &str, value: T) -> Self {
        let value = serde_json::to_value(value).unwrap_or_else(|e| {
            tracing::error!(key, error = %e, "Failed to serialize response field");
            Value::Null
        });
        self.body.insert(key.to_string(), value);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (self.status, Json(Value::Object(self.body))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body(envelope: Envelope) -> Value {
        let response = envelope.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_ok_envelope() {
        let json = body(Envelope::ok().with("available_slots", vec!["09:00", "09:30"])).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["available_slots"][1], "09:30");
        assert!(json.get("message").is_none());
    }

    #[tokio::test]
    async fn test_created_with_message() {
        let envelope = Envelope::created()
            .message("Appointment created")
            .with("new_stock", 70);
        assert_eq!(envelope.status(), StatusCode::CREATED);

        let json = body(envelope).await;
        assert_eq!(json["message"], "Appointment created");
        assert_eq!(json["new_stock"], 70);
    }
}
