//! The JSON envelope shared by every endpoint.
//!
//! Success: `{"success": true, "message": "...", "data": ...}`.
//! Failure: `{"success": false, "message": "..."}` with a 4xx/5xx status.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Success without a payload.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_omits_data() {
        let json = serde_json::to_value(ApiResponse::error("Data tidak ditemukan")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "message": "Data tidak ditemukan"})
        );
    }

    #[test]
    fn success_envelope_carries_data() {
        let json = serde_json::to_value(ApiResponse::success("ok", vec![1, 2])).unwrap();
        assert_eq!(json["data"], serde_json::json!([1, 2]));
        assert_eq!(json["success"], serde_json::json!(true));
    }
}
