//! Maps `gateway_core::GatewayError` onto HTTP status codes and a JSON
//! error body. The core crate stays edge-framework-agnostic; this is the
//! one place that knows about `axum`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gateway_core::GatewayError;
use serde_json::json;

pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            GatewayError::ModelNotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::Configuration(_) => StatusCode::BAD_REQUEST,
            GatewayError::Cancelled => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::ToolNotImplemented { .. }
            | GatewayError::StrictPassthroughUnsupported { .. }
            | GatewayError::StreamingNotSupported { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            GatewayError::NoUpstreamAvailable(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Transport { .. } | GatewayError::Protocol { .. } | GatewayError::ScriptAdapter { .. } => {
                StatusCode::BAD_GATEWAY
            }
            GatewayError::HookAborted { .. } => StatusCode::FORBIDDEN,
            GatewayError::Serialization(_) | GatewayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": {
                "message": self.0.message(),
                "type": error_type(&self.0),
            }
        }));

        (status, body).into_response()
    }
}

fn error_type(err: &GatewayError) -> &'static str {
    match err {
        GatewayError::ModelNotFound { .. } => "model_not_found",
        GatewayError::Transport { .. } => "transport_error",
        GatewayError::Protocol { .. } => "protocol_error",
        GatewayError::ToolNotImplemented { .. } => "tool_not_implemented",
        GatewayError::StrictPassthroughUnsupported { .. } => "strict_passthrough_unsupported",
        GatewayError::Cancelled => "cancelled",
        GatewayError::StreamingNotSupported { .. } => "streaming_not_supported",
        GatewayError::NoUpstreamAvailable(_) => "no_upstream_available",
        GatewayError::HookAborted { .. } => "hook_aborted",
        GatewayError::ScriptAdapter { .. } => "script_adapter_error",
        GatewayError::Configuration(_) => "configuration_error",
        GatewayError::Serialization(_) => "serialization_error",
        GatewayError::Io(_) => "io_error",
    }
}
