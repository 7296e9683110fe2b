// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway.
//!
//! Handles POST /v1/chat/send and GET /health.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use rolechat_agent::TurnRequest;
use rolechat_core::{ConversationId, HealthStatus};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::server::GatewayState;
use crate::sse;

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// User id assumed when the header is absent or unparsable.
pub const DEFAULT_USER_ID: i64 = 1;

/// Request body for POST /v1/chat/send.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    /// Existing conversation, or 0 to start a new one.
    #[serde(default)]
    pub conversation_id: i64,
    /// Character to talk to. Only consulted when starting a conversation.
    #[serde(default)]
    pub character_id: i64,
    pub content: String,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`.
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    /// Turns currently running.
    pub active_turns: usize,
}

fn user_id(headers: &HeaderMap) -> i64 {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(DEFAULT_USER_ID)
}

/// POST /v1/chat/send
///
/// Starts a turn and streams its events back as SSE. Every failure after
/// the body parses arrives in-band as an `error` frame.
pub async fn post_chat_send(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(body): Json<SendRequest>,
) -> Response {
    let request = TurnRequest {
        request_id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id(&headers),
        conversation_id: ConversationId(body.conversation_id),
        character_id: body.character_id,
        content: body.content,
    };
    debug!(
        request_id = %request.request_id,
        conversation_id = body.conversation_id,
        "chat send accepted"
    );

    // The turn task owns its own outcome; the stream is all the client sees.
    let (events, _task) = state.orchestrator.start_turn(request).into_parts();
    sse::stream_turn(events).into_response()
}

/// GET /health
///
/// Reports `degraded` with 503 when storage is unreachable.
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let storage_ok = match state.orchestrator.storage().health_check().await {
        Ok(HealthStatus::Healthy) => true,
        Ok(status) => {
            warn!(?status, "storage health check not healthy");
            false
        }
        Err(e) => {
            warn!(error = %e, "storage health check failed");
            false
        }
    };

    let (code, status) = if storage_ok {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        active_turns: state.orchestrator.in_flight(),
    };
    (code, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn send_request_deserializes_camel_case() {
        let json = r#"{"conversationId": 12, "characterId": 7, "content": "Hello"}"#;
        let req: SendRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.conversation_id, 12);
        assert_eq!(req.character_id, 7);
        assert_eq!(req.content, "Hello");
    }

    #[test]
    fn send_request_ids_default_to_zero() {
        let req: SendRequest = serde_json::from_str(r#"{"content": "hi"}"#).unwrap();
        assert_eq!(req.conversation_id, 0);
        assert_eq!(req.character_id, 0);
    }

    #[test]
    fn send_request_requires_content() {
        let err = serde_json::from_str::<SendRequest>(r#"{"conversationId": 1}"#);
        assert!(err.is_err());
    }

    #[test]
    fn user_id_from_header_or_default() {
        let mut headers = HeaderMap::new();
        assert_eq!(user_id(&headers), DEFAULT_USER_ID);

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("42"));
        assert_eq!(user_id(&headers), 42);

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("not-a-number"));
        assert_eq!(user_id(&headers), DEFAULT_USER_ID);
    }

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse {
            status: "healthy".to_string(),
            version: "0.1.0".to_string(),
            uptime_secs: 42,
            active_turns: 2,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(json.contains("\"version\":\"0.1.0\""));
        assert!(json.contains("\"uptime_secs\":42"));
        assert!(json.contains("\"active_turns\":2"));
    }
}
