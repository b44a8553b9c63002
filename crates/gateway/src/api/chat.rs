//! Chat streaming endpoint.
//!
//! `POST /v1/chat/stream` — validates and normalizes the turn request,
//! then bridges the turn pipeline's event channel onto SSE. Validation
//! and unknown-model failures return a JSON 4xx before any streaming
//! starts; everything after that point arrives as SSE events.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json};
use futures_util::stream::Stream;
use serde::Deserialize;

use pc_domain::error::Error;
use pc_domain::message::{ReasoningEffort, Verbosity};
use pc_providers::GuestCredential;

use crate::runtime::{normalize, run_turn, TurnEvent, TurnInput};
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request shape
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct ChatTurnRequest {
    /// Raw messages in any of the accepted encodings.
    pub messages: Vec<serde_json::Value>,
    pub chat_id: String,
    pub user_id: String,
    #[serde(default)]
    pub is_authenticated: bool,
    /// Model override; falls back to the configured default.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub enable_search: bool,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub reasoning_effort: Option<ReasoningEffort>,
    #[serde(default)]
    pub verbosity: Option<Verbosity>,
    /// Context tag; pairs with `personality` for persona overrides.
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub personality: Option<String>,
}

/// Per-request guest credential headers.
const GUEST_PROVIDER_HEADER: &str = "x-llm-provider";
const GUEST_KEY_HEADER: &str = "x-llm-api-key";

fn guest_credential(headers: &HeaderMap) -> Option<GuestCredential> {
    let provider = headers.get(GUEST_PROVIDER_HEADER)?.to_str().ok()?;
    let key = headers.get(GUEST_KEY_HEADER)?.to_str().ok()?;
    if provider.is_empty() || key.is_empty() {
        return None;
    }
    Some(GuestCredential {
        provider: provider.to_owned(),
        key: key.to_owned(),
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/chat/stream
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn chat_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ChatTurnRequest>,
) -> impl IntoResponse {
    let input = match validate(&state, body, &headers) {
        Ok(input) => input,
        Err((status, message)) => {
            return (status, Json(serde_json::json!({ "error": message }))).into_response();
        }
    };

    let rx = run_turn(state, input);

    Sse::new(make_sse_stream(rx))
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// Everything that can fail with a 4xx happens here, before the SSE
/// response starts.
fn validate(
    state: &AppState,
    body: ChatTurnRequest,
    headers: &HeaderMap,
) -> Result<TurnInput, (StatusCode, String)> {
    if body.chat_id.is_empty() || body.user_id.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "chat_id and user_id must be non-empty".into(),
        ));
    }

    let messages = normalize::normalize(&body.messages).map_err(|e| match e {
        Error::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
        other => (StatusCode::BAD_REQUEST, other.to_string()),
    })?;

    let model = body
        .model
        .unwrap_or_else(|| state.config.llm.default_model.clone());
    if let Err(e) = state.models.resolve(&model) {
        return Err((StatusCode::BAD_REQUEST, e.to_string()));
    }

    Ok(TurnInput {
        chat_id: body.chat_id,
        user_id: body.user_id,
        is_authenticated: body.is_authenticated,
        messages,
        model,
        system_prompt_override: body.system_prompt,
        enable_search: body.enable_search,
        temperature: body.temperature,
        reasoning_effort: body.reasoning_effort,
        verbosity: body.verbosity,
        context_tag: body.context,
        personality_tag: body.personality,
        guest: guest_credential(headers),
    })
}

fn make_sse_stream(
    mut rx: tokio::sync::mpsc::Receiver<TurnEvent>,
) -> impl Stream<Item = Result<Event, std::convert::Infallible>> {
    async_stream::stream! {
        while let Some(event) = rx.recv().await {
            let event_type = match &event {
                TurnEvent::Delta { .. } => "delta",
                TurnEvent::Reasoning { .. } => "reasoning",
                TurnEvent::Final { .. } => "final",
                TurnEvent::UsageEvent { .. } => "usage",
                TurnEvent::Error { .. } => "error",
            };
            let data = serde_json::to_string(&event).unwrap_or_default();
            yield Ok(Event::default().event(event_type).data(data));
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn guest_credential_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(GUEST_PROVIDER_HEADER, HeaderValue::from_static("openai"));
        headers.insert(
            GUEST_KEY_HEADER,
            HeaderValue::from_static("sk-guest-key-123456"),
        );
        let guest = guest_credential(&headers).unwrap();
        assert_eq!(guest.provider, "openai");
        assert_eq!(guest.key, "sk-guest-key-123456");
    }

    #[test]
    fn missing_or_empty_headers_yield_no_credential() {
        assert!(guest_credential(&HeaderMap::new()).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(GUEST_PROVIDER_HEADER, HeaderValue::from_static("openai"));
        headers.insert(GUEST_KEY_HEADER, HeaderValue::from_static(""));
        assert!(guest_credential(&headers).is_none());
    }
}
