//! Models listing endpoint.

use axum::extract::State;
use axum::response::Json;

use crate::state::AppState;

/// `GET /v1/models` — the canonical model table with capability flags.
pub async fn list_models(State(state): State<AppState>) -> Json<serde_json::Value> {
    let models: Vec<serde_json::Value> = state
        .models
        .list()
        .iter()
        .map(|p| {
            serde_json::json!({
                "id": p.canonical_id,
                "provider": p.provider.as_str(),
                "reasoning_capable": p.reasoning_capable,
                "supports_file_search": p.supports_file_search,
            })
        })
        .collect();

    Json(serde_json::json!({ "models": models }))
}
