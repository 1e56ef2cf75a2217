use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use tracing::warn;

use crate::api_state::ApiState;

const PROBE_KEY: &str = "readiness-probe";

/// Readiness probe: 200 once the catalog and the blob store both answer, else 503.
pub async fn ready(State(state): State<ApiState>) -> impl IntoResponse {
    let timeout = state.config.lookup_timeout();

    let db_ok = match tokio::time::timeout(timeout, state.db.client.query("RETURN true")).await {
        Ok(Ok(_)) => true,
        Ok(Err(err)) => {
            warn!(error = %err, "catalog readiness check failed");
            false
        }
        Err(_) => {
            warn!(?timeout, "catalog readiness check timed out");
            false
        }
    };

    // A missing probe object still proves the store is reachable.
    let storage_ok = match tokio::time::timeout(timeout, state.storage.exists(PROBE_KEY)).await {
        Ok(Ok(_)) => true,
        Ok(Err(err)) => {
            warn!(error = %err, "blob store readiness check failed");
            false
        }
        Err(_) => {
            warn!(?timeout, "blob store readiness check timed out");
            false
        }
    };

    let check = |ok: bool| if ok { "ok" } else { "fail" };
    let status = if db_ok && storage_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if status == StatusCode::OK { "ok" } else { "error" },
            "checks": { "db": check(db_ok), "storage": check(storage_ok) }
        })),
    )
}
