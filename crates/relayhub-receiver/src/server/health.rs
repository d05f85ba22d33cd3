//! Liveness endpoint.

use axum::Json;
use serde_json::{Value, json};

/// If this handler runs, the receiver is up and serving HTTP.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "serving",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
