//! Datasource metadata routes
//!
//! The dashboard protocol probes `/` to test the connection and may ask
//! for annotations and ad-hoc filter tag keys/values. Hearth serves none
//! of those, so they answer with empty bodies rather than 404s.

use axum::Json;
use serde_json::{json, Value};

/// GET /
///
/// Connection probe; a 200 means the datasource is up.
pub async fn root() -> Json<Value> {
    Json(json!({}))
}

/// POST /annotations
pub async fn annotations() -> Json<Vec<Value>> {
    Json(Vec::new())
}

/// POST /tag-keys
pub async fn tag_keys() -> Json<Vec<Value>> {
    Json(Vec::new())
}

/// POST /tag-values
pub async fn tag_values() -> Json<Vec<Value>> {
    Json(Vec::new())
}
