use crate::api::openapi::api_document;
use crate::core::error::Result;
use axum::Json;
use openapiv3::OpenAPI;
use serde_json::{json, Value};

/// Handler for GET /health
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
        "timestamp": chrono::Utc::now().timestamp(),
    }))
}

/// Handler for GET /swagger/doc.json
pub async fn swagger_doc() -> Result<Json<OpenAPI>> {
    Ok(Json(api_document()?))
}
