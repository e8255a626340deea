use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct HealthState {
    pub service_name: String,
}

pub async fn health_check(State(state): State<HealthState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": state.service_name,
        "version": env!("CARGO_PKG_VERSION")
    }))
}
