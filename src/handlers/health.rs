use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use whatsapp_oficial_gateway::utils::logging::*;
use whatsapp_oficial_gateway::AppState;

pub async fn health_check() -> Json<Value> {
    log_health_check();

    Json(json!({
        "status": "healthy",
        "service": "whatsapp-oficial-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn ready_check(State(state): State<Arc<AppState>>) -> Result<Json<Value>, StatusCode> {
    log_integration_status_check();

    // O armazenamento efêmero é a única dependência dura do pipeline
    let redis_status = if state.redis.ping().await {
        "connected"
    } else {
        "disconnected"
    };

    let overall_ready = redis_status == "connected";

    let response = json!({
        "ready": overall_ready,
        "service": "whatsapp-oficial-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "dependencies": {
            "redis": {
                "status": redis_status
            },
            "backend": {
                "url": state.settings.backend.url
            }
        }
    });

    if overall_ready {
        Ok(Json(response))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

pub async fn status_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    log_integration_status_check();

    let rabbitmq_configured = state.settings.rabbitmq.url.is_some();
    let signature_validation = state.settings.meta.validate_signature;
    let uptime_secs = (chrono::Utc::now() - state.started_at).num_seconds();

    Json(json!({
        "service": "whatsapp-oficial-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_secs,
        "environment": std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string()),
        "integrations": {
            "redis": {
                "connected": state.redis.ping().await
            },
            "rabbitmq": {
                "configured": rabbitmq_configured
            },
            "backend": {
                "url": state.settings.backend.url,
                "ack_timeout_ms": state.settings.backend.ack_timeout_ms
            },
            "meta": {
                "signature_validation": signature_validation
            },
            "tenants": {
                "registry": state.settings.tenants.registry
            }
        }
    }))
}
