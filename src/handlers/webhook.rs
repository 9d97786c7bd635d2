/// Handlers do webhook da Cloud API
///
/// Fluxo:
/// 1. Meta envia GET de verificação na configuração do webhook (handshake)
/// 2. Meta envia POST por entrega de mensagem/status
/// 3. Handler valida assinatura (quando habilitada) e delega ao orquestrador
/// 4. Provider recebe 200 para qualquer entrega aceita, inclusive duplicada

use axum::{
    body::Body,
    extract::{Path, Query, Request, State},
    http::HeaderMap,
    response::Json,
};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use std::sync::Arc;
use tokio::time::Instant;

use whatsapp_oficial_gateway::utils::logging::*;
use whatsapp_oficial_gateway::utils::AppError;
use whatsapp_oficial_gateway::AppState;

/// Query string do handshake de verificação, com os nomes pontuados da Meta.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// `GET /webhook/:tenant_id/:connection_id` — handshake de verificação.
///
/// Responde o challenge em texto puro apenas quando `hub.mode=subscribe` e o
/// token bate com o `verify_token` da conexão.
pub async fn verify_webhook(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, connection_id)): Path<(String, i64)>,
    Query(params): Query<VerifyParams>,
) -> Result<String, AppError> {
    log_request_received(&format!("/webhook/{}/{}", tenant_id, connection_id), "GET");

    let (_, connection) = state.tenants.resolve(&tenant_id, connection_id).await?;

    if handshake_accepts(&params, &connection.verify_token) {
        let challenge = params.challenge.unwrap_or_default();
        log_info(&format!(
            "✅ Webhook verificado: tenant={} connection={}",
            tenant_id, connection_id
        ));
        Ok(challenge)
    } else {
        log_validation_error("hub.verify_token", "handshake rejected");
        Err(AppError::ValidationError(
            "Webhook verification failed".to_string(),
        ))
    }
}

/// `POST /webhook/:tenant_id/:connection_id` — ingestão de eventos.
pub async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, connection_id)): Path<(String, i64)>,
    headers: HeaderMap,
    request: Request<Body>,
) -> Result<Json<Value>, AppError> {
    let start_time = Instant::now();
    let endpoint = format!("/webhook/{}/{}", tenant_id, connection_id);
    log_request_received(&endpoint, "POST");

    // Body como bytes: necessário para validar a assinatura
    let body_bytes = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to read request body: {}", e)))?;

    if state.settings.meta.validate_signature {
        let secret = state
            .settings
            .meta
            .app_secret
            .as_deref()
            .ok_or_else(|| {
                AppError::ConfigError("META_APP_SECRET não configurado".to_string())
            })?;
        let signature = headers
            .get("x-hub-signature-256")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::ValidationError("Missing X-Hub-Signature-256 header".to_string())
            })?;

        if !signature_is_valid(secret, &body_bytes, signature) {
            log_warning("❌ Assinatura inválida do webhook!");
            return Err(AppError::ValidationError(
                "Invalid webhook signature".to_string(),
            ));
        }
    }

    let payload: Value = serde_json::from_slice(&body_bytes)
        .map_err(|e| AppError::ValidationError(format!("Invalid JSON: {}", e)))?;

    let accepted = state
        .webhook
        .handle_inbound_event(&tenant_id, connection_id, payload)
        .await?;

    let processing_time = start_time.elapsed().as_millis() as u64;
    log_request_processed(&endpoint, 200, processing_time);

    Ok(Json(Value::Bool(accepted)))
}

/// `GET /webhook/:tenant_id/:connection_id/messages` — buffer circular de
/// mensagens recentes, para inspeção.
pub async fn list_recent_messages(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, connection_id)): Path<(String, i64)>,
) -> Result<Json<Value>, AppError> {
    log_request_received(
        &format!("/webhook/{}/{}/messages", tenant_id, connection_id),
        "GET",
    );

    // Garante que a rota só serve conexões existentes
    state.tenants.resolve(&tenant_id, connection_id).await?;

    let messages = state
        .webhook
        .recent_messages(&tenant_id, connection_id)
        .await?;

    Ok(Json(serde_json::json!({
        "count": messages.len(),
        "messages": messages
    })))
}

/// Aceita o handshake apenas com `hub.mode=subscribe` e token idêntico ao
/// `verify_token` da conexão; qualquer outra combinação é rejeitada.
fn handshake_accepts(params: &VerifyParams, verify_token: &str) -> bool {
    params.mode.as_deref() == Some("subscribe")
        && params.verify_token.as_deref() == Some(verify_token)
}

/// Valida `X-Hub-Signature-256: sha256=<hex>` contra o HMAC do corpo.
/// A comparação é em tempo constante (`verify_slice`).
fn signature_is_valid(secret: &str, body: &[u8], header: &str) -> bool {
    let Some(hex_digest) = header.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
