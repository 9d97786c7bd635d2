/// Handler de envio de mensagem pela Cloud API
///
/// O backend de atendimento responde conversas por aqui: o corpo segue o
/// formato da Graph API (`messaging_product`, `to`, `type`, ...) e é
/// repassado como está, com o token e o número da conexão resolvidos pelo
/// gateway.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use whatsapp_oficial_gateway::utils::logging::*;
use whatsapp_oficial_gateway::utils::AppError;
use whatsapp_oficial_gateway::AppState;

use super::authorize_admin;

/// `POST /messages/:tenant_id/:connection_id`
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, connection_id)): Path<(String, i64)>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, AppError> {
    log_request_received(&format!("/messages/{}/{}", tenant_id, connection_id), "POST");

    let (tenant, connection) = state.tenants.resolve(&tenant_id, connection_id).await?;
    authorize_admin(&headers, &tenant.admin_token)?;

    let result = state
        .meta
        .send_message(&connection.phone_number_id, &connection.send_token, &payload)
        .await?;

    log_info(&format!(
        "✅ Mensagem enviada: tenant={} connection={}",
        tenant_id, connection_id
    ));

    Ok(Json(json!({
        "success": true,
        "result": result
    })))
}
