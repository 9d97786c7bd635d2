// ============================================================================
// Handlers administrativos de templates de mensagem
// ============================================================================
//
// Ciclo de vida de templates na WABA do tenant: criação, listagem e remoção.
// Estes endpoints NÃO fazem parte do fluxo de webhook — são ferramentas de
// administração chamadas pelo backend de atendimento, autenticadas com o
// admin_token do tenant. O status de aprovação chega depois, de forma
// assíncrona, pelo webhook de template (ver orquestrador).

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use meta_graph::MessageTemplate;
use whatsapp_oficial_gateway::utils::logging::*;
use whatsapp_oficial_gateway::utils::AppError;
use whatsapp_oficial_gateway::AppState;

use super::authorize_admin;

/// `GET /templates/:tenant_id/:connection_id`
pub async fn list_templates(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, connection_id)): Path<(String, i64)>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    log_request_received(&format!("/templates/{}/{}", tenant_id, connection_id), "GET");

    let (tenant, connection) = state.tenants.resolve(&tenant_id, connection_id).await?;
    authorize_admin(&headers, &tenant.admin_token)?;

    let templates = state
        .meta
        .list_templates(&connection.waba_id, &connection.send_token)
        .await?;

    Ok(Json(json!({
        "count": templates.len(),
        "templates": templates
    })))
}

/// `POST /templates/:tenant_id/:connection_id`
pub async fn create_template(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, connection_id)): Path<(String, i64)>,
    headers: HeaderMap,
    Json(template): Json<MessageTemplate>,
) -> Result<Json<Value>, AppError> {
    log_request_received(&format!("/templates/{}/{}", tenant_id, connection_id), "POST");

    let (tenant, connection) = state.tenants.resolve(&tenant_id, connection_id).await?;
    authorize_admin(&headers, &tenant.admin_token)?;

    let result = state
        .meta
        .create_template(&connection.waba_id, &connection.send_token, &template)
        .await?;

    log_info(&format!("✅ Template '{}' submetido para aprovação", template.name));

    Ok(Json(json!({
        "success": true,
        "result": result
    })))
}

/// `DELETE /templates/:tenant_id/:connection_id/:name`
pub async fn delete_template(
    State(state): State<Arc<AppState>>,
    Path((tenant_id, connection_id, name)): Path<(String, i64, String)>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    log_request_received(
        &format!("/templates/{}/{}/{}", tenant_id, connection_id, name),
        "DELETE",
    );

    let (tenant, connection) = state.tenants.resolve(&tenant_id, connection_id).await?;
    authorize_admin(&headers, &tenant.admin_token)?;

    let result = state
        .meta
        .delete_template(&connection.waba_id, &connection.send_token, &name)
        .await?;

    Ok(Json(json!({
        "success": true,
        "result": result
    })))
}
