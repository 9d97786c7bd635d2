// Biblioteca do gateway WhatsApp Oficial
// Expõe módulos para uso em testes e binários

use std::sync::Arc;

pub mod config;
pub mod models;
pub mod services;
pub mod utils;

// AppState é definido aqui para ser compartilhado
#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub meta: meta_graph::MetaClient,
    pub tenants: services::TenantStore,
    pub redis: services::RedisService,
    pub socket: Arc<services::SocketService>,
    pub webhook: services::WebhookService,
    pub started_at: chrono::DateTime<chrono::Utc>,
}
