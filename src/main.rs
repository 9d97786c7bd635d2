/// Gateway multi-tenant para a API Oficial do WhatsApp (Meta Cloud API)
///
/// Arquitetura:
/// - Webhook recebe o envelope da Cloud API e deduplica por id de mensagem
/// - Orquestrador normaliza por tipo, baixa mídia e empurra em tempo real
///   para o backend de atendimento (ack obrigatório)
/// - Fila AMQP e fan-out de webhooks externos são opt-in por tenant
/// - Registro de empresas/conexões em YAML, relido a cada webhook
///
/// SEM banco de dados: toda a operação usa YAML + Redis efêmero

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// Importar módulos da biblioteca
use whatsapp_oficial_gateway::{config, services, utils, AppState};

mod handlers;

use config::Settings;
use handlers::{
    create_template, delete_template, handle_webhook, health_check, list_recent_messages,
    list_templates, ready_check, send_message, status_check, verify_webhook,
};
use meta_graph::MetaClient;
use services::{
    DistributedLock, ForwarderService, MediaService, RabbitMqService, RedisService, RetryPolicy,
    SocketService, TenantStore, WebhookService,
};
use utils::{logging::*, AppError};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 🔧 Carregar variáveis de ambiente do arquivo .env (se existir)
    if dotenvy::dotenv().is_err() {
        // Em produção não existe .env - variáveis vêm do ambiente
        tracing::debug!("Arquivo .env não encontrado - usando variáveis de ambiente do sistema");
    }

    // Inicializar tracing
    tracing_subscriber::fmt::init();

    // Carregar configurações
    let settings = Settings::new()
        .map_err(|e| AppError::ConfigError(format!("Failed to load settings: {}", e)))?;

    log_config_loaded(&std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string()));
    log_info(&format!(
        "📄 Modo YAML-only: registro de tenants em {}",
        settings.tenants.registry
    ));

    // Armazenamento efêmero: dedup, buffer circular e lock distribuído
    let redis = RedisService::connect(&settings.redis.url)
        .await
        .map_err(|e| AppError::ConfigError(format!("Failed to connect to Redis: {}", e)))?;
    log_info("✅ Redis conectado (ConnectionManager com reconexão automática)");

    let lock = DistributedLock::new(redis.clone(), RetryPolicy::default());

    // Cliente da Graph API (uma instância para todos os tenants)
    let meta = match settings.meta.base_url.as_deref() {
        Some(base_url) => MetaClient::with_base_url(base_url),
        None => MetaClient::new(),
    };
    let media = MediaService::new(meta.clone(), settings.storage.root.clone());

    // Conexões em tempo real com o backend de atendimento
    let socket = Arc::new(SocketService::new(
        settings.backend.url.clone(),
        Duration::from_millis(settings.backend.ack_timeout_ms),
    ));

    // Publicação AMQP é opcional: sem URL, tenants com use_rabbitmq degradam
    let rabbitmq = match settings.rabbitmq.url.as_deref() {
        Some(url) => {
            log_info("✅ RabbitMQ configurado (conexão preguiçosa)");
            Some(RabbitMqService::new(url))
        }
        None => {
            log_warning("⚠️ RABBITMQ_URL ausente - publicação em fila desabilitada");
            None
        }
    };

    let tenants = TenantStore::new(settings.tenants.registry.clone());
    let forwarder = ForwarderService::new();

    let webhook = WebhookService::new(
        tenants.clone(),
        redis.clone(),
        lock,
        media,
        Arc::clone(&socket),
        rabbitmq,
        forwarder,
    );

    // Inicializar estado da aplicação
    let app_state = Arc::new(AppState {
        settings: settings.clone(),
        meta,
        tenants,
        redis,
        socket: Arc::clone(&socket),
        webhook,
        started_at: chrono::Utc::now(),
    });

    // Configurar rotas
    let app = Router::new()
        // Health checks (públicos)
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/status", get(status_check))

        // Webhooks da Cloud API (handshake + ingestão + inspeção)
        .route(
            "/webhook/:tenant_id/:connection_id",
            get(verify_webhook).post(handle_webhook),
        )
        .route(
            "/webhook/:tenant_id/:connection_id/messages",
            get(list_recent_messages),
        )

        // Rotas administrativas (autenticadas pelo admin_token do tenant)
        .route("/messages/:tenant_id/:connection_id", post(send_message))
        .route(
            "/templates/:tenant_id/:connection_id",
            get(list_templates).post(create_template),
        )
        .route(
            "/templates/:tenant_id/:connection_id/:name",
            delete(delete_template),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Iniciar servidor (PORT do ambiente tem precedência, como em Cloud Run)
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(settings.server.port);
    let listener = TcpListener::bind(format!("{}:{}", settings.server.host, port)).await?;

    log_server_startup(port);
    log_server_ready(port);

    // Graceful shutdown com signal handling
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Drena as conexões em tempo real antes de sair
    socket.close().await;
    log_info("🛑 Server shut down gracefully");
    Ok(())
}

/// Signal handler para graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log_info("🛑 Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            log_info("🛑 Received SIGTERM, shutting down gracefully...");
        }
    }
}
