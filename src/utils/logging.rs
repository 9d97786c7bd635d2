use tracing::{debug, error, info, warn};

pub fn log_request_received(endpoint: &str, method: &str) {
    info!("Request received: {} {}", method, endpoint);
}

pub fn log_request_processed(endpoint: &str, status: u16, duration_ms: u64) {
    info!(
        "Request processed: {} - Status: {} - Duration: {}ms",
        endpoint, status, duration_ms
    );
}

pub fn log_webhook_duplicate(tenant: &str, message_id: &str) {
    info!(
        "Duplicate webhook ignored: tenant={} message_id={}",
        tenant, message_id
    );
}

pub fn log_degraded_stage(stage: &str, detail: &str) {
    warn!("⚠️ Pipeline degradado na etapa '{}': {}", stage, detail);
}

pub fn log_realtime_push(tenant: &str, event: &str, ok: bool) {
    if ok {
        info!("Realtime push delivered: tenant={} event={}", tenant, event);
    } else {
        warn!("Realtime push failed: tenant={} event={}", tenant, event);
    }
}

pub fn log_queue_published(exchange: &str, routing_key: &str) {
    info!(
        "Message published to queue: exchange={} routing_key={}",
        exchange, routing_key
    );
}

pub fn log_config_loaded(env: &str) {
    info!("Configuration loaded successfully for environment: {}", env);
}

pub fn log_server_startup(port: u16) {
    info!("🚀 WhatsApp oficial gateway starting on port {}", port);
}

pub fn log_server_ready(port: u16) {
    info!("✅ Server ready and listening on http://0.0.0.0:{}", port);
}

pub fn log_health_check() {
    debug!("Health check requested");
}

pub fn log_integration_status_check() {
    debug!("Integration status check requested");
}

pub fn log_validation_error(field: &str, message: &str) {
    warn!("Validation error: {} - {}", field, message);
}

pub fn log_info(message: &str) {
    info!("{}", message);
}

pub fn log_error(message: &str) {
    error!("{}", message);
}

pub fn log_warning(message: &str) {
    warn!("{}", message);
}
