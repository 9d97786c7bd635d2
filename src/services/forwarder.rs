//! Fan-out do payload bruto para webhooks externos configurados pelo
//! tenant. Fire-and-forget: nenhum resultado aqui altera o pipeline, e a
//! falha de um slot não impede a tentativa nos demais.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};

use crate::models::connection::MAX_WEBHOOK_SLOTS;
use crate::models::WebhookSlot;

#[derive(Clone)]
pub struct ForwarderService {
    http: Client,
}

impl Default for ForwarderService {
    fn default() -> Self {
        Self::new()
    }
}

impl ForwarderService {
    pub fn new() -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { http }
    }

    /// Entrega para um endpoint. Nunca retorna erro: não-2xx e falha de
    /// transporte viram log.
    pub async fn forward(&self, url: &str, token: Option<&str>, body: &Value) {
        let mut request = self.http.post(url).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                info!("External webhook delivered: {}", url);
            }
            Ok(response) => {
                warn!(
                    "External webhook rejected: {} - Status: {}",
                    url,
                    response.status()
                );
            }
            Err(e) => {
                warn!("External webhook unreachable: {} - {}", url, e);
            }
        }
    }

    /// Percorre os slots configurados (no máximo 4), um a um.
    pub async fn forward_all(&self, slots: &[WebhookSlot], body: &Value) {
        for slot in slots.iter().take(MAX_WEBHOOK_SLOTS) {
            self.forward(&slot.url, slot.token.as_deref(), body).await;
        }
    }
}
