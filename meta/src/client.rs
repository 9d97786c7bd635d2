use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::{MetaError, MetaResult};

const GRAPH_API_BASE: &str = "https://graph.facebook.com/v18.0";

/// Cliente HTTP para a Meta Graph API (WhatsApp Cloud).
///
/// Stateless: tokens e ids de número/WABA são passados por chamada, nunca
/// retidos. Uma única instância pode atender todos os tenants.
#[derive(Debug, Clone)]
pub struct MetaClient {
    pub(crate) http: Client,
    pub(crate) base_url: String,
}

impl Default for MetaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MetaClient {
    pub fn new() -> Self {
        Self::with_base_url(GRAPH_API_BASE)
    }

    /// Base alternativa, usada em testes e em proxies regionais.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /{numberId}/messages` — envio de mensagem pela Cloud API.
    ///
    /// O payload segue o formato da Cloud API (`messaging_product`,
    /// `to`, `type`, ...); o corpo é repassado como está.
    pub async fn send_message(
        &self,
        number_id: &str,
        token: &str,
        payload: &Value,
    ) -> MetaResult<Value> {
        let url = format!("{}/{}/messages", self.base_url, number_id);
        debug!("Graph API send_message: number_id={}", number_id);

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;

        Self::into_json(response).await
    }

    pub(crate) async fn into_json(response: reqwest::Response) -> MetaResult<Value> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(MetaError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_send_message_posts_bearer_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/123456/messages")
                    .header("authorization", "Bearer token-abc")
                    .json_body(json!({
                        "messaging_product": "whatsapp",
                        "to": "5511999999999",
                        "type": "text",
                        "text": {"body": "oi"}
                    }));
                then.status(200)
                    .json_body(json!({"messages": [{"id": "wamid.X"}]}));
            })
            .await;

        let client = MetaClient::with_base_url(server.base_url());
        let result = client
            .send_message(
                "123456",
                "token-abc",
                &json!({
                    "messaging_product": "whatsapp",
                    "to": "5511999999999",
                    "type": "text",
                    "text": {"body": "oi"}
                }),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result["messages"][0]["id"], "wamid.X");
    }

    #[tokio::test]
    async fn test_send_message_surfaces_api_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/123456/messages");
                then.status(401).body("{\"error\":{\"message\":\"bad token\"}}");
            })
            .await;

        let client = MetaClient::with_base_url(server.base_url());
        let err = client
            .send_message("123456", "wrong", &json!({}))
            .await
            .unwrap_err();

        match err {
            MetaError::Api { status, .. } => assert_eq!(status, 401),
            other => panic!("unexpected error: {other}"),
        }
    }
}
