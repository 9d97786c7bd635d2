//! Ciclo de vida de templates de mensagem: criação, listagem e remoção no
//! escopo da WABA (WhatsApp Business Account) do tenant.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::client::MetaClient;
use crate::error::MetaResult;

/// Status de aprovação reportado pela Meta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TemplateStatus {
    Approved,
    Pending,
    Rejected,
    Paused,
    Disabled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageTemplate {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub language: String,
    pub category: String,
    #[serde(default)]
    pub status: Option<TemplateStatus>,
    #[serde(default)]
    pub components: Vec<Value>,
}

impl MetaClient {
    /// `POST /{wabaId}/message_templates`
    pub async fn create_template(
        &self,
        waba_id: &str,
        token: &str,
        template: &MessageTemplate,
    ) -> MetaResult<Value> {
        let url = format!("{}/{}/message_templates", self.base_url, waba_id);
        debug!("Graph API create_template: {} ({})", template.name, waba_id);

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(template)
            .send()
            .await?;
        Self::into_json(response).await
    }

    /// `GET /{wabaId}/message_templates`
    pub async fn list_templates(&self, waba_id: &str, token: &str) -> MetaResult<Vec<MessageTemplate>> {
        let url = format!("{}/{}/message_templates", self.base_url, waba_id);
        let response = self.http.get(&url).bearer_auth(token).send().await?;
        let value = Self::into_json(response).await?;

        let data = value.get("data").cloned().unwrap_or(Value::Array(vec![]));
        Ok(serde_json::from_value(data)?)
    }

    /// `DELETE /{wabaId}/message_templates?name=...`
    pub async fn delete_template(&self, waba_id: &str, token: &str, name: &str) -> MetaResult<Value> {
        let url = format!(
            "{}/{}/message_templates?name={}",
            self.base_url,
            waba_id,
            urlencoding::encode(name)
        );
        let response = self.http.delete(&url).bearer_auth(token).send().await?;
        Self::into_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_list_templates_unwraps_data() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/waba1/message_templates");
                then.status(200).json_body(json!({
                    "data": [
                        {
                            "id": "t1",
                            "name": "boas_vindas",
                            "language": "pt_BR",
                            "category": "UTILITY",
                            "status": "APPROVED",
                            "components": []
                        }
                    ]
                }));
            })
            .await;

        let client = MetaClient::with_base_url(server.base_url());
        let templates = client.list_templates("waba1", "tok").await.unwrap();

        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].name, "boas_vindas");
        assert_eq!(templates[0].status, Some(TemplateStatus::Approved));
    }

    #[test]
    fn test_unknown_status_is_tolerated() {
        let t: MessageTemplate = serde_json::from_value(json!({
            "name": "x", "language": "pt_BR", "category": "MARKETING",
            "status": "IN_APPEAL"
        }))
        .unwrap();
        assert_eq!(t.status, Some(TemplateStatus::Unknown));
    }
}
