//! Esquema do registro YAML de empresas e conexões.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantRecord {
    /// Id externo exposto nos payloads e nas rotas de webhook
    pub external_id: String,
    /// Id numérico interno, distinto do externo
    pub internal_id: i64,
    #[serde(default)]
    pub name: String,
    /// Token usado na conexão em tempo real com o backend
    pub admin_token: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub connections: Vec<ChannelConnection>,
}

/// Uma conexão = um número registrado na API Oficial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConnection {
    pub id: i64,
    #[serde(default)]
    pub waba_id: String,
    #[serde(default)]
    pub phone_number_id: String,
    /// Bearer token para as chamadas à Graph API desta conexão
    #[serde(default)]
    pub send_token: String,
    /// Segredo do handshake de verificação do webhook
    pub verify_token: String,
    #[serde(default)]
    pub use_rabbitmq: bool,
    #[serde(default)]
    pub rabbitmq: Option<RabbitBinding>,
    /// Até 4 integrações externas; cada slot é independente
    #[serde(default)]
    pub external_webhooks: Vec<WebhookSlot>,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RabbitBinding {
    pub exchange: String,
    pub queue: String,
    pub routing_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookSlot {
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
}

/// Limite de slots de webhook externo por conexão.
pub const MAX_WEBHOOK_SLOTS: usize = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_yaml_roundtrip() {
        let yaml = r#"
external_id: "10"
internal_id: 1
name: "Empresa"
admin_token: "tok"
connections:
  - id: 3
    waba_id: "w1"
    phone_number_id: "p1"
    send_token: "meta-tok"
    verify_token: "segredo"
    use_rabbitmq: true
    rabbitmq:
      exchange: "whatsapp.inbound"
      queue: "empresa.inbound"
      routing_key: "empresa.messages"
    external_webhooks:
      - url: "https://hook.exemplo.com/a"
        token: "t1"
      - url: "https://hook.exemplo.com/b"
"#;
        let tenant: TenantRecord = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(tenant.external_id, "10");
        assert_eq!(tenant.internal_id, 1);
        assert!(!tenant.deleted);

        let conn = &tenant.connections[0];
        assert_eq!(conn.id, 3);
        assert!(conn.use_rabbitmq);
        assert_eq!(conn.rabbitmq.as_ref().unwrap().routing_key, "empresa.messages");
        assert_eq!(conn.external_webhooks.len(), 2);
        assert_eq!(conn.external_webhooks[1].token, None);
    }
}
