//! Representação interna entregue ao backend de atendimento via push em
//! tempo real. Construída por mensagem, entregue por valor, nunca retida.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMessage {
    /// Id externo da empresa (não confundir com o id numérico interno)
    pub company_id: String,
    pub name_contact: String,
    pub token: String,
    pub from_number: String,
    pub message: MessagePayload,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: String,
    pub id_message: String,
    /// String na maioria dos tipos; objeto `{contacts: [...]}` no tipo
    /// contacts (assimetria do contrato com o backend, preservada aqui)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Value>,
    /// Conteúdo binário em base64
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_message_id: Option<String>,
}
