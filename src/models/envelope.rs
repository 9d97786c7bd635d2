//! Payload bruto dos webhooks da Cloud API.
//!
//! O parse é deliberadamente tolerante (`#[serde(default)]` em quase tudo):
//! a Meta adiciona campos sem aviso e um webhook malformado num campo não
//! pode derrubar o restante do lote.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Marcador fixo do objeto de conta business; qualquer outro valor é
/// envelope malformado.
pub const BUSINESS_ACCOUNT_OBJECT: &str = "whatsapp_business_account";

/// Tipos de mensagem que seguem pelo pipeline. `system`, `button`,
/// `reaction` e `unsupported` ficam de fora: não geram push nem fan-out.
pub const PROCESSABLE_TYPES: [&str; 11] = [
    "text",
    "image",
    "audio",
    "document",
    "video",
    "location",
    "contacts",
    "order",
    "interactive",
    "referral",
    "sticker",
];

/// Tipos cujo conteúdo é binário e exige download na Graph API.
pub const MEDIA_TYPES: [&str; 5] = ["image", "audio", "document", "video", "sticker"];

/// Campo de change com atualizações de status de template.
pub const FIELD_TEMPLATE_STATUS: &str = "message_template_status_update";

/// Campo de change com mensagens/statuses de conversa.
pub const FIELD_MESSAGES: &str = "messages";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEnvelope {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<EnvelopeEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub changes: Vec<EnvelopeChange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeChange {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub value: Option<ChangeValue>,
}

/// Na prática `messages` e `statuses` são mutuamente exclusivos por value;
/// o orquestrador trata como ramos independentes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub metadata: Option<ValueMetadata>,
    #[serde(default)]
    pub contacts: Vec<InboundContact>,
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
    #[serde(default)]
    pub statuses: Vec<InboundStatus>,
    /// Campos extras (ex.: payload de status de template) preservados
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueMetadata {
    #[serde(default)]
    pub phone_number_id: String,
    #[serde(default)]
    pub display_phone_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundContact {
    #[serde(default)]
    pub wa_id: String,
    #[serde(default)]
    pub profile: Option<ContactProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactProfile {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<TextContent>,
    #[serde(default)]
    pub image: Option<MediaContent>,
    #[serde(default)]
    pub audio: Option<MediaContent>,
    #[serde(default)]
    pub video: Option<MediaContent>,
    #[serde(default)]
    pub document: Option<MediaContent>,
    #[serde(default)]
    pub sticker: Option<MediaContent>,
    #[serde(default)]
    pub location: Option<Value>,
    #[serde(default)]
    pub contacts: Option<Value>,
    #[serde(default)]
    pub order: Option<Value>,
    #[serde(default)]
    pub interactive: Option<InteractiveContent>,
    #[serde(default)]
    pub referral: Option<Value>,
    #[serde(default)]
    pub context: Option<MessageContext>,
}

impl InboundMessage {
    /// Mensagem dentro do allow-list do pipeline?
    pub fn is_processable(&self) -> bool {
        PROCESSABLE_TYPES.contains(&self.kind.as_str())
    }

    /// Mensagem cujo conteúdo exige download de mídia?
    pub fn is_media(&self) -> bool {
        MEDIA_TYPES.contains(&self.kind.as_str())
    }

    /// Conteúdo de mídia correspondente ao tipo declarado.
    pub fn media_content(&self) -> Option<&MediaContent> {
        match self.kind.as_str() {
            "image" => self.image.as_ref(),
            "audio" => self.audio.as_ref(),
            "video" => self.video.as_ref(),
            "document" => self.document.as_ref(),
            "sticker" => self.sticker.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaContent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractiveContent {
    #[serde(default)]
    pub button_reply: Option<InteractiveReply>,
    #[serde(default)]
    pub list_reply: Option<InteractiveReply>,
}

impl InteractiveContent {
    /// Id de qualquer das respostas presentes (button ou list).
    pub fn reply_id(&self) -> Option<&str> {
        self.button_reply
            .as_ref()
            .or(self.list_reply.as_ref())
            .map(|r| r.id.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractiveReply {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageContext {
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundStatus {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub recipient_id: Option<String>,
}
