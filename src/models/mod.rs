pub mod connection;
pub mod envelope;
pub mod normalized;

pub use connection::{ChannelConnection, RabbitBinding, TenantRecord, WebhookSlot};
pub use envelope::{
    ChangeValue, EnvelopeChange, EnvelopeEntry, InboundContact, InboundEnvelope, InboundMessage,
    InboundStatus, BUSINESS_ACCOUNT_OBJECT, FIELD_MESSAGES, FIELD_TEMPLATE_STATUS,
};
pub use normalized::{MessagePayload, NormalizedMessage};
