//! # Meta Graph API — WhatsApp Cloud
//!
//! Cliente HTTP assíncrono para os endpoints da Cloud API usados pelo
//! gateway: resolução e download de mídia (dois saltos), envio de mensagens
//! e ciclo de vida de templates.
//!
//! Todas as chamadas usam `Authorization: Bearer <token>`; o token é sempre
//! parâmetro, o cliente não guarda credencial de nenhum tenant.

/// Módulo de cliente API
pub mod client;

/// Módulo de mídia (resolução de URL assinada + download binário)
pub mod media;

/// Módulo de templates de mensagem
pub mod templates;

/// Módulo de tratamento de erros
pub mod error;

pub use client::MetaClient;
pub use error::{MetaError, MetaResult};
pub use media::{DownloadedMedia, MediaHandle};
pub use templates::{MessageTemplate, TemplateStatus};
