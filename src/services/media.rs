//! Download e persistência de mídia recebida.
//!
//! O binário vem da Graph API em dois saltos (id → URL assinada → bytes),
//! é gravado em `{root}/{tenant}/{conexão}/{mediaId}.{ext}` e devolvido ao
//! pipeline como base64 + mime type para o push em tempo real.

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use meta_graph::MetaClient;
use tracing::info;

use crate::utils::{DegradedError, DegradedResult};

#[derive(Debug, Clone)]
pub struct SavedMedia {
    pub base64: String,
    pub mime_type: String,
    pub file_name: String,
}

#[derive(Clone)]
pub struct MediaService {
    meta: MetaClient,
    storage_root: PathBuf,
}

impl MediaService {
    pub fn new(meta: MetaClient, storage_root: impl Into<PathBuf>) -> Self {
        Self {
            meta,
            storage_root: storage_root.into(),
        }
    }

    /// Baixa, grava em disco e devolve o conteúdo codificado. Best effort:
    /// qualquer falha degrada apenas a mensagem corrente.
    pub async fn fetch_and_store(
        &self,
        tenant_external_id: &str,
        connection_id: i64,
        media_id: &str,
        phone_number_id: &str,
        token: &str,
    ) -> DegradedResult<SavedMedia> {
        let media = self
            .meta
            .download_media(media_id, phone_number_id, token)
            .await
            .map_err(|e| DegradedError::new("media-download", e.to_string()))?;

        let file_name = format!("{}.{}", media_id, ext_for_mime(&media.mime_type));
        let dir = self
            .storage_root
            .join(tenant_external_id)
            .join(connection_id.to_string());

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| DegradedError::new("media-store", e.to_string()))?;
        let path = dir.join(&file_name);
        tokio::fs::write(&path, &media.bytes)
            .await
            .map_err(|e| DegradedError::new("media-store", e.to_string()))?;

        info!(
            "Media stored: {} ({} bytes, {})",
            path.display(),
            media.bytes.len(),
            media.mime_type
        );

        Ok(SavedMedia {
            base64: BASE64.encode(&media.bytes),
            mime_type: media.mime_type,
            file_name,
        })
    }
}

/// Extensão de arquivo a partir do mime informado (parâmetros de codec são
/// descartados, ex. "audio/ogg; codecs=opus").
fn ext_for_mime(mime_type: &str) -> &'static str {
    let base = mime_type.split(';').next().unwrap_or("").trim();
    match base {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "video/mp4" => "mp4",
        "video/3gpp" => "3gp",
        "audio/ogg" => "ogg",
        "audio/mpeg" => "mp3",
        "audio/mp4" => "m4a",
        "audio/amr" => "amr",
        "application/pdf" => "pdf",
        "text/plain" => "txt",
        _ => "bin",
    }
}
