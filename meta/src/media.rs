//! Download de mídia em dois saltos: a Cloud API primeiro resolve o id de
//! mídia para uma URL assinada de curta duração, e só então o binário é
//! baixado dessa URL (também autenticado).

use serde::Deserialize;
use tracing::debug;

use crate::client::MetaClient;
use crate::error::{MetaError, MetaResult};

/// Resposta de `GET /{mediaId}` — a URL assinada e os metadados da mídia.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaHandle {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub id: String,
}

/// Binário baixado com o mime type informado pela API.
#[derive(Debug, Clone)]
pub struct DownloadedMedia {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl MetaClient {
    /// Primeiro salto: `GET /{mediaId}?phone_number_id=...` resolve a URL
    /// assinada. A URL expira em poucos minutos; o chamador deve baixar em
    /// seguida, não guardar.
    pub async fn resolve_media(
        &self,
        media_id: &str,
        phone_number_id: &str,
        token: &str,
    ) -> MetaResult<MediaHandle> {
        let url = format!(
            "{}/{}?phone_number_id={}",
            self.base_url, media_id, phone_number_id
        );
        debug!("Graph API resolve_media: media_id={}", media_id);

        let response = self.http.get(&url).bearer_auth(token).send().await?;
        let value = Self::into_json(response).await?;

        let handle: MediaHandle = serde_json::from_value(value)?;
        if handle.url.is_empty() {
            return Err(MetaError::MissingField("url"));
        }
        Ok(handle)
    }

    /// Segundo salto: busca os bytes da URL assinada.
    pub async fn fetch_media_bytes(
        &self,
        handle: &MediaHandle,
        token: &str,
    ) -> MetaResult<DownloadedMedia> {
        let response = self.http.get(&handle.url).bearer_auth(token).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MetaError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        // Mime da resposta tem prioridade; o handle é o fallback
        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| handle.mime_type.clone());

        let bytes = response.bytes().await?.to_vec();
        Ok(DownloadedMedia { bytes, mime_type })
    }

    /// Os dois saltos encadeados.
    pub async fn download_media(
        &self,
        media_id: &str,
        phone_number_id: &str,
        token: &str,
    ) -> MetaResult<DownloadedMedia> {
        let handle = self.resolve_media(media_id, phone_number_id, token).await?;
        self.fetch_media_bytes(&handle, token).await
    }
}
