//! Orquestrador de ingestão dos webhooks da Cloud API.
//!
//! Um único passo é fatal (resolução de tenant/conexão): todos os demais —
//! dedup, fila, buffer, mídia, push, fan-out — são best effort e degradam
//! com log sem derrubar o restante do lote. O provider recebe 200 sempre
//! que o envelope é válido e o tenant existe, para não acumular retries.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::info;

use crate::models::{
    ChangeValue, InboundEnvelope, InboundMessage, MessagePayload, NormalizedMessage,
    BUSINESS_ACCOUNT_OBJECT, FIELD_MESSAGES, FIELD_TEMPLATE_STATUS,
};
use crate::services::forwarder::ForwarderService;
use crate::services::lock::DistributedLock;
use crate::services::media::MediaService;
use crate::services::rabbitmq::RabbitMqService;
use crate::services::redis::RedisService;
use crate::services::socket::{
    SocketService, EVENT_MESSAGE_STATUS, EVENT_READ_MESSAGE, EVENT_RECEIVED_MESSAGE,
    EVENT_TEMPLATE_STATUS,
};
use crate::services::tenant_store::TenantStore;
use crate::utils::logging::{
    log_degraded_stage, log_validation_error, log_warning, log_webhook_duplicate,
};
use crate::utils::{AppError, AppResult};

#[derive(Clone)]
pub struct WebhookService {
    tenants: TenantStore,
    redis: RedisService,
    lock: DistributedLock,
    media: MediaService,
    socket: Arc<SocketService>,
    rabbitmq: Option<RabbitMqService>,
    forwarder: ForwarderService,
}

impl WebhookService {
    pub fn new(
        tenants: TenantStore,
        redis: RedisService,
        lock: DistributedLock,
        media: MediaService,
        socket: Arc<SocketService>,
        rabbitmq: Option<RabbitMqService>,
        forwarder: ForwarderService,
    ) -> Self {
        Self {
            tenants,
            redis,
            lock,
            media,
            socket,
            rabbitmq,
            forwarder,
        }
    }

    /// Processa um POST de webhook já autenticado. `Ok(true)` significa
    /// "aceito" (inclusive duplicado); erro só em envelope inválido ou
    /// tenant/conexão desconhecidos.
    pub async fn handle_inbound_event(
        &self,
        tenant_external_id: &str,
        connection_id: i64,
        raw: Value,
    ) -> AppResult<bool> {
        let envelope: InboundEnvelope = serde_json::from_value(raw.clone())?;
        if envelope.object != BUSINESS_ACCOUNT_OBJECT {
            log_validation_error("object", &envelope.object);
            return Err(AppError::ValidationError(format!(
                "Unexpected webhook object '{}'",
                envelope.object
            )));
        }

        let (tenant, connection) = self
            .tenants
            .resolve(tenant_external_id, connection_id)
            .await?;

        // Dedup por lote: se qualquer mensagem já foi vista, a entrega
        // inteira é um retry do provider. Checagem e marcação sob lock
        // distribuído, contra entregas concorrentes do mesmo retry.
        let message_ids = collect_message_ids(&envelope);
        if !message_ids.is_empty() {
            let lock_key = format!("webhook:{}:{}", tenant.external_id, connection.id);
            let duplicate = match self
                .lock
                .with_lock(&lock_key, || async {
                    Ok(self.check_and_mark(&tenant.external_id, &message_ids).await)
                })
                .await
            {
                Ok(duplicate) => duplicate,
                // Lock indisponível: dedup sem exclusão mútua
                Err(e) => {
                    log_degraded_stage("dedup-lock", &e.to_string());
                    self.check_and_mark(&tenant.external_id, &message_ids).await
                }
            };
            if duplicate {
                log_webhook_duplicate(&tenant.external_id, message_ids[0]);
                return Ok(true);
            }
        }

        for entry in &envelope.entry {
            for change in &entry.changes {
                if change.field == FIELD_TEMPLATE_STATUS {
                    let value = change
                        .value
                        .as_ref()
                        .and_then(|v| serde_json::to_value(v).ok())
                        .unwrap_or(Value::Null);
                    self.socket
                        .push(
                            &tenant.external_id,
                            &tenant.admin_token,
                            EVENT_TEMPLATE_STATUS,
                            json!({"companyId": tenant.external_id, "value": value}),
                        )
                        .await;
                    continue;
                }
                if change.field != FIELD_MESSAGES {
                    continue;
                }
                let Some(value) = &change.value else { continue };

                for status in &value.statuses {
                    let (event, payload) = if status.status == "read" {
                        (
                            EVENT_READ_MESSAGE,
                            json!({
                                "companyId": tenant.external_id,
                                "messageId": status.id,
                                "token": tenant.admin_token,
                            }),
                        )
                    } else {
                        (
                            EVENT_MESSAGE_STATUS,
                            json!({
                                "companyId": tenant.external_id,
                                "messageId": status.id,
                                "status": status.status,
                                "timestamp": status.timestamp,
                                "token": tenant.admin_token,
                            }),
                        )
                    };
                    // Resultado já logado pelo cliente de push
                    self.socket
                        .push(&tenant.external_id, &tenant.admin_token, event, payload)
                        .await;
                }

                // Efeitos colaterais por mensagem, apenas para tipos do
                // allow-list: fila → buffer → normalização/push → fan-out.
                // Tipos excluídos não geram nenhum deles.
                for message in &value.messages {
                    if !message.is_processable() {
                        info!(
                            "Skipping message outside allow-list: id={} type={}",
                            message.id, message.kind
                        );
                        continue;
                    }

                    if connection.use_rabbitmq {
                        match (&self.rabbitmq, &connection.rabbitmq) {
                            (Some(service), Some(binding)) => {
                                if let Err(e) = service.publish_raw(binding, &raw).await {
                                    log_degraded_stage(e.stage, &e.detail);
                                }
                            }
                            _ => log_warning(
                                "RabbitMQ habilitado para a conexão mas sem broker/binding configurado",
                            ),
                        }
                    }

                    self.append_to_buffer(&tenant.external_id, connection.id, &raw, &envelope)
                        .await;

                    self.dispatch_message(&tenant.external_id, &tenant.admin_token, &connection, value, message)
                        .await;

                    self.forwarder
                        .forward_all(&connection.external_webhooks, &raw)
                        .await;
                }
            }
        }

        Ok(true)
    }

    /// `true` quando a entrega é um retry já visto. Marca cada id antes do
    /// processamento; Redis fora degrada para "primeira vez".
    async fn check_and_mark(&self, tenant_external_id: &str, message_ids: &[&str]) -> bool {
        match self.redis.any_processed(tenant_external_id, message_ids).await {
            Ok(true) => return true,
            Ok(false) => {}
            Err(e) => log_degraded_stage(e.stage, &e.detail),
        }

        for id in message_ids {
            if let Err(e) = self.redis.mark_processed(tenant_external_id, id).await {
                log_degraded_stage(e.stage, &e.detail);
            }
        }
        false
    }

    /// Normaliza e entrega uma mensagem. Falha de mídia degrada apenas a
    /// mensagem corrente.
    async fn dispatch_message(
        &self,
        tenant_external_id: &str,
        admin_token: &str,
        connection: &crate::models::ChannelConnection,
        value: &ChangeValue,
        message: &InboundMessage,
    ) {
        let mut payload = build_message_payload(message);

        if message.is_media() {
            let Some(media) = message.media_content() else {
                log_degraded_stage(
                    "media-dispatch",
                    &format!("message {} declara {} sem conteúdo", message.id, message.kind),
                );
                return;
            };
            match self
                .media
                .fetch_and_store(
                    tenant_external_id,
                    connection.id,
                    &media.id,
                    &connection.phone_number_id,
                    &connection.send_token,
                )
                .await
            {
                Ok(saved) => {
                    payload.file = Some(saved.base64);
                    payload.mime_type = Some(saved.mime_type);
                    payload.id_file = Some(saved.file_name);
                }
                Err(e) => {
                    log_degraded_stage(e.stage, &e.detail);
                    return;
                }
            }
        }

        let normalized = NormalizedMessage {
            company_id: tenant_external_id.to_string(),
            name_contact: contact_name(value, message),
            token: connection.send_token.clone(),
            from_number: message.from.clone(),
            message: payload,
        };
        let wire = match serde_json::to_value(&normalized) {
            Ok(wire) => wire,
            Err(e) => {
                log_degraded_stage("normalize", &e.to_string());
                return;
            }
        };

        self.socket
            .push(tenant_external_id, admin_token, EVENT_RECEIVED_MESSAGE, wire)
            .await;
    }

    /// Buffer circular em dois níveis: envelope completo e, se a escrita
    /// falhar, a forma reduzida; nova falha apenas loga.
    async fn append_to_buffer(
        &self,
        tenant_external_id: &str,
        connection_id: i64,
        raw: &Value,
        envelope: &InboundEnvelope,
    ) {
        if let Err(e) = self
            .redis
            .append_recent(tenant_external_id, connection_id, &raw.to_string())
            .await
        {
            log_degraded_stage(e.stage, &e.detail);
            let reduced = reduced_envelope(envelope).to_string();
            if let Err(e) = self
                .redis
                .append_recent(tenant_external_id, connection_id, &reduced)
                .await
            {
                log_degraded_stage(e.stage, &e.detail);
            }
        }
    }

    /// Buffer de mensagens recentes, para o endpoint de inspeção.
    pub async fn recent_messages(
        &self,
        tenant_external_id: &str,
        connection_id: i64,
    ) -> AppResult<Vec<Value>> {
        let entries = self
            .redis
            .recent_messages(tenant_external_id, connection_id)
            .await
            .map_err(|e| AppError::RedisError(e.detail))?;
        Ok(entries
            .iter()
            .filter_map(|entry| serde_json::from_str(entry).ok())
            .collect())
    }
}

fn collect_message_ids(envelope: &InboundEnvelope) -> Vec<&str> {
    envelope
        .entry
        .iter()
        .flat_map(|entry| &entry.changes)
        .filter(|change| change.field == FIELD_MESSAGES)
        .filter_map(|change| change.value.as_ref())
        .flat_map(|value| &value.messages)
        .map(|message| message.id.as_str())
        .collect()
}

/// Forma reduzida gravada no buffer quando o envelope completo não couber.
fn reduced_envelope(envelope: &InboundEnvelope) -> Value {
    json!({
        "object": envelope.object,
        "entry": envelope
            .entry
            .iter()
            .map(|e| e.id.as_str())
            .collect::<Vec<_>>(),
        "messages": collect_message_ids(envelope),
    })
}

/// Nome do contato do lote; sem perfil, cai para o número do remetente.
fn contact_name(value: &ChangeValue, message: &InboundMessage) -> String {
    value
        .contacts
        .first()
        .and_then(|c| c.profile.as_ref())
        .map(|p| p.name.clone())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| message.from.clone())
}

/// Conteúdo normalizado por tipo, sem os campos de mídia (preenchidos pelo
/// orquestrador após o download).
fn build_message_payload(message: &InboundMessage) -> MessagePayload {
    let mut payload = MessagePayload {
        kind: message.kind.clone(),
        timestamp: message.timestamp.clone(),
        id_message: message.id.clone(),
        ..Default::default()
    };

    match message.kind.as_str() {
        "interactive" => {
            payload.text = message
                .interactive
                .as_ref()
                .and_then(|i| i.reply_id())
                .map(|id| Value::String(id.to_string()));
        }
        // Localização e pedido vão como string JSON
        "location" => {
            payload.text = message
                .location
                .as_ref()
                .map(|l| Value::String(l.to_string()));
        }
        "order" => {
            payload.text = message.order.as_ref().map(|o| Value::String(o.to_string()));
        }
        // Contacts é o único tipo cujo texto é um objeto
        "contacts" => {
            payload.text = message
                .contacts
                .as_ref()
                .map(|c| json!({"contacts": c}));
        }
        _ if message.is_media() => {
            payload.text = message
                .media_content()
                .and_then(|m| m.caption.clone())
                .map(Value::String);
        }
        _ => {
            payload.text = message
                .text
                .as_ref()
                .map(|t| Value::String(t.body.clone()));
            // Citação só acompanha o ramo textual
            payload.quote_message_id = message.context.as_ref().map(|c| c.id.clone());
        }
    }

    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(json: Value) -> InboundMessage {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_text_payload_carries_body_and_quote() {
        let payload = build_message_payload(&message(json!({
            "id": "m1",
            "from": "5511999999999",
            "timestamp": "1700000000",
            "type": "text",
            "text": {"body": "oi"},
            "context": {"id": "m0"}
        })));

        assert_eq!(payload.kind, "text");
        assert_eq!(payload.id_message, "m1");
        assert_eq!(payload.text, Some(json!("oi")));
        assert_eq!(payload.quote_message_id.as_deref(), Some("m0"));
        assert!(payload.file.is_none());
    }

    #[test]
    fn test_interactive_payload_uses_reply_id() {
        let payload = build_message_payload(&message(json!({
            "id": "m2",
            "type": "interactive",
            "interactive": {"list_reply": {"id": "opt-3", "title": "Terceira"}},
            "context": {"id": "m0"}
        })));

        assert_eq!(payload.text, Some(json!("opt-3")));
        // Citação pertence apenas ao ramo textual
        assert!(payload.quote_message_id.is_none());
    }

    #[test]
    fn test_location_and_order_serialized_as_string() {
        let location = build_message_payload(&message(json!({
            "id": "m3",
            "type": "location",
            "location": {"latitude": -23.5, "longitude": -46.6}
        })));
        let text = location.text.unwrap();
        assert!(text.is_string());
        let parsed: Value = serde_json::from_str(text.as_str().unwrap()).unwrap();
        assert_eq!(parsed["latitude"], json!(-23.5));

        let order = build_message_payload(&message(json!({
            "id": "m4",
            "type": "order",
            "order": {"catalog_id": "c1", "product_items": []}
        })));
        assert!(order.text.unwrap().is_string());
    }

    #[test]
    fn test_contacts_payload_keeps_object_shape() {
        let payload = build_message_payload(&message(json!({
            "id": "m5",
            "type": "contacts",
            "contacts": [{"name": {"formatted_name": "João"}}]
        })));

        let text = payload.text.unwrap();
        assert!(text.is_object());
        assert_eq!(text["contacts"][0]["name"]["formatted_name"], "João");
    }

    #[test]
    fn test_media_payload_uses_caption_as_text() {
        let with_caption = build_message_payload(&message(json!({
            "id": "m6",
            "type": "image",
            "image": {"id": "media-1", "mime_type": "image/jpeg", "caption": "olha isso"}
        })));
        assert_eq!(with_caption.text, Some(json!("olha isso")));
        // Campos de mídia só entram após o download
        assert!(with_caption.file.is_none());

        let without = build_message_payload(&message(json!({
            "id": "m7",
            "type": "audio",
            "audio": {"id": "media-2", "mime_type": "audio/ogg"}
        })));
        assert!(without.text.is_none());
    }

    #[test]
    fn test_contact_name_falls_back_to_sender() {
        let value: ChangeValue = serde_json::from_value(json!({
            "contacts": [{"wa_id": "5511999999999"}]
        }))
        .unwrap();
        let msg = message(json!({"id": "m8", "from": "5511999999999", "type": "text"}));
        assert_eq!(contact_name(&value, &msg), "5511999999999");

        let named: ChangeValue = serde_json::from_value(json!({
            "contacts": [{"wa_id": "5511999999999", "profile": {"name": "Maria"}}]
        }))
        .unwrap();
        assert_eq!(contact_name(&named, &msg), "Maria");
    }

    #[test]
    fn test_reduced_envelope_shape() {
        let envelope: InboundEnvelope = serde_json::from_value(json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "waba-1",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messages": [
                            {"id": "m1", "type": "text", "text": {"body": "a"}},
                            {"id": "m2", "type": "text", "text": {"body": "b"}}
                        ]
                    }
                }]
            }]
        }))
        .unwrap();

        assert_eq!(collect_message_ids(&envelope), vec!["m1", "m2"]);
        let reduced = reduced_envelope(&envelope);
        assert_eq!(reduced["object"], "whatsapp_business_account");
        assert_eq!(reduced["entry"], json!(["waba-1"]));
        assert_eq!(reduced["messages"], json!(["m1", "m2"]));
    }

    #[test]
    fn test_status_only_envelope_has_no_message_ids() {
        let envelope: InboundEnvelope = serde_json::from_value(json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "waba-1",
                "changes": [{
                    "field": "messages",
                    "value": {"statuses": [{"id": "m1", "status": "delivered"}]}
                }]
            }]
        }))
        .unwrap();
        assert!(collect_message_ids(&envelope).is_empty());
    }

    // ------------------------------------------------------------------
    // Pipeline completo contra um armazenamento RESP em processo, para
    // observar quais efeitos colaterais cada envelope realmente dispara.
    // ------------------------------------------------------------------

    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use httpmock::prelude::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use crate::services::lock::RetryPolicy;
    use meta_graph::MetaClient;

    /// Servidor RESP mínimo com estado em memória: o suficiente para
    /// dedup (EXISTS/SETEX), buffer (RPUSH/LTRIM) e lock (GET/SETEX/DEL).
    #[derive(Default)]
    struct StoreState {
        strings: HashMap<String, String>,
        lists: HashMap<String, Vec<String>>,
        commands: Vec<String>,
    }

    async fn spawn_store() -> (String, Arc<StdMutex<StoreState>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(StdMutex::new(StoreState::default()));
        let shared = Arc::clone(&state);

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let state = Arc::clone(&shared);
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 4096];
                    loop {
                        let n = match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => n,
                        };
                        buf.extend_from_slice(&chunk[..n]);
                        while let Some((args, consumed)) = parse_resp_command(&buf) {
                            buf.drain(..consumed);
                            let reply = respond(&state, &args);
                            if socket.write_all(reply.as_bytes()).await.is_err() {
                                return;
                            }
                        }
                    }
                });
            }
        });

        (format!("redis://{}", addr), state)
    }

    fn parse_resp_command(buf: &[u8]) -> Option<(Vec<String>, usize)> {
        let mut pos = 0;
        let header = read_resp_line(buf, &mut pos)?;
        let count: usize = header.strip_prefix('*')?.parse().ok()?;
        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            let len_line = read_resp_line(buf, &mut pos)?;
            let len: usize = len_line.strip_prefix('$')?.parse().ok()?;
            if buf.len() < pos + len + 2 {
                return None;
            }
            args.push(String::from_utf8_lossy(&buf[pos..pos + len]).into_owned());
            pos += len + 2;
        }
        Some((args, pos))
    }

    fn read_resp_line(buf: &[u8], pos: &mut usize) -> Option<String> {
        let end = buf[*pos..].windows(2).position(|w| w == b"\r\n")? + *pos;
        let line = String::from_utf8_lossy(&buf[*pos..end]).into_owned();
        *pos = end + 2;
        Some(line)
    }

    fn respond(state: &Arc<StdMutex<StoreState>>, args: &[String]) -> String {
        let mut state = state.lock().unwrap();
        let cmd = args.first().map(|c| c.to_uppercase()).unwrap_or_default();
        state.commands.push(cmd.clone());
        match cmd.as_str() {
            "GET" => match state.strings.get(&args[1]) {
                Some(v) => format!("${}\r\n{}\r\n", v.len(), v),
                None => "$-1\r\n".to_string(),
            },
            "SET" => {
                state.strings.insert(args[1].clone(), args[2].clone());
                "+OK\r\n".to_string()
            }
            "SETEX" => {
                state.strings.insert(args[1].clone(), args[3].clone());
                "+OK\r\n".to_string()
            }
            "DEL" => {
                let hit = state.strings.remove(&args[1]).is_some();
                format!(":{}\r\n", hit as i64)
            }
            "EXISTS" => {
                let hit = state.strings.contains_key(&args[1]);
                format!(":{}\r\n", hit as i64)
            }
            "RPUSH" => {
                let key = args[1].clone();
                let list = state.lists.entry(key).or_default();
                for value in &args[2..] {
                    list.push(value.clone());
                }
                format!(":{}\r\n", list.len())
            }
            "LTRIM" => "+OK\r\n".to_string(),
            "PING" => "+PONG\r\n".to_string(),
            // Comandos de setup do client (CLIENT SETINFO etc.)
            _ => "+OK\r\n".to_string(),
        }
    }

    /// Serviço completo apontando para o armazenamento em processo e um
    /// único slot de webhook externo. Backend realtime inalcançável de
    /// propósito: push falha rápido e o pipeline segue degradado.
    async fn pipeline_with_slot(
        redis_url: &str,
        slot_url: &str,
    ) -> (WebhookService, tempfile::NamedTempFile) {
        let yaml = format!(
            r#"
tenants:
  - external_id: "10"
    internal_id: 1
    admin_token: "tok"
    connections:
      - id: 3
        phone_number_id: "555"
        send_token: "meta-tok"
        verify_token: "v"
        external_webhooks:
          - url: "{slot_url}"
"#
        );
        let mut registry = tempfile::NamedTempFile::new().unwrap();
        registry.write_all(yaml.as_bytes()).unwrap();

        let redis = RedisService::connect(redis_url).await.unwrap();
        let service = WebhookService::new(
            TenantStore::new(registry.path()),
            redis.clone(),
            DistributedLock::new(redis, RetryPolicy::default()),
            MediaService::new(
                MetaClient::with_base_url("http://127.0.0.1:9"),
                std::env::temp_dir(),
            ),
            Arc::new(SocketService::new(
                "ws://127.0.0.1:9",
                Duration::from_millis(100),
            )),
            None,
            ForwarderService::new(),
        );
        (service, registry)
    }

    #[tokio::test]
    async fn test_disallowed_type_only_envelope_has_no_side_effects() {
        let (redis_url, store) = spawn_store().await;
        let server = MockServer::start_async().await;
        let slot = server
            .mock_async(|when, then| {
                when.method(POST).path("/slot");
                then.status(200);
            })
            .await;

        let (service, _registry) = pipeline_with_slot(&redis_url, &server.url("/slot")).await;

        let accepted = service
            .handle_inbound_event(
                "10",
                3,
                json!({
                    "object": "whatsapp_business_account",
                    "entry": [{
                        "id": "waba-1",
                        "changes": [{
                            "field": "messages",
                            "value": {
                                "contacts": [{"wa_id": "5511999999999", "profile": {"name": "Maria"}}],
                                "messages": [{
                                    "id": "m-react",
                                    "from": "5511999999999",
                                    "timestamp": "1700000000",
                                    "type": "reaction"
                                }]
                            }
                        }]
                    }]
                }),
            )
            .await
            .unwrap();
        assert!(accepted);

        // Tipo fora do allow-list: nenhum fan-out e nenhuma escrita no buffer
        assert_eq!(slot.hits_async().await, 0);
        assert!(!store.lock().unwrap().commands.iter().any(|c| c == "RPUSH"));
    }

    #[tokio::test]
    async fn test_status_only_envelope_skips_fan_out_and_buffer() {
        let (redis_url, store) = spawn_store().await;
        let server = MockServer::start_async().await;
        let slot = server
            .mock_async(|when, then| {
                when.method(POST).path("/slot");
                then.status(200);
            })
            .await;

        let (service, _registry) = pipeline_with_slot(&redis_url, &server.url("/slot")).await;

        service
            .handle_inbound_event(
                "10",
                3,
                json!({
                    "object": "whatsapp_business_account",
                    "entry": [{
                        "id": "waba-1",
                        "changes": [{
                            "field": "messages",
                            "value": {
                                "statuses": [{"id": "m1", "status": "delivered", "timestamp": "1700000001"}]
                            }
                        }]
                    }]
                }),
            )
            .await
            .unwrap();

        assert_eq!(slot.hits_async().await, 0);
        assert!(!store.lock().unwrap().commands.iter().any(|c| c == "RPUSH"));
    }

    #[tokio::test]
    async fn test_allow_listed_message_buffers_and_fans_out_once() {
        let (redis_url, store) = spawn_store().await;
        let server = MockServer::start_async().await;
        let slot = server
            .mock_async(|when, then| {
                when.method(POST).path("/slot");
                then.status(200);
            })
            .await;

        let (service, _registry) = pipeline_with_slot(&redis_url, &server.url("/slot")).await;

        let envelope = json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "waba-1",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "contacts": [{"wa_id": "5511999999999", "profile": {"name": "Maria"}}],
                        "messages": [{
                            "id": "m-text",
                            "from": "5511999999999",
                            "timestamp": "1700000000",
                            "type": "text",
                            "text": {"body": "oi"}
                        }]
                    }
                }]
            }]
        });

        let accepted = service
            .handle_inbound_event("10", 3, envelope.clone())
            .await
            .unwrap();
        assert!(accepted);
        assert_eq!(slot.hits_async().await, 1);

        // Envelope completo gravado no buffer da conexão
        {
            let state = store.lock().unwrap();
            let entries = state.lists.get("messages:10:3").unwrap();
            assert_eq!(entries.len(), 1);
            let stored: Value = serde_json::from_str(&entries[0]).unwrap();
            assert_eq!(stored["entry"][0]["id"], "waba-1");
        }

        // Reentrega do mesmo lote: curto-circuito do dedup, sem novo fan-out
        let accepted = service.handle_inbound_event("10", 3, envelope).await.unwrap();
        assert!(accepted);
        assert_eq!(slot.hits_async().await, 1);
    }
}
