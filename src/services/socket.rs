//! Cliente de push em tempo real para o backend de atendimento.
//!
//! Uma conexão websocket persistente por tenant, criada sob demanda e
//! cacheada num mapa explícito de posse do serviço. Cada push emite um
//! frame `{event, payload, ack}` e espera o ack `{ack, ok, error}` do
//! backend dentro do timeout; erro de transporte, `{ok: false}` e timeout
//! contam igualmente como falha — e falha de push nunca propaga, vira log.
//!
//! A desconexão evicta a entrada do cache apenas se ela ainda for a mesma
//! conexão que registrou o callback (checagem de identidade por id), para
//! não derrubar uma conexão recém-recriada por outro push.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex, RwLock};
use tokio::time::{timeout, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::utils::logging::log_realtime_push;

/// Eventos nomeados do contrato com o backend.
pub const EVENT_RECEIVED_MESSAGE: &str = "receivedMessageWhatsAppOficial";
pub const EVENT_READ_MESSAGE: &str = "readMessageWhatsAppOficial";
pub const EVENT_MESSAGE_STATUS: &str = "messageStatusUpdateWhatsAppOficial";
pub const EVENT_TEMPLATE_STATUS: &str = "templateStatusUpdateWhatsAppOficial";

/// Janela mínima entre logs de erro de conexão do mesmo tenant.
const CONNECT_ERROR_LOG_WINDOW: Duration = Duration::from_secs(10);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Ack do backend: `{ack, ok?, error?}`.
#[derive(Debug, Clone, Deserialize)]
struct AckFrame {
    #[serde(default)]
    ack: Option<u64>,
    #[serde(default)]
    ok: Option<bool>,
    #[serde(default)]
    error: Option<String>,
}

struct SocketConnection {
    id: Uuid,
    sink: Mutex<WsSink>,
    connected: AtomicBool,
    pending: Mutex<HashMap<u64, oneshot::Sender<AckFrame>>>,
    seq: AtomicU64,
}

type ConnectionMap = Arc<RwLock<HashMap<String, Arc<SocketConnection>>>>;

#[derive(Clone)]
pub struct SocketService {
    backend_url: String,
    ack_timeout: Duration,
    connections: ConnectionMap,
    last_connect_error: Arc<RwLock<HashMap<String, Instant>>>,
}

impl SocketService {
    pub fn new(backend_url: impl Into<String>, ack_timeout: Duration) -> Self {
        Self {
            backend_url: backend_url.into(),
            ack_timeout,
            connections: Arc::new(RwLock::new(HashMap::new())),
            last_connect_error: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn endpoint(&self, tenant_id: &str, admin_token: &str) -> String {
        format!(
            "{}/{}?token={}&transport=websocket",
            self.backend_url.trim_end_matches('/'),
            tenant_id,
            urlencoding::encode(&format!("Bearer {}", admin_token))
        )
    }

    /// Emite um evento nomeado e espera o ack. `true` apenas quando o
    /// backend confirmou sem `{ok: false}` dentro do timeout.
    pub async fn push(
        &self,
        tenant_id: &str,
        admin_token: &str,
        event: &str,
        payload: Value,
    ) -> bool {
        let connection = match self.live_connection(tenant_id, admin_token).await {
            Some(connection) => connection,
            None => {
                log_realtime_push(tenant_id, event, false);
                return false;
            }
        };

        let ack_id = connection.seq.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        connection.pending.lock().await.insert(ack_id, tx);

        let frame = json!({"event": event, "payload": payload, "ack": ack_id}).to_string();
        {
            let mut sink = connection.sink.lock().await;
            if let Err(e) = sink.send(Message::Text(frame)).await {
                warn!("Socket send failed for tenant {}: {}", tenant_id, e);
                connection.connected.store(false, Ordering::SeqCst);
                connection.pending.lock().await.remove(&ack_id);
                self.evict_if_same(tenant_id, connection.id).await;
                log_realtime_push(tenant_id, event, false);
                return false;
            }
        }

        let ok = match timeout(self.ack_timeout, rx).await {
            Ok(Ok(ack)) => ack.ok.unwrap_or(true) && ack.error.is_none(),
            // Conexão caiu antes do ack
            Ok(Err(_)) => false,
            // Timeout de ack: descarta o pendente
            Err(_) => {
                connection.pending.lock().await.remove(&ack_id);
                false
            }
        };

        log_realtime_push(tenant_id, event, ok);
        ok
    }

    /// Conexão cacheada se viva; senão recria dentro do timeout.
    async fn live_connection(
        &self,
        tenant_id: &str,
        admin_token: &str,
    ) -> Option<Arc<SocketConnection>> {
        {
            let map = self.connections.read().await;
            if let Some(connection) = map.get(tenant_id) {
                if connection.connected.load(Ordering::SeqCst) {
                    return Some(Arc::clone(connection));
                }
            }
        }

        match timeout(self.ack_timeout, connect_async(self.endpoint(tenant_id, admin_token))).await
        {
            Ok(Ok((stream, _response))) => {
                let (sink, source) = stream.split();
                let connection = Arc::new(SocketConnection {
                    id: Uuid::new_v4(),
                    sink: Mutex::new(sink),
                    connected: AtomicBool::new(true),
                    pending: Mutex::new(HashMap::new()),
                    seq: AtomicU64::new(0),
                });

                self.connections
                    .write()
                    .await
                    .insert(tenant_id.to_string(), Arc::clone(&connection));

                self.spawn_reader(tenant_id.to_string(), Arc::clone(&connection), source);
                info!("Realtime connection established: tenant={}", tenant_id);
                Some(connection)
            }
            Ok(Err(e)) => {
                self.log_connect_error(tenant_id, &e.to_string()).await;
                None
            }
            Err(_) => {
                self.log_connect_error(tenant_id, "connect timeout").await;
                None
            }
        }
    }

    fn spawn_reader(&self, tenant_id: String, connection: Arc<SocketConnection>, mut source: WsSource) {
        let connections = Arc::clone(&self.connections);
        tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        let ack: AckFrame = match serde_json::from_str(&text) {
                            Ok(ack) => ack,
                            Err(e) => {
                                debug!("Ignoring unparseable frame from backend: {}", e);
                                continue;
                            }
                        };
                        if let Some(ack_id) = ack.ack {
                            if let Some(tx) =
                                connection.pending.lock().await.remove(&ack_id)
                            {
                                let _ = tx.send(ack);
                            }
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        debug!("Realtime read error for tenant {}: {}", tenant_id, e);
                        break;
                    }
                }
            }

            connection.connected.store(false, Ordering::SeqCst);
            // Pendentes sem ack falham ao derrubar os senders
            connection.pending.lock().await.clear();

            let mut map = connections.write().await;
            if let Some(current) = map.get(&tenant_id) {
                if current.id == connection.id {
                    map.remove(&tenant_id);
                    info!("Realtime connection evicted: tenant={}", tenant_id);
                }
            }
        });
    }

    async fn evict_if_same(&self, tenant_id: &str, connection_id: Uuid) {
        let mut map = self.connections.write().await;
        if let Some(current) = map.get(tenant_id) {
            if current.id == connection_id {
                map.remove(tenant_id);
            }
        }
    }

    /// No máximo um log de erro por tenant por janela, para não inundar o
    /// log durante uma indisponibilidade do backend.
    async fn log_connect_error(&self, tenant_id: &str, detail: &str) {
        let now = Instant::now();
        let mut last = self.last_connect_error.write().await;
        let should_log = last
            .get(tenant_id)
            .map(|at| now.duration_since(*at) >= CONNECT_ERROR_LOG_WINDOW)
            .unwrap_or(true);
        if should_log {
            last.insert(tenant_id.to_string(), now);
            error!("Realtime connect failed: tenant={} - {}", tenant_id, detail);
        } else {
            debug!("Realtime connect failed (throttled): tenant={}", tenant_id);
        }
    }

    /// Drena todas as conexões no shutdown.
    pub async fn close(&self) {
        let mut map = self.connections.write().await;
        for (tenant_id, connection) in map.drain() {
            connection.connected.store(false, Ordering::SeqCst);
            let mut sink = connection.sink.lock().await;
            if let Err(e) = sink.send(Message::Close(None)).await {
                debug!("Close frame failed for tenant {}: {}", tenant_id, e);
            }
        }
    }
}
