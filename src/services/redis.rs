//! Usos do armazenamento efêmero, todos namespaced para não colidir:
//! `webhook:processed:*` (ledger de idempotência com TTL),
//! `messages:*` (buffer circular por tenant+conexão, sem TTL) e
//! `lock:*` (exclusão mútua distribuída, ver `lock.rs`).

use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::utils::{AppError, AppResult, DegradedError, DegradedResult};

/// TTL do marcador de idempotência: janela de retry agressivo do provider.
pub const DEDUP_TTL_SECS: u64 = 300;

/// Capacidade do buffer de mensagens recentes (FIFO, mais novas no fim).
pub const RECENT_BUFFER_SIZE: isize = 50;

#[derive(Clone)]
pub struct RedisService {
    conn: ConnectionManager,
}

impl RedisService {
    /// Conecta com reconexão automática (ConnectionManager).
    pub async fn connect(url: &str) -> AppResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| AppError::RedisError(format!("Invalid Redis URL: {}", e)))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::RedisError(format!("Failed to connect to Redis: {}", e)))?;
        Ok(Self { conn })
    }

    fn dedup_key(tenant_external_id: &str, message_id: &str) -> String {
        format!("webhook:processed:{}:{}", tenant_external_id, message_id)
    }

    fn buffer_key(tenant_external_id: &str, connection_id: i64) -> String {
        format!("messages:{}:{}", tenant_external_id, connection_id)
    }

    /// Algum dos ids já tem marcador vivo? Presença significa que a entrega
    /// já foi processada (total ou parcialmente) e o reprocessamento deve
    /// curto-circuitar antes de qualquer efeito colateral.
    pub async fn any_processed(
        &self,
        tenant_external_id: &str,
        message_ids: &[&str],
    ) -> DegradedResult<bool> {
        let mut conn = self.conn.clone();
        for id in message_ids {
            let exists: bool = conn
                .exists(Self::dedup_key(tenant_external_id, id))
                .await
                .map_err(|e| DegradedError::new("dedup-check", e.to_string()))?;
            if exists {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Marca a mensagem como vista, com expiração automática. Nunca é
    /// removido explicitamente.
    pub async fn mark_processed(
        &self,
        tenant_external_id: &str,
        message_id: &str,
    ) -> DegradedResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(
                Self::dedup_key(tenant_external_id, message_id),
                "1",
                DEDUP_TTL_SECS,
            )
            .await
            .map_err(|e| DegradedError::new("dedup-mark", e.to_string()))?;
        Ok(())
    }

    /// Anexa ao buffer circular e poda para as N mais recentes.
    pub async fn append_recent(
        &self,
        tenant_external_id: &str,
        connection_id: i64,
        raw_json: &str,
    ) -> DegradedResult<()> {
        let key = Self::buffer_key(tenant_external_id, connection_id);
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .rpush(&key, raw_json)
            .await
            .map_err(|e| DegradedError::new("buffer-append", e.to_string()))?;
        let _: () = conn
            .ltrim(&key, -RECENT_BUFFER_SIZE, -1)
            .await
            .map_err(|e| DegradedError::new("buffer-trim", e.to_string()))?;
        Ok(())
    }

    /// Conteúdo atual do buffer, do mais antigo ao mais novo.
    pub async fn recent_messages(
        &self,
        tenant_external_id: &str,
        connection_id: i64,
    ) -> DegradedResult<Vec<String>> {
        let mut conn = self.conn.clone();
        conn.lrange(Self::buffer_key(tenant_external_id, connection_id), 0, -1)
            .await
            .map_err(|e| DegradedError::new("buffer-read", e.to_string()))
    }

    /// Ping para o probe de readiness.
    pub async fn ping(&self) -> bool {
        let mut conn = self.conn.clone();
        let pong: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
        pong.is_ok()
    }

    // Primitivas cruas usadas pelo lock distribuído

    pub(crate) async fn get_raw(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(key)
            .await
            .map_err(|e| AppError::RedisError(e.to_string()))
    }

    pub(crate) async fn set_ex_raw(&self, key: &str, value: &str, ttl_secs: u64) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(key, value, ttl_secs)
            .await
            .map_err(|e| AppError::RedisError(e.to_string()))?;
        Ok(())
    }

    pub(crate) async fn del_raw(&self, key: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .del(key)
            .await
            .map_err(|e| AppError::RedisError(e.to_string()))?;
        Ok(())
    }
}
