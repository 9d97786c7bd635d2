//! Exclusão mútua distribuída sobre o armazenamento efêmero.
//!
//! Não é um CAS atômico: leitura → escrita com TTL → releitura. As janelas
//! de contenção são curtas e o custo de uma dupla aquisição rara é limitado
//! pelo TTL. O valor do lock é um token aleatório; o release só apaga a
//! chave se o token armazenado ainda for o do chamador, para não liberar um
//! lock readquirido por outro processo após expiração.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use uuid::Uuid;

use crate::services::redis::RedisService;
use crate::utils::{AppError, AppResult};

/// TTL do lock: limite de recuperação quando o dono morre sem liberar.
const LOCK_TTL_SECS: u64 = 30;

/// Cadência de aquisição explícita em vez de constantes espalhadas.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_duration: Duration,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_duration: Duration::from_secs(5),
            interval: Duration::from_millis(50),
        }
    }
}

#[derive(Clone)]
pub struct DistributedLock {
    redis: RedisService,
    policy: RetryPolicy,
}

/// Posse de um lock. Liberada explicitamente via `DistributedLock::release`.
#[derive(Debug)]
pub struct LockGuard {
    key: String,
    token: String,
}

impl DistributedLock {
    pub fn new(redis: RedisService, policy: RetryPolicy) -> Self {
        Self { redis, policy }
    }

    fn lock_key(key: &str) -> String {
        format!("lock:{}", key)
    }

    /// Spin-poll até adquirir ou estourar `policy.max_duration`.
    pub async fn acquire(&self, key: &str) -> AppResult<LockGuard> {
        let lock_key = Self::lock_key(key);
        let token = Uuid::new_v4().to_string();
        let deadline = Instant::now() + self.policy.max_duration;

        loop {
            let current = self.redis.get_raw(&lock_key).await?;
            if current.is_none() {
                self.redis
                    .set_ex_raw(&lock_key, &token, LOCK_TTL_SECS)
                    .await?;
                // Releitura: outro processo pode ter escrito entre o GET e o SET
                if self.redis.get_raw(&lock_key).await?.as_deref() == Some(token.as_str()) {
                    return Ok(LockGuard {
                        key: lock_key,
                        token,
                    });
                }
            }

            if Instant::now() >= deadline {
                return Err(AppError::LockTimeout(format!(
                    "Could not acquire lock '{}' within {:?}",
                    key, self.policy.max_duration
                )));
            }
            sleep(self.policy.interval).await;
        }
    }

    /// Libera apenas se o token ainda for do chamador.
    pub async fn release(&self, guard: LockGuard) -> AppResult<()> {
        let current = self.redis.get_raw(&guard.key).await?;
        if current.as_deref() == Some(guard.token.as_str()) {
            self.redis.del_raw(&guard.key).await?;
        }
        Ok(())
    }

    /// Adquire, executa e sempre libera, inclusive quando `f` falha.
    pub async fn with_lock<F, Fut, T>(&self, key: &str, f: F) -> AppResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let guard = self.acquire(key).await?;
        let result = f().await;
        // Falha de release não mascara o resultado da seção crítica
        if let Err(e) = self.release(guard).await {
            tracing::warn!("Failed to release lock '{}': {}", key, e);
        }
        result
    }
}
