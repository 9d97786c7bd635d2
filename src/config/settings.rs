use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub backend: BackendSettings,
    pub redis: RedisSettings,
    pub rabbitmq: RabbitMqSettings,
    pub meta: MetaSettings,
    pub storage: StorageSettings,
    pub tenants: TenantSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Backend de atendimento que recebe os eventos em tempo real.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackendSettings {
    /// URL base websocket, ex.: `ws://backend.interno:3001`
    pub url: String,
    /// Timeout de ack por push (padrão 10s)
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RedisSettings {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RabbitMqSettings {
    /// URL AMQP; opcional porque a publicação é opt-in por tenant
    pub url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MetaSettings {
    /// Base alternativa da Graph API (testes/proxy); default do crate se ausente
    pub base_url: Option<String>,
    /// Validação do X-Hub-Signature-256 nos webhooks
    #[serde(default)]
    pub validate_signature: bool,
    pub app_secret: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StorageSettings {
    /// Raiz de mídia baixada: {root}/{tenant}/{conexão}/{mediaId}.{ext}
    pub root: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TenantSettings {
    /// Registro YAML de empresas e conexões, relido a cada webhook
    pub registry: String,
}

fn default_ack_timeout_ms() -> u64 {
    10_000
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            // Arquivo de configuração base
            .add_source(File::with_name("config/default").required(false))
            // Arquivo específico do ambiente
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false));

        // Overrides pontuais por variável de ambiente
        if let Ok(url) = std::env::var("REDIS_URL") {
            builder = builder.set_override("redis.url", url)?;
        }
        if let Ok(url) = std::env::var("RABBITMQ_URL") {
            builder = builder.set_override("rabbitmq.url", url)?;
        }
        if let Ok(url) = std::env::var("BACKEND_URL") {
            builder = builder.set_override("backend.url", url)?;
        }
        if let Ok(path) = std::env::var("TENANT_REGISTRY") {
            builder = builder.set_override("tenants.registry", path)?;
        }
        if let Ok(root) = std::env::var("STORAGE_ROOT") {
            builder = builder.set_override("storage.root", root)?;
        }
        if let Ok(secret) = std::env::var("META_APP_SECRET") {
            builder = builder.set_override("meta.app_secret", secret)?;
        }

        builder = builder.add_source(Environment::with_prefix("WHATSAPP_GATEWAY"));

        let s = builder.build()?;

        s.try_deserialize()
    }
}
