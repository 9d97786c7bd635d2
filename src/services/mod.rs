pub mod forwarder;
pub mod lock;
pub mod media;
pub mod rabbitmq;
pub mod redis;
pub mod socket;
pub mod tenant_store;
pub mod webhook;

pub use forwarder::ForwarderService;
pub use lock::{DistributedLock, RetryPolicy};
pub use media::MediaService;
pub use rabbitmq::RabbitMqService;
pub use redis::RedisService;
pub use socket::SocketService;
pub use tenant_store::TenantStore;
pub use webhook::WebhookService;
