//! Redis-backed notifier.
//!
//! Publishes each alert as JSON on a per-recipient pub/sub channel,
//! `<prefix>:dm:<principal>`. A chat gateway subscribed to
//! `<prefix>:dm:*` turns them into direct messages.

use crate::notifier::{Alert, Notifier, NotifyError, NotifyResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use warden_rbac::Principal;

/// Redis notifier configuration.
#[derive(Debug, Clone)]
pub struct RedisNotifierConfig {
    /// Redis connection URL (e.g., redis://localhost:6379).
    pub url: String,

    /// Channel prefix (default: "warden").
    pub channel_prefix: String,
}

impl Default for RedisNotifierConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            channel_prefix: "warden".to_string(),
        }
    }
}

/// Notifier publishing alerts to Redis.
pub struct RedisNotifier {
    conn: ConnectionManager,
    config: RedisNotifierConfig,
}

impl std::fmt::Debug for RedisNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisNotifier")
            .field("config", &self.config)
            .finish()
    }
}

impl RedisNotifier {
    /// Connect to Redis.
    pub async fn new(config: RedisNotifierConfig) -> NotifyResult<Self> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        Ok(Self { conn, config })
    }

    /// Channel alerts for `principal` are published on.
    pub fn channel_for(&self, principal: &Principal) -> String {
        channel_name(&self.config.channel_prefix, principal)
    }
}

fn channel_name(prefix: &str, principal: &Principal) -> String {
    format!("{}:dm:{}", prefix, principal)
}

#[async_trait]
impl Notifier for RedisNotifier {
    async fn send_direct(&self, principal: &Principal, alert: &Alert) -> NotifyResult<()> {
        let channel = self.channel_for(principal);
        let payload =
            serde_json::to_string(alert).map_err(|e| NotifyError::Serialization(e.to_string()))?;

        let mut conn = self.conn.clone();
        let receivers: i64 = conn
            .publish(&channel, &payload)
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        if receivers == 0 {
            tracing::warn!(channel = %channel, alert_id = %alert.id, "No gateway subscribed to alert channel");
        } else {
            tracing::debug!(channel = %channel, alert_id = %alert.id, "Published alert to Redis");
        }

        Ok(())
    }
}
