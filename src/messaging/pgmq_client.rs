//! # PostgreSQL Message Queue Client (pgmq-rs)
//!
//! Production queue collaborator. Delayed redelivery uses pgmq's native
//! `send_delay`, visibility timeouts give at-least-once delivery, and the
//! receipt handle is the pgmq message id.

use super::errors::{MessagingError, MessagingResult};
use super::message::InboundRecord;
use super::QueueClient;
use async_trait::async_trait;
use pgmq::PGMQueue;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct PgmqClient {
    pgmq: PGMQueue,
}

impl PgmqClient {
    /// Create new pgmq client using a connection string.
    pub async fn new(database_url: &str) -> MessagingResult<Self> {
        let pgmq = PGMQueue::new(database_url.to_string())
            .await
            .map_err(MessagingError::database_connection)?;
        info!("Connected to pgmq");
        Ok(Self { pgmq })
    }

    /// Create new pgmq client sharing an existing connection pool.
    pub async fn new_with_pool(pool: sqlx::PgPool) -> Self {
        let pgmq = PGMQueue::new_with_pool(pool).await;
        debug!("pgmq client created with shared pool");
        Self { pgmq }
    }
}

#[async_trait]
impl QueueClient for PgmqClient {
    async fn create_queue(&self, queue_name: &str) -> MessagingResult<()> {
        self.pgmq
            .create(queue_name)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "create", e))?;
        debug!(queue = queue_name, "Queue ensured");
        Ok(())
    }

    async fn send(&self, queue_name: &str, body: &serde_json::Value) -> MessagingResult<i64> {
        let message_id = self
            .pgmq
            .send(queue_name, body)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "send", e))?;
        debug!(queue = queue_name, message_id, "Message sent");
        Ok(message_id)
    }

    async fn send_delayed(
        &self,
        queue_name: &str,
        body: &serde_json::Value,
        delay_seconds: u64,
    ) -> MessagingResult<i64> {
        let message_id = self
            .pgmq
            .send_delay(queue_name, body, delay_seconds)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "send_delay", e))?;
        debug!(
            queue = queue_name,
            message_id, delay_seconds, "Delayed message sent"
        );
        Ok(message_id)
    }

    async fn delete(&self, queue_name: &str, receipt_handle: i64) -> MessagingResult<()> {
        self.pgmq
            .delete(queue_name, receipt_handle)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "delete", e))?;
        debug!(queue = queue_name, receipt_handle, "Message deleted");
        Ok(())
    }

    async fn read_batch(
        &self,
        queue_name: &str,
        visibility_timeout_secs: i32,
        limit: i32,
    ) -> MessagingResult<Vec<InboundRecord>> {
        let messages = self
            .pgmq
            .read_batch::<serde_json::Value>(queue_name, Some(visibility_timeout_secs), limit)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "read_batch", e))?
            .unwrap_or_default();

        debug!(queue = queue_name, count = messages.len(), "Messages read");
        Ok(messages
            .into_iter()
            .map(|m| InboundRecord {
                receipt_handle: m.msg_id,
                body: m.message.to_string(),
            })
            .collect())
    }
}
