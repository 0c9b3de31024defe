//! # Messaging
//!
//! Queue collaborator contract, its pgmq production implementation, and
//! the message shapes the core reads and writes.

pub mod errors;
pub mod message;
pub mod pgmq_client;

use async_trait::async_trait;

pub use errors::{MessagingError, MessagingResult};
pub use message::{ArchivoRtaMessage, InboundRecord, StorageEventMessage};
pub use pgmq_client::PgmqClient;

/// Queue collaborator contract. The receipt handle is
/// the queue's message id; `send_delayed` leans on the queue's native
/// delay mechanism, never an in-process timer.
#[async_trait]
pub trait QueueClient: Send + Sync {
    async fn create_queue(&self, queue_name: &str) -> MessagingResult<()>;

    async fn send(&self, queue_name: &str, body: &serde_json::Value) -> MessagingResult<i64>;

    async fn send_delayed(
        &self,
        queue_name: &str,
        body: &serde_json::Value,
        delay_seconds: u64,
    ) -> MessagingResult<i64>;

    async fn delete(&self, queue_name: &str, receipt_handle: i64) -> MessagingResult<()>;

    async fn read_batch(
        &self,
        queue_name: &str,
        visibility_timeout_secs: i32,
        limit: i32,
    ) -> MessagingResult<Vec<InboundRecord>>;
}
