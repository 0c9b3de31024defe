//! # Messaging Error Types
//!
//! Structured error handling for queue operations using thiserror instead
//! of `Box<dyn Error>` patterns. Everything here is connectivity-shaped
//! and therefore retryable under the crate taxonomy.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MessagingError {
    #[error("Queue operation failed: {queue_name}: {operation}: {message}")]
    QueueOperation {
        queue_name: String,
        operation: String,
        message: String,
    },

    #[error("Queue not found: {queue_name}")]
    QueueNotFound { queue_name: String },

    #[error("Message serialization error: {message}")]
    MessageSerialization { message: String },

    #[error("Message deserialization error: {message}")]
    MessageDeserialization { message: String },

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },
}

impl MessagingError {
    pub fn queue_operation(
        queue_name: impl Into<String>,
        operation: impl Into<String>,
        message: impl ToString,
    ) -> Self {
        Self::QueueOperation {
            queue_name: queue_name.into(),
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    pub fn serialization(message: impl ToString) -> Self {
        Self::MessageSerialization {
            message: message.to_string(),
        }
    }

    pub fn deserialization(message: impl ToString) -> Self {
        Self::MessageDeserialization {
            message: message.to_string(),
        }
    }

    pub fn database_connection(message: impl ToString) -> Self {
        Self::DatabaseConnection {
            message: message.to_string(),
        }
    }
}

impl From<serde_json::Error> for MessagingError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err)
    }
}

pub type MessagingResult<T> = Result<T, MessagingError>;
