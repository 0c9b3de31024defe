//! # Structured Logging Module
//!
//! Environment-aware structured logging that outputs to both console and files
//! for tracing message-driven ingestion runs across async boundaries.

use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment);

        let log_dir = PathBuf::from("log");
        if !log_dir.exists() {
            if let Err(e) = fs::create_dir_all(&log_dir) {
                eprintln!("Failed to create log directory: {e}");
                return;
            }
        }

        // Log file name carries environment, PID, and timestamp so parallel
        // consumers never clobber each other's output
        let pid = process::id();
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let log_filename = format!("{environment}.{pid}.{timestamp}.log");
        let log_path = log_dir.join(&log_filename);

        let file_appender = tracing_appender::rolling::never(&log_dir, log_filename);
        let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);

        let subscriber = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_level(true)
                    .with_ansi(true)
                    .with_filter(EnvFilter::new(log_level.clone())),
            )
            .with(
                fmt::layer()
                    .with_writer(file_writer)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_level(true)
                    .with_ansi(false)
                    .json()
                    .with_filter(EnvFilter::new(log_level)),
            );

        // Use try_init to avoid panic if a global subscriber already exists
        // (test harnesses set one up before the code under test runs)
        if subscriber.try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }

        tracing::info!(
            pid = pid,
            environment = %environment,
            log_file = %log_path.display(),
            "Structured logging initialized with file output"
        );

        // The guard must outlive the process or buffered lines are lost
        std::mem::forget(_guard);
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("RTA_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for archivo lifecycle operations
pub fn log_archivo_operation(
    operation: &str,
    archivo_id: Option<i64>,
    nombre_archivo: Option<&str>,
    estado: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        archivo_id = archivo_id,
        nombre_archivo = nombre_archivo,
        estado = %estado,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "ARCHIVO_OPERATION"
    );
}

/// Log structured data for queue operations
pub fn log_queue_operation(
    operation: &str,
    queue_name: &str,
    message_id: Option<i64>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        queue_name = %queue_name,
        message_id = message_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "QUEUE_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "PROCESSING_ERROR"
    );
}
