//! # RTA Processor
//!
//! Queue consumer binary. Builds every collaborator once at startup
//! (explicit dependency injection, no global registries), ensures the
//! queues exist, then long-polls the inbound queue and hands each batch to
//! the ingestion processor until interrupted. A fatal error from the
//! processor stops the process; everything recoverable was already routed
//! to the retry policy inside.

use anyhow::Context;
use rta_core::config::{ConfigManager, ConfigParameterStore, ParameterStore};
use rta_core::logging::init_structured_logging;
use rta_core::manifest::ManifestRules;
use rta_core::messaging::{PgmqClient, QueueClient};
use rta_core::naming::NameGrammar;
use rta_core::notifications::QueueNotifier;
use rta_core::orchestration::{
    ErrorEscalationService, IngestionProcessor, ProcessorSettings, RetryCoordinator,
};
use rta_core::persistence::PgArchivoRepository;
use rta_core::state_machine::ArchivoStateMachine;
use rta_core::storage::S3ObjectStore;
use rta_core::archive::ZipContentValidator;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging();

    let manager = ConfigManager::load().context("configuration load failed")?;
    let config = manager.config().clone();

    // credentials resolve through the parameter store, not the raw config
    let parameters = ConfigParameterStore::new(&config);
    let database_url = match &config.database.credential_secret {
        Some(name) => {
            let secret = parameters
                .get_secret(name)
                .context("database credential secret lookup failed")?;
            config.database.resolved_url_with(&secret)
        }
        None => config.database.resolved_url(),
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.database.idle_timeout_secs))
        .connect(&database_url)
        .await
        .context("database connection failed")?;
    info!("Database pool established");

    let queue: Arc<dyn QueueClient> = Arc::new(PgmqClient::new_with_pool(pool.clone()).await);
    for name in [
        &config.queues.entrada,
        &config.queues.salida,
        &config.queues.notificaciones,
    ] {
        queue.create_queue(name).await.context("queue setup failed")?;
    }

    let storage = Arc::new(S3ObjectStore::new(&config.storage).await);
    let repository = Arc::new(PgArchivoRepository::new(pool));
    let notifier = Arc::new(QueueNotifier::new(
        &config.notificaciones,
        config.queues.notificaciones.clone(),
        queue.clone(),
    ));

    let grammar = NameGrammar::new(&config.naming).context("naming grammar compilation failed")?;
    let rules = ManifestRules::new(&config.manifiestos, &config.naming);
    let state_machine = Arc::new(ArchivoStateMachine::new(
        repository.clone(),
        &config.states.validos,
    ));

    let escalation = Arc::new(ErrorEscalationService::new(
        storage.clone(),
        queue.clone(),
        repository.clone(),
        notifier,
        &config.storage,
        config.queues.entrada.clone(),
    ));
    let retry = RetryCoordinator::new(
        state_machine.clone(),
        repository.clone(),
        queue.clone(),
        escalation.clone(),
        config.retry.respuesta.clone(),
        config.queues.entrada.clone(),
        config.notificaciones.template_fallo_tecnico.clone(),
    );

    let processor = IngestionProcessor::new(
        grammar,
        ZipContentValidator::new(rules),
        repository,
        storage,
        queue.clone(),
        state_machine,
        retry,
        escalation,
        ProcessorSettings::from_config(&config),
    );

    info!(queue = %config.queues.entrada, "RTA processor started");
    run_consumer_loop(&processor, queue, &config).await
}

/// Long-poll the inbound queue until interrupted.
async fn run_consumer_loop(
    processor: &IngestionProcessor,
    queue: Arc<dyn QueueClient>,
    config: &rta_core::RtaConfig,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received; stopping consumer loop");
                return Ok(());
            }
            batch = queue.read_batch(
                &config.queues.entrada,
                config.queues.visibility_timeout_secs,
                config.queues.batch_size,
            ) => {
                match batch {
                    Ok(records) if records.is_empty() => {
                        tokio::time::sleep(Duration::from_millis(config.queues.poll_interval_ms))
                            .await;
                    }
                    Ok(records) => {
                        if let Err(e) = processor.process_batch(records).await {
                            error!(error = %e, "Fatal processing error; stopping");
                            return Err(e.into());
                        }
                    }
                    Err(e) => {
                        // connectivity blip: back off and poll again
                        warn!(error = %e, "Queue read failed; backing off");
                        tokio::time::sleep(Duration::from_millis(config.queues.poll_interval_ms))
                            .await;
                    }
                }
            }
        }
    }
}
