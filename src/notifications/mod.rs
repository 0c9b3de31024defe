//! # Notifications
//!
//! Email dispatch behind a trait seam: template lookup plus enqueue of a
//! fully-built message onto the email queue. The core never sends mail
//! itself; a downstream consumer renders and delivers. A template without
//! declared parameters suppresses sending rather than emitting a message
//! the renderer cannot fill.

use crate::config::{EmailTemplateConfig, NotificationConfig};
use crate::messaging::{MessagingResult, QueueClient};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// One notification template: subject, body and the parameter names the
/// body expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub id: String,
    pub asunto: String,
    pub cuerpo: String,
    pub parametros: Vec<String>,
    pub destinatarios: Vec<String>,
}

impl From<&EmailTemplateConfig> for EmailTemplate {
    fn from(config: &EmailTemplateConfig) -> Self {
        Self {
            id: config.id.clone(),
            asunto: config.asunto.clone(),
            cuerpo: config.cuerpo.clone(),
            parametros: config.parametros.clone(),
            destinatarios: config.destinatarios.clone(),
        }
    }
}

/// Fully-built email message enqueued for a downstream renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub template_id: String,
    pub asunto: String,
    pub destinatarios: Vec<String>,
    /// Parameter name to value, covering the template's declared names
    pub parametros: HashMap<String, String>,
}

/// Notification collaborator contract.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn lookup_template(&self, template_id: &str) -> Option<EmailTemplate>;

    async fn enqueue(&self, message: EmailMessage) -> MessagingResult<()>;
}

/// Production notifier: configured template map plus the email queue.
pub struct QueueNotifier {
    templates: HashMap<String, EmailTemplate>,
    queue: Arc<dyn QueueClient>,
    email_queue_name: String,
}

impl QueueNotifier {
    pub fn new(
        config: &NotificationConfig,
        email_queue_name: impl Into<String>,
        queue: Arc<dyn QueueClient>,
    ) -> Self {
        let templates = config
            .plantillas
            .iter()
            .map(|t| (t.id.clone(), EmailTemplate::from(t)))
            .collect();
        Self {
            templates,
            queue,
            email_queue_name: email_queue_name.into(),
        }
    }
}

#[async_trait]
impl Notifier for QueueNotifier {
    fn lookup_template(&self, template_id: &str) -> Option<EmailTemplate> {
        self.templates.get(template_id).cloned()
    }

    async fn enqueue(&self, message: EmailMessage) -> MessagingResult<()> {
        let body = serde_json::to_value(&message)?;
        let message_id = self.queue.send(&self.email_queue_name, &body).await?;
        info!(
            template = %message.template_id,
            queue = %self.email_queue_name,
            message_id,
            "Notification enqueued"
        );
        Ok(())
    }
}

/// Build the parameter map for a template from the error context.
///
/// Only the template's declared names are filled; unknown declared names
/// get an empty value so the renderer sees every key it expects.
pub fn build_parametros(
    template: &EmailTemplate,
    nombre_archivo: &str,
    codigo_error: &str,
    descripcion_error: &str,
) -> HashMap<String, String> {
    let mut parametros = HashMap::new();
    for nombre in &template.parametros {
        let valor = match nombre.as_str() {
            "nombre_archivo" => nombre_archivo.to_string(),
            "codigo_error" => codigo_error.to_string(),
            "descripcion_error" => descripcion_error.to_string(),
            "fecha" => chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            other => {
                debug!(parametro = other, "Template declares a parameter with no known source");
                String::new()
            }
        };
        parametros.insert(nombre.clone(), valor);
    }
    parametros
}
