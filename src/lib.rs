#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # RTA Core
//!
//! Ingestion core for compressed response files delivered as object-store
//! creation events routed through a queue. Each inbound zip is classified
//! against two configured filename families, moved to a working area,
//! decompressed, validated against the response type's manifest, and
//! tracked in a persistent per-file state machine with a retry/escalation
//! policy for technical failures.
//!
//! ## Module Organization
//!
//! - [`naming`] - filename grammar: classification, validation, extraction
//! - [`manifest`] - expected zip contents per response type
//! - [`archive`] - decompression and the pure content validator
//! - [`models`] - sqlx entities: archivo, audit log, attempts, sub-files
//! - [`state_machine`] - archivo lifecycle with atomic audit persistence
//! - [`persistence`] - repository seam over the entities
//! - [`storage`] - object store contract and its S3 implementation
//! - [`messaging`] - queue contract, pgmq client, message shapes
//! - [`notifications`] - template lookup and email enqueue
//! - [`orchestration`] - the per-message flow, retry policy, escalation
//! - [`config`] - validated startup configuration and parameter store
//! - [`error`] - crate-wide failure taxonomy
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rta_core::config::ConfigManager;
//! use rta_core::naming::NameGrammar;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let grammar = NameGrammar::new(&manager.config().naming)?;
//! let kind = grammar.classify("RE_ESP_TUTGMF0001003920241002-0001.zip");
//! println!("classified as {kind:?}");
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod messaging;
pub mod models;
pub mod naming;
pub mod notifications;
pub mod orchestration;
pub mod persistence;
pub mod state_machine;
pub mod storage;

// Re-export the main entry points
pub use config::{ConfigManager, RtaConfig};
pub use error::{FailureKind, Result, RtaError};
pub use manifest::{Manifest, ManifestRules};
pub use naming::{FileKind, NameGrammar};
pub use orchestration::{IngestionProcessor, ProcessorSettings};
pub use state_machine::{ArchivoState, ArchivoStateMachine};
