//! Shared plumbing for signet: errors, configuration, tracing setup and the
//! signature API client.

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod telemetry;

pub use crate::client::SignatureClient;
pub use crate::config::{Config, FileStore, Loader, Saver};
pub use crate::error::{Result, SignetError};
pub use crate::models::{RecordId, SignaturePayload, SignatureRecord};
