pub mod config;
pub mod consumer;
pub mod contracts;
pub mod db;
pub mod dlq;
pub mod health;
pub mod repos;
pub mod routes;
pub mod services;
pub mod snapshot_store;
pub mod validation;

pub use consumer::audit_consumer::start_audit_consumer;
pub use services::audit_emitter::{AuditEmitter, EmitterSettings};
