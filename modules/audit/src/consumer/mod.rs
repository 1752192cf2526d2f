pub mod audit_consumer;
