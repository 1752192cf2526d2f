pub mod audit_emitter;
pub mod audit_merge_service;
pub mod audit_query_service;
