pub mod audit_query_repo;
pub mod audit_repo;
pub mod failed_repo;
