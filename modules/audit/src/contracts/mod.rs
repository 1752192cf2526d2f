//! Versioned wire contracts for the audit pipeline.
//!
//! Event payloads and snapshot projections are versioned structs; field
//! names are part of the contract and must not change within a version.

pub mod audit_event_v1;
pub mod entity_snapshots_v1;

pub use audit_event_v1::{AuditEventType, AuditEventV1, EntityType, MutationAction};
pub use entity_snapshots_v1::{
    DepartmentSnapshotV1, EmployeeSnapshotV1, LeaveRequestSnapshotV1, ProjectSnapshotV1,
    TaskSnapshotV1,
};
