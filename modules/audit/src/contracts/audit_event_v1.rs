//! Audit Event V1 Contract Types
//!
//! The payload published with `EventEnvelope<AuditEventV1>` for every
//! workforce mutation. It carries identifying fields only — entity state
//! travels through the snapshot store, never over the bus.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entity kinds covered by the audit trail
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Employee,
    Department,
    Project,
    Task,
    LeaveRequest,
}

impl EntityType {
    /// PascalCase name used in the event type tag and audit records
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "Employee",
            Self::Department => "Department",
            Self::Project => "Project",
            Self::Task => "Task",
            Self::LeaveRequest => "LeaveRequest",
        }
    }

    /// Lowercase token used in bus subjects
    fn subject_token(&self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Department => "department",
            Self::Project => "project",
            Self::Task => "task",
            Self::LeaveRequest => "leave_request",
        }
    }

    pub const ALL: [EntityType; 5] = [
        Self::Employee,
        Self::Department,
        Self::Project,
        Self::Task,
        Self::LeaveRequest,
    ];
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| format!("unknown entity type: {s}"))
    }
}

/// Mutation kinds covered by the audit trail
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationAction {
    Created,
    Updated,
    Deleted,
    StatusChanged,
}

impl MutationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Updated => "Updated",
            Self::Deleted => "Deleted",
            Self::StatusChanged => "StatusChanged",
        }
    }

    fn subject_token(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::StatusChanged => "status_changed",
        }
    }

    /// Whether a pre-image snapshot is expected for this mutation kind.
    /// Creates have no prior state.
    pub fn expects_before(&self) -> bool {
        !matches!(self, Self::Created)
    }

    /// Whether a post-image snapshot is expected. Deletes carry the
    /// pre-image only; the tombstoned state is not snapshotted.
    pub fn expects_after(&self) -> bool {
        !matches!(self, Self::Deleted)
    }

    pub const ALL: [MutationAction; 4] =
        [Self::Created, Self::Updated, Self::Deleted, Self::StatusChanged];
}

impl fmt::Display for MutationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Closed event type space: entity kind crossed with mutation action.
///
/// Renders as `"EmployeeCreated"`, `"LeaveRequestStatusChanged"`, etc. and
/// maps onto the bus subject `workforce.events.<entity>.<action>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditEventType {
    pub entity: EntityType,
    pub action: MutationAction,
}

impl AuditEventType {
    pub fn new(entity: EntityType, action: MutationAction) -> Self {
        Self { entity, action }
    }

    /// Bus subject this event type is published to
    pub fn subject(&self) -> String {
        format!(
            "workforce.events.{}.{}",
            self.entity.subject_token(),
            self.action.subject_token()
        )
    }

    /// Wildcard subject pattern matching every audit event
    pub const WILDCARD_SUBJECT: &'static str = "workforce.events.>";
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.entity.as_str(), self.action.as_str())
    }
}

impl FromStr for AuditEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for entity in EntityType::ALL {
            for action in MutationAction::ALL {
                let candidate = Self::new(entity, action);
                if candidate.to_string() == s {
                    return Ok(candidate);
                }
            }
        }
        Err(format!("unknown event type: {s}"))
    }
}

/// Payload for audit events
///
/// This is the payload type used with `EventEnvelope<AuditEventV1>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEventV1 {
    /// Kind of entity that was mutated
    pub entity_type: EntityType,

    /// Identifier of the mutated entity in the originating store
    pub entity_id: String,

    /// Which mutation occurred
    pub action: MutationAction,
}

impl AuditEventV1 {
    /// The event type this payload belongs to, derived from its own fields.
    /// The consumer uses this rather than trusting the envelope tag.
    pub fn event_type(&self) -> AuditEventType {
        AuditEventType::new(self.entity_type, self.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_rendering() {
        let et = AuditEventType::new(EntityType::Employee, MutationAction::Created);
        assert_eq!(et.to_string(), "EmployeeCreated");

        let et = AuditEventType::new(EntityType::LeaveRequest, MutationAction::StatusChanged);
        assert_eq!(et.to_string(), "LeaveRequestStatusChanged");
    }

    #[test]
    fn test_event_type_subjects() {
        let et = AuditEventType::new(EntityType::Task, MutationAction::Updated);
        assert_eq!(et.subject(), "workforce.events.task.updated");

        let et = AuditEventType::new(EntityType::LeaveRequest, MutationAction::Deleted);
        assert_eq!(et.subject(), "workforce.events.leave_request.deleted");
    }

    #[test]
    fn test_event_type_round_trips_through_string() {
        for entity in EntityType::ALL {
            for action in MutationAction::ALL {
                let et = AuditEventType::new(entity, action);
                let parsed: AuditEventType = et.to_string().parse().unwrap();
                assert_eq!(parsed, et);
            }
        }
    }

    #[test]
    fn test_unknown_event_type_rejected() {
        assert!("EmployeeVaporized".parse::<AuditEventType>().is_err());
        assert!("".parse::<AuditEventType>().is_err());
    }

    #[test]
    fn test_expected_snapshot_phases() {
        assert!(!MutationAction::Created.expects_before());
        assert!(MutationAction::Created.expects_after());

        assert!(MutationAction::Updated.expects_before());
        assert!(MutationAction::Updated.expects_after());

        assert!(MutationAction::Deleted.expects_before());
        assert!(!MutationAction::Deleted.expects_after());

        assert!(MutationAction::StatusChanged.expects_before());
        assert!(MutationAction::StatusChanged.expects_after());
    }

    #[test]
    fn test_deserialize_valid_payload() {
        let json = r#"{
            "entity_type": "EMPLOYEE",
            "entity_id": "emp_01HPQW9K7J4M6N8P2R5T7V9W1X",
            "action": "STATUS_CHANGED"
        }"#;

        let payload: AuditEventV1 = serde_json::from_str(json).unwrap();
        assert_eq!(payload.entity_type, EntityType::Employee);
        assert_eq!(payload.action, MutationAction::StatusChanged);
        assert_eq!(payload.event_type().to_string(), "EmployeeStatusChanged");
    }

    #[test]
    fn test_entity_type_serde_tokens() {
        let tokens = [
            (EntityType::Employee, "\"EMPLOYEE\""),
            (EntityType::Department, "\"DEPARTMENT\""),
            (EntityType::Project, "\"PROJECT\""),
            (EntityType::Task, "\"TASK\""),
            (EntityType::LeaveRequest, "\"LEAVE_REQUEST\""),
        ];

        for (entity, expected) in tokens {
            assert_eq!(serde_json::to_string(&entity).unwrap(), expected);
        }
    }
}
