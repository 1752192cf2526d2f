//! Payload validation for incoming audit events.
//!
//! Validation failures are not retriable — the consumer routes them
//! straight to the dead-letter table.

use crate::contracts::AuditEventV1;

const MAX_ENTITY_ID_LEN: usize = 128;

/// Errors from audit event validation
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("entity_id must not be empty")]
    EmptyEntityId,

    #[error("entity_id exceeds {MAX_ENTITY_ID_LEN} characters: {0}")]
    EntityIdTooLong(usize),
}

/// Validate an audit event payload
pub fn validate_audit_event(event: &AuditEventV1) -> Result<(), ValidationError> {
    if event.entity_id.trim().is_empty() {
        return Err(ValidationError::EmptyEntityId);
    }

    if event.entity_id.len() > MAX_ENTITY_ID_LEN {
        return Err(ValidationError::EntityIdTooLong(event.entity_id.len()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{EntityType, MutationAction};

    fn event_with_id(entity_id: &str) -> AuditEventV1 {
        AuditEventV1 {
            entity_type: EntityType::Employee,
            entity_id: entity_id.to_string(),
            action: MutationAction::Created,
        }
    }

    #[test]
    fn test_valid_event_passes() {
        assert!(validate_audit_event(&event_with_id("emp-001")).is_ok());
    }

    #[test]
    fn test_empty_entity_id_rejected() {
        assert!(validate_audit_event(&event_with_id("")).is_err());
        assert!(validate_audit_event(&event_with_id("   ")).is_err());
    }

    #[test]
    fn test_oversized_entity_id_rejected() {
        let long_id = "x".repeat(129);
        let result = validate_audit_event(&event_with_id(&long_id));
        assert!(matches!(result, Err(ValidationError::EntityIdTooLong(129))));
    }
}
