//! Provisioning saga bookkeeping
//!
//! Account provisioning writes two records on the remote server: the party
//! (primary) and the user that references it. The saga record tracks which
//! steps have committed so the failure path knows exactly what must be
//! compensated. There is one compensating action: deleting the party after
//! a failed user creation.

use portico_domain::{PorticoError, ProvisioningState, Result};

use crate::erp_ports::RecordId;

/// State for a single provisioning run.
///
/// Transitions are `Start -> PartyCreated -> Completed`, with the failure
/// edge `PartyCreated -> RolledBack`. Anything else is a logic error and is
/// rejected rather than silently accepted.
#[derive(Debug, Clone)]
pub struct ProvisioningSaga {
    state: ProvisioningState,
    party_id: Option<RecordId>,
    user_id: Option<RecordId>,
}

impl ProvisioningSaga {
    #[must_use]
    pub fn new() -> Self {
        Self { state: ProvisioningState::Start, party_id: None, user_id: None }
    }

    #[must_use]
    pub fn state(&self) -> ProvisioningState {
        self.state
    }

    #[must_use]
    pub fn party_id(&self) -> Option<RecordId> {
        self.party_id
    }

    #[must_use]
    pub fn user_id(&self) -> Option<RecordId> {
        self.user_id
    }

    /// Record id that must be deleted if the dependent step fails.
    #[must_use]
    pub fn compensation_target(&self) -> Option<RecordId> {
        match self.state {
            ProvisioningState::PartyCreated => self.party_id,
            _ => None,
        }
    }

    /// Record the committed primary step.
    pub fn party_created(&mut self, party_id: RecordId) -> Result<()> {
        self.transition(ProvisioningState::Start, ProvisioningState::PartyCreated)?;
        self.party_id = Some(party_id);
        Ok(())
    }

    /// Record the committed dependent step.
    pub fn completed(&mut self, user_id: RecordId) -> Result<()> {
        self.transition(ProvisioningState::PartyCreated, ProvisioningState::Completed)?;
        self.user_id = Some(user_id);
        Ok(())
    }

    /// Record that the primary step was compensated.
    pub fn rolled_back(&mut self) -> Result<()> {
        self.transition(ProvisioningState::PartyCreated, ProvisioningState::RolledBack)
    }

    fn transition(&mut self, expected: ProvisioningState, next: ProvisioningState) -> Result<()> {
        if self.state != expected {
            return Err(PorticoError::Internal(format!(
                "invalid provisioning transition: {} -> {}",
                self.state, next
            )));
        }
        self.state = next;
        Ok(())
    }
}

impl Default for ProvisioningSaga {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_walks_start_to_completed() {
        let mut saga = ProvisioningSaga::new();
        assert_eq!(saga.state(), ProvisioningState::Start);
        assert_eq!(saga.compensation_target(), None);

        saga.party_created(7).unwrap();
        assert_eq!(saga.state(), ProvisioningState::PartyCreated);
        assert_eq!(saga.compensation_target(), Some(7));

        saga.completed(42).unwrap();
        assert_eq!(saga.state(), ProvisioningState::Completed);
        assert_eq!(saga.party_id(), Some(7));
        assert_eq!(saga.user_id(), Some(42));
        // Nothing left to compensate once both records exist.
        assert_eq!(saga.compensation_target(), None);
    }

    #[test]
    fn failure_edge_records_the_rollback() {
        let mut saga = ProvisioningSaga::new();
        saga.party_created(7).unwrap();
        saga.rolled_back().unwrap();
        assert_eq!(saga.state(), ProvisioningState::RolledBack);
        assert_eq!(saga.compensation_target(), None);
    }

    #[test]
    fn out_of_order_transitions_are_rejected() {
        let mut saga = ProvisioningSaga::new();
        let err = saga.completed(42).unwrap_err();
        assert!(matches!(err, PorticoError::Internal(_)));

        let err = saga.rolled_back().unwrap_err();
        assert!(matches!(err, PorticoError::Internal(_)));
        assert_eq!(saga.state(), ProvisioningState::Start);
    }
}
