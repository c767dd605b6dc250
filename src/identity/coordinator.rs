use serde::Serialize;
use tracing::{debug, info, warn};

use crate::client::{UserProfile, Verification};
use crate::constants::VERIFY_TRANSPORT_FAILURE_MESSAGE;
use crate::utils::{GenieError, SubmitError};

/// Verification state of the handle currently typed in
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum IdentityState {
    #[default]
    Idle,
    Verifying,
    Valid,
    Invalid(String),
}

/// A handle the service has confirmed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentityRecord {
    pub handle: String,
    pub verified: bool,
    pub profile: Option<UserProfile>,
}

/// Proof that a verification was started for a particular edit of the handle
#[derive(Debug)]
pub struct VerificationTicket {
    handle: String,
    epoch: u64,
}

impl VerificationTicket {
    pub fn handle(&self) -> &str {
        &self.handle
    }
}

/// Owns the handle input and its verification outcome
///
/// Every edit of the handle bumps an epoch. A verification result carries the
/// epoch it was started under and is dropped if the input changed meanwhile.
#[derive(Debug, Default)]
pub struct IdentityCoordinator {
    raw_handle: String,
    state: IdentityState,
    record: Option<IdentityRecord>,
    epoch: u64,
}

impl IdentityCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The handle exactly as typed
    pub fn raw_handle(&self) -> &str {
        &self.raw_handle
    }

    pub fn state(&self) -> &IdentityState {
        &self.state
    }

    pub fn record(&self) -> Option<&IdentityRecord> {
        self.record.as_ref()
    }

    pub fn is_valid(&self) -> bool {
        self.state == IdentityState::Valid
    }

    /// Record an edit event. Trust is dropped even when the text is unchanged.
    pub fn edit_handle(&mut self, raw: impl Into<String>) {
        self.raw_handle = raw.into();
        self.epoch += 1;
        self.state = IdentityState::Idle;
        self.record = None;
        debug!(epoch = self.epoch, "handle edited, verification reset");
    }

    /// Move to `Verifying` and hand out a ticket for the lookup
    pub fn begin(&mut self) -> Result<VerificationTicket, SubmitError> {
        let handle = self.raw_handle.trim();
        if handle.is_empty() {
            return Err(SubmitError::EmptyHandle);
        }
        let handle = handle.to_string();

        // A second attempt supersedes one still in flight
        self.epoch += 1;
        self.state = IdentityState::Verifying;
        self.record = None;

        Ok(VerificationTicket {
            handle,
            epoch: self.epoch,
        })
    }

    /// Apply a lookup result. Returns `None` when the ticket is stale.
    pub fn finish(
        &mut self,
        ticket: VerificationTicket,
        outcome: Result<Verification, GenieError>,
    ) -> Option<&IdentityState> {
        if ticket.epoch != self.epoch {
            debug!(
                handle = %ticket.handle,
                ticket_epoch = ticket.epoch,
                epoch = self.epoch,
                "discarding stale verification result"
            );
            return None;
        }

        match outcome {
            Ok(Verification::Verified(profile)) => {
                info!(handle = %ticket.handle, "handle verified");
                self.state = IdentityState::Valid;
                self.record = Some(IdentityRecord {
                    handle: ticket.handle,
                    verified: true,
                    profile: Some(profile),
                });
            }
            Ok(Verification::NotFound { reason }) => {
                info!(handle = %ticket.handle, %reason, "handle rejected");
                self.state = IdentityState::Invalid(reason);
            }
            Err(e) => {
                warn!(handle = %ticket.handle, error = %e, "verification request failed");
                self.state = IdentityState::Invalid(VERIFY_TRANSPORT_FAILURE_MESSAGE.to_string());
            }
        }

        Some(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator(handle: &str) -> IdentityCoordinator {
        let mut identity = IdentityCoordinator::new();
        identity.edit_handle(handle);
        identity
    }

    fn profile(name: &str) -> UserProfile {
        UserProfile {
            username: Some(name.to_string()),
            ..UserProfile::default()
        }
    }

    #[test]
    fn test_verified_handle_becomes_valid() {
        let mut identity = coordinator("coach123");
        let ticket = identity.begin().unwrap();
        assert_eq!(ticket.handle(), "coach123");
        assert_eq!(identity.state(), &IdentityState::Verifying);

        let state = identity.finish(ticket, Ok(Verification::Verified(profile("coach123"))));
        assert_eq!(state, Some(&IdentityState::Valid));

        let record = identity.record().unwrap();
        assert_eq!(record.handle, "coach123");
        assert!(record.verified);
        assert_eq!(record.profile, Some(profile("coach123")));
    }

    #[test]
    fn test_not_found_keeps_backend_reason() {
        let mut identity = coordinator("coach123");
        let ticket = identity.begin().unwrap();
        identity.finish(
            ticket,
            Ok(Verification::NotFound {
                reason: "not found".to_string(),
            }),
        );
        assert_eq!(identity.state(), &IdentityState::Invalid("not found".into()));
        assert!(identity.record().is_none());
    }

    #[test]
    fn test_transport_failure_uses_generic_reason() {
        let mut identity = coordinator("coach123");
        let ticket = identity.begin().unwrap();
        identity.finish(ticket, Err(GenieError::Unreachable("refused".into())));
        assert_eq!(
            identity.state(),
            &IdentityState::Invalid(VERIFY_TRANSPORT_FAILURE_MESSAGE.into())
        );
    }

    #[test]
    fn test_edit_resets_even_with_identical_text() {
        let mut identity = coordinator("coach123");
        let ticket = identity.begin().unwrap();
        identity.finish(ticket, Ok(Verification::Verified(profile("coach123"))));
        assert!(identity.is_valid());

        identity.edit_handle("coach123");
        assert_eq!(identity.state(), &IdentityState::Idle);
        assert!(identity.record().is_none());
    }

    #[test]
    fn test_result_for_edited_handle_is_discarded() {
        let mut identity = coordinator("coach12");
        let ticket = identity.begin().unwrap();

        identity.edit_handle("coach123");
        let state = identity.finish(ticket, Ok(Verification::Verified(profile("coach12"))));

        assert_eq!(state, None);
        assert_eq!(identity.state(), &IdentityState::Idle);
        assert!(identity.record().is_none());
    }

    #[test]
    fn test_blank_handle_cannot_be_verified() {
        let mut identity = coordinator("   ");
        assert_eq!(identity.begin().unwrap_err(), SubmitError::EmptyHandle);
        assert_eq!(identity.state(), &IdentityState::Idle);
    }

    #[test]
    fn test_handle_is_trimmed_for_lookup() {
        let mut identity = coordinator("  coach123 ");
        assert_eq!(identity.begin().unwrap().handle(), "coach123");
        assert_eq!(identity.raw_handle(), "  coach123 ");
    }
}
