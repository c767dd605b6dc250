/// Identity verification module - Gateway

mod coordinator;

pub use coordinator::{IdentityCoordinator, IdentityRecord, IdentityState, VerificationTicket};
