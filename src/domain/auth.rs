//! Caller authorization

use tracing::warn;

use super::{CallerIdentity, DomainError};

/// Admits exactly one configured caller identity.
#[derive(Debug, Clone)]
pub struct AuthorizationGate {
    allowed: CallerIdentity,
}

impl AuthorizationGate {
    pub fn new(allowed: impl Into<CallerIdentity>) -> Self {
        Self {
            allowed: allowed.into(),
        }
    }

    /// Fails unless `caller` exactly equals the allowed identity.
    pub fn check_caller(&self, caller: &CallerIdentity) -> Result<(), DomainError> {
        if caller == &self.allowed {
            Ok(())
        } else {
            warn!("rejected caller: {}", caller);
            Err(DomainError::Unauthorized {
                caller: caller.to_string(),
            })
        }
    }
}
