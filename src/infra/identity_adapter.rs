use crate::app::ports::IdentityPort;
use crate::types::Identity;

/// Identity fixed at startup, e.g. from CLI flags after the login collaborator verified the token.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticIdentity {
    identity: Option<Identity>,
}

impl StaticIdentity {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
        }
    }

    pub fn anonymous() -> Self {
        Self { identity: None }
    }
}

impl IdentityPort for StaticIdentity {
    fn current_identity(&self) -> Option<Identity> {
        self.identity
    }
}
