use crate::owner::OwnerId;

/// Request-scoped data passed explicitly from handlers to the service layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    owner: Option<OwnerId>,
}

impl RequestContext {
    /// A context without an authenticated owner.
    pub fn anonymous() -> Self {
        Self { owner: None }
    }

    pub fn for_owner(owner: OwnerId) -> Self {
        Self { owner: Some(owner) }
    }

    pub fn owner(&self) -> Option<&OwnerId> {
        self.owner.as_ref()
    }
}
