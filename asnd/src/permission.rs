use crate::session::{Role, Session};
use asn_lib::{Blob, EncrPub};
use thiserror::Error;

/// reason a blob is refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct Denied {
    reason: String,
}

/// decide whether a session may store a blob
pub trait Permission {
    /// `login` is the login key of the peer, `ephemeral` the ephemeral
    /// key of its session
    fn check(
        &self,
        session: &Session,
        blob: &Blob,
        login: &EncrPub,
        ephemeral: &EncrPub,
    ) -> Result<(), Denied>;
}

/// the administrator and the servers may store anything, a user may
/// store the blobs it owns or authored
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPermission;

impl Denied {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Permission for DefaultPermission {
    fn check(
        &self,
        session: &Session,
        blob: &Blob,
        login: &EncrPub,
        _ephemeral: &EncrPub,
    ) -> Result<(), Denied> {
        match session.role() {
            Some(Role::Admin) | Some(Role::Server) => Ok(()),
            Some(Role::User) if &blob.owner == login || &blob.author == login => Ok(()),
            Some(Role::User) => Err(Denied::new(format!(
                "{} is neither the owner nor the author of {:?}",
                login.short(),
                blob.name
            ))),
            None => Err(Denied::new("the session is not logged in")),
        }
    }
}
