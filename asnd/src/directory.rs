use asn_lib::{AuthPub, EncrPub};
use std::collections::BTreeMap;

/// authorization directory of the users
///
/// the administrator and the servers are known from the configuration,
/// every other peer is looked up here at login.
pub trait Directory {
    /// the signing key of the user logging in with `login`
    fn signing_key(&self, login: &EncrPub) -> Option<AuthPub>;
}

/// directory of the users listed in the configuration
#[derive(Debug, Default, Clone)]
pub struct UserDirectory {
    users: BTreeMap<EncrPub, AuthPub>,
}

impl UserDirectory {
    pub fn new(users: BTreeMap<EncrPub, AuthPub>) -> Self {
        Self { users }
    }

    pub fn insert(&mut self, login: EncrPub, auth: AuthPub) -> Option<AuthPub> {
        self.users.insert(login, auth)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl Directory for UserDirectory {
    fn signing_key(&self, login: &EncrPub) -> Option<AuthPub> {
        self.users.get(login).copied()
    }
}
