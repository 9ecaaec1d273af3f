use shared::domain::{Identity, UserId};

/// Session state decoded from the caller's cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub authenticated: bool,
    pub user_id: UserId,
    pub username: String,
    pub is_admin: bool,
}

impl Session {
    pub fn for_identity(identity: &Identity) -> Self {
        Self {
            authenticated: true,
            user_id: identity.user_id,
            username: identity.username.clone(),
            is_admin: identity.is_admin,
        }
    }

    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.user_id,
            username: self.username.clone(),
            is_admin: self.is_admin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResult {
    Authorized(Identity),
    Unauthorized,
}

/// Only a present session with its `authenticated` flag set gets through.
pub fn authorize(session: Option<&Session>) -> AuthResult {
    match session {
        Some(session) if session.authenticated => AuthResult::Authorized(session.identity()),
        _ => AuthResult::Unauthorized,
    }
}
