//! Identity session context.
//!
//! The session is passed explicitly to every loader and handler that needs
//! it. It changes only through [`SessionContext::sign_in`] and
//! [`SessionContext::sign_out`].

use serde::{Deserialize, Serialize};

/// An authenticated identity as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub email: String,
}

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: String::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// Label for page headers: the email when known, otherwise the id.
    pub fn display_name(&self) -> &str {
        if self.email.trim().is_empty() {
            &self.id
        } else {
            &self.email
        }
    }
}

/// Source of "who is signed in".
pub trait SessionProvider {
    /// The current identity, or `None` when nobody is signed in.
    fn current_identity(&self) -> Option<Identity>;
}

/// Single source of truth for the signed-in identity of one view/request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    identity: Option<Identity>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self { identity: None }
    }

    pub fn signed_in(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
        }
    }

    pub fn sign_in(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }

    pub fn sign_out(&mut self) {
        self.identity = None;
    }

    pub fn is_signed_in(&self) -> bool {
        self.identity.is_some()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }
}

impl From<Option<Identity>> for SessionContext {
    fn from(identity: Option<Identity>) -> Self {
        Self { identity }
    }
}

impl SessionProvider for SessionContext {
    fn current_identity(&self) -> Option<Identity> {
        self.identity.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_in_and_out_update_identity() {
        let mut session = SessionContext::anonymous();
        assert!(session.current_identity().is_none());

        session.sign_in(Identity::new("user-1"));
        assert!(session.is_signed_in());
        assert_eq!(
            session.current_identity().map(|identity| identity.id),
            Some("user-1".to_string())
        );

        session.sign_out();
        assert!(!session.is_signed_in());
    }

    #[test]
    fn display_name_prefers_email() {
        let identity = Identity::new("user-1");
        assert_eq!(identity.display_name(), "user-1");
        let identity = identity.with_email("ada@example.com");
        assert_eq!(identity.display_name(), "ada@example.com");
    }
}
