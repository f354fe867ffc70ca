//! Who is booking.
//!
//! A [`Session`] carries the bearer token issued by the Auth Service and,
//! when known, the signed-in customer. It is passed explicitly to every
//! Booking Service call; nothing reads credentials from global state.

use crate::types::Customer;
use std::fmt;

/// Credentials for Booking Service calls
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
    user: Option<Customer>,
}

impl Session {
    /// Session without credentials; catalog and occupancy calls still work
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            token: None,
            user: None,
        }
    }

    /// Session authenticated by a bearer token
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            user: None,
        }
    }

    /// Attaches the signed-in customer
    #[must_use]
    pub fn for_user(mut self, user: Customer) -> Self {
        self.user = Some(user);
        self
    }

    /// Bearer token, if signed in
    #[must_use]
    pub fn bearer(&self) -> Option<&str> {
        self.token.as_deref().filter(|token| !token.trim().is_empty())
    }

    /// Signed-in customer, if known
    #[must_use]
    pub const fn user(&self) -> Option<&Customer> {
        self.user.as_ref()
    }

    /// True when a non-empty token is present
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.bearer().is_some()
    }
}

// Keeps tokens out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .field("user", &self.user.as_ref().map(|u| u.email.as_str()))
            .finish()
    }
}
