//! In-memory user → capability table.

use std::collections::{BTreeSet, HashMap};

use crate::config::AuthConfig;
use crate::core::Authorizer;

/// Authorizer backed by a fixed table loaded at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthorizer {
    users: HashMap<String, BTreeSet<String>>,
}

impl StaticAuthorizer {
    /// Create an authorizer with no users.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user holding `capabilities`. Re-adding a user merges capabilities.
    #[must_use]
    pub fn with_user<I, S>(mut self, user: impl Into<String>, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.users
            .entry(user.into())
            .or_default()
            .extend(capabilities.into_iter().map(Into::into));
        self
    }

    /// Build from the `auth` section of the configuration.
    #[must_use]
    pub fn from_config(cfg: &AuthConfig) -> Self {
        cfg.users
            .iter()
            .fold(Self::new(), |auth, (user, caps)| {
                auth.with_user(user.clone(), caps.iter().cloned())
            })
    }
}

impl Authorizer for StaticAuthorizer {
    fn is_known_user(&self, user: &str) -> bool {
        self.users.contains_key(user)
    }

    fn has_capability(&self, user: &str, capability: &str) -> bool {
        self.users
            .get(user)
            .is_some_and(|caps| caps.contains(capability))
    }
}
