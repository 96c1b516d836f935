//! Shared bearer token holder.

use std::sync::{Arc, RwLock};

/// A replaceable, optional bearer token shared by every clone.
///
/// Builders read the token when the request is built, so a token swapped
/// in by a pre-build hook is the one that goes out on the wire. An absent or
/// empty token leaves the `authorization` header alone.
#[derive(Debug, Clone, Default)]
pub struct BearerToken {
    token: Arc<RwLock<Option<String>>>,
}

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(Some(token.into()))),
        }
    }

    /// A holder with no token.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// The `authorization` header value, if a non-empty token is present.
    pub fn header_value(&self) -> Option<String> {
        self.token()
            .filter(|token| !token.is_empty())
            .map(|token| format!("Bearer {token}"))
    }

    pub fn set(&self, token: impl Into<String>) {
        *self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token.into());
    }

    pub fn clear(&self) {
        *self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}

impl From<&str> for BearerToken {
    fn from(token: &str) -> Self {
        BearerToken::new(token)
    }
}

impl From<String> for BearerToken {
    fn from(token: String) -> Self {
        BearerToken::new(token)
    }
}

impl From<Option<String>> for BearerToken {
    fn from(token: Option<String>) -> Self {
        token.map_or_else(BearerToken::empty, BearerToken::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_value_requires_non_empty_token() {
        assert_eq!(BearerToken::new("abc").header_value().as_deref(), Some("Bearer abc"));
        assert!(BearerToken::new("").header_value().is_none());
        assert!(BearerToken::empty().header_value().is_none());
        assert!(BearerToken::from(None).header_value().is_none());
    }

    #[test]
    fn clones_share_the_token() {
        let token = BearerToken::new("abc");
        let shared = token.clone();
        token.set("def");
        assert_eq!(shared.token().as_deref(), Some("def"));
        shared.clear();
        assert!(token.token().is_none());
    }
}
