//! Route identifiers used by navigation and the redirect guard.

use std::fmt::{Display, Formatter};

use leadline_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Maximum accepted length of a route path in bytes.
pub const ROUTE_PATH_MAX_LENGTH: usize = 2048;

/// Validated in-application route such as `/dashboard` or `/leads?owner=me`.
///
/// Only same-origin paths are accepted: the value must start with a single
/// `/`, so `//evil.example` and absolute URLs are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoutePath(String);

impl RoutePath {
    /// Creates a validated route path.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "route path must not be empty".to_owned(),
            ));
        }

        if !trimmed.starts_with('/') {
            return Err(AppError::Validation(format!(
                "route path '{trimmed}' must start with '/'"
            )));
        }

        if trimmed.starts_with("//") {
            return Err(AppError::Validation(format!(
                "route path '{trimmed}' must not be protocol-relative"
            )));
        }

        if trimmed.len() > ROUTE_PATH_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "route path must not exceed {ROUTE_PATH_MAX_LENGTH} bytes"
            )));
        }

        if trimmed
            .chars()
            .any(|character| character.is_whitespace() || character.is_control())
        {
            return Err(AppError::Validation(
                "route path must not contain whitespace or control characters".to_owned(),
            ));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the full path including any query string or fragment.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the path without query string or fragment.
    #[must_use]
    pub fn route(&self) -> &str {
        let end = self.0.find(['?', '#']).unwrap_or(self.0.len());
        &self.0[..end]
    }

    /// Returns whether this route equals `prefix` or lives beneath it.
    ///
    /// Matching is segment-aware: `/leads` covers `/leads/42` but not
    /// `/leadsboard`.
    #[must_use]
    pub fn is_within(&self, prefix: &RoutePath) -> bool {
        let route = self.route();
        let prefix = prefix.route().trim_end_matches('/');
        if prefix.is_empty() {
            return true;
        }

        route == prefix
            || route
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl TryFrom<String> for RoutePath {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RoutePath> for String {
    fn from(value: RoutePath) -> Self {
        value.0
    }
}

impl Display for RoutePath {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}
