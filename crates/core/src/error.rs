//! Typed result channel for external data
//!
//! The original design conflated "no data", "must re-authenticate" and
//! "malformed response" behind broad catch-alls. Here every gateway and
//! service returns [`Availability`] so callers can tell them apart without
//! string matching.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome of a lookup against an external, unreliable data source
///
/// `Unavailable` is an expected, non-exceptional state: callers degrade the
/// affected field and carry on. `AuthRequired` propagates to the refresh
/// boundary where it becomes a dedicated dashboard state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "value")]
pub enum Availability<T> {
    Available(T),
    Unavailable,
    AuthRequired,
}

impl<T> Availability<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available(_))
    }

    pub fn is_auth_required(&self) -> bool {
        matches!(self, Availability::AuthRequired)
    }

    /// View the value, if any
    pub fn as_option(&self) -> Option<&T> {
        match self {
            Availability::Available(v) => Some(v),
            _ => None,
        }
    }

    /// Consume into an `Option`, discarding the auth distinction
    pub fn into_option(self) -> Option<T> {
        match self {
            Availability::Available(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Availability<U> {
        match self {
            Availability::Available(v) => Availability::Available(f(v)),
            Availability::Unavailable => Availability::Unavailable,
            Availability::AuthRequired => Availability::AuthRequired,
        }
    }

    /// `Some` becomes `Available`, `None` becomes `Unavailable`
    pub fn from_option(opt: Option<T>) -> Self {
        match opt {
            Some(v) => Availability::Available(v),
            None => Availability::Unavailable,
        }
    }
}

/// Errors crossing the provider boundary
///
/// Everything except `AuthExpired` degrades to `Availability::Unavailable`
/// at the gateway layer; nothing is retried within a single refresh (the
/// next user-triggered refresh is the retry mechanism).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("authentication expired or missing")]
    AuthExpired,

    #[error("request timed out")]
    Timeout,

    #[error("upstream returned HTTP {0}")]
    Http(u16),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl ProviderError {
    /// Fold a provider result into the availability channel, logging the
    /// failure. Only auth failures keep their identity.
    pub fn into_availability<T>(self) -> Availability<T> {
        match self {
            ProviderError::AuthExpired => Availability::AuthRequired,
            _ => Availability::Unavailable,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if let Some(status) = err.status() {
            if status.as_u16() == 401 || status.as_u16() == 403 {
                ProviderError::AuthExpired
            } else {
                ProviderError::Http(status.as_u16())
            }
        } else if err.is_decode() {
            ProviderError::Malformed(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_availability_map_preserves_states() {
        let a: Availability<i32> = Availability::Available(2);
        assert_eq!(a.map(|v| v * 2), Availability::Available(4));

        let u: Availability<i32> = Availability::Unavailable;
        assert_eq!(u.map(|v| v * 2), Availability::Unavailable);

        let auth: Availability<i32> = Availability::AuthRequired;
        assert_eq!(auth.map(|v| v * 2), Availability::AuthRequired);
    }

    #[test]
    fn test_auth_error_keeps_identity() {
        let a: Availability<()> = ProviderError::AuthExpired.into_availability();
        assert!(a.is_auth_required());

        let t: Availability<()> = ProviderError::Timeout.into_availability();
        assert_eq!(t, Availability::Unavailable);
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Availability::from_option(Some(1)), Availability::Available(1));
        assert_eq!(Availability::<i32>::from_option(None), Availability::Unavailable);
    }
}
