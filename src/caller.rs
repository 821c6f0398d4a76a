//! Extracts the identity of the caller for audit logging.

use std::{convert::Infallible, fmt::Display};

use axum::{extract::FromRequestParts, http::request::Parts};

/// The header the upstream gateway sets to the authenticated caller's identity.
pub const CALLER_HEADER: &str = "x-caller-id";

/// The identity of whoever made the request.
///
/// The value is opaque and is only written to the logs. It is never used to
/// decide whether a request is allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(Option<String>);

impl Caller {
    /// A caller with the given identity.
    pub fn new(identity: &str) -> Self {
        Self(Some(identity.to_owned()))
    }

    /// A caller whose identity was not supplied.
    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl Display for Caller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(identity) => write!(f, "{identity}"),
            None => write!(f, "<anonymous>"),
        }
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        let identity = parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        Ok(match identity {
            Some(identity) => Caller::new(identity),
            None => Caller::anonymous(),
        })
    }
}
