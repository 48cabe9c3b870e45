//! Customer authentication extractors.
//!
//! The storefront observes exactly one thing about authentication: whether a
//! customer bearer token is present in the session. The token is issued by
//! the commerce backend's login endpoint and stored here; everything else
//! about identity is the backend's concern.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::commerce::types::CustomerToken;

/// Session key for the customer bearer token.
pub const CUSTOMER_TOKEN_KEY: &str = "customer_token";

/// Read the customer token from the session, treating an expired token as
/// absent.
async fn current_token(session: &Session) -> Option<CustomerToken> {
    let token: CustomerToken = session.get(CUSTOMER_TOKEN_KEY).await.ok().flatten()?;
    if token.is_expired() {
        tracing::debug!("Customer token expired, treating session as guest");
        return None;
    }
    Some(token)
}

/// Extractor that optionally gets the customer token.
///
/// Never rejects: a guest simply extracts as `None`, and the store layer
/// routes on the `Option`.
pub struct OptionalCustomer(pub Option<CustomerToken>);

impl<S> FromRequestParts<S> for OptionalCustomer
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = match parts.extensions.get::<Session>() {
            Some(session) => current_token(session).await,
            None => None,
        };

        Ok(Self(token))
    }
}

/// Helper to set the customer token in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_customer_token(
    session: &Session,
    token: &CustomerToken,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(CUSTOMER_TOKEN_KEY, token).await
}

/// Helper to clear the customer token from the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_customer_token(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session.remove::<CustomerToken>(CUSTOMER_TOKEN_KEY).await?;
    Ok(())
}
