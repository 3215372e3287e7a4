use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::{debug, warn};

use super::jwt::JwtKeys;
use crate::error::ApiError;

/// Identity of a caller whose bearer token has been verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub i64);

/// Pulls the token out of `Bearer <token>`. Anything with a different scheme
/// or a different number of parts yields `None`.
pub fn bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None)
            if scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty() =>
        {
            Some(token)
        }
        _ => None,
    }
}

/// Resolves a raw `Authorization` header value to the verified caller.
pub fn authorize(keys: &JwtKeys, header: &str) -> Result<AuthUser, ApiError> {
    let token = bearer_token(header).ok_or_else(|| {
        debug!("authorization header is not a bearer credential");
        ApiError::Unauthorized("invalid authorization header")
    })?;

    match keys.verify(token) {
        Ok(user_id) => Ok(AuthUser(user_id)),
        Err(e) => {
            warn!(error = %e, "rejected bearer token");
            Err(e.into())
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(ApiError::Unauthorized("missing authorization header"))?
            .to_str()
            .map_err(|_| ApiError::Unauthorized("invalid authorization header"))?;

        authorize(&keys, header)
    }
}
