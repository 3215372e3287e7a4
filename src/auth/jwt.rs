use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

use crate::{auth::claims::Claims, state::AppState};

/// Fixed token lifetime. Tokens are not renewable.
pub const TOKEN_TTL: Duration = Duration::hours(72);

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Signing and verification keys derived from the process secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.keys.clone()
    }
}

impl JwtKeys {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn sign(&self, user_id: i64) -> Result<String, TokenError> {
        self.sign_at(user_id, OffsetDateTime::now_utc())
    }

    pub(crate) fn sign_at(
        &self,
        user_id: i64,
        issued_at: OffsetDateTime,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            user_id,
            exp: (issued_at + TOKEN_TTL).unix_timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Signing)?;
        debug!(user_id, exp = claims.exp, "jwt signed");
        Ok(token)
    }

    /// Returns the user id bound to a valid, unexpired token.
    pub fn verify(&self, token: &str) -> Result<i64, TokenError> {
        self.verify_at(token, OffsetDateTime::now_utc())
    }

    pub(crate) fn verify_at(&self, token: &str, now: OffsetDateTime) -> Result<i64, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(classify)?;
        let claims = data.claims;

        // the library only rejects exp < now; a token is dead at exp itself
        if claims.exp <= now.unix_timestamp() {
            debug!(user_id = claims.user_id, exp = claims.exp, "jwt expired");
            return Err(TokenError::Expired);
        }
        if claims.user_id <= 0 {
            debug!(user_id = claims.user_id, "jwt user_id out of range");
            return Err(TokenError::Malformed);
        }

        debug!(user_id = claims.user_id, "jwt verified");
        Ok(claims.user_id)
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
            warn!(error = %err, "jwt signature rejected");
            TokenError::InvalidSignature
        }
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::Json(_) | ErrorKind::MissingRequiredClaim(_) => {
            debug!(error = %err, "jwt claims rejected");
            TokenError::Malformed
        }
        _ => {
            debug!(error = %err, "jwt structure rejected");
            TokenError::Malformed
        }
    }
}
