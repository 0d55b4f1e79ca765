use jsonwebtoken::{Algorithm, DecodingKey, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crm_core::SubjectId;

/// Access-token claims as issued by the identity provider.
///
/// Supabase access tokens are HS256 JWTs signed with the project's JWT
/// secret; only the claims below are read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject / identity identifier.
    pub sub: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Expiration (seconds since epoch).
    pub exp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

/// A verified identity: who the bearer is, according to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub subject: SubjectId,
    pub email: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token audience is invalid")]
    InvalidAudience,

    #[error("token has no subject")]
    MissingSubject,

    #[error("malformed token: {0}")]
    Malformed(String),
}

/// Verifies bearer tokens without any IO.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Identity, TokenValidationError>;
}

/// HS256 verifier keyed by the identity provider's shared JWT secret.
#[derive(Clone)]
pub struct Hs256TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256TokenVerifier {
    /// `audience = None` disables the `aud` check.
    pub fn new(secret: impl AsRef<[u8]>, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }
}

impl core::fmt::Debug for Hs256TokenVerifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256TokenVerifier")
            .field("audience", &self.validation.aud)
            .finish_non_exhaustive()
    }
}

impl TokenVerifier for Hs256TokenVerifier {
    fn verify(&self, token: &str) -> Result<Identity, TokenValidationError> {
        let data = jsonwebtoken::decode::<AccessTokenClaims>(token, &self.key, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "access token rejected");
                match e.kind() {
                    ErrorKind::ExpiredSignature => TokenValidationError::Expired,
                    ErrorKind::InvalidSignature => TokenValidationError::InvalidSignature,
                    ErrorKind::InvalidAudience => TokenValidationError::InvalidAudience,
                    _ => TokenValidationError::Malformed(e.to_string()),
                }
            })?;
        identity_from_claims(data.claims)
    }
}

/// Map decoded claims to an identity.
///
/// A token without an `email` claim yields an empty email; callers derive
/// names from the subject in that case.
pub fn identity_from_claims(claims: AccessTokenClaims) -> Result<Identity, TokenValidationError> {
    let subject = SubjectId::parse(claims.sub).map_err(|_| TokenValidationError::MissingSubject)?;
    Ok(Identity {
        subject,
        email: claims.email.unwrap_or_default(),
    })
}
