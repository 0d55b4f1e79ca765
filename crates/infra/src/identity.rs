//! Identity Provider adapters.
//!
//! Bearer tokens are verified locally (HS256 with the provider's JWT secret).
//! Identity lookups by subject go to the provider's admin API and are only
//! used to check that an explicit signup names a real identity.

use std::collections::HashMap;
use std::sync::RwLock;

use reqwest::{StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use crm_auth::{Hs256TokenVerifier, Identity, TokenValidationError, TokenVerifier};
use crm_core::SubjectId;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("unexpected identity provider response: {0}")]
    UnexpectedResponse(String),
}

#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    fn verify_token(&self, token: &str) -> Result<Identity, TokenValidationError>;

    /// `Ok(None)` when the provider has no identity with this subject.
    async fn get_identity(&self, subject: &SubjectId) -> Result<Option<Identity>, IdentityError>;
}

/// Supabase Auth: local token verification plus the GoTrue admin API.
#[derive(Clone)]
pub struct SupabaseIdentityProvider {
    http: reqwest::Client,
    base_url: Url,
    service_role_key: String,
    verifier: Hs256TokenVerifier,
}

impl core::fmt::Debug for SupabaseIdentityProvider {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SupabaseIdentityProvider")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct AdminUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl SupabaseIdentityProvider {
    pub fn new(
        base_url: &str,
        service_role_key: impl Into<String>,
        verifier: Hs256TokenVerifier,
    ) -> Result<Self, IdentityError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| IdentityError::Unavailable(format!("invalid provider url '{base_url}': {e}")))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            service_role_key: service_role_key.into(),
            verifier,
        })
    }

    /// `<base>/auth/v1/admin/users/<subject>`, with the subject percent-encoded.
    fn admin_user_url(&self, subject: &SubjectId) -> Result<Url, IdentityError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| IdentityError::Unavailable(format!("provider url '{}' cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(["auth", "v1", "admin", "users", subject.as_str()]);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl IdentityProvider for SupabaseIdentityProvider {
    fn verify_token(&self, token: &str) -> Result<Identity, TokenValidationError> {
        self.verifier.verify(token)
    }

    #[instrument(skip(self), fields(subject = %subject), err)]
    async fn get_identity(&self, subject: &SubjectId) -> Result<Option<Identity>, IdentityError> {
        let url = self.admin_user_url(subject)?;
        let response = self
            .http
            .get(url)
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        match response.status() {
            // GoTrue rejects ids that are not UUIDs before looking them up;
            // such a subject cannot exist either.
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Ok(None),
            status if status.is_success() => {
                let user: AdminUser = response
                    .json()
                    .await
                    .map_err(|e| IdentityError::UnexpectedResponse(e.to_string()))?;
                let subject = SubjectId::parse(user.id)
                    .map_err(|e| IdentityError::UnexpectedResponse(e.to_string()))?;
                Ok(Some(Identity {
                    subject,
                    email: user.email.unwrap_or_default(),
                }))
            }
            status => Err(IdentityError::UnexpectedResponse(format!("status {status}"))),
        }
    }
}

/// Identity provider for tests/dev: the same token verification, with a
/// local registry standing in for the admin API.
///
/// Only [`register`](Self::register)ed subjects exist; a valid token alone
/// does not make its holder known to `get_identity`.
#[derive(Debug)]
pub struct InMemoryIdentityProvider {
    verifier: Hs256TokenVerifier,
    identities: RwLock<HashMap<SubjectId, Identity>>,
}

impl InMemoryIdentityProvider {
    pub fn new(verifier: Hs256TokenVerifier) -> Self {
        Self {
            verifier,
            identities: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, identity: Identity) {
        if let Ok(mut map) = self.identities.write() {
            map.insert(identity.subject.clone(), identity);
        }
    }
}

#[async_trait::async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    fn verify_token(&self, token: &str) -> Result<Identity, TokenValidationError> {
        self.verifier.verify(token)
    }

    async fn get_identity(&self, subject: &SubjectId) -> Result<Option<Identity>, IdentityError> {
        let map = self
            .identities
            .read()
            .map_err(|_| IdentityError::Unavailable("identity registry lock poisoned".to_string()))?;
        Ok(map.get(subject).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crm_auth::AccessTokenClaims;
    use jsonwebtoken::{EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn token(sub: &str) -> String {
        let claims = AccessTokenClaims {
            sub: sub.to_string(),
            email: Some(format!("{sub}@example.com")),
            aud: Some("authenticated".to_string()),
            exp: chrono::Utc::now().timestamp() + 600,
            iat: None,
        };
        jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
    }

    #[tokio::test]
    async fn in_memory_provider_knows_only_registered_identities() {
        let provider = InMemoryIdentityProvider::new(Hs256TokenVerifier::new(SECRET, Some("authenticated")));
        let ghost = SubjectId::parse("ghost").unwrap();
        assert_eq!(provider.get_identity(&ghost).await.unwrap(), None);

        provider.register(Identity {
            subject: SubjectId::parse("u1").unwrap(),
            email: "a@x.com".into(),
        });
        let found = provider
            .get_identity(&SubjectId::parse("u1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.email, "a@x.com");

        let verified = provider.verify_token(&token("u2")).unwrap();
        assert_eq!(verified.subject.as_str(), "u2");
        assert_eq!(provider.get_identity(&verified.subject).await.unwrap(), None);
    }

    #[test]
    fn admin_url_encodes_subject() {
        let provider = SupabaseIdentityProvider::new(
            "https://project.supabase.co/",
            "service-key",
            Hs256TokenVerifier::new(SECRET, None),
        )
        .unwrap();
        let url = provider
            .admin_user_url(&SubjectId::parse("a/b").unwrap())
            .unwrap();
        assert_eq!(url.as_str(), "https://project.supabase.co/auth/v1/admin/users/a%2Fb");
    }
}
