use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crm_auth::{DirectoryUser, DirectoryUserPatch, Organization};
use crm_core::Resource;

use crate::error::{self, ClientError};

/// A signed-in caller: the bearer token sent with every authenticated call.
#[derive(Clone)]
pub struct Session {
    token: String,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("token", &"<redacted>").finish()
    }
}

/// `POST /api/bootstrap/signup` body.
#[derive(Debug, Clone, Serialize)]
pub struct SignupForm {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub org_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Signup {
    pub user: DirectoryUser,
    pub organization: Organization,
}

#[derive(Debug, Clone)]
pub struct CrmClient {
    base_url: String,
    http: reqwest::Client,
}

impl CrmClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(base_url, reqwest::Client::new())
    }

    pub fn with_http(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http }
    }

    pub async fn health(&self) -> Result<(), ClientError> {
        let resp = self.send(self.request(Method::GET, "/health", None)).await?;
        check(resp).await.map(|_| ())
    }

    pub async fn signup(&self, form: &SignupForm) -> Result<Signup, ClientError> {
        let req = self
            .request(Method::POST, "/api/bootstrap/signup", None)
            .json(form);
        self.fetch(req).await
    }

    /// The caller's directory row; the server provisions one on first access.
    pub async fn me(&self, session: &Session) -> Result<DirectoryUser, ClientError> {
        self.fetch(self.request(Method::GET, "/api/users/me", Some(session)))
            .await
    }

    pub async fn create_profile(
        &self,
        session: &Session,
        email: &str,
        full_name: Option<&str>,
    ) -> Result<DirectoryUser, ClientError> {
        let req = self
            .request(Method::POST, "/api/users", Some(session))
            .json(&json!({ "email": email, "full_name": full_name }));
        self.fetch(req).await
    }

    pub async fn members(&self, session: &Session) -> Result<Vec<DirectoryUser>, ClientError> {
        self.fetch(self.request(Method::GET, "/api/users", Some(session)))
            .await
    }

    pub async fn update_member(
        &self,
        session: &Session,
        id: &str,
        patch: &DirectoryUserPatch,
    ) -> Result<DirectoryUser, ClientError> {
        let req = self
            .request(Method::PUT, &format!("/api/users/{id}"), Some(session))
            .json(patch);
        self.fetch(req).await
    }

    pub async fn remove_member(&self, session: &Session, id: &str) -> Result<(), ClientError> {
        let req = self.request(Method::DELETE, &format!("/api/users/{id}"), Some(session));
        check(self.send(req).await?).await.map(|_| ())
    }

    pub async fn organization(&self, session: &Session) -> Result<Organization, ClientError> {
        self.fetch(self.request(Method::GET, "/api/organizations", Some(session)))
            .await
    }

    pub async fn create_organization(
        &self,
        session: &Session,
        name: &str,
    ) -> Result<Organization, ClientError> {
        let req = self
            .request(Method::POST, "/api/organizations", Some(session))
            .json(&json!({ "name": name }));
        self.fetch(req).await
    }

    pub async fn rename_organization(
        &self,
        session: &Session,
        name: &str,
    ) -> Result<Organization, ClientError> {
        let req = self
            .request(Method::PUT, "/api/organizations", Some(session))
            .json(&json!({ "name": name }));
        self.fetch(req).await
    }

    /// List records of `R`, optionally filtered by field equality
    /// (e.g. `[("account_id", id)]`).
    pub async fn list<R: Resource>(
        &self,
        session: &Session,
        filters: &[(&str, &str)],
    ) -> Result<Vec<R>, ClientError> {
        let req = self
            .request(Method::GET, &collection_path::<R>(), Some(session))
            .query(filters);
        self.fetch(req).await
    }

    pub async fn get<R: Resource>(&self, session: &Session, id: &str) -> Result<R, ClientError> {
        let path = format!("{}/{id}", collection_path::<R>());
        self.fetch(self.request(Method::GET, &path, Some(session)))
            .await
    }

    pub async fn create<R: Resource>(
        &self,
        session: &Session,
        draft: &impl Serialize,
    ) -> Result<R, ClientError> {
        let req = self
            .request(Method::POST, &collection_path::<R>(), Some(session))
            .json(draft);
        self.fetch(req).await
    }

    /// Merge-patch: only the fields present in `patch` change.
    pub async fn update<R: Resource>(
        &self,
        session: &Session,
        id: &str,
        patch: &impl Serialize,
    ) -> Result<R, ClientError> {
        let path = format!("{}/{id}", collection_path::<R>());
        let req = self.request(Method::PUT, &path, Some(session)).json(patch);
        self.fetch(req).await
    }

    pub async fn delete<R: Resource>(&self, session: &Session, id: &str) -> Result<(), ClientError> {
        let path = format!("{}/{id}", collection_path::<R>());
        let req = self.request(Method::DELETE, &path, Some(session));
        check(self.send(req).await?).await.map(|_| ())
    }

    fn request(&self, method: Method, path: &str, session: Option<&Session>) -> RequestBuilder {
        let req = self.http.request(method, format!("{}{path}", self.base_url));
        match session {
            Some(session) => req.bearer_auth(session.token()),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, ClientError> {
        req.send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))
    }

    async fn fetch<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ClientError> {
        let resp = check(self.send(req).await?).await?;
        resp.json()
            .await
            .map_err(|e| ClientError::Transport(format!("invalid response body: {e}")))
    }
}

fn collection_path<R: Resource>() -> String {
    format!("/api/{}", R::KIND.collection)
}

async fn check(resp: Response) -> Result<Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), "request rejected");
    Err(error::from_response(status, &body))
}
