use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use crm_api::app::services::{AppServices, RecordStores};
use crm_auth::{AccessTokenClaims, DirectoryUser, DirectoryUserPatch, Hs256TokenVerifier, Identity, Role};
use crm_client::{ClientError, CrmClient, Session, SignupForm};
use crm_core::SubjectId;
use crm_infra::{CorsOrigins, InMemoryIdentityProvider, InMemoryTenantDirectory, TenantDirectory};
use crm_invoicing::Invoice;
use crm_parties::{Account, Contact};
use crm_sales::Activity;

const JWT_SECRET: &str = "test-secret";
const AUDIENCE: &str = "authenticated";

struct TestServer {
    base_url: String,
    directory: Arc<InMemoryTenantDirectory>,
    identities: Arc<InMemoryIdentityProvider>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let verifier = Hs256TokenVerifier::new(JWT_SECRET, Some(AUDIENCE));
        let identities = Arc::new(InMemoryIdentityProvider::new(verifier));
        let directory = Arc::new(InMemoryTenantDirectory::new());
        let services = AppServices::new(directory.clone(), identities.clone(), RecordStores::in_memory());

        // Build app (same router as prod), but bind to an ephemeral port.
        let app = crm_api::app::build_app(Arc::new(services), &CorsOrigins::Any);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            directory,
            identities,
            handle,
        }
    }

    fn client(&self) -> CrmClient {
        CrmClient::new(self.base_url.clone())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(secret: &str, sub: &str, email: &str) -> String {
    let now = Utc::now();
    let claims = AccessTokenClaims {
        sub: sub.to_string(),
        email: Some(email.to_string()),
        aud: Some(AUDIENCE.to_string()),
        exp: (now + ChronoDuration::minutes(10)).timestamp(),
        iat: Some(now.timestamp()),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn session(sub: &str, email: &str) -> Session {
    Session::new(mint_jwt(JWT_SECRET, sub, email))
}

fn api_status(err: ClientError) -> u16 {
    match err {
        ClientError::Api { status, .. } => status,
        ClientError::SessionExpired => 401,
        other => panic!("unexpected client error: {other}"),
    }
}

/// A member with the `user` role, added to an existing organization.
async fn add_member(srv: &TestServer, admin: &DirectoryUser, sub: &str) -> Session {
    let email = format!("{sub}@x.com");
    let row = DirectoryUser::new(
        SubjectId::parse(sub).unwrap(),
        email.clone(),
        None,
        Role::User,
        admin.organization_id,
    );
    srv.directory.insert_user(row).await.unwrap();
    session(sub, &email)
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;

    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "status": "ok" }));

    srv.client().health().await.unwrap();
}

#[tokio::test]
async fn protected_routes_reject_missing_or_invalid_tokens() {
    let srv = TestServer::spawn().await;
    let http = reqwest::Client::new();

    let forged = mint_jwt("some-other-secret", "u1", "u1@x.com");
    let routes = [
        (reqwest::Method::GET, "/api/users/me"),
        (reqwest::Method::GET, "/api/users"),
        (reqwest::Method::GET, "/api/organizations"),
        (reqwest::Method::POST, "/api/organizations"),
        (reqwest::Method::GET, "/api/accounts"),
        (reqwest::Method::POST, "/api/accounts"),
        (reqwest::Method::DELETE, "/api/contacts/0190a5c4-0000-7000-8000-000000000000"),
        (reqwest::Method::PUT, "/api/expenses/0190a5c4-0000-7000-8000-000000000000"),
    ];

    for (method, path) in routes {
        let res = http
            .request(method.clone(), srv.url(path))
            .json(&json!({ "name": "Acme" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{method} {path} without token");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "unauthenticated");

        let res = http
            .request(method.clone(), srv.url(path))
            .bearer_auth(&forged)
            .json(&json!({ "name": "Acme" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{method} {path} with forged token");
    }

    // None of the rejected requests touched the directory.
    assert_eq!(srv.directory.organization_count(), 0);
}

#[tokio::test]
async fn client_reports_expired_session() {
    let srv = TestServer::spawn().await;
    let bogus = Session::new("not-a-jwt");

    let err = srv.client().me(&bogus).await.unwrap_err();
    assert_eq!(err, ClientError::SessionExpired);
}

#[tokio::test]
async fn principal_without_organization_is_forbidden() {
    let srv = TestServer::spawn().await;
    let client = srv.client();
    let loner = session("loner", "loner@x.com");

    let profile = client.create_profile(&loner, "loner@x.com", None).await.unwrap();
    assert_eq!(profile.organization_id, None);

    let http = reqwest::Client::new();
    for path in [
        "/api/accounts",
        "/api/contacts",
        "/api/leads",
        "/api/opportunities",
        "/api/activities",
        "/api/invoices",
        "/api/expenses",
        "/api/users",
        "/api/organizations",
    ] {
        let res = http
            .get(srv.url(path))
            .bearer_auth(loner.token())
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN, "GET {path}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["message"], "no organization");
    }

    let err = client
        .create::<Account>(&loner, &json!({ "name": "Acme" }))
        .await
        .unwrap_err();
    assert_eq!(api_status(err), 403);
}

#[tokio::test]
async fn first_access_provisions_exactly_once() {
    let srv = TestServer::spawn().await;
    let client = srv.client();
    let alice = session("alice", "alice@example.com");

    let first = client.me(&alice).await.unwrap();
    let second = client.me(&alice).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.role, Role::User);
    assert_eq!(first.full_name.as_deref(), Some("alice"));
    assert!(first.organization_id.is_some());
    assert_eq!(srv.directory.organization_count(), 1);

    let organization = client.organization(&alice).await.unwrap();
    assert_eq!(Some(organization.id), first.organization_id);
    assert_eq!(organization.name, "alice's Org");

    let members = client.members(&alice).await.unwrap();
    assert_eq!(members, vec![first]);
}

#[tokio::test]
async fn concurrent_first_access_creates_one_organization() {
    let srv = TestServer::spawn().await;
    let client = srv.client();
    let racer = session("racer", "racer@x.com");

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let client = client.clone();
        let racer = racer.clone();
        tasks.push(tokio::spawn(async move { client.me(&racer).await }));
    }

    let mut rows = Vec::new();
    for task in tasks {
        rows.push(task.await.unwrap().unwrap());
    }

    assert!(rows.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(srv.directory.organization_count(), 1);
}

#[tokio::test]
async fn signup_creates_admin_owned_organization() {
    let srv = TestServer::spawn().await;
    let client = srv.client();
    srv.identities.register(Identity {
        subject: SubjectId::parse("u1").unwrap(),
        email: "a@x.com".to_string(),
    });

    let form = SignupForm {
        user_id: "u1".to_string(),
        email: "a@x.com".to_string(),
        full_name: None,
        org_name: "Acme".to_string(),
    };
    let signup = client.signup(&form).await.unwrap();

    assert_eq!(signup.user.role, Role::Admin);
    assert_eq!(signup.user.organization_id, Some(signup.organization.id));
    assert_eq!(signup.organization.name, "Acme");

    let u1 = session("u1", "a@x.com");
    let accounts = client.list::<Account>(&u1, &[]).await.unwrap();
    assert!(accounts.is_empty());

    // A second signup for the same subject does not create another tenant.
    let err = client.signup(&form).await.unwrap_err();
    match err {
        ClientError::Api { status, code, .. } => {
            assert_eq!(status, 400);
            assert_eq!(code, "already_provisioned");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(srv.directory.organization_count(), 1);
}

#[tokio::test]
async fn signup_validates_its_body() {
    let srv = TestServer::spawn().await;
    let http = reqwest::Client::new();

    let missing_org = http
        .post(srv.url("/api/bootstrap/signup"))
        .json(&json!({ "userId": "u1", "email": "a@x.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing_org.status(), StatusCode::BAD_REQUEST);

    let unknown_identity = http
        .post(srv.url("/api/bootstrap/signup"))
        .json(&json!({ "userId": "ghost", "email": "g@x.com", "org_name": "Ghosts" }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown_identity.status(), StatusCode::BAD_REQUEST);

    assert_eq!(srv.directory.organization_count(), 0);
}

#[tokio::test]
async fn cross_tenant_records_are_not_found() {
    let srv = TestServer::spawn().await;
    let client = srv.client();
    let t1 = session("tenant-one", "one@x.com");
    let t2 = session("tenant-two", "two@x.com");

    client.me(&t1).await.unwrap();
    client.me(&t2).await.unwrap();

    let account: Account = client.create(&t1, &json!({ "name": "Acme" })).await.unwrap();
    let id = account.meta.id.to_string();

    assert_eq!(client.get::<Account>(&t1, &id).await.unwrap(), account);

    let err = client.get::<Account>(&t2, &id).await.unwrap_err();
    assert!(err.is_not_found());
    let err = client
        .update::<Account>(&t2, &id, &json!({ "name": "Stolen" }))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(client.list::<Account>(&t2, &[]).await.unwrap().is_empty());

    // Malformed ids look the same as foreign ones.
    let err = client.get::<Account>(&t2, "not-a-uuid").await.unwrap_err();
    assert!(err.is_not_found());

    // Still intact for its owner.
    let unchanged = client.get::<Account>(&t1, &id).await.unwrap();
    assert_eq!(unchanged.name, "Acme");
}

#[tokio::test]
async fn server_injects_tenant_and_creator() {
    let srv = TestServer::spawn().await;
    let client = srv.client();
    let alice = session("alice", "alice@x.com");
    let me = client.me(&alice).await.unwrap();

    let account: Account = client
        .create(
            &alice,
            &json!({
                "name": "Acme",
                "organization_id": "0190a5c4-0000-7000-8000-000000000000",
                "created_by": "mallory",
            }),
        )
        .await
        .unwrap();

    assert_eq!(Some(account.meta.organization_id), me.organization_id);
    assert_eq!(account.meta.created_by, Some(me.id));
}

#[tokio::test]
async fn contact_phone_patch_leaves_other_fields_intact() {
    let srv = TestServer::spawn().await;
    let client = srv.client();
    let alice = session("alice", "alice@x.com");
    client.me(&alice).await.unwrap();

    let contact: Contact = client
        .create(
            &alice,
            &json!({
                "first_name": "Ada",
                "last_name": "Lovelace",
                "email": "ada@x.com",
                "phone": "111",
            }),
        )
        .await
        .unwrap();
    let id = contact.meta.id.to_string();

    let updated: Contact = client
        .update(&alice, &id, &json!({ "phone": "222" }))
        .await
        .unwrap();

    assert_eq!(updated.phone.as_deref(), Some("222"));
    assert_eq!(updated.first_name, "Ada");
    assert_eq!(updated.last_name, "Lovelace");
    assert_eq!(updated.email.as_deref(), Some("ada@x.com"));
    assert_eq!(updated.meta, contact.meta);
}

#[tokio::test]
async fn list_is_newest_first_and_filterable() {
    let srv = TestServer::spawn().await;
    let client = srv.client();
    let alice = session("alice", "alice@x.com");
    client.me(&alice).await.unwrap();

    let acme: Account = client.create(&alice, &json!({ "name": "Acme" })).await.unwrap();
    let globex: Account = client.create(&alice, &json!({ "name": "Globex" })).await.unwrap();

    let accounts = client.list::<Account>(&alice, &[]).await.unwrap();
    let names: Vec<_> = accounts.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["Globex", "Acme"]);

    let acme_id = acme.meta.id.to_string();
    let globex_id = globex.meta.id.to_string();
    for (first_name, account) in [("Ada", &acme_id), ("Grace", &globex_id)] {
        let _: Contact = client
            .create(
                &alice,
                &json!({ "first_name": first_name, "last_name": "X", "account_id": account }),
            )
            .await
            .unwrap();
    }

    let contacts = client
        .list::<Contact>(&alice, &[("account_id", acme_id.as_str())])
        .await
        .unwrap();
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].first_name, "Ada");

    let activity: Activity = client
        .create(
            &alice,
            &json!({
                "type": "call",
                "subject": "Intro",
                "regarding_type": "account",
                "regarding_id": acme_id,
            }),
        )
        .await
        .unwrap();
    assert!(!activity.completed);

    let regarding = client
        .list::<Activity>(
            &alice,
            &[("regarding_type", "account"), ("regarding_id", acme_id.as_str())],
        )
        .await
        .unwrap();
    assert_eq!(regarding, vec![activity]);
    let other = client
        .list::<Activity>(
            &alice,
            &[("regarding_type", "account"), ("regarding_id", globex_id.as_str())],
        )
        .await
        .unwrap();
    assert!(other.is_empty());
}

#[tokio::test]
async fn create_rejects_missing_fields_and_malformed_bodies() {
    let srv = TestServer::spawn().await;
    let alice = session("alice", "alice@x.com");
    srv.client().me(&alice).await.unwrap();
    let http = reqwest::Client::new();

    let res = http
        .post(srv.url("/api/accounts"))
        .bearer_auth(alice.token())
        .json(&json!({ "industry": "Retail" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = http
        .post(srv.url("/api/expenses"))
        .bearer_auth(alice.token())
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "bad_request");

    let res = http
        .get(srv.url("/api/accounts"))
        .bearer_auth(alice.token())
        .send()
        .await
        .unwrap();
    let accounts: Vec<Value> = res.json().await.unwrap();
    assert!(accounts.is_empty());
}

#[tokio::test]
async fn delete_requires_admin_where_marked() {
    let srv = TestServer::spawn().await;
    let client = srv.client();
    let owner = session("owner", "owner@x.com");
    // Profile first, organization second: the existing row becomes admin.
    let profile = client.create_profile(&owner, "owner@x.com", None).await.unwrap();
    assert_eq!(profile.role, Role::User);
    let organization = client.create_organization(&owner, "Acme").await.unwrap();

    let owner_row = client.me(&owner).await.unwrap();
    assert_eq!(owner_row.role, Role::Admin);
    assert_eq!(owner_row.organization_id, Some(organization.id));

    let member = add_member(&srv, &owner_row, "member").await;

    let account: Account = client.create(&member, &json!({ "name": "Acme" })).await.unwrap();
    let account_id = account.meta.id.to_string();

    let err = client.delete::<Account>(&member, &account_id).await.unwrap_err();
    assert!(err.is_forbidden());
    client.get::<Account>(&owner, &account_id).await.unwrap();

    let activity: Activity = client
        .create(&member, &json!({ "type": "task", "subject": "Follow up" }))
        .await
        .unwrap();
    client
        .delete::<Activity>(&member, &activity.meta.id.to_string())
        .await
        .unwrap();

    client.delete::<Account>(&owner, &account_id).await.unwrap();
    let err = client.get::<Account>(&owner, &account_id).await.unwrap_err();
    assert!(err.is_not_found());
    let err = client.delete::<Account>(&owner, &account_id).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn organization_endpoints() {
    let srv = TestServer::spawn().await;
    let client = srv.client();
    let founder = session("founder", "founder@x.com");

    // No directory row yet: one is created from the token.
    let organization = client.create_organization(&founder, "Initech").await.unwrap();
    let me = client.me(&founder).await.unwrap();
    assert_eq!(me.organization_id, Some(organization.id));
    assert_eq!(me.role, Role::Admin);
    assert_eq!(me.email, "founder@x.com");

    let err = client.create_organization(&founder, "Second").await.unwrap_err();
    assert_eq!(api_status(err), 400);
    assert_eq!(srv.directory.organization_count(), 1);

    let renamed = client.rename_organization(&founder, "Initrode").await.unwrap();
    assert_eq!(renamed.id, organization.id);
    assert_eq!(client.organization(&founder).await.unwrap().name, "Initrode");

    let err = client.rename_organization(&founder, "  ").await.unwrap_err();
    assert_eq!(api_status(err), 400);

    let member = add_member(&srv, &me, "peon").await;
    let err = client.rename_organization(&member, "Mine").await.unwrap_err();
    assert!(err.is_forbidden());
    assert_eq!(client.organization(&member).await.unwrap().name, "Initrode");
}

#[tokio::test]
async fn member_management_is_admin_only_and_tenant_scoped() {
    let srv = TestServer::spawn().await;
    let client = srv.client();

    let admin = session("boss", "boss@x.com");
    client.create_organization(&admin, "Acme").await.unwrap();
    let admin_row = client.me(&admin).await.unwrap();
    let member = add_member(&srv, &admin_row, "worker").await;

    let outsider = session("outsider", "outsider@x.com");
    client.me(&outsider).await.unwrap();

    let members = client.members(&admin).await.unwrap();
    assert_eq!(members.len(), 2);

    // Members cannot manage each other.
    let patch = DirectoryUserPatch {
        role: Some(Role::Admin),
        full_name: None,
    };
    let err = client.update_member(&member, "worker", &patch).await.unwrap_err();
    assert!(err.is_forbidden());

    let promoted = client
        .update_member(
            &admin,
            "worker",
            &DirectoryUserPatch {
                role: None,
                full_name: Some("Willa Worker".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(promoted.full_name.as_deref(), Some("Willa Worker"));
    assert_eq!(promoted.role, Role::User);

    // Users of other tenants are invisible.
    let err = client.update_member(&admin, "outsider", &patch).await.unwrap_err();
    assert!(err.is_not_found());
    let err = client.remove_member(&admin, "outsider").await.unwrap_err();
    assert!(err.is_not_found());

    let http = reqwest::Client::new();
    let res = http
        .put(srv.url("/api/users/worker"))
        .bearer_auth(admin.token())
        .json(&json!({ "role": "superuser" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = http
        .delete(srv.url("/api/users/boss"))
        .bearer_auth(admin.token())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Cannot delete yourself");

    client.remove_member(&admin, "worker").await.unwrap();
    assert_eq!(client.members(&admin).await.unwrap().len(), 1);
}

#[tokio::test]
async fn create_profile_is_idempotent() {
    let srv = TestServer::spawn().await;
    let client = srv.client();
    let carol = session("carol", "carol@x.com");
    let http = reqwest::Client::new();

    let res = http
        .post(srv.url("/api/users"))
        .bearer_auth(carol.token())
        .json(&json!({ "email": "carol@x.com", "full_name": "Carol" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = http
        .post(srv.url("/api/users"))
        .bearer_auth(carol.token())
        .json(&json!({ "email": "carol@x.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let row: DirectoryUser = res.json().await.unwrap();
    assert_eq!(row.full_name.as_deref(), Some("Carol"));

    let dave = session("dave", "dave@x.com");
    let err = client.create_profile(&dave, "", None).await.unwrap_err();
    assert_eq!(api_status(err), 400);
}

fn api_message(err: ClientError) -> (u16, String) {
    match err {
        ClientError::Api { status, message, .. } => (status, message),
        other => panic!("unexpected client error: {other}"),
    }
}

#[tokio::test]
async fn references_must_belong_to_the_callers_organization() {
    let srv = TestServer::spawn().await;
    let client = srv.client();
    let t1 = session("tenant-one", "one@x.com");
    let t2 = session("tenant-two", "two@x.com");
    client.me(&t1).await.unwrap();
    client.me(&t2).await.unwrap();

    let foreign: Account = client.create(&t1, &json!({ "name": "Acme" })).await.unwrap();
    let foreign_id = foreign.meta.id.to_string();
    let random_id = "0190a5c4-0000-7000-8000-000000000000";

    let err = client
        .create::<Contact>(&t2, &json!({ "first_name": "Eve", "last_name": "X", "account_id": foreign_id }))
        .await
        .unwrap_err();
    let (status, foreign_message) = api_message(err);
    assert_eq!(status, 400);

    // A foreign id is indistinguishable from one that does not exist.
    let err = client
        .create::<Contact>(&t2, &json!({ "first_name": "Eve", "last_name": "X", "account_id": random_id }))
        .await
        .unwrap_err();
    assert_eq!(api_message(err), (400, foreign_message));
    assert!(client.list::<Contact>(&t2, &[]).await.unwrap().is_empty());

    let own: Account = client.create(&t2, &json!({ "name": "Globex" })).await.unwrap();
    let contact: Contact = client
        .create(&t2, &json!({ "first_name": "Eve", "last_name": "X", "account_id": own.meta.id }))
        .await
        .unwrap();
    let contact_id = contact.meta.id.to_string();

    let err = client
        .update::<Contact>(&t2, &contact_id, &json!({ "account_id": foreign_id }))
        .await
        .unwrap_err();
    assert_eq!(api_status(err), 400);
    let unchanged = client.get::<Contact>(&t2, &contact_id).await.unwrap();
    assert_eq!(unchanged.account_id, Some(own.meta.id));

    let err = client
        .create::<Invoice>(&t2, &json!({ "number": "INV-1", "account_id": foreign_id }))
        .await
        .unwrap_err();
    assert_eq!(api_status(err), 400);

    let err = client
        .create::<Activity>(
            &t2,
            &json!({ "type": "call", "subject": "Intro", "regarding_type": "account", "regarding_id": foreign_id }),
        )
        .await
        .unwrap_err();
    assert_eq!(api_status(err), 400);

    // Free-form regarding types are not looked up.
    let _: Activity = client
        .create(
            &t2,
            &json!({ "type": "call", "subject": "Intro", "regarding_type": "meeting-room", "regarding_id": random_id }),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn patch_cannot_blank_required_fields() {
    let srv = TestServer::spawn().await;
    let client = srv.client();
    let alice = session("alice", "alice@x.com");
    client.me(&alice).await.unwrap();

    let contact: Contact = client
        .create(&alice, &json!({ "first_name": "Ada", "last_name": "Lovelace" }))
        .await
        .unwrap();
    let id = contact.meta.id.to_string();

    let err = client
        .update::<Contact>(&alice, &id, &json!({ "first_name": "   " }))
        .await
        .unwrap_err();
    assert_eq!(api_status(err), 400);

    // `null` on a required field is ignored rather than clearing it.
    let kept: Contact = client
        .update(&alice, &id, &json!({ "last_name": null, "title": "Countess" }))
        .await
        .unwrap();
    assert_eq!(kept.first_name, "Ada");
    assert_eq!(kept.last_name, "Lovelace");
    assert_eq!(kept.title.as_deref(), Some("Countess"));

    let account: Account = client.create(&alice, &json!({ "name": "Acme" })).await.unwrap();
    let err = client
        .update::<Account>(&alice, &account.meta.id.to_string(), &json!({ "name": "" }))
        .await
        .unwrap_err();
    assert_eq!(api_status(err), 400);
    let unchanged = client.get::<Account>(&alice, &account.meta.id.to_string()).await.unwrap();
    assert_eq!(unchanged.name, "Acme");
}

#[tokio::test]
async fn invoices_carry_their_account_name() {
    let srv = TestServer::spawn().await;
    let client = srv.client();
    let alice = session("alice", "alice@x.com");
    client.me(&alice).await.unwrap();
    let http = reqwest::Client::new();

    let acme: Account = client.create(&alice, &json!({ "name": "Acme" })).await.unwrap();
    let billed: Invoice = client
        .create(&alice, &json!({ "number": "INV-1", "account_id": acme.meta.id, "amount": 120.0 }))
        .await
        .unwrap();
    let _: Invoice = client
        .create(&alice, &json!({ "number": "INV-2" }))
        .await
        .unwrap();

    let res = http
        .get(srv.url("/api/invoices"))
        .bearer_auth(alice.token())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let listed: Vec<Value> = res.json().await.unwrap();
    let names: Vec<(&str, &str)> = listed
        .iter()
        .map(|inv| (inv["number"].as_str().unwrap(), inv["account_name"].as_str().unwrap()))
        .collect();
    assert_eq!(names, [("INV-2", "Unknown"), ("INV-1", "Acme")]);

    let res = http
        .get(srv.url(&format!("/api/invoices/{}", billed.meta.id)))
        .bearer_auth(alice.token())
        .send()
        .await
        .unwrap();
    let fetched: Value = res.json().await.unwrap();
    assert_eq!(fetched["account_name"], "Acme");
    assert_eq!(fetched["status"], "draft");

    // The typed client still reads the invoice itself.
    let typed = client.list::<Invoice>(&alice, &[]).await.unwrap();
    assert_eq!(typed.len(), 2);
}
