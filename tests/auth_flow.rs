use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use axum::body::Body;
use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use http_body_util::BodyExt;
use tower::ServiceExt;
use wellness_sso::app;
use wellness_sso::memory::{MemoryIdentityStore, MemorySessionStore};
use wellness_sso::middleware::{
    AuthConfig, AuthState, IdentityStore, NewSession, SessionStore, StoreError,
};
use wellness_sso::{AuthClient, ExternalId, Identity, OAuthConfig, Role, SessionId};

const SESSION_COOKIE: &str = "__wellness_session";

fn test_config() -> AuthConfig {
    let oauth = OAuthConfig::new(
        "test-client",
        "test-secret",
        "http://localhost:3000/auth/google/callback".parse().unwrap(),
    );
    AuthConfig::new(AuthClient::new(oauth))
        .with_secure_cookies(false)
        .with_dev_login_enabled(true)
}

async fn send(router: &Router, uri: &str, cookie: Option<&str>) -> Response {
    let mut req = Request::get(uri);
    if let Some(cookie) = cookie {
        req = req.header(COOKIE, cookie);
    }
    router
        .clone()
        .oneshot(req.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

fn location(resp: &Response) -> &str {
    resp.headers()[LOCATION].to_str().unwrap()
}

fn session_cookie(resp: &Response) -> Option<String> {
    resp.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{SESSION_COOKIE}=")))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

/// Names of the cookies a response tells the browser to drop.
fn cleared_cookies(resp: &Response) -> Vec<String> {
    resp.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter(|v| v.contains("Max-Age=0"))
        .filter_map(|v| v.split('=').next())
        .map(str::to_string)
        .collect()
}

async fn body_text(resp: Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

struct TestApp {
    router: Router,
    identities: Arc<MemoryIdentityStore>,
    sessions: Arc<MemorySessionStore>,
}

impl TestApp {
    fn new() -> Self {
        let identities = Arc::new(MemoryIdentityStore::new());
        let sessions = Arc::new(MemorySessionStore::default());
        let state = AuthState::from_shared(test_config(), identities.clone(), sessions.clone());
        Self {
            router: app::router(state),
            identities,
            sessions,
        }
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        send(&self.router, uri, cookie).await
    }

    /// Dev-login and return the landing page plus the session cookie.
    async fn login(&self, id: &str, name: &str) -> (String, String) {
        let resp = self
            .get(&format!("/auth/google/dev-login?id={id}&name={name}"), None)
            .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let cookie = session_cookie(&resp).expect("login sets a session cookie");
        (location(&resp).to_string(), cookie)
    }
}

#[tokio::test]
async fn anonymous_dashboard_redirects_to_error_view() {
    let app = TestApp::new();

    let resp = app.get("/dashboard", None).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/error");
}

#[tokio::test]
async fn first_login_lands_on_dashboard_as_user() {
    let app = TestApp::new();
    let (landing, cookie) = app.login("g-123", "Ada").await;
    assert_eq!(landing, "/dashboard");

    let resp = app.get("/dashboard", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(resp).await;
    assert!(body.contains("Welcome Ada! Role: user"), "{body}");

    let identity = app
        .identities
        .find(&ExternalId::from("g-123"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(identity.login_count, 1);
    assert_eq!(identity.role, Role::User);
}

#[tokio::test]
async fn role_gate_separates_anonymous_from_forbidden() {
    let app = TestApp::new();

    let anonymous = app.get("/super-dashboard", None).await;
    assert_eq!(anonymous.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&anonymous), "/error");

    let (_, cookie) = app.login("g-123", "Ada").await;
    let user = app.get("/super-dashboard", Some(&cookie)).await;
    assert_eq!(user.status(), StatusCode::FORBIDDEN);
    assert!(user.headers().get(LOCATION).is_none());
}

#[tokio::test]
async fn fourth_login_promotes_to_superuser() {
    let app = TestApp::new();

    let mut landings = Vec::new();
    let mut cookie = String::new();
    for _ in 0..5 {
        let (landing, c) = app.login("g-123", "Ada").await;
        landings.push(landing);
        cookie = c;
    }
    assert_eq!(
        landings,
        [
            "/dashboard",
            "/dashboard",
            "/dashboard",
            "/super-dashboard",
            "/super-dashboard"
        ]
    );

    let resp = app.get("/super-dashboard", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("Role: superuser"));

    let identity = app
        .identities
        .find(&ExternalId::from("g-123"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(identity.login_count, 5);
    assert_eq!(identity.role, Role::Superuser);
}

#[tokio::test]
async fn deleted_identity_downgrades_to_anonymous() {
    let app = TestApp::new();
    let (_, cookie) = app.login("g-123", "Ada").await;

    app.identities.remove(&ExternalId::from("g-123"));

    let resp = app.get("/dashboard", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/error");

    let index = app.get("/", Some(&cookie)).await;
    assert_eq!(index.status(), StatusCode::OK);
    assert!(body_text(index).await.contains("Sign in"));
}

#[tokio::test]
async fn logout_discards_session_but_keeps_identity() {
    let app = TestApp::new();
    let (_, cookie) = app.login("g-123", "Ada").await;
    assert_eq!(app.sessions.len(), 1);

    let resp = app.get("/logout", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");
    assert!(app.sessions.is_empty());

    let after = app.get("/dashboard", Some(&cookie)).await;
    assert_eq!(after.status(), StatusCode::SEE_OTHER);

    let identity = app
        .identities
        .find(&ExternalId::from("g-123"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(identity.login_count, 1);
}

#[tokio::test]
async fn relogin_replaces_previous_session() {
    let app = TestApp::new();
    let (_, first) = app.login("g-123", "Ada").await;

    let resp = app
        .get("/auth/google/dev-login?id=g-123&name=Ada", Some(&first))
        .await;
    let second = session_cookie(&resp).unwrap();

    assert_eq!(app.sessions.len(), 1);
    assert_eq!(
        app.get("/dashboard", Some(&first)).await.status(),
        StatusCode::SEE_OTHER
    );
    assert_eq!(
        app.get("/dashboard", Some(&second)).await.status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn admin_route_requires_exact_role() {
    let app = TestApp::new();
    app.identities.insert(Identity {
        external_id: ExternalId::from("g-root"),
        display_name: "Root".into(),
        login_count: 7,
        role: Role::Admin,
    });

    let (landing, admin) = app.login("g-root", "Root").await;
    assert_eq!(landing, "/dashboard");
    assert_eq!(
        app.get("/protected", Some(&admin)).await.status(),
        StatusCode::OK
    );
    assert_eq!(
        app.get("/super-dashboard", Some(&admin)).await.status(),
        StatusCode::FORBIDDEN
    );

    let mut superuser = String::new();
    for _ in 0..4 {
        superuser = app.login("g-123", "Ada").await.1;
    }
    assert_eq!(
        app.get("/protected", Some(&superuser)).await.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.get("/protected", None).await.status(),
        StatusCode::SEE_OTHER
    );
}

#[tokio::test]
async fn display_name_is_escaped() {
    let app = TestApp::new();
    let (_, cookie) = app.login("g-xss", "%3Cb%3EAda%3C%2Fb%3E").await;

    let body = body_text(app.get("/dashboard", Some(&cookie)).await).await;
    assert!(body.contains("&lt;b&gt;Ada&lt;/b&gt;"), "{body}");
    assert!(!body.contains("<b>Ada</b>"));
}

#[tokio::test]
async fn wellness_goals_api_is_gated() {
    let app = TestApp::new();
    assert_eq!(
        app.get("/api/wellness-goals", None).await.status(),
        StatusCode::SEE_OTHER
    );

    let (_, cookie) = app.login("g-123", "Ada").await;
    let resp = app.get("/api/wellness-goals", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let goals: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
    assert_eq!(goals.as_array().map(Vec::len), Some(4));

    let one = app.get("/api/wellness-goals/2", Some(&cookie)).await;
    assert_eq!(one.status(), StatusCode::OK);
    let goal: serde_json::Value = serde_json::from_str(&body_text(one).await).unwrap();
    assert_eq!(goal["title"], "Walk");

    assert_eq!(
        app.get("/api/wellness-goals/99", Some(&cookie)).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn login_redirects_to_google_with_handshake_cookies() {
    let app = TestApp::new();
    let resp = app.get("/auth/google", None).await;

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
    let names: Vec<String> = resp
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split('=').next())
        .map(str::to_string)
        .collect();
    assert!(names.contains(&"__wellness_pkce".to_string()));
    assert!(names.contains(&"__wellness_state".to_string()));
}

#[tokio::test]
async fn provider_denial_routes_to_error_view() {
    let app = TestApp::new();
    let resp = app
        .get("/auth/google/callback?error=access_denied", None)
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/error?error=access_denied");
    assert!(app.identities.is_empty());

    let cleared = cleared_cookies(&resp);
    assert!(cleared.contains(&"__wellness_pkce".to_string()), "{cleared:?}");
    assert!(cleared.contains(&"__wellness_state".to_string()), "{cleared:?}");
}

#[tokio::test]
async fn callback_without_handshake_cookies_is_state_mismatch() {
    let app = TestApp::new();
    let resp = app
        .get("/auth/google/callback?code=abc&state=xyz", None)
        .await;
    assert_eq!(location(&resp), "/error?error=state_mismatch");
    assert_eq!(cleared_cookies(&resp).len(), 2);
}

#[tokio::test]
async fn dev_login_with_blank_name_shows_subject() {
    let app = TestApp::new();
    let (_, cookie) = app.login("g-blank", "").await;

    let body = body_text(app.get("/dashboard", Some(&cookie)).await).await;
    assert!(body.contains("Welcome g-blank! Role: user"), "{body}");

    let identity = app
        .identities
        .find(&ExternalId::from("g-blank"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(identity.display_name, "g-blank");
}

#[tokio::test]
async fn dev_login_absent_unless_enabled() {
    let state = AuthState::new(
        test_config().with_dev_login_enabled(false),
        MemoryIdentityStore::new(),
        MemorySessionStore::default(),
    );
    let router = app::router(state);
    let resp = send(&router, "/auth/google/dev-login?id=g-1", None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ── Failing stores ─────────────────────────────────────────────────

struct UnreachableIdentities;

impl IdentityStore for UnreachableIdentities {
    async fn find(&self, _: &ExternalId) -> Result<Option<Identity>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn upsert_with<F>(&self, _: &ExternalId, _: F) -> Result<Identity, StoreError>
    where
        F: FnOnce(Option<Identity>) -> Identity + Send,
    {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

#[derive(Default)]
struct FlakyIdentities {
    inner: MemoryIdentityStore,
    fail_find: AtomicBool,
}

impl IdentityStore for FlakyIdentities {
    async fn find(&self, external_id: &ExternalId) -> Result<Option<Identity>, StoreError> {
        if self.fail_find.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("read timeout".into()));
        }
        self.inner.find(external_id).await
    }

    async fn upsert_with<F>(
        &self,
        external_id: &ExternalId,
        apply: F,
    ) -> Result<Identity, StoreError>
    where
        F: FnOnce(Option<Identity>) -> Identity + Send,
    {
        self.inner.upsert_with(external_id, apply).await
    }
}

#[derive(Default)]
struct FlakySessions {
    inner: MemorySessionStore,
    fail_delete: AtomicBool,
}

impl SessionStore for FlakySessions {
    async fn create(&self, session: NewSession) -> Result<SessionId, StoreError> {
        self.inner.create(session).await
    }

    async fn find(&self, session_id: &SessionId) -> Result<Option<ExternalId>, StoreError> {
        self.inner.find(session_id).await
    }

    async fn delete(&self, session_id: &SessionId) -> Result<(), StoreError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection reset".into()));
        }
        self.inner.delete(session_id).await
    }
}

#[tokio::test]
async fn store_outage_during_login_is_a_generic_error() {
    let state = AuthState::new(
        test_config(),
        UnreachableIdentities,
        MemorySessionStore::default(),
    );
    let router = app::router(state);

    let resp = send(&router, "/auth/google/dev-login?id=g-1&name=Ada", None).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(session_cookie(&resp).is_none());
    assert!(body_text(resp).await.contains("Something went wrong"));
}

#[tokio::test]
async fn failed_logout_is_reported_not_hidden() {
    let sessions = Arc::new(FlakySessions::default());
    let state = AuthState::from_shared(
        test_config(),
        Arc::new(MemoryIdentityStore::new()),
        sessions.clone(),
    );
    let router = app::router(state);

    let resp = send(&router, "/auth/google/dev-login?id=g-1&name=Ada", None).await;
    let cookie = session_cookie(&resp).unwrap();

    sessions.fail_delete.store(true, Ordering::SeqCst);
    let resp = send(&router, "/logout", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(resp.headers().get(SET_COOKIE).is_none());

    // Still signed in.
    assert_eq!(
        send(&router, "/dashboard", Some(&cookie)).await.status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn store_outage_during_resolution_is_not_anonymous() {
    let identities = Arc::new(FlakyIdentities::default());
    let state = AuthState::from_shared(
        test_config(),
        identities.clone(),
        Arc::new(MemorySessionStore::default()),
    );
    let router = app::router(state);

    let resp = send(&router, "/auth/google/dev-login?id=g-1&name=Ada", None).await;
    let cookie = session_cookie(&resp).unwrap();

    identities.fail_find.store(true, Ordering::SeqCst);
    for uri in ["/dashboard", "/super-dashboard"] {
        let resp = send(&router, uri, Some(&cookie)).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
        assert!(resp.headers().get(LOCATION).is_none(), "{uri}");
        assert!(body_text(resp).await.contains("Something went wrong"));
    }

    identities.fail_find.store(false, Ordering::SeqCst);
    assert_eq!(
        send(&router, "/dashboard", Some(&cookie)).await.status(),
        StatusCode::OK
    );
}
