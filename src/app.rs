//! Application router: public pages, gated dashboards and the goals API.

use axum::Router;
use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::get;
use serde::Deserialize;

use crate::goals::{self, WellnessGoal};
use crate::middleware::{
    AdminOnly, AuthState, IdentityStore, Principal, SessionStore, SuperuserOnly, auth_routes,
};

/// Full application router with auth routes merged in.
pub fn router<I: IdentityStore, S: SessionStore>(state: AuthState<I, S>) -> Router {
    Router::<AuthState<I, S>>::new()
        .route("/", get(index))
        .route("/signin", get(signin))
        .route("/error", get(error_page))
        .route("/dashboard", get(dashboard))
        .route("/super-dashboard", get(super_dashboard))
        .route("/protected", get(protected))
        .route("/api/wellness-goals", get(list_goals))
        .route("/api/wellness-goals/{id}", get(get_goal))
        .merge(auth_routes(&state))
        .with_state(state)
}

async fn index(principal: Option<Principal>) -> Html<String> {
    let body = match principal {
        Some(p) => format!(
            "<h1>Wellness Goals</h1><p>Signed in as {}.</p><a href=\"/dashboard\">Dashboard</a> <a href=\"/logout\">Logout</a>",
            escape_html(&p.display_name)
        ),
        None => "<h1>Wellness Goals</h1><a href=\"/signin\">Sign in</a>".to_string(),
    };
    Html(body)
}

async fn signin() -> Html<&'static str> {
    Html("<h1>Sign in</h1><a href=\"/auth/google\">Sign in with Google</a>")
}

#[derive(Deserialize)]
struct ErrorParams {
    error: Option<String>,
}

async fn error_page(Query(params): Query<ErrorParams>) -> Html<String> {
    let detail = params
        .error
        .map(|code| format!("<p>Reason: {}</p>", escape_html(&code)))
        .unwrap_or_default();
    Html(format!(
        "<h1>Authentication required</h1>{detail}<a href=\"/signin\">Sign in</a>"
    ))
}

async fn dashboard(principal: Principal) -> Html<String> {
    Html(format!(
        "<h1>Dashboard</h1><p>Welcome {}! Role: {}</p><a href=\"/logout\">Logout</a>",
        escape_html(&principal.display_name),
        principal.role
    ))
}

async fn super_dashboard(principal: SuperuserOnly) -> Html<String> {
    Html(format!(
        "<h1>Super Dashboard</h1><p>Welcome {}! Role: {}</p><a href=\"/logout\">Logout</a>",
        escape_html(&principal.display_name),
        principal.role
    ))
}

async fn protected(principal: AdminOnly) -> Html<String> {
    Html(format!(
        "<h1>Protected</h1><p>Hello admin {}.</p>",
        escape_html(&principal.display_name)
    ))
}

async fn list_goals(_: Principal) -> Json<&'static [WellnessGoal]> {
    Json(goals::WELLNESS_GOALS)
}

async fn get_goal(_: Principal, Path(id): Path<u32>) -> Response {
    match goals::find_goal(id) {
        Some(goal) => Json(goal).into_response(),
        None => (StatusCode::NOT_FOUND, "Goal not found").into_response(),
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
