//! Admission checks for pages and API calls.
//!
//! [`evaluate`] is the whole decision: it only projects the session state the auth
//! service reported onto one of three outcomes. The helpers below turn that outcome
//! into the right HTTP response for HTML pages and for JSON endpoints.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    session::{CurrentUser, Portal, SessionContext},
    web::{AppState, SESSION_COOKIE},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// The session could not be settled yet.
    Loading,
    RedirectToLogin,
    Admit(CurrentUser),
}

pub fn evaluate(is_loading: bool, user: Option<&CurrentUser>) -> GateDecision {
    if is_loading {
        return GateDecision::Loading;
    }
    match user {
        Some(user) => GateDecision::Admit(user.clone()),
        None => GateDecision::RedirectToLogin,
    }
}

pub fn session_token(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().trim().to_string())
        .filter(|token| !token.is_empty())
}

pub async fn session_context(state: &AppState, jar: &CookieJar) -> SessionContext {
    SessionContext::resolve(state.auth_handle(), session_token(jar)).await
}

/// Admits a signed-in user whose role may enter `portal`. Everyone else gets the
/// loading page, the sign-in redirect or `/?error=not_authorized`.
pub async fn require_portal(
    state: &AppState,
    jar: &CookieJar,
    portal: Portal,
) -> Result<CurrentUser, Response> {
    let ctx = session_context(state, jar).await;
    match evaluate(ctx.is_loading(), ctx.current_user()) {
        GateDecision::Loading => Err(loading_response()),
        GateDecision::RedirectToLogin => Err(Redirect::to("/auth").into_response()),
        GateDecision::Admit(user) if !user.role.can_access(portal) => {
            Err(Redirect::to("/?error=not_authorized").into_response())
        }
        GateDecision::Admit(user) => Ok(user),
    }
}

#[derive(Debug)]
pub struct JsonAuthError {
    pub status: StatusCode,
    pub title: &'static str,
    pub message: &'static str,
}

pub async fn current_user_or_json_error(
    state: &AppState,
    jar: &CookieJar,
) -> Result<CurrentUser, JsonAuthError> {
    let ctx = session_context(state, jar).await;
    match evaluate(ctx.is_loading(), ctx.current_user()) {
        GateDecision::Admit(user) => Ok(user),
        GateDecision::Loading => Err(JsonAuthError {
            status: StatusCode::SERVICE_UNAVAILABLE,
            title: "Loading",
            message: "Your session could not be checked yet, please retry",
        }),
        GateDecision::RedirectToLogin => Err(JsonAuthError {
            status: StatusCode::UNAUTHORIZED,
            title: "Sign In Required",
            message: "Please sign in to continue",
        }),
    }
}

pub fn loading_response() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, Html(render_loading_page())).into_response()
}

fn render_loading_page() -> String {
    r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta http-equiv="refresh" content="2">
    <title>CertSecure</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>
        body { font-family: "Helvetica Neue", Arial, sans-serif; margin: 0; min-height: 100vh; display: flex; align-items: center; justify-content: center; background: #f8fafc; color: #0f172a; }
        .card { background: #ffffff; border: 1px solid #e2e8f0; border-radius: 16px; padding: 2rem 2.5rem; text-align: center; box-shadow: 0 18px 40px rgba(15, 23, 42, 0.08); }
        .mark { width: 2.5rem; height: 2.5rem; margin: 0 auto 1rem; border-radius: 10px; background: linear-gradient(135deg, #1d4ed8, #0ea5e9); animation: pulse 1.2s ease-in-out infinite; }
        p { margin: 0; color: #64748b; }
        @keyframes pulse { 50% { opacity: 0.4; } }
    </style>
</head>
<body>
    <div class="card"><div class="mark"></div><p>Loading...</p></div>
</body>
</html>"#
        .to_string()
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::session::Role;

    fn user() -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            email: "student@example.com".to_string(),
            full_name: None,
            role: Role::User,
        }
    }

    #[test]
    fn loading_wins_over_everything() {
        assert_eq!(evaluate(true, None), GateDecision::Loading);
        assert_eq!(evaluate(true, Some(&user())), GateDecision::Loading);
    }

    #[test]
    fn settled_without_session_redirects() {
        assert_eq!(evaluate(false, None), GateDecision::RedirectToLogin);
    }

    #[test]
    fn settled_with_session_admits() {
        let user = user();
        assert_eq!(evaluate(false, Some(&user)), GateDecision::Admit(user));
    }

    #[test]
    fn empty_cookie_is_no_token() {
        let jar = CookieJar::new().add(axum_extra::extract::cookie::Cookie::new(
            SESSION_COOKIE,
            "  ",
        ));
        assert_eq!(session_token(&jar), None);
    }

    #[test]
    fn loading_page_refreshes() {
        let response = loading_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(render_loading_page().contains(r#"http-equiv="refresh" content="2""#));
    }
}
