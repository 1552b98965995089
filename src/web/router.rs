use axum::{
    Router,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};

use crate::web::{AppState, admin, auth, institution, landing, verify};

const ROBOTS_TXT_BODY: &str = include_str!("../../robots.txt");

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(landing::home_page))
        .route("/auth", get(auth::auth_page).post(auth::process_auth))
        .route("/logout", post(auth::logout))
        .route("/healthz", get(healthz))
        .route("/robots.txt", get(robots_txt))
        .route("/institution", get(institution::institution_portal))
        .route(
            "/institution/actions/:action",
            post(institution::institution_action),
        )
        .route("/admin", get(admin::dashboard))
        .route("/admin/actions/:action", post(admin::admin_action))
        .merge(verify::router())
        .with_state(state)
}

async fn robots_txt() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        ROBOTS_TXT_BODY,
    )
}

async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, Response},
    };
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::session::{
        AuthError, AuthResult, AuthService, AuthSession, CurrentUser, DEMO_PASSWORD,
        SignUpOutcome, SignUpRequest,
    };

    const BOUNDARY: &str = "certsecure-test-boundary";

    async fn app() -> (Router, TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = AppState::for_tests(dir.path()).await;
        (build_router(state), dir)
    }

    async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
        app.clone().oneshot(request).await.expect("response")
    }

    async fn body_text(response: Response<Body>) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        String::from_utf8(bytes.to_vec()).expect("utf8")
    }

    async fn body_json(response: Response<Body>) -> Value {
        serde_json::from_str(&body_text(response).await).expect("json")
    }

    fn location(response: &Response<Body>) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .expect("location header")
    }

    fn form_post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .expect("request")
    }

    fn post_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .expect("request")
    }

    fn upload_request(uri: &str, cookie: &str, file_name: &str, content_type: &str, data: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"certificate\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::COOKIE, cookie)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    /// Signs in through the form and returns the `name=value` cookie pair.
    async fn sign_in(app: &Router, email: &str, role: &str) -> String {
        let body = format!("mode=signin&email={email}&password={DEMO_PASSWORD}&role={role}");
        let response = send(app, form_post("/auth", &body)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/?status=signed_in");

        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .expect("session cookie");
        let pair = set_cookie.split(';').next().expect("cookie pair");
        assert!(pair.starts_with("auth_token="));
        pair.to_string()
    }

    #[tokio::test]
    async fn health_and_robots_are_public() {
        let (app, _dir) = app().await;

        let response = send(&app, Request::get("/healthz").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, Request::get("/robots.txt").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, ROBOTS_TXT_BODY);
    }

    #[tokio::test]
    async fn pages_redirect_to_sign_in_without_a_session() {
        let (app, _dir) = app().await;
        for uri in ["/", "/institution", "/admin"] {
            let response = send(&app, Request::get(uri).body(Body::empty()).unwrap()).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
            assert_eq!(location(&response), "/auth");
        }
    }

    #[tokio::test]
    async fn sign_in_lands_on_the_home_page() {
        let (app, _dir) = app().await;
        let cookie = sign_in(&app, "student@example.com", "user").await;

        let response = send(&app, get_with_cookie("/?status=signed_in", &cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Welcome Back"));
        assert!(html.contains("Verify Academic Certificate"));

        let response = send(&app, get_with_cookie("/auth", &cookie)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let (app, _dir) = app().await;
        let response = send(
            &app,
            form_post(
                "/auth",
                "mode=signin&email=student@example.com&password=wrongpass&role=user",
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        let html = body_text(response).await;
        assert!(html.contains("Sign In Failed"));
        assert!(html.contains("Invalid login credentials"));
    }

    #[tokio::test]
    async fn institution_sign_up_needs_a_verified_domain() {
        let (app, _dir) = app().await;
        let response = send(
            &app,
            form_post(
                "/auth",
                "mode=signup&email=registrar@gmail.com&password=secret123&full_name=Fake+College&role=institution",
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let html = body_text(response).await;
        assert!(html.contains("Invalid Institution Email"));
        assert!(html.contains("Fake College"));
    }

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let (app, _dir) = app().await;
        let response = send(
            &app,
            form_post(
                "/auth",
                "mode=signup&email=new.student@example.com&password=secret123&full_name=New+Student&role=user",
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Sign Up Successful"));

        let response = send(
            &app,
            form_post(
                "/auth",
                "mode=signin&email=new.student@example.com&password=secret123&role=user",
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn portals_are_gated_by_role() {
        let (app, _dir) = app().await;

        let student = sign_in(&app, "student@example.com", "user").await;
        for uri in ["/institution", "/admin"] {
            let response = send(&app, get_with_cookie(uri, &student)).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
            assert_eq!(location(&response), "/?error=not_authorized");
        }
        let html = body_text(send(&app, get_with_cookie("/?error=not_authorized", &student)).await).await;
        assert!(html.contains("Access Denied"));

        let institution = sign_in(&app, "admin@harvard.edu", "institution").await;
        let response = send(&app, get_with_cookie("/institution", &institution)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let response = send(&app, get_with_cookie("/admin", &institution)).await;
        assert_eq!(location(&response), "/?error=not_authorized");

        let admin = sign_in(&app, "admin@verifyed.com", "admin").await;
        for uri in ["/", "/institution", "/admin"] {
            let response = send(&app, get_with_cookie(uri, &admin)).await;
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
        }
    }

    #[tokio::test]
    async fn tabs_fall_back_and_list_domains() {
        let (app, _dir) = app().await;
        let admin = sign_in(&app, "admin@verifyed.com", "admin").await;

        let html = body_text(send(&app, get_with_cookie("/admin?tab=billing", &admin)).await).await;
        assert!(html.contains("Recent Verifications"));

        let html = body_text(send(&app, get_with_cookie("/admin?tab=institutions", &admin)).await).await;
        assert!(html.contains("mit.edu"));
        assert!(html.contains("bitmesra.ac.in"));

        let html =
            body_text(send(&app, get_with_cookie("/institution?section=nowhere", &admin)).await)
                .await;
        assert!(html.contains("Recent Activity"));
    }

    #[tokio::test]
    async fn quick_actions_acknowledge_with_a_toast() {
        let (app, _dir) = app().await;
        let institution = sign_in(&app, "admin@harvard.edu", "institution").await;

        let response = send(&app, post_with_cookie("/institution/actions/bulk_upload", &institution)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/institution?status=bulk_upload");

        let html = body_text(
            send(&app, get_with_cookie("/institution?status=bulk_upload", &institution)).await,
        )
        .await;
        assert!(html.contains("Bulk certificate upload interface would open here"));

        let admin = sign_in(&app, "admin@verifyed.com", "admin").await;
        let response = send(&app, post_with_cookie("/admin/actions/add_institution", &admin)).await;
        assert_eq!(location(&response), "/admin?status=add_institution");

        let response = send(&app, post_with_cookie("/admin/actions/add_institution", &institution)).await;
        assert_eq!(location(&response), "/?error=not_authorized");
    }

    #[tokio::test]
    async fn verification_runs_to_a_terminal_result() {
        let (app, _dir) = app().await;
        let cookie = sign_in(&app, "hr@techcorp.com", "employer").await;

        let response = send(&app, post_with_cookie("/api/verifications", &cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let created = body_json(response).await;
        let status_url = created["status_url"].as_str().expect("status url").to_string();

        let response = send(
            &app,
            upload_request(
                &format!("{status_url}/file"),
                &cookie,
                "degree.pdf",
                "application/pdf",
                b"%PDF-1.4 certificate",
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let selected = body_json(response).await;
        assert_eq!(selected["candidate"]["name"], "degree.pdf");
        assert_eq!(selected["result"]["status"], "idle");

        let response = send(&app, post_with_cookie(&format!("{status_url}/start"), &cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let mut terminal = None;
        for _ in 0..100 {
            let snapshot = body_json(send(&app, get_with_cookie(&status_url, &cookie)).await).await;
            let status = snapshot["result"]["status"].as_str().unwrap_or_default().to_string();
            if matches!(status.as_str(), "verified" | "invalid" | "error") {
                terminal = Some(snapshot);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let snapshot = terminal.expect("flow reached a terminal state");
        assert_eq!(snapshot["progress"], 100);
        assert!(snapshot["toast"]["title"].is_string());

        let response = send(
            &app,
            Request::builder()
                .method(Method::DELETE)
                .uri(&status_url)
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = send(&app, get_with_cookie(&status_url, &cookie)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn uploads_are_checked_server_side() {
        let (app, _dir) = app().await;
        let cookie = sign_in(&app, "student@example.com", "user").await;
        let created = body_json(send(&app, post_with_cookie("/api/verifications", &cookie)).await).await;
        let file_url = format!("{}/file", created["status_url"].as_str().expect("status url"));

        let response = send(
            &app,
            upload_request(&file_url, &cookie, "notes.txt", "text/plain", b"hello"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["title"], "Invalid file type");

        let oversized = vec![0u8; 10 * 1024 * 1024 + 1];
        let response = send(
            &app,
            upload_request(&file_url, &cookie, "scan.png", "image/png", &oversized),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["title"], "File too large");

        let response = send(&app, post_with_cookie(&format!("{}/start", created["status_url"].as_str().unwrap()), &cookie)).await;
        let snapshot = body_json(response).await;
        assert_eq!(snapshot["result"]["status"], "idle");
    }

    #[tokio::test]
    async fn flow_api_requires_the_owner() {
        let (app, _dir) = app().await;

        let response = send(
            &app,
            Request::post("/api/verifications").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["title"], "Sign In Required");

        let owner = sign_in(&app, "student@example.com", "user").await;
        let created = body_json(send(&app, post_with_cookie("/api/verifications", &owner)).await).await;
        let status_url = created["status_url"].as_str().expect("status url").to_string();

        let other = sign_in(&app, "hr@techcorp.com", "employer").await;
        let response = send(&app, get_with_cookie(&status_url, &other)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = send(&app, post_with_cookie(&format!("{status_url}/start"), &other)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn logout_clears_the_session() {
        let (app, _dir) = app().await;
        let cookie = sign_in(&app, "student@example.com", "user").await;

        let response = send(&app, post_with_cookie("/logout", &cookie)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/auth?status=signed_out");

        let response = send(&app, get_with_cookie("/", &cookie)).await;
        assert_eq!(location(&response), "/auth");
    }

    struct UnreachableAuth;

    #[async_trait]
    impl AuthService for UnreachableAuth {
        async fn sign_up(&self, _request: SignUpRequest) -> AuthResult<SignUpOutcome> {
            Err(AuthError::Unavailable("offline".to_string()))
        }

        async fn sign_in(&self, _email: &str, _password: &str) -> AuthResult<AuthSession> {
            Err(AuthError::Unavailable("offline".to_string()))
        }

        async fn sign_out(&self, _token: &str) -> AuthResult<()> {
            Err(AuthError::Unavailable("offline".to_string()))
        }

        async fn current_user(&self, _token: &str) -> AuthResult<Option<CurrentUser>> {
            Err(AuthError::Unavailable("offline".to_string()))
        }

        async fn verified_institution_domains(&self) -> AuthResult<Vec<String>> {
            Err(AuthError::Unavailable("offline".to_string()))
        }
    }

    #[tokio::test]
    async fn unsettled_sessions_get_the_loading_page() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = AppState::for_tests_with_auth(Arc::new(UnreachableAuth), dir.path());
        let app = build_router(state);
        let cookie = "auth_token=some-token";

        let response = send(&app, get_with_cookie("/admin", cookie)).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(body_text(response).await.contains(r#"http-equiv="refresh""#));

        let response = send(&app, post_with_cookie("/api/verifications", cookie)).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = send(
            &app,
            form_post(
                "/auth",
                "mode=signin&email=student@example.com&password=password123&role=user",
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
