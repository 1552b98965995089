use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

use super::{
    AuthError, AuthResult, AuthService, AuthSession, CurrentUser, Role, SignUpOutcome,
    SignUpRequest, normalize_email,
};

/// Hosted Supabase project (GoTrue auth + PostgREST).
#[derive(Clone)]
pub struct SupabaseAuthService {
    http: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseAuthService {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn with_api_key(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", &self.anon_key)
    }

    async fn read_json(response: Response) -> AuthResult<(StatusCode, Value)> {
        let status = response.status();
        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|err| {
                AuthError::Unavailable(format!(
                    "unexpected response from auth service ({status}): {err}"
                ))
            })?
        };
        Ok((status, body))
    }
}

#[async_trait]
impl AuthService for SupabaseAuthService {
    async fn sign_up(&self, request: SignUpRequest) -> AuthResult<SignUpOutcome> {
        let payload = json!({
            "email": normalize_email(&request.email),
            "password": request.password,
            "data": {
                "full_name": request.full_name,
                "user_type": request.role.as_str(),
            },
        });

        let response = self
            .with_api_key(self.http.post(self.endpoint("/auth/v1/signup")))
            .json(&payload)
            .send()
            .await?;
        let (status, body) = Self::read_json(response).await?;
        if !status.is_success() {
            return Err(error_from_response(status, &body));
        }

        if body.get("access_token").and_then(Value::as_str).is_some() {
            Ok(SignUpOutcome::Active)
        } else {
            Ok(SignUpOutcome::ConfirmationPending)
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        let payload = json!({
            "email": normalize_email(email),
            "password": password,
        });

        let response = self
            .with_api_key(
                self.http
                    .post(self.endpoint("/auth/v1/token?grant_type=password")),
            )
            .json(&payload)
            .send()
            .await?;
        let (status, body) = Self::read_json(response).await?;
        if !status.is_success() {
            return Err(error_from_response(status, &body));
        }

        parse_session(&body).ok_or_else(|| {
            AuthError::Unavailable("auth service returned an incomplete session".to_string())
        })
    }

    async fn sign_out(&self, token: &str) -> AuthResult<()> {
        let response = self
            .with_api_key(self.http.post(self.endpoint("/auth/v1/logout")))
            .bearer_auth(token)
            .send()
            .await?;
        let (status, body) = Self::read_json(response).await?;
        // An already-expired token counts as signed out.
        if status.is_success() || status == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        Err(error_from_response(status, &body))
    }

    async fn current_user(&self, token: &str) -> AuthResult<Option<CurrentUser>> {
        let response = self
            .with_api_key(self.http.get(self.endpoint("/auth/v1/user")))
            .bearer_auth(token)
            .send()
            .await?;
        let (status, body) = Self::read_json(response).await?;
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(parse_user(&body)),
            status => Err(AuthError::Unavailable(format!(
                "user lookup failed with status {status}: {}",
                error_message(&body).unwrap_or_default()
            ))),
        }
    }

    async fn verified_institution_domains(&self) -> AuthResult<Vec<String>> {
        let response = self
            .with_api_key(self.http.get(self.endpoint(
                "/rest/v1/institutions_domains?select=domain&is_verified=eq.true",
            )))
            .bearer_auth(&self.anon_key)
            .send()
            .await?;
        let (status, body) = Self::read_json(response).await?;
        if !status.is_success() {
            return Err(AuthError::Unavailable(format!(
                "domain lookup failed with status {status}"
            )));
        }

        Ok(body
            .as_array()
            .map(|rows| {
                rows.iter()
                    .filter_map(|row| row.get("domain").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }
}

fn error_message(body: &Value) -> Option<String> {
    ["msg", "error_description", "message", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Any message the service puts in the body is shown to the user as-is, whatever
/// the status. Only bodies without one count as the service being unavailable.
fn error_from_response(status: StatusCode, body: &Value) -> AuthError {
    match error_message(body) {
        Some(message) => AuthError::Rejected(message),
        None => AuthError::Unavailable(format!("auth service answered {status}")),
    }
}

fn parse_user(value: &Value) -> Option<CurrentUser> {
    let id = value
        .get("id")
        .and_then(Value::as_str)
        .and_then(|id| Uuid::parse_str(id).ok())?;
    let email = value.get("email").and_then(Value::as_str)?.to_string();
    let metadata = value.get("user_metadata");
    let full_name = metadata
        .and_then(|meta| meta.get("full_name"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let role = metadata
        .and_then(|meta| meta.get("user_type"))
        .and_then(Value::as_str)
        .and_then(Role::parse)
        .unwrap_or(Role::User);

    Some(CurrentUser {
        id,
        email,
        full_name,
        role,
    })
}

fn parse_session(body: &Value) -> Option<AuthSession> {
    let token = body.get("access_token").and_then(Value::as_str)?.to_string();
    let user = parse_user(body.get("user")?)?;
    let expires_in = body
        .get("expires_in")
        .and_then(Value::as_i64)
        .unwrap_or(3600);

    Some(AuthSession {
        token,
        user,
        expires_at: Utc::now() + Duration::seconds(expires_in),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_surfaced_verbatim() {
        let body = json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" });
        match error_from_response(StatusCode::BAD_REQUEST, &body) {
            AuthError::Rejected(message) => assert_eq!(message, "Invalid login credentials"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn server_error_messages_are_surfaced_verbatim() {
        let body = json!({ "msg": "Database error saving new user" });
        let err = error_from_response(StatusCode::INTERNAL_SERVER_ERROR, &body);
        assert!(matches!(&err, AuthError::Rejected(_)));
        assert_eq!(err.user_message(), "Database error saving new user");
    }

    #[test]
    fn bodies_without_a_message_are_unavailable() {
        for body in [json!({ "code": 502 }), Value::Null] {
            let err = error_from_response(StatusCode::BAD_GATEWAY, &body);
            assert!(matches!(&err, AuthError::Unavailable(_)));
            assert_eq!(err.user_message(), "An unexpected error occurred");
        }
    }

    #[test]
    fn parses_session_with_metadata_role() {
        let body = json!({
            "access_token": "jwt-token",
            "expires_in": 60,
            "user": {
                "id": "6f1c1a3e-9c5d-4a43-9d0e-1f2a3b4c5d6e",
                "email": "registrar@mit.edu",
                "user_metadata": { "full_name": "MIT Registrar", "user_type": "institution" }
            }
        });
        let session = parse_session(&body).expect("session");
        assert_eq!(session.token, "jwt-token");
        assert_eq!(session.user.role, Role::Institution);
        assert_eq!(session.user.full_name.as_deref(), Some("MIT Registrar"));
    }

    #[test]
    fn missing_role_metadata_defaults_to_user() {
        let body = json!({
            "id": "6f1c1a3e-9c5d-4a43-9d0e-1f2a3b4c5d6e",
            "email": "someone@example.com"
        });
        assert_eq!(parse_user(&body).map(|user| user.role), Some(Role::User));
    }

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let service = SupabaseAuthService::new("https://project.supabase.co/", "anon");
        assert_eq!(
            service.endpoint("/auth/v1/user"),
            "https://project.supabase.co/auth/v1/user"
        );
    }
}
