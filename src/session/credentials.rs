use thiserror::Error;
use tracing::warn;

use super::{AuthError, AuthSession, Role, SessionContext, SignUpOutcome, SignUpRequest};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    SignIn,
    SignUp,
}

impl FormMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormMode::SignIn => "signin",
            FormMode::SignUp => "signup",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "signin" => Some(FormMode::SignIn),
            "signup" => Some(FormMode::SignUp),
            _ => None,
        }
    }
}

/// Sign-in / sign-up submission as entered by the user.
#[derive(Debug, Clone)]
pub struct CredentialForm {
    pub mode: FormMode,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub role: Role,
}

#[derive(Debug)]
pub enum SubmitOutcome {
    SignedIn(AuthSession),
    SignedUp(SignUpOutcome),
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Password should be at least 6 characters")]
    PasswordTooShort,
    #[error(
        "Please use your official institution email address. Contact support if your institution is not listed."
    )]
    InstitutionDomain,
    #[error(transparent)]
    Service(#[from] AuthError),
}

impl CredentialError {
    pub fn toast_title(&self, mode: FormMode) -> &'static str {
        match self {
            CredentialError::InstitutionDomain => "Invalid Institution Email",
            CredentialError::Service(AuthError::Unavailable(_)) => "Error",
            _ => match mode {
                FormMode::SignIn => "Sign In Failed",
                FormMode::SignUp => "Sign Up Failed",
            },
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            CredentialError::Service(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}

/// Domain part of an address, lowercased. `None` when there is no `@` or nothing after it.
pub fn email_domain(email: &str) -> Option<String> {
    let (_, domain) = email.trim().rsplit_once('@')?;
    let domain = domain.trim();
    if domain.is_empty() {
        None
    } else {
        Some(domain.to_ascii_lowercase())
    }
}

impl CredentialForm {
    pub fn validate(&self) -> Result<(), CredentialError> {
        let email = self.email.trim();
        if email.is_empty() || email_domain(email).is_none() {
            return Err(CredentialError::InvalidEmail);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(CredentialError::PasswordTooShort);
        }
        Ok(())
    }

    pub fn requires_institution_domain(&self) -> bool {
        self.mode == FormMode::SignUp && self.role == Role::Institution
    }

    /// Runs local checks, the institution-domain gate and then the session call.
    /// Nothing reaches the backend's sign-up when the domain gate fails.
    pub async fn submit(&self, session: &SessionContext) -> Result<SubmitOutcome, CredentialError> {
        self.validate()?;

        if self.requires_institution_domain() {
            let domains = match session.auth().verified_institution_domains().await {
                Ok(domains) => domains,
                Err(err) => {
                    warn!(%err, "failed to load verified institution domains");
                    Vec::new()
                }
            };
            let accepted = email_domain(&self.email).is_some_and(|domain| {
                domains
                    .iter()
                    .any(|allowed| allowed.trim().eq_ignore_ascii_case(&domain))
            });
            if !accepted {
                return Err(CredentialError::InstitutionDomain);
            }
        }

        match self.mode {
            FormMode::SignIn => {
                let signed_in = session.sign_in(self.email.trim(), &self.password).await?;
                Ok(SubmitOutcome::SignedIn(signed_in))
            }
            FormMode::SignUp => {
                let outcome = session
                    .sign_up(SignUpRequest {
                        email: self.email.trim().to_string(),
                        password: self.password.clone(),
                        full_name: self
                            .full_name
                            .as_deref()
                            .map(str::trim)
                            .filter(|name| !name.is_empty())
                            .map(str::to_string),
                        role: self.role,
                    })
                    .await?;
                Ok(SubmitOutcome::SignedUp(outcome))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;

    use super::*;
    use crate::session::{
        AuthResult, AuthService, CurrentUser, DEMO_PASSWORD, MemoryAuthService,
    };

    /// Wraps the in-memory backend and counts calls that reach it.
    struct CountingAuth {
        inner: MemoryAuthService,
        sign_ups: AtomicUsize,
        sign_ins: AtomicUsize,
    }

    impl CountingAuth {
        async fn new() -> Self {
            Self {
                inner: MemoryAuthService::with_demo_data().await,
                sign_ups: AtomicUsize::new(0),
                sign_ins: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AuthService for CountingAuth {
        async fn sign_up(&self, request: SignUpRequest) -> AuthResult<SignUpOutcome> {
            self.sign_ups.fetch_add(1, Ordering::SeqCst);
            self.inner.sign_up(request).await
        }

        async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
            self.sign_ins.fetch_add(1, Ordering::SeqCst);
            self.inner.sign_in(email, password).await
        }

        async fn sign_out(&self, token: &str) -> AuthResult<()> {
            self.inner.sign_out(token).await
        }

        async fn current_user(&self, token: &str) -> AuthResult<Option<CurrentUser>> {
            self.inner.current_user(token).await
        }

        async fn verified_institution_domains(&self) -> AuthResult<Vec<String>> {
            self.inner.verified_institution_domains().await
        }
    }

    /// Anonymous session context over a counting backend.
    async fn counting_session() -> (Arc<CountingAuth>, SessionContext) {
        let auth = Arc::new(CountingAuth::new().await);
        let session = SessionContext::resolve(auth.clone(), None).await;
        (auth, session)
    }

    fn form(mode: FormMode, email: &str, role: Role) -> CredentialForm {
        CredentialForm {
            mode,
            email: email.to_string(),
            password: "secret-pass".to_string(),
            full_name: Some("Registrar".to_string()),
            role,
        }
    }

    #[test]
    fn extracts_domain_after_last_at() {
        assert_eq!(email_domain("Registrar@MIT.edu"), Some("mit.edu".to_string()));
        assert_eq!(email_domain("odd@name@harvard.edu"), Some("harvard.edu".to_string()));
        assert_eq!(email_domain("no-at-sign"), None);
        assert_eq!(email_domain("trailing@"), None);
    }

    #[test]
    fn short_password_fails_validation() {
        let mut candidate = form(FormMode::SignIn, "a@b.com", Role::User);
        candidate.password = "12345".to_string();
        assert!(matches!(
            candidate.validate(),
            Err(CredentialError::PasswordTooShort)
        ));
    }

    #[tokio::test]
    async fn unlisted_institution_domain_never_reaches_sign_up() {
        let (auth, session) = counting_session().await;
        let err = form(FormMode::SignUp, "registrar@unknown-college.edu", Role::Institution)
            .submit(&session)
            .await
            .expect_err("domain rejected");

        assert!(matches!(err, CredentialError::InstitutionDomain));
        assert_eq!(err.toast_title(FormMode::SignUp), "Invalid Institution Email");
        assert_eq!(auth.sign_ups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn listed_institution_domain_signs_up() {
        let (auth, session) = counting_session().await;
        let outcome = form(FormMode::SignUp, "registrar@MIT.edu", Role::Institution)
            .submit(&session)
            .await
            .expect("sign up");

        assert!(matches!(outcome, SubmitOutcome::SignedUp(SignUpOutcome::Active)));
        assert_eq!(auth.sign_ups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn domain_gate_skipped_for_sign_in_and_other_roles() {
        let (auth, session) = counting_session().await;
        form(FormMode::SignUp, "someone@gmail.com", Role::Employer)
            .submit(&session)
            .await
            .expect("employer sign up");

        let mut sign_in = form(FormMode::SignIn, "admin@harvard.edu", Role::Institution);
        sign_in.password = DEMO_PASSWORD.to_string();
        let outcome = sign_in.submit(&session).await.expect("sign in");
        assert!(matches!(outcome, SubmitOutcome::SignedIn(_)));
        assert_eq!(auth.sign_ins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn backend_rejection_is_passed_through_verbatim() {
        let (_auth, session) = counting_session().await;
        let err = form(FormMode::SignIn, "student@example.com", Role::User)
            .submit(&session)
            .await
            .expect_err("wrong password");

        assert_eq!(err.toast_title(FormMode::SignIn), "Sign In Failed");
        assert_eq!(err.user_message(), "Invalid login credentials");
    }
}
