//! Account and session handling.
//!
//! The authentication/database backend is an external collaborator: this crate only
//! calls it, reads the result and reacts to the session it hands back. [`AuthService`]
//! is the seam; the concrete backends live in the submodules.

mod credentials;
mod memory;
mod password;
mod postgres;
mod supabase;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub use credentials::{
    CredentialError, CredentialForm, FormMode, MIN_PASSWORD_LEN, SubmitOutcome, email_domain,
};
pub use memory::MemoryAuthService;
pub use postgres::{PostgresAuthService, SESSION_TTL_DAYS};
pub use supabase::SupabaseAuthService;

pub const DEMO_PASSWORD: &str = "password123";

/// Accounts seeded for demonstrations, one per role.
pub const DEMO_ACCOUNTS: &[(&str, &str, Role)] = &[
    ("student@example.com", "Demo Student", Role::User),
    ("hr@techcorp.com", "TechCorp HR", Role::Employer),
    ("admin@harvard.edu", "Harvard University", Role::Institution),
    ("admin@verifyed.com", "Platform Admin", Role::Admin),
];

pub const DEMO_INSTITUTION_DOMAINS: &[&str] = &[
    "harvard.edu",
    "mit.edu",
    "nitjsr.ac.in",
    "bitmesra.ac.in",
    "iitism.ac.in",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Employer,
    Institution,
    Admin,
}

/// Role-gated areas of the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Portal {
    Verify,
    Institution,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::User, Role::Employer, Role::Institution, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Employer => "employer",
            Role::Institution => "institution",
            Role::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "user" => Some(Role::User),
            "employer" => Some(Role::Employer),
            "institution" => Some(Role::Institution),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "Personal User",
            Role::Employer => "Employer",
            Role::Institution => "Institution",
            Role::Admin => "Admin",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Role::User => "Verify certificates",
            Role::Employer => "Verify candidates",
            Role::Institution => "Issue certificates",
            Role::Admin => "System management",
        }
    }

    pub fn name_label(&self) -> &'static str {
        match self {
            Role::User => "Full Name",
            Role::Employer => "Company Name",
            Role::Institution => "Institution Name",
            Role::Admin => "Admin Name",
        }
    }

    pub fn name_placeholder(&self) -> &'static str {
        match self {
            Role::User => "Enter your full name",
            Role::Employer => "Enter company name",
            Role::Institution => "Enter institution name",
            Role::Admin => "Enter admin name",
        }
    }

    pub fn can_access(&self, portal: Portal) -> bool {
        match portal {
            Portal::Verify => true,
            Portal::Institution => matches!(self, Role::Institution | Role::Admin),
            Portal::Admin => matches!(self, Role::Admin),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
}

impl CurrentUser {
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// A signed-in session handed back by the backend. `token` goes into the session cookie.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user: CurrentUser,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The account exists but must be confirmed by email first.
    ConfirmationPending,
    Active,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Refused by the backend. The message is shown to the user as-is.
    #[error("{0}")]
    Rejected(String),
    #[error("authentication service unavailable: {0}")]
    Unavailable(String),
}

impl AuthError {
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Rejected(message) => message.clone(),
            AuthError::Unavailable(_) => "An unexpected error occurred".to_string(),
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Unavailable(err.to_string())
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Unavailable(err.to_string())
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn sign_up(&self, request: SignUpRequest) -> AuthResult<SignUpOutcome>;

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession>;

    async fn sign_out(&self, token: &str) -> AuthResult<()>;

    /// Resolves a session token. `Ok(None)` for unknown or expired tokens.
    async fn current_user(&self, token: &str) -> AuthResult<Option<CurrentUser>>;

    async fn verified_institution_domains(&self) -> AuthResult<Vec<String>>;

    /// Drops expired sessions, where the backend keeps them locally.
    async fn purge_expired_sessions(&self) -> AuthResult<u64> {
        Ok(0)
    }
}

/// Per-request view of the caller's session plus the operations that change it.
#[derive(Clone)]
pub struct SessionContext {
    auth: Arc<dyn AuthService>,
    token: Option<String>,
    current_user: Option<CurrentUser>,
    is_loading: bool,
}

impl SessionContext {
    /// Settles the session for `token`. A backend failure leaves the context loading
    /// rather than signed out.
    pub async fn resolve(auth: Arc<dyn AuthService>, token: Option<String>) -> Self {
        let (current_user, is_loading) = match token.as_deref() {
            None => (None, false),
            Some(token) => match auth.current_user(token).await {
                Ok(user) => (user, false),
                Err(err) => {
                    tracing::warn!(%err, "session lookup failed");
                    (None, true)
                }
            },
        };

        Self {
            auth,
            token,
            current_user,
            is_loading,
        }
    }

    pub fn current_user(&self) -> Option<&CurrentUser> {
        self.current_user.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn auth(&self) -> &dyn AuthService {
        self.auth.as_ref()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        self.auth.sign_in(email, password).await
    }

    pub async fn sign_up(&self, request: SignUpRequest) -> AuthResult<SignUpOutcome> {
        self.auth.sign_up(request).await
    }

    pub async fn sign_out(&self) -> AuthResult<()> {
        match self.token.as_deref() {
            Some(token) => self.auth.sign_out(token).await,
            None => Ok(()),
        }
    }
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
