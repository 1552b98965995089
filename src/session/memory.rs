use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use super::{
    AuthError, AuthResult, AuthService, AuthSession, CurrentUser, DEMO_ACCOUNTS,
    DEMO_INSTITUTION_DOMAINS, DEMO_PASSWORD, MIN_PASSWORD_LEN, Role, SignUpOutcome,
    SignUpRequest, normalize_email,
    password::{hash_password, verify_password},
    postgres::SESSION_TTL_DAYS,
};

struct StoredAccount {
    user: CurrentUser,
    password_hash: String,
}

#[derive(Default)]
struct MemoryStore {
    accounts: HashMap<String, StoredAccount>,
    sessions: HashMap<String, (Uuid, chrono::DateTime<Utc>)>,
    domains: HashSet<String>,
}

/// In-process backend for demos and tests. Messages match the Postgres backend.
#[derive(Default)]
pub struct MemoryAuthService {
    store: RwLock<MemoryStore>,
}

impl MemoryAuthService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_demo_data() -> Self {
        let service = Self::new();
        for domain in DEMO_INSTITUTION_DOMAINS {
            service.add_verified_domain(domain).await;
        }
        service.seed_demo_accounts().await;
        service
    }

    /// Registers the demo accounts, returning how many were created. Failures are
    /// logged and skipped.
    pub async fn seed_demo_accounts(&self) -> usize {
        let mut created = 0;
        for (email, name, role) in DEMO_ACCOUNTS {
            let seeded = self
                .sign_up(SignUpRequest {
                    email: email.to_string(),
                    password: DEMO_PASSWORD.to_string(),
                    full_name: Some(name.to_string()),
                    role: *role,
                })
                .await;
            match seeded {
                Ok(_) => created += 1,
                Err(err) => warn!(%email, %err, "failed to seed demo account"),
            }
        }
        created
    }

    pub async fn add_verified_domain(&self, domain: &str) {
        let mut store = self.store.write().await;
        store.domains.insert(domain.trim().to_ascii_lowercase());
    }
}

#[async_trait]
impl AuthService for MemoryAuthService {
    async fn sign_up(&self, request: SignUpRequest) -> AuthResult<SignUpOutcome> {
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Rejected(
                "Password should be at least 6 characters".to_string(),
            ));
        }

        let email = normalize_email(&request.email);
        let password_hash = hash_password(&request.password)
            .map_err(|err| AuthError::Unavailable(format!("failed to hash password: {err}")))?;

        let mut store = self.store.write().await;
        if store.accounts.contains_key(&email) {
            return Err(AuthError::Rejected("User already registered".to_string()));
        }

        store.accounts.insert(
            email.clone(),
            StoredAccount {
                user: CurrentUser {
                    id: Uuid::new_v4(),
                    email,
                    full_name: request.full_name,
                    role: request.role,
                },
                password_hash,
            },
        );

        Ok(SignUpOutcome::Active)
    }

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        let email = normalize_email(email);
        let mut store = self.store.write().await;

        let user = match store.accounts.get(&email) {
            Some(account) if verify_password(password, &account.password_hash) => {
                account.user.clone()
            }
            _ => return Err(AuthError::Rejected("Invalid login credentials".to_string())),
        };

        let token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + Duration::days(SESSION_TTL_DAYS);
        store.sessions.insert(token.clone(), (user.id, expires_at));

        Ok(AuthSession {
            token,
            user,
            expires_at,
        })
    }

    async fn sign_out(&self, token: &str) -> AuthResult<()> {
        let mut store = self.store.write().await;
        store.sessions.remove(token);
        Ok(())
    }

    async fn current_user(&self, token: &str) -> AuthResult<Option<CurrentUser>> {
        let store = self.store.read().await;
        let Some((user_id, expires_at)) = store.sessions.get(token) else {
            return Ok(None);
        };
        if *expires_at <= Utc::now() {
            return Ok(None);
        }

        Ok(store
            .accounts
            .values()
            .find(|account| account.user.id == *user_id)
            .map(|account| account.user.clone()))
    }

    async fn verified_institution_domains(&self) -> AuthResult<Vec<String>> {
        let store = self.store.read().await;
        let mut domains: Vec<String> = store.domains.iter().cloned().collect();
        domains.sort();
        Ok(domains)
    }

    async fn purge_expired_sessions(&self) -> AuthResult<u64> {
        let mut store = self.store.write().await;
        let now = Utc::now();
        let before = store.sessions.len();
        store.sessions.retain(|_, (_, expires_at)| *expires_at > now);
        Ok((before - store.sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_accounts_cover_every_role() {
        let service = MemoryAuthService::with_demo_data().await;
        let mut seen = HashSet::new();
        for (email, _, _) in DEMO_ACCOUNTS {
            let session = service.sign_in(email, DEMO_PASSWORD).await.expect("sign in");
            seen.insert(session.user.role);
        }
        assert_eq!(seen.len(), Role::ALL.len());
    }

    #[tokio::test]
    async fn reseeding_skips_existing_accounts() {
        let service = MemoryAuthService::with_demo_data().await;
        assert_eq!(service.seed_demo_accounts().await, 0);

        let fresh = MemoryAuthService::new();
        assert_eq!(fresh.seed_demo_accounts().await, DEMO_ACCOUNTS.len());
        let (email, _, _) = DEMO_ACCOUNTS[0];
        assert!(service.sign_in(email, DEMO_PASSWORD).await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_sign_up_is_rejected_verbatim() {
        let service = MemoryAuthService::with_demo_data().await;
        let err = service
            .sign_up(SignUpRequest {
                email: "Student@Example.com".to_string(),
                password: "secret99".to_string(),
                full_name: None,
                role: Role::User,
            })
            .await
            .expect_err("duplicate");
        assert_eq!(err.user_message(), "User already registered");
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let service = MemoryAuthService::with_demo_data().await;
        let err = service
            .sign_in("student@example.com", "nope-nope")
            .await
            .expect_err("bad password");
        assert_eq!(err.user_message(), "Invalid login credentials");
    }

    #[tokio::test]
    async fn sign_out_invalidates_token() {
        let service = MemoryAuthService::with_demo_data().await;
        let session = service
            .sign_in("admin@verifyed.com", DEMO_PASSWORD)
            .await
            .expect("sign in");
        assert!(service.current_user(&session.token).await.unwrap().is_some());

        service.sign_out(&session.token).await.unwrap();
        assert!(service.current_user(&session.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn domains_are_sorted_and_lowercased() {
        let service = MemoryAuthService::new();
        service.add_verified_domain("MIT.edu").await;
        service.add_verified_domain("harvard.edu").await;
        let domains = service.verified_institution_domains().await.unwrap();
        assert_eq!(domains, vec!["harvard.edu".to_string(), "mit.edu".to_string()]);
    }
}
