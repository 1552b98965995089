use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    AuthError, AuthResult, AuthService, AuthSession, CurrentUser, DEMO_ACCOUNTS,
    DEMO_INSTITUTION_DOMAINS, DEMO_PASSWORD, MIN_PASSWORD_LEN, Role, SignUpOutcome,
    SignUpRequest, normalize_email,
    password::{hash_password, verify_password},
};

pub const SESSION_TTL_DAYS: i64 = 7;

#[derive(Clone, sqlx::FromRow)]
struct DbUserAuth {
    id: Uuid,
    password_hash: String,
}

#[derive(Clone, sqlx::FromRow)]
struct DbUser {
    id: Uuid,
    email: String,
    full_name: Option<String>,
    role: String,
}

impl From<DbUser> for CurrentUser {
    fn from(row: DbUser) -> Self {
        let role = Role::parse(&row.role).unwrap_or_else(|| {
            warn!(user_id = %row.id, role = %row.role, "unknown role stored for user");
            Role::User
        });
        CurrentUser {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            role,
        }
    }
}

/// Accounts, sessions and the institution allow-list kept in Postgres.
#[derive(Clone)]
pub struct PostgresAuthService {
    pool: PgPool,
}

impl PostgresAuthService {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("failed to connect to Postgres")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run database migrations")?;

        Ok(Self { pool })
    }

    pub async fn ensure_demo_accounts(&self) -> Result<()> {
        for domain in DEMO_INSTITUTION_DOMAINS {
            sqlx::query(
                "INSERT INTO institutions_domains (domain, is_verified) VALUES ($1, TRUE)
                 ON CONFLICT (domain) DO NOTHING",
            )
            .bind(domain)
            .execute(&self.pool)
            .await
            .context("failed to seed institution domain")?;
        }

        let mut seeded = 0_usize;
        for (email, name, role) in DEMO_ACCOUNTS {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                    .bind(email)
                    .fetch_one(&self.pool)
                    .await
                    .context("failed to check demo account")?;
            if exists {
                continue;
            }

            let password_hash = hash_password(DEMO_PASSWORD)
                .map_err(|err| anyhow!("failed to hash demo password: {err}"))?;
            sqlx::query(
                "INSERT INTO users (id, email, full_name, role, password_hash) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(Uuid::new_v4())
            .bind(email)
            .bind(name)
            .bind(role.as_str())
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .context("failed to insert demo account")?;
            seeded += 1;
        }

        if seeded > 0 {
            info!(
                seeded,
                "Seeded demo accounts (password: '{DEMO_PASSWORD}'). Disable SEED_DEMO_ACCOUNTS in production."
            );
        }

        Ok(())
    }
}

#[async_trait]
impl AuthService for PostgresAuthService {
    async fn sign_up(&self, request: SignUpRequest) -> AuthResult<SignUpOutcome> {
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Rejected(
                "Password should be at least 6 characters".to_string(),
            ));
        }

        let email = normalize_email(&request.email);
        let password_hash = hash_password(&request.password)
            .map_err(|err| AuthError::Unavailable(format!("failed to hash password: {err}")))?;

        let inserted = sqlx::query(
            "INSERT INTO users (id, email, full_name, role, password_hash) VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (email) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(&email)
        .bind(request.full_name.as_deref())
        .bind(request.role.as_str())
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(AuthError::Rejected("User already registered".to_string()));
        }

        Ok(SignUpOutcome::Active)
    }

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        let email = normalize_email(email);
        let user = sqlx::query_as::<_, DbUserAuth>(
            "SELECT id, password_hash FROM users WHERE email = $1",
        )
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?;

        let Some(user) = user.filter(|user| verify_password(password, &user.password_hash)) else {
            return Err(AuthError::Rejected("Invalid login credentials".to_string()));
        };

        let session_token = Uuid::new_v4();
        let expires_at = Utc::now() + Duration::days(SESSION_TTL_DAYS);

        sqlx::query("INSERT INTO sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_token)
            .bind(user.id)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;

        let profile = sqlx::query_as::<_, DbUser>(
            "SELECT id, email, full_name, role FROM users WHERE id = $1",
        )
        .bind(user.id)
        .fetch_one(&self.pool)
        .await?;

        Ok(AuthSession {
            token: session_token.to_string(),
            user: profile.into(),
            expires_at,
        })
    }

    async fn sign_out(&self, token: &str) -> AuthResult<()> {
        let Ok(token) = Uuid::parse_str(token) else {
            return Ok(());
        };
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn current_user(&self, token: &str) -> AuthResult<Option<CurrentUser>> {
        let Ok(token) = Uuid::parse_str(token) else {
            return Ok(None);
        };
        let user = sqlx::query_as::<_, DbUser>(
            "SELECT users.id, users.email, users.full_name, users.role FROM sessions JOIN users ON users.id = sessions.user_id WHERE sessions.id = $1 AND sessions.expires_at > NOW()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user.map(CurrentUser::from))
    }

    async fn verified_institution_domains(&self) -> AuthResult<Vec<String>> {
        let domains = sqlx::query_scalar::<_, String>(
            "SELECT domain FROM institutions_domains WHERE is_verified = TRUE ORDER BY domain",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(domains)
    }

    async fn purge_expired_sessions(&self) -> AuthResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
