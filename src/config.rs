use std::{env, path::PathBuf, str::FromStr};

use anyhow::{Context, Result, anyhow};

use crate::verification::MAX_TIME_SCALE;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_STORAGE_ROOT: &str = "storage/verifications";
const DEFAULT_FLOW_TTL_MINUTES: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthBackendKind {
    Postgres,
    Supabase,
    Memory,
}

impl FromStr for AuthBackendKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(AuthBackendKind::Postgres),
            "supabase" => Ok(AuthBackendKind::Supabase),
            "memory" => Ok(AuthBackendKind::Memory),
            other => Err(anyhow!(
                "unknown AUTH_BACKEND `{other}` (expected postgres, supabase or memory)"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub enum AuthSettings {
    Postgres { database_url: String },
    Supabase { url: String, anon_key: String },
    Memory,
}

impl AuthSettings {
    pub fn kind(&self) -> AuthBackendKind {
        match self {
            AuthSettings::Postgres { .. } => AuthBackendKind::Postgres,
            AuthSettings::Supabase { .. } => AuthBackendKind::Supabase,
            AuthSettings::Memory => AuthBackendKind::Memory,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub auth: AuthSettings,
    pub seed_demo_accounts: bool,
    pub storage_root: PathBuf,
    pub flow_ttl_minutes: i64,
    pub simulation_time_scale: f64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let port = match read("PORT") {
            Some(raw) => raw.parse().context("PORT must be a valid port number")?,
            None => DEFAULT_PORT,
        };

        let kind = match read("AUTH_BACKEND") {
            Some(raw) => raw.parse::<AuthBackendKind>()?,
            None => AuthBackendKind::Postgres,
        };

        let auth = match kind {
            AuthBackendKind::Postgres => AuthSettings::Postgres {
                database_url: read("DATABASE_URL").context("DATABASE_URL env var is missing")?,
            },
            AuthBackendKind::Supabase => AuthSettings::Supabase {
                url: read("SUPABASE_URL").context("SUPABASE_URL env var is missing")?,
                anon_key: read("SUPABASE_ANON_KEY")
                    .context("SUPABASE_ANON_KEY env var is missing")?,
            },
            AuthBackendKind::Memory => AuthSettings::Memory,
        };

        let seed_demo_accounts = match read("SEED_DEMO_ACCOUNTS") {
            Some(raw) => parse_flag(&raw)
                .with_context(|| format!("SEED_DEMO_ACCOUNTS has invalid value `{raw}`"))?,
            None => kind == AuthBackendKind::Memory,
        };

        let storage_root = read("STORAGE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_ROOT));

        let flow_ttl_minutes = match read("VERIFICATION_FLOW_TTL_MINUTES") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|minutes| *minutes > 0)
                .with_context(|| {
                    format!("VERIFICATION_FLOW_TTL_MINUTES must be a positive integer, got `{raw}`")
                })?,
            None => DEFAULT_FLOW_TTL_MINUTES,
        };

        let simulation_time_scale = match read("SIMULATION_TIME_SCALE") {
            Some(raw) => raw
                .parse::<f64>()
                .ok()
                .filter(|scale| (0.0..=MAX_TIME_SCALE).contains(scale))
                .with_context(|| {
                    format!(
                        "SIMULATION_TIME_SCALE must be a number between 0 and {MAX_TIME_SCALE}, got `{raw}`"
                    )
                })?,
            None => 1.0,
        };

        Ok(Self {
            port,
            auth,
            seed_demo_accounts,
            storage_root,
            flow_ttl_minutes,
            simulation_time_scale,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn memory_backend_defaults() {
        let config = config(&[("AUTH_BACKEND", "memory")]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.auth.kind(), AuthBackendKind::Memory);
        assert!(config.seed_demo_accounts);
        assert_eq!(config.storage_root, PathBuf::from("storage/verifications"));
        assert_eq!(config.flow_ttl_minutes, 60);
        assert_eq!(config.simulation_time_scale, 1.0);
    }

    #[test]
    fn postgres_is_default_and_needs_url() {
        let err = config(&[]).expect_err("missing url");
        assert!(err.to_string().contains("DATABASE_URL"));

        let config = config(&[("DATABASE_URL", "postgres://localhost/certsecure")]).unwrap();
        assert_eq!(config.auth.kind(), AuthBackendKind::Postgres);
        assert!(!config.seed_demo_accounts);
    }

    #[test]
    fn supabase_requires_both_keys() {
        let err = config(&[("AUTH_BACKEND", "supabase"), ("SUPABASE_URL", "https://x.supabase.co")])
            .expect_err("missing key");
        assert!(err.to_string().contains("SUPABASE_ANON_KEY"));
    }

    #[test]
    fn unknown_backend_names_accepted_values() {
        let err = config(&[("AUTH_BACKEND", "ldap")]).expect_err("unknown backend");
        assert!(err.to_string().contains("postgres, supabase or memory"));
    }

    #[test]
    fn rejects_bad_numbers() {
        assert!(config(&[("AUTH_BACKEND", "memory"), ("PORT", "http")]).is_err());
        assert!(config(&[("AUTH_BACKEND", "memory"), ("SIMULATION_TIME_SCALE", "-1")]).is_err());
        assert!(
            config(&[("AUTH_BACKEND", "memory"), ("VERIFICATION_FLOW_TTL_MINUTES", "0")]).is_err()
        );
        let scaled = config(&[("AUTH_BACKEND", "memory"), ("SIMULATION_TIME_SCALE", "0.25")]).unwrap();
        assert_eq!(scaled.simulation_time_scale, 0.25);
    }

    #[test]
    fn time_scale_has_an_upper_bound() {
        for raw in ["1e300", "inf", "NaN", "100.5"] {
            let err = config(&[("AUTH_BACKEND", "memory"), ("SIMULATION_TIME_SCALE", raw)])
                .unwrap_err();
            assert!(err.to_string().contains("between 0 and 100"), "{raw}: {err}");
        }
        let slowest = config(&[("AUTH_BACKEND", "memory"), ("SIMULATION_TIME_SCALE", "100")]).unwrap();
        assert_eq!(slowest.simulation_time_scale, MAX_TIME_SCALE);
    }
}
