mod config;
mod maintenance;
mod session;
mod toast;
mod verification;
mod web;

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::{
    config::{AppConfig, AuthSettings},
    session::{AuthService, MemoryAuthService, PostgresAuthService, SupabaseAuthService},
    verification::{FlowRegistry, FlowSchedule, SimulatedBackend},
    web::AppState,
};

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_tracing();

    if let Err(err) = app_main().await {
        error!(?err, "application error");
        std::process::exit(1);
    }
}

async fn app_main() -> Result<()> {
    let config = AppConfig::from_env().context("failed to load configuration")?;

    let auth = build_auth_service(&config).await?;

    tokio::fs::create_dir_all(&config.storage_root)
        .await
        .with_context(|| {
            format!(
                "failed to create storage root {}",
                config.storage_root.display()
            )
        })?;
    let schedule = FlowSchedule::scaled(config.simulation_time_scale);
    let flows = FlowRegistry::new(
        Arc::new(SimulatedBackend::new(schedule)),
        config.storage_root.clone(),
    );

    let port = config.port;
    let state = AppState::new(auth, flows, config);
    maintenance::spawn(state.clone());

    let app = web::router::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "listening");

    let listener = TcpListener::bind(addr)
        .await
        .context("failed to bind listener")?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

async fn build_auth_service(config: &AppConfig) -> Result<Arc<dyn AuthService>> {
    let service: Arc<dyn AuthService> = match &config.auth {
        AuthSettings::Postgres { database_url } => {
            let service = PostgresAuthService::connect(database_url).await?;
            if config.seed_demo_accounts {
                service
                    .ensure_demo_accounts()
                    .await
                    .context("failed to seed demo accounts")?;
            }
            Arc::new(service)
        }
        AuthSettings::Supabase { url, anon_key } => {
            if config.seed_demo_accounts {
                info!("demo accounts are managed by the hosted backend, skipping seed");
            }
            Arc::new(SupabaseAuthService::new(url.clone(), anon_key.clone()))
        }
        AuthSettings::Memory => {
            if config.seed_demo_accounts {
                info!("seeded in-memory demo accounts");
                Arc::new(MemoryAuthService::with_demo_data().await)
            } else {
                Arc::new(MemoryAuthService::new())
            }
        }
    };

    info!(backend = ?config.auth.kind(), "authentication backend ready");
    Ok(service)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
