use std::sync::Arc;

use crate::{config::AppConfig, session::AuthService, verification::FlowRegistry};

#[derive(Clone)]
pub struct AppState {
    auth: Arc<dyn AuthService>,
    flows: FlowRegistry,
    config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(auth: Arc<dyn AuthService>, flows: FlowRegistry, config: AppConfig) -> Self {
        Self {
            auth,
            flows,
            config: Arc::new(config),
        }
    }

    pub fn auth(&self) -> &dyn AuthService {
        self.auth.as_ref()
    }

    pub fn auth_handle(&self) -> Arc<dyn AuthService> {
        self.auth.clone()
    }

    pub fn flows(&self) -> &FlowRegistry {
        &self.flows
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

#[cfg(test)]
impl AppState {
    /// In-memory state with the demo accounts and a zero-delay simulated backend.
    pub async fn for_tests(storage_root: &std::path::Path) -> Self {
        let auth: Arc<dyn AuthService> =
            Arc::new(crate::session::MemoryAuthService::with_demo_data().await);
        Self::for_tests_with_auth(auth, storage_root)
    }

    pub fn for_tests_with_auth(auth: Arc<dyn AuthService>, storage_root: &std::path::Path) -> Self {
        use crate::{
            config::AuthSettings,
            verification::{FlowSchedule, SimulatedBackend},
        };

        let flows = FlowRegistry::new(
            Arc::new(SimulatedBackend::new(FlowSchedule::immediate())),
            storage_root,
        );
        let config = AppConfig {
            port: 0,
            auth: AuthSettings::Memory,
            seed_demo_accounts: true,
            storage_root: storage_root.to_path_buf(),
            flow_ttl_minutes: 60,
            simulation_time_scale: 0.0,
        };
        Self::new(auth, flows, config)
    }
}
