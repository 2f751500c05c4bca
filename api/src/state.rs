use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use common::actions::JobService;
use common::auth::{CredentialVerifier, SessionService};
use common::config::Settings;
use common::scripts::ScriptCatalog;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub jobs: Arc<JobService>,
    pub catalog: ScriptCatalog,
    pub verifier: Arc<dyn CredentialVerifier>,
    pub sessions: SessionService,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create a new AppState instance
    pub fn new(
        config: Settings,
        jobs: JobService,
        verifier: Arc<dyn CredentialVerifier>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let catalog = ScriptCatalog::from_config(&config.scripts);
        let sessions = SessionService::from_config(&config.auth);

        Self {
            config: Arc::new(config),
            jobs: Arc::new(jobs),
            catalog,
            verifier,
            sessions,
            metrics,
        }
    }
}
