use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::AppError;
use crate::services::registration_service::RegistrationService;
use crate::store::{ReconcileStats, RegistrationStore};

/// Periodically recomputes enrolled counters from active registrations.
pub struct ReconcileScheduler {
    store: Arc<dyn RegistrationStore>,
    interval: Duration,
}

impl ReconcileScheduler {
    pub fn new(store: Arc<dyn RegistrationStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs forever. A failed pass is logged and the next one still runs.
    pub async fn start(self) {
        info!("starting reconcile scheduler (interval: {:?})", self.interval);

        loop {
            tokio::time::sleep(self.interval).await;

            match self.run_once().await {
                Ok(stats) if stats.courses_corrected > 0 => {
                    warn!(
                        "reconcile corrected {} of {} courses",
                        stats.courses_corrected, stats.courses_checked
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("reconcile failed: {:?}", e);
                }
            }
        }
    }

    pub async fn run_once(&self) -> Result<ReconcileStats, AppError> {
        let service = RegistrationService::new(self.store.clone());
        service.reconcile().await
    }
}
