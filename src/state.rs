use std::sync::Arc;

use crate::services::RegistrationService;
use crate::store::RegistrationStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RegistrationStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn RegistrationStore>) -> Self {
        Self { store }
    }

    pub fn registrations(&self) -> RegistrationService {
        RegistrationService::new(self.store.clone())
    }
}
