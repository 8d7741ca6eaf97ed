use std::sync::Arc;

use tracing::info;

use crate::error::AppError;
use crate::models::{Course, NewRegistration, RegisterRequest, Registration};
use crate::store::{ReconcileStats, RegistrationStore};

pub struct RegistrationService {
    store: Arc<dyn RegistrationStore>,
}

impl RegistrationService {
    pub fn new(store: Arc<dyn RegistrationStore>) -> Self {
        Self { store }
    }

    pub async fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        self.store.list_courses().await
    }

    pub async fn get_course(&self, id: &str) -> Result<Course, AppError> {
        self.store
            .get_course(id.trim())
            .await?
            .ok_or_else(AppError::course_not_found)
    }

    /// Validates the request, then lets the store apply the capacity and
    /// duplicate rules together with the writes.
    pub async fn register(&self, req: RegisterRequest) -> Result<Registration, AppError> {
        let new = NewRegistration::try_from(req)?;
        let registration = self.store.register(new).await?;
        info!(
            "registered student {} for {} ({})",
            registration.student_id, registration.course_code, registration.id
        );
        Ok(registration)
    }

    pub async fn list_for_student(&self, student_id: &str) -> Result<Vec<Registration>, AppError> {
        self.store.registrations_for_student(student_id.trim()).await
    }

    pub async fn list_all(&self) -> Result<Vec<Registration>, AppError> {
        self.store.active_registrations().await
    }

    pub async fn drop_registration(&self, id: &str) -> Result<Registration, AppError> {
        let registration = self.store.drop_registration(id.trim()).await?;
        info!(
            "dropped registration {} of student {} from {}",
            registration.id, registration.student_id, registration.course_code
        );
        Ok(registration)
    }

    pub async fn reconcile(&self) -> Result<ReconcileStats, AppError> {
        let stats = self.store.reconcile_enrollment().await?;
        info!(
            "reconcile checked {} courses, corrected {}",
            stats.courses_checked, stats.courses_corrected
        );
        Ok(stats)
    }
}
