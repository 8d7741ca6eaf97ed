pub mod file;
pub mod sqlite;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::AppError;
use crate::models::{Course, NewRegistration, Registration};

pub use file::JsonFileStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileStats {
    pub courses_checked: usize,
    pub courses_corrected: usize,
}

/// Persistence for courses and registrations.
///
/// `register` and `drop_registration` must apply the registration change and
/// the enrolled counter change as one unit: either both are visible or
/// neither is, and concurrent callers cannot both take the last seat.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Inserts the sample catalogue, skipping codes that already exist.
    /// Returns how many courses were inserted.
    async fn seed_courses(&self) -> Result<usize, AppError>;

    async fn list_courses(&self) -> Result<Vec<Course>, AppError>;

    async fn get_course(&self, id: &str) -> Result<Option<Course>, AppError>;

    async fn register(&self, new: NewRegistration) -> Result<Registration, AppError>;

    /// Active registrations of one student, newest first.
    async fn registrations_for_student(&self, student_id: &str)
        -> Result<Vec<Registration>, AppError>;

    /// All active registrations, newest first.
    async fn active_registrations(&self) -> Result<Vec<Registration>, AppError>;

    /// Returns the registration as it was before the drop.
    async fn drop_registration(&self, id: &str) -> Result<Registration, AppError>;

    /// Rewrites every course's enrolled counter from its active registrations.
    async fn reconcile_enrollment(&self) -> Result<ReconcileStats, AppError>;

    async fn ping(&self) -> Result<(), AppError>;
}
