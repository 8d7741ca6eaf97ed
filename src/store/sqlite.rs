use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::repository;
use crate::error::AppError;
use crate::models::{Course, NewRegistration, Registration, RegistrationStatus, seed_courses};
use crate::store::{ReconcileStats, RegistrationStore};

/// Database-backed store. Drops are soft: the row keeps its history with
/// `status = dropped`.
#[derive(Clone)]
pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }
}

#[async_trait]
impl RegistrationStore for SqliteStore {
    async fn seed_courses(&self) -> Result<usize, AppError> {
        let mut inserted = 0;
        for seed in seed_courses() {
            let seed = seed.validate()?;
            if repository::insert_course_if_absent(&self.db, &seed).await? {
                inserted += 1;
            }
        }
        if inserted > 0 {
            info!("seeded {} courses", inserted);
        }
        Ok(inserted)
    }

    async fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        Ok(repository::fetch_courses(&self.db).await?)
    }

    async fn get_course(&self, id: &str) -> Result<Option<Course>, AppError> {
        Ok(repository::find_course_by_id(&self.db, id).await?)
    }

    async fn register(&self, new: NewRegistration) -> Result<Registration, AppError> {
        let mut tx = self.db.begin().await?;

        // Write first so the transaction holds the write lock from its first
        // statement and never has to upgrade from a read lock.
        let seat_taken = repository::try_take_seat(&mut *tx, &new.course_id).await?;

        let course = repository::find_course_by_id(&mut *tx, &new.course_id)
            .await?
            .ok_or_else(AppError::course_not_found)?;

        let duplicate =
            repository::has_active_registration(&mut *tx, &new.student_id, &course.id).await?;
        if duplicate {
            return Err(AppError::already_registered());
        }
        if !seat_taken {
            return Err(AppError::course_full());
        }

        let now = Utc::now().to_rfc3339();
        let registration = Registration {
            id: Uuid::new_v4().to_string(),
            student_id: new.student_id,
            student_name: new.student_name,
            email: new.email,
            course_id: course.id,
            course_name: course.name,
            course_code: course.code,
            registered_at: now.clone(),
            status: RegistrationStatus::Active,
            updated_at: now,
        };

        match repository::insert_registration(&mut *tx, &registration).await {
            Ok(()) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(AppError::already_registered());
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().await?;
        Ok(registration)
    }

    async fn registrations_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<Registration>, AppError> {
        Ok(repository::fetch_active_registrations_for_student(&self.db, student_id).await?)
    }

    async fn active_registrations(&self) -> Result<Vec<Registration>, AppError> {
        Ok(repository::fetch_active_registrations(&self.db).await?)
    }

    async fn drop_registration(&self, id: &str) -> Result<Registration, AppError> {
        let mut tx = self.db.begin().await?;

        if !repository::mark_dropped(&mut *tx, id).await? {
            return Err(AppError::registration_not_found());
        }
        let registration = repository::find_registration_by_id(&mut *tx, id)
            .await?
            .ok_or_else(AppError::registration_not_found)?;

        if !repository::release_seat(&mut *tx, &registration.course_id).await? {
            warn!(
                "registration {} references missing course {}",
                registration.id, registration.course_id
            );
        }

        tx.commit().await?;

        // report the row as it was before the drop
        Ok(Registration {
            status: RegistrationStatus::Active,
            ..registration
        })
    }

    async fn reconcile_enrollment(&self) -> Result<ReconcileStats, AppError> {
        let counts = repository::enrollment_counts(&self.db).await?;

        let mut stats = ReconcileStats {
            courses_checked: counts.len(),
            ..Default::default()
        };
        for count in counts.iter().filter(|c| c.enrolled != c.active) {
            warn!(
                "enrolled counter drift on {}: counter={} active={}",
                count.code, count.enrolled, count.active
            );
            repository::recount_enrolled(&self.db, &count.id).await?;
            stats.courses_corrected += 1;
        }

        Ok(stats)
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("select 1").execute(&self.db).await?;
        Ok(())
    }
}
