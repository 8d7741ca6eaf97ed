use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Course, NewRegistration, Registration, RegistrationStatus, seed_courses};
use crate::store::{ReconcileStats, RegistrationStore};

const STORE_FILE: &str = "registrations.json";

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    courses: Vec<Course>,
    registrations: Vec<Registration>,
}

impl Document {
    fn sort_newest_first(regs: &mut [Registration]) {
        regs.sort_by(|a, b| b.registered_at.cmp(&a.registered_at));
    }
}

/// File-backed store. The whole dataset is one JSON document that is
/// replaced atomically on every write; drops remove the registration.
pub struct JsonFileStore {
    path: PathBuf,
    doc: Mutex<Document>,
}

impl JsonFileStore {
    /// Opens the store under `data_dir`, creating the directory and an empty
    /// document if needed.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, AppError> {
        let data_dir = data_dir.as_ref();
        tokio::fs::create_dir_all(data_dir).await?;
        let path = data_dir.join(STORE_FILE);

        let doc = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let doc = Document::default();
                persist(&path, &doc).await?;
                doc
            }
            Err(e) => return Err(e.into()),
        };
        info!("file store ready at {}", path.display());

        Ok(Self {
            path,
            doc: Mutex::new(doc),
        })
    }

    /// Applies `f` to a copy of the document and persists it. The in-memory
    /// state only changes once the file write succeeded.
    async fn update<T>(
        &self,
        f: impl FnOnce(&mut Document) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let mut guard = self.doc.lock().await;
        let mut next = guard.clone();
        let out = f(&mut next)?;
        persist(&self.path, &next).await?;
        *guard = next;
        Ok(out)
    }
}

async fn persist(path: &Path, doc: &Document) -> Result<(), AppError> {
    let tmp = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(doc)?;
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl RegistrationStore for JsonFileStore {
    async fn seed_courses(&self) -> Result<usize, AppError> {
        let seeds = seed_courses()
            .into_iter()
            .map(|s| s.validate())
            .collect::<Result<Vec<_>, _>>()?;

        let inserted = self
            .update(|doc| {
                let now = Utc::now().to_rfc3339();
                let mut inserted = 0;
                for seed in seeds {
                    if doc.courses.iter().any(|c| c.code == seed.code) {
                        continue;
                    }
                    doc.courses.push(Course {
                        id: Uuid::new_v4().to_string(),
                        code: seed.code,
                        name: seed.name,
                        instructor: seed.instructor,
                        credits: seed.credits,
                        schedule: seed.schedule,
                        capacity: seed.capacity,
                        enrolled: 0,
                        description: seed.description,
                        created_at: now.clone(),
                        updated_at: now.clone(),
                    });
                    inserted += 1;
                }
                doc.courses.sort_by(|a, b| a.code.cmp(&b.code));
                Ok(inserted)
            })
            .await?;

        if inserted > 0 {
            info!("seeded {} courses", inserted);
        }
        Ok(inserted)
    }

    async fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        Ok(self.doc.lock().await.courses.clone())
    }

    async fn get_course(&self, id: &str) -> Result<Option<Course>, AppError> {
        let doc = self.doc.lock().await;
        Ok(doc.courses.iter().find(|c| c.id == id).cloned())
    }

    async fn register(&self, new: NewRegistration) -> Result<Registration, AppError> {
        self.update(|doc| {
            let course = doc
                .courses
                .iter_mut()
                .find(|c| c.id == new.course_id)
                .ok_or_else(AppError::course_not_found)?;

            let duplicate = doc.registrations.iter().any(|r| {
                r.is_active() && r.student_id == new.student_id && r.course_id == course.id
            });
            course.check_admission(duplicate)?;

            let now = Utc::now().to_rfc3339();
            course.enrolled += 1;
            course.updated_at = now.clone();

            let registration = Registration {
                id: Uuid::new_v4().to_string(),
                student_id: new.student_id,
                student_name: new.student_name,
                email: new.email,
                course_id: course.id.clone(),
                course_name: course.name.clone(),
                course_code: course.code.clone(),
                registered_at: now.clone(),
                status: RegistrationStatus::Active,
                updated_at: now,
            };
            doc.registrations.push(registration.clone());
            Ok(registration)
        })
        .await
    }

    async fn registrations_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<Registration>, AppError> {
        let doc = self.doc.lock().await;
        let mut regs: Vec<_> = doc
            .registrations
            .iter()
            .filter(|r| r.is_active() && r.student_id == student_id)
            .cloned()
            .collect();
        Document::sort_newest_first(&mut regs);
        Ok(regs)
    }

    async fn active_registrations(&self) -> Result<Vec<Registration>, AppError> {
        let doc = self.doc.lock().await;
        let mut regs: Vec<_> = doc
            .registrations
            .iter()
            .filter(|r| r.is_active())
            .cloned()
            .collect();
        Document::sort_newest_first(&mut regs);
        Ok(regs)
    }

    async fn drop_registration(&self, id: &str) -> Result<Registration, AppError> {
        self.update(|doc| {
            let idx = doc
                .registrations
                .iter()
                .position(|r| r.id == id && r.is_active())
                .ok_or_else(AppError::registration_not_found)?;
            let registration = doc.registrations.remove(idx);

            match doc.courses.iter_mut().find(|c| c.id == registration.course_id) {
                Some(course) => {
                    course.enrolled = (course.enrolled - 1).max(0);
                    course.updated_at = Utc::now().to_rfc3339();
                }
                None => warn!(
                    "registration {} references missing course {}",
                    registration.id, registration.course_id
                ),
            }
            Ok(registration)
        })
        .await
    }

    async fn reconcile_enrollment(&self) -> Result<ReconcileStats, AppError> {
        self.update(|doc| {
            let mut stats = ReconcileStats {
                courses_checked: doc.courses.len(),
                ..Default::default()
            };
            let now = Utc::now().to_rfc3339();
            for course in doc.courses.iter_mut() {
                let active = doc
                    .registrations
                    .iter()
                    .filter(|r| r.is_active() && r.course_id == course.id)
                    .count() as i32;
                if course.enrolled != active {
                    warn!(
                        "enrolled counter drift on {}: counter={} active={}",
                        course.code, course.enrolled, active
                    );
                    course.enrolled = active;
                    course.updated_at = now.clone();
                    stats.courses_corrected += 1;
                }
            }
            Ok(stats)
        })
        .await
    }

    async fn ping(&self) -> Result<(), AppError> {
        tokio::fs::metadata(&self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_store(dir: &Path) -> JsonFileStore {
        let store = JsonFileStore::open(dir).await.expect("Failed to open store");
        store.seed_courses().await.expect("Failed to seed");
        store
    }

    async fn course_id(store: &JsonFileStore, code: &str) -> String {
        store
            .list_courses()
            .await
            .unwrap()
            .into_iter()
            .find(|c| c.code == code)
            .map(|c| c.id)
            .expect("seeded course")
    }

    fn new_registration(student_id: &str, course_id: &str) -> NewRegistration {
        NewRegistration {
            student_id: student_id.to_string(),
            student_name: "Student".to_string(),
            email: "student@example.com".to_string(),
            course_id: course_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = setup_store(dir.path()).await;
        let cs201 = course_id(&store, "CS201").await;
        let reg = store.register(new_registration("S1", &cs201)).await.unwrap();
        drop(store);

        let reopened = JsonFileStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.seed_courses().await.unwrap(), 0);
        let regs = reopened.registrations_for_student("S1").await.unwrap();
        assert_eq!(regs, vec![reg]);
        let course = reopened.get_course(&cs201).await.unwrap().unwrap();
        assert_eq!(course.enrolled, 1);
    }

    #[tokio::test]
    async fn test_duplicate_is_rejected_before_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let store = setup_store(dir.path()).await;
        let cs101 = course_id(&store, "CS101").await;

        store.register(new_registration("S1", &cs101)).await.unwrap();
        let err = store.register(new_registration("S1", &cs101)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.get_course(&cs101).await.unwrap().unwrap().enrolled, 1);
    }

    #[tokio::test]
    async fn test_drop_is_hard_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = setup_store(dir.path()).await;
        let cs101 = course_id(&store, "CS101").await;
        let reg = store.register(new_registration("S1", &cs101)).await.unwrap();

        let dropped = store.drop_registration(&reg.id).await.unwrap();
        assert_eq!(dropped.id, reg.id);
        assert!(store.active_registrations().await.unwrap().is_empty());
        assert_eq!(store.get_course(&cs101).await.unwrap().unwrap().enrolled, 0);

        let err = store.drop_registration(&reg.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_registrations_never_overfill() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(setup_store(dir.path()).await);
        // CS401 has 20 seats
        let cs401 = course_id(&store, "CS401").await;

        let mut handles = Vec::new();
        for i in 0..30 {
            let store = store.clone();
            let course = cs401.clone();
            handles.push(tokio::spawn(async move {
                store.register(new_registration(&format!("S{i}"), &course)).await
            }));
        }

        let mut ok = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(e) => assert!(matches!(e, AppError::CapacityExceeded(_))),
            }
        }
        assert_eq!(ok, 20);
        assert_eq!(store.get_course(&cs401).await.unwrap().unwrap().enrolled, 20);
    }

    #[tokio::test]
    async fn test_reconcile_fixes_hand_edited_counter() {
        let dir = tempfile::tempdir().unwrap();
        let store = setup_store(dir.path()).await;
        let cs101 = course_id(&store, "CS101").await;
        store.register(new_registration("S1", &cs101)).await.unwrap();
        store
            .update(|doc| {
                doc.courses.iter_mut().for_each(|c| c.enrolled = 3);
                Ok(())
            })
            .await
            .unwrap();

        let stats = store.reconcile_enrollment().await.unwrap();
        assert_eq!(stats.courses_checked, 6);
        assert_eq!(stats.courses_corrected, 6);
        assert_eq!(store.get_course(&cs101).await.unwrap().unwrap().enrolled, 1);
    }
}
