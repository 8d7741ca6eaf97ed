use chrono::Utc;
use sqlx::{Executor, FromRow, Sqlite};
use uuid::Uuid;

use crate::models::{Course, NewCourse, Registration};

#[derive(Debug, Clone, FromRow)]
pub struct EnrollmentCount {
    pub id: String,
    pub code: String,
    pub enrolled: i64,
    pub active: i64,
}

pub async fn fetch_courses<'e, E>(db: E) -> Result<Vec<Course>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Course>(
        r#"
        SELECT id, code, name, instructor, credits, schedule,
            capacity, enrolled, description, created_at, updated_at
        FROM courses
        ORDER BY code
        "#,
    )
    .fetch_all(db)
    .await
}

pub async fn find_course_by_id<'e, E>(db: E, id: &str) -> Result<Option<Course>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Course>(
        r#"
        SELECT id, code, name, instructor, credits, schedule,
            capacity, enrolled, description, created_at, updated_at
        FROM courses
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Inserts the course unless its code is taken. Returns whether a row was written.
pub async fn insert_course_if_absent<'e, E>(db: E, course: &NewCourse) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    let result = sqlx::query(
        r#"
        INSERT INTO courses
            (id, code, name, instructor, credits, schedule,
            capacity, enrolled, description, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9, ?9)
        ON CONFLICT(code) DO NOTHING
        "#,
    )
    .bind(id)
    .bind(&course.code)
    .bind(&course.name)
    .bind(&course.instructor)
    .bind(course.credits)
    .bind(&course.schedule)
    .bind(course.capacity)
    .bind(&course.description)
    .bind(now)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Takes one seat if one is free. The capacity check and the increment are a
/// single statement, so two writers cannot both take the last seat.
pub async fn try_take_seat<'e, E>(db: E, course_id: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        UPDATE courses
        SET enrolled = enrolled + 1,
            updated_at = ?2
        WHERE id = ?1 AND enrolled < capacity
        "#,
    )
    .bind(course_id)
    .bind(now)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn release_seat<'e, E>(db: E, course_id: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        UPDATE courses
        SET enrolled = MAX(enrolled - 1, 0),
            updated_at = ?2
        WHERE id = ?1
        "#,
    )
    .bind(course_id)
    .bind(now)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Recomputes the counter from active rows in one statement.
pub async fn recount_enrolled<'e, E>(db: E, course_id: &str) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"
        UPDATE courses
        SET enrolled = (SELECT COUNT(*) FROM registrations r
                WHERE r.course_id = courses.id AND r.status = 'active'),
            updated_at = ?2
        WHERE id = ?1
        "#,
    )
    .bind(course_id)
    .bind(now)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn enrollment_counts<'e, E>(db: E) -> Result<Vec<EnrollmentCount>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, EnrollmentCount>(
        r#"
        SELECT
            c.id AS id,
            c.code AS code,
            c.enrolled AS enrolled,
            (SELECT COUNT(*) FROM registrations r
                WHERE r.course_id = c.id AND r.status = 'active') AS active
        FROM courses c
        ORDER BY c.code
        "#,
    )
    .fetch_all(db)
    .await
}

pub async fn has_active_registration<'e, E>(
    db: E,
    student_id: &str,
    course_id: &str,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        SELECT 1 FROM registrations
        WHERE student_id = ?1 AND course_id = ?2 AND status = 'active'
        LIMIT 1
        "#,
    )
    .bind(student_id)
    .bind(course_id)
    .fetch_optional(db)
    .await?;

    Ok(row.is_some())
}

pub async fn insert_registration<'e, E>(db: E, reg: &Registration) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO registrations
            (id, student_id, student_name, email, course_id, course_name,
            course_code, registered_at, status, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&reg.id)
    .bind(&reg.student_id)
    .bind(&reg.student_name)
    .bind(&reg.email)
    .bind(&reg.course_id)
    .bind(&reg.course_name)
    .bind(&reg.course_code)
    .bind(&reg.registered_at)
    .bind(reg.status)
    .bind(&reg.updated_at)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn find_registration_by_id<'e, E>(
    db: E,
    id: &str,
) -> Result<Option<Registration>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Registration>(
        r#"
        SELECT id, student_id, student_name, email, course_id, course_name,
            course_code, registered_at, status, updated_at
        FROM registrations
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn fetch_active_registrations_for_student<'e, E>(
    db: E,
    student_id: &str,
) -> Result<Vec<Registration>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Registration>(
        r#"
        SELECT id, student_id, student_name, email, course_id, course_name,
            course_code, registered_at, status, updated_at
        FROM registrations
        WHERE student_id = ?1 AND status = 'active'
        ORDER BY registered_at DESC, rowid DESC
        "#,
    )
    .bind(student_id)
    .fetch_all(db)
    .await
}

pub async fn fetch_active_registrations<'e, E>(db: E) -> Result<Vec<Registration>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Registration>(
        r#"
        SELECT id, student_id, student_name, email, course_id, course_name,
            course_code, registered_at, status, updated_at
        FROM registrations
        WHERE status = 'active'
        ORDER BY registered_at DESC, rowid DESC
        "#,
    )
    .fetch_all(db)
    .await
}

/// Soft delete. Only flips active rows, so a second drop is a no-op.
pub async fn mark_dropped<'e, E>(db: E, id: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        UPDATE registrations
        SET status = 'dropped',
            updated_at = ?2
        WHERE id = ?1 AND status = 'active'
        "#,
    )
    .bind(id)
    .bind(now)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}
