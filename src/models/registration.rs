use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("email pattern compiles"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Active,
    Dropped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    pub email: String,
    pub course_id: String,
    pub course_name: String,
    pub course_code: String,
    pub registered_at: String,
    pub status: RegistrationStatus,
    pub updated_at: String,
}

impl Registration {
    pub fn is_active(&self) -> bool {
        self.status == RegistrationStatus::Active
    }
}

/// Body of `POST /api/register`. Every field is optional here so that a
/// missing field reports as a validation error instead of a decode failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub student_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub course_id: Option<String>,
}

/// A register request that passed validation, with normalized fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRegistration {
    pub student_id: String,
    pub student_name: String,
    pub email: String,
    pub course_id: String,
}

impl TryFrom<RegisterRequest> for NewRegistration {
    type Error = AppError;

    fn try_from(req: RegisterRequest) -> Result<Self, Self::Error> {
        let field = |v: Option<String>| {
            v.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .ok_or_else(AppError::missing_fields)
        };

        let student_id = field(req.student_id)?;
        let student_name = field(req.student_name)?;
        let email = field(req.email)?.to_lowercase();
        let course_id = field(req.course_id)?;

        if !EMAIL_PATTERN.is_match(&email) {
            return Err(AppError::invalid_email());
        }

        Ok(Self {
            student_id,
            student_name,
            email,
            course_id,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub registration: Registration,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegisterRequest {
        RegisterRequest {
            student_id: Some(" S1 ".to_string()),
            student_name: Some("Ada Lovelace".to_string()),
            email: Some("Ada@Example.COM".to_string()),
            course_id: Some("course-1".to_string()),
        }
    }

    #[test]
    fn test_valid_request_is_normalized() {
        let new = NewRegistration::try_from(request()).unwrap();
        assert_eq!(new.student_id, "S1");
        assert_eq!(new.email, "ada@example.com");
    }

    #[test]
    fn test_missing_or_blank_fields_rejected() {
        let mut req = request();
        req.student_name = None;
        let err = NewRegistration::try_from(req).unwrap_err();
        assert_eq!(err.to_string(), "All fields are required");

        let mut req = request();
        req.course_id = Some("   ".to_string());
        assert!(matches!(
            NewRegistration::try_from(req),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_email_pattern() {
        for bad in ["ada", "ada@example", "ada @example.com", "@example.com"] {
            let mut req = request();
            req.email = Some(bad.to_string());
            let err = NewRegistration::try_from(req).unwrap_err();
            assert_eq!(err.to_string(), "Please enter a valid email address", "{bad}");
        }
    }

    #[test]
    fn test_request_decodes_camel_case_with_missing_fields() {
        let req: RegisterRequest =
            serde_json::from_str(r#"{"studentId":"S1","courseId":"c"}"#).unwrap();
        assert_eq!(req.student_id.as_deref(), Some("S1"));
        assert!(req.email.is_none());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&RegistrationStatus::Dropped).unwrap();
        assert_eq!(json, "\"dropped\"");
    }
}
