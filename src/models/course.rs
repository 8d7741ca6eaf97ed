use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub code: String,
    pub name: String,
    pub instructor: String,
    pub credits: i32,
    pub schedule: String,
    pub capacity: i32,
    pub enrolled: i32,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Course {
    pub fn available_seats(&self) -> i32 {
        self.capacity - self.enrolled
    }

    pub fn is_full(&self) -> bool {
        self.enrolled >= self.capacity
    }

    /// Admission rules shared by every store: a student holding an active
    /// registration is rejected before the seat check.
    pub fn check_admission(&self, already_registered: bool) -> Result<(), AppError> {
        if already_registered {
            return Err(AppError::already_registered());
        }
        if self.is_full() {
            return Err(AppError::course_full());
        }
        Ok(())
    }
}

/// Course as returned by the API, with the derived seat count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseResponse {
    #[serde(flatten)]
    pub course: Course,
    pub available_seats: i32,
}

impl From<Course> for CourseResponse {
    fn from(course: Course) -> Self {
        let available_seats = course.available_seats();
        Self { course, available_seats }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourse {
    pub code: String,
    pub name: String,
    pub instructor: String,
    pub credits: i32,
    pub schedule: String,
    pub capacity: i32,
    pub description: String,
}

impl NewCourse {
    /// Trims text fields and checks the catalogue constraints.
    pub fn validate(mut self) -> Result<Self, AppError> {
        self.code = self.code.trim().to_string();
        self.name = self.name.trim().to_string();
        self.instructor = self.instructor.trim().to_string();

        if self.code.is_empty()
            || self.name.is_empty()
            || self.instructor.is_empty()
            || self.schedule.trim().is_empty()
            || self.description.trim().is_empty()
        {
            return Err(AppError::missing_fields());
        }
        if !(1..=6).contains(&self.credits) {
            return Err(AppError::Validation(format!(
                "{}: credits must be between 1 and 6",
                self.code
            )));
        }
        if self.capacity < 1 {
            return Err(AppError::Validation(format!(
                "{}: capacity must be at least 1",
                self.code
            )));
        }
        Ok(self)
    }
}

fn seed(
    code: &str,
    name: &str,
    instructor: &str,
    credits: i32,
    schedule: &str,
    capacity: i32,
    description: &str,
) -> NewCourse {
    NewCourse {
        code: code.to_string(),
        name: name.to_string(),
        instructor: instructor.to_string(),
        credits,
        schedule: schedule.to_string(),
        capacity,
        description: description.to_string(),
    }
}

/// The sample catalogue every fresh store starts with.
pub fn seed_courses() -> Vec<NewCourse> {
    vec![
        seed(
            "CS101",
            "Introduction to Computer Science",
            "Dr. Sarah Johnson",
            3,
            "Mon, Wed, Fri 9:00-10:00 AM",
            30,
            "Fundamental concepts of computer science and programming.",
        ),
        seed(
            "CS201",
            "Data Structures and Algorithms",
            "Prof. Michael Chen",
            4,
            "Tue, Thu 10:30-12:00 PM",
            25,
            "Study of data structures, algorithms, and their analysis.",
        ),
        seed(
            "CS301",
            "Database Management Systems",
            "Dr. Emily Rodriguez",
            3,
            "Mon, Wed 2:00-3:30 PM",
            28,
            "Design and implementation of database systems.",
        ),
        seed(
            "CS302",
            "Web Development",
            "Prof. David Kim",
            3,
            "Tue, Thu 1:00-2:30 PM",
            30,
            "Modern web development technologies and frameworks.",
        ),
        seed(
            "CS401",
            "Machine Learning",
            "Dr. Lisa Wang",
            4,
            "Mon, Wed, Fri 11:00-12:00 PM",
            20,
            "Introduction to machine learning algorithms and applications.",
        ),
        seed(
            "CS402",
            "Cloud Computing",
            "Prof. James Anderson",
            3,
            "Tue, Thu 3:00-4:30 PM",
            25,
            "Cloud computing concepts, services, and deployment models.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(capacity: i32, enrolled: i32) -> Course {
        Course {
            id: "c1".to_string(),
            code: "CS101".to_string(),
            name: "Intro".to_string(),
            instructor: "Dr. X".to_string(),
            credits: 3,
            schedule: "Mon".to_string(),
            capacity,
            enrolled,
            description: "d".to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_admission_rules() {
        assert!(course(30, 0).check_admission(false).is_ok());
        assert!(matches!(
            course(1, 1).check_admission(false),
            Err(AppError::CapacityExceeded(_))
        ));
        // duplicate wins over capacity
        assert!(matches!(
            course(1, 1).check_admission(true),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn test_course_response_has_available_seats() {
        let json = serde_json::to_value(CourseResponse::from(course(30, 4))).unwrap();
        assert_eq!(json["availableSeats"], 26);
        assert_eq!(json["code"], "CS101");
        assert_eq!(json["createdAt"], "");
    }

    #[test]
    fn test_seed_catalogue_is_valid() {
        let seeds = seed_courses();
        assert_eq!(seeds.len(), 6);
        for s in seeds {
            assert!(s.validate().is_ok());
        }
    }

    #[test]
    fn test_new_course_validation() {
        let mut bad = seed_courses().remove(0);
        bad.credits = 7;
        assert!(matches!(bad.validate(), Err(AppError::Validation(_))));

        let mut padded = seed_courses().remove(0);
        padded.code = "  CS101 ".to_string();
        assert_eq!(padded.validate().unwrap().code, "CS101");
    }
}
