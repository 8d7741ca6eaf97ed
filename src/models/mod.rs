pub mod course;
pub mod registration;

pub use course::{Course, CourseResponse, NewCourse, seed_courses};
pub use registration::{
    MessageResponse, NewRegistration, RegisterRequest, RegisterResponse, Registration,
    RegistrationStatus,
};
