pub mod registration_service;
pub mod scheduler;

pub use registration_service::RegistrationService;
pub use scheduler::ReconcileScheduler;
