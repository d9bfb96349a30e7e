//! Course enrollment for a school culture centre.
//!
//! Students request courses and apply to approved ones; teachers approve requests, manage
//! applicants, and keep the class roster. Each class (school and grade) is stored as one
//! snapshot behind a [`ClassGateway`].

pub mod domain;
pub mod enrollment;
pub mod gateway;
pub mod roster;
pub mod router;
pub mod service;
pub mod store;
pub mod views;

#[cfg(test)]
mod tests;

pub use domain::{
    ClassKey, ClassSnapshot, Course, CourseDraft, CourseId, CourseStatus, LoginRecord, Role,
    Student, StudentId, StudentProfile, Teacher, User,
};
pub use enrollment::EnrollmentError;
pub use gateway::{ClassGateway, GatewayError, SnapshotListener, Subscription};
pub use roster::{NewStudent, StudentEdit, ValidationError};
pub use router::centre_router;
pub use service::{CentreService, CentreServiceError, ClassReplica, StudentSession};
pub use store::{InMemoryClassGateway, JsonFileClassGateway};
pub use views::{StudentCourseState, StudentDashboard, TeacherDashboard};
