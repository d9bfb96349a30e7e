//! Course status transitions and membership changes.
//!
//! Every function works on the class's course collection and either applies the whole change or
//! returns an error leaving the collection untouched.

use super::domain::{
    Course, CourseDraft, CourseId, CourseStatus, Student, StudentId, PLACEHOLDER_IMAGE_URL,
};
use super::roster::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnrollmentError {
    #[error("course {0} not found")]
    CourseNotFound(String),
    #[error("course {course_id} is {actual}, expected {expected}")]
    InvalidStatus {
        course_id: String,
        expected: CourseStatus,
        actual: CourseStatus,
    },
    #[error("course {0} has no requesting student to enroll")]
    MissingCreator(String),
    #[error("student {student_id} has not applied to course {course_id}")]
    NotAnApplicant {
        course_id: String,
        student_id: String,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Validate a student's course request and append it in `Requested` status.
pub fn request_course(
    courses: &mut Vec<Course>,
    student: &Student,
    draft: CourseDraft,
) -> Result<Course, EnrollmentError> {
    let draft = validate_draft(draft)?;

    let course = Course {
        id: CourseId::generate(),
        name: draft.name,
        instructor: draft.instructor,
        date: draft.date,
        location: draft.location,
        supplies: draft.supplies,
        image_url: draft
            .image_url
            .unwrap_or_else(|| PLACEHOLDER_IMAGE_URL.to_string()),
        status: CourseStatus::Requested,
        creator_id: Some(student.id.clone()),
        enrolled_student_ids: Vec::new(),
        applicants: vec![student.id.clone()],
    };

    courses.push(course.clone());
    Ok(course)
}

pub fn approve_course(
    courses: &mut [Course],
    course_id: &CourseId,
) -> Result<Course, EnrollmentError> {
    let course = course_in_status(courses, course_id, CourseStatus::Requested)?;
    let creator = course
        .creator_id
        .clone()
        .ok_or_else(|| EnrollmentError::MissingCreator(course_id.0.clone()))?;

    course.status = CourseStatus::Approved;
    course.enrolled_student_ids = vec![creator];
    Ok(course.clone())
}

/// Drop a requested course from the collection. Nothing is kept for audit.
pub fn reject_course(
    courses: &mut Vec<Course>,
    course_id: &CourseId,
) -> Result<Course, EnrollmentError> {
    course_in_status(courses, course_id, CourseStatus::Requested)?;
    let index = courses
        .iter()
        .position(|course| &course.id == course_id)
        .ok_or_else(|| EnrollmentError::CourseNotFound(course_id.0.clone()))?;
    Ok(courses.remove(index))
}

pub fn cancel_course(
    courses: &mut [Course],
    course_id: &CourseId,
) -> Result<Course, EnrollmentError> {
    let course = course_in_status(courses, course_id, CourseStatus::Approved)?;
    course.status = CourseStatus::Cancelled;
    Ok(course.clone())
}

/// Record interest in an approved course. Applying again changes nothing.
pub fn apply_to_course(
    courses: &mut [Course],
    course_id: &CourseId,
    student_id: &StudentId,
) -> Result<Course, EnrollmentError> {
    let course = course_in_status(courses, course_id, CourseStatus::Approved)?;
    if !course.has_applied(student_id) {
        course.applicants.push(student_id.clone());
    }
    Ok(course.clone())
}

/// Enroll an applicant. The student stays in `applicants`.
pub fn approve_applicant(
    courses: &mut [Course],
    course_id: &CourseId,
    student_id: &StudentId,
) -> Result<Course, EnrollmentError> {
    let course = course_in_status(courses, course_id, CourseStatus::Approved)?;
    if !course.has_applied(student_id) {
        return Err(EnrollmentError::NotAnApplicant {
            course_id: course_id.0.clone(),
            student_id: student_id.0.clone(),
        });
    }
    if !course.is_enrolled(student_id) {
        course.enrolled_student_ids.push(student_id.clone());
    }
    Ok(course.clone())
}

/// Remove a student from `applicants`. An existing enrollment is kept.
pub fn reject_applicant(
    courses: &mut [Course],
    course_id: &CourseId,
    student_id: &StudentId,
) -> Result<Course, EnrollmentError> {
    let course = course_in_status(courses, course_id, CourseStatus::Approved)?;
    course.applicants.retain(|id| id != student_id);
    Ok(course.clone())
}

fn course_in_status<'a>(
    courses: &'a mut [Course],
    course_id: &CourseId,
    expected: CourseStatus,
) -> Result<&'a mut Course, EnrollmentError> {
    let course = courses
        .iter_mut()
        .find(|course| &course.id == course_id)
        .ok_or_else(|| EnrollmentError::CourseNotFound(course_id.0.clone()))?;

    if course.status != expected {
        return Err(EnrollmentError::InvalidStatus {
            course_id: course_id.0.clone(),
            expected,
            actual: course.status,
        });
    }
    Ok(course)
}

fn validate_draft(draft: CourseDraft) -> Result<CourseDraft, ValidationError> {
    let name = required("name", &draft.name)?;
    let instructor = required("instructor", &draft.instructor)?;
    let location = required("location", &draft.location)?;
    let image_url = draft
        .image_url
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty());

    Ok(CourseDraft {
        name,
        instructor,
        date: draft.date,
        location,
        supplies: draft.supplies.trim().to_string(),
        image_url,
    })
}

pub(crate) fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(trimmed.to_string())
}
