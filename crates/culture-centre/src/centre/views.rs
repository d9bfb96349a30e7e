//! Read-side classifications recomputed from `(course, today)` on every call.

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use super::domain::{Course, CourseStatus, StudentId};

/// Days after its date that a course stays in the student course list.
pub const STUDENT_VISIBILITY_DAYS: i64 = 5;
/// Horizon for the "upcoming" section of the student dashboard.
pub const UPCOMING_WINDOW_DAYS: i64 = 7;
pub const UPCOMING_LIMIT: usize = 3;

fn days_since(course: &Course, today: NaiveDate) -> i64 {
    today.signed_duration_since(course.date).num_days()
}

pub fn is_completed(course: &Course, today: NaiveDate) -> bool {
    course.status == CourseStatus::Approved && course.date < today
}

pub fn is_in_progress(course: &Course, today: NaiveDate) -> bool {
    course.status == CourseStatus::Approved && course.date == today
}

pub fn is_visible_to_students(course: &Course, today: NaiveDate) -> bool {
    course.status == CourseStatus::Approved && days_since(course, today) < STUDENT_VISIBILITY_DAYS
}

pub fn is_upcoming_for(course: &Course, student_id: &StudentId, today: NaiveDate) -> bool {
    let ahead = -days_since(course, today);
    course.status == CourseStatus::Approved
        && course.is_enrolled(student_id)
        && (0..=UPCOMING_WINDOW_DAYS).contains(&ahead)
}

/// What a student sees on a course card, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentCourseState {
    InProgress,
    Enrolled,
    AwaitingApproval,
    Ended,
    Open,
}

impl StudentCourseState {
    pub fn of(course: &Course, student_id: &StudentId, today: NaiveDate) -> Self {
        if course.is_enrolled(student_id) {
            if is_in_progress(course, today) {
                StudentCourseState::InProgress
            } else {
                StudentCourseState::Enrolled
            }
        } else if course.has_applied(student_id) {
            StudentCourseState::AwaitingApproval
        } else if is_completed(course, today) {
            StudentCourseState::Ended
        } else {
            StudentCourseState::Open
        }
    }

    pub fn can_apply(self) -> bool {
        matches!(self, StudentCourseState::Open)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentCourseView {
    pub course: Course,
    pub state: StudentCourseState,
    pub completed: bool,
    /// Whether the apply action is offered on the card.
    pub can_apply: bool,
}

/// Courses open to students, oldest date first.
pub fn visible_courses(courses: &[Course], today: NaiveDate) -> Vec<&Course> {
    let mut visible: Vec<&Course> = courses
        .iter()
        .filter(|course| is_visible_to_students(course, today))
        .collect();
    visible.sort_by_key(|course| course.date);
    visible
}

pub fn student_course_list(
    courses: &[Course],
    student_id: &StudentId,
    today: NaiveDate,
) -> Vec<StudentCourseView> {
    visible_courses(courses, today)
        .into_iter()
        .map(|course| {
            let state = StudentCourseState::of(course, student_id, today);
            StudentCourseView {
                course: course.clone(),
                state,
                completed: is_completed(course, today),
                can_apply: state.can_apply(),
            }
        })
        .collect()
}

/// Uniform pick among approved courses the student is not enrolled in.
pub fn recommend<'a, R: Rng + ?Sized>(
    courses: &'a [Course],
    student_id: &StudentId,
    rng: &mut R,
) -> Option<&'a Course> {
    let candidates: Vec<&Course> = courses
        .iter()
        .filter(|course| course.status == CourseStatus::Approved && !course.is_enrolled(student_id))
        .collect();
    candidates.choose(rng).copied()
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentDashboard {
    pub enrolled: Vec<Course>,
    pub pending_applications: Vec<Course>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub today: Option<Course>,
    pub upcoming: Vec<Course>,
    pub leading: Vec<Course>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended: Option<Course>,
}

pub fn student_dashboard<R: Rng + ?Sized>(
    courses: &[Course],
    student_id: &StudentId,
    today: NaiveDate,
    rng: &mut R,
) -> StudentDashboard {
    let enrolled: Vec<&Course> = courses
        .iter()
        .filter(|course| course.status == CourseStatus::Approved && course.is_enrolled(student_id))
        .collect();

    let pending_applications = courses
        .iter()
        .filter(|course| {
            course.status == CourseStatus::Approved
                && course.has_applied(student_id)
                && !course.is_enrolled(student_id)
        })
        .cloned()
        .collect();

    let todays = enrolled.iter().find(|course| course.date == today).copied();

    let mut upcoming: Vec<&Course> = enrolled
        .iter()
        .filter(|course| course.date > today && is_upcoming_for(course, student_id, today))
        .copied()
        .collect();
    upcoming.sort_by_key(|course| course.date);
    upcoming.truncate(UPCOMING_LIMIT);

    let leading = enrolled
        .iter()
        .filter(|course| course.creator_id.as_ref() == Some(student_id) && course.date >= today)
        .map(|course| (*course).clone())
        .collect();

    StudentDashboard {
        enrolled: enrolled.iter().map(|course| (*course).clone()).collect(),
        pending_applications,
        today: todays.cloned(),
        upcoming: upcoming.into_iter().cloned().collect(),
        leading,
        recommended: recommend(courses, student_id, rng).cloned(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveCourseSummary {
    pub course: Course,
    pub enrolled_count: usize,
    pub waiting_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeacherDashboard {
    pub requests: Vec<Course>,
    pub active: Vec<ActiveCourseSummary>,
    pub cancelled: Vec<Course>,
}

pub fn teacher_dashboard(courses: &[Course]) -> TeacherDashboard {
    let with_status = |status: CourseStatus| -> Vec<Course> {
        courses
            .iter()
            .filter(|course| course.status == status)
            .cloned()
            .collect()
    };

    let active = courses
        .iter()
        .filter(|course| course.status == CourseStatus::Approved)
        .map(|course| ActiveCourseSummary {
            course: course.clone(),
            enrolled_count: course.enrolled_student_ids.len(),
            waiting_count: course.waiting_applicants().count(),
        })
        .collect();

    TeacherDashboard {
        requests: with_status(CourseStatus::Requested),
        active,
        cancelled: with_status(CourseStatus::Cancelled),
    }
}
