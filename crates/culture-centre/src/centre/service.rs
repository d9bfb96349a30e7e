use std::io::Read;
use std::sync::{Arc, RwLock};

use chrono::NaiveDate;
use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{
    ClassKey, ClassSnapshot, Course, CourseDraft, CourseId, Student, StudentId, StudentProfile,
    Teacher,
};
use super::enrollment::{self, EnrollmentError};
use super::gateway::{ClassGateway, GatewayError, Subscription};
use super::roster::{self, NewStudent, StudentEdit, ValidationError};
use super::views::{self, StudentCourseView, StudentDashboard, TeacherDashboard};

/// Typed store over one gateway. Every mutation loads the class snapshot, applies one
/// transition, and saves the whole snapshot back. Nothing is saved when the transition fails.
pub struct CentreService<G> {
    gateway: Arc<G>,
    teacher_passcode: Option<String>,
}

/// Result of a successful student login.
#[derive(Debug, Clone, Serialize)]
pub struct StudentSession {
    pub class: ClassKey,
    pub student: StudentProfile,
}

impl<G> CentreService<G>
where
    G: ClassGateway + 'static,
{
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            teacher_passcode: None,
        }
    }

    pub fn with_teacher_passcode(mut self, passcode: Option<String>) -> Self {
        self.teacher_passcode = passcode.filter(|value| !value.is_empty());
        self
    }

    /// Current snapshot of a class; a class never saved reads as empty.
    pub fn snapshot(&self, class: &ClassKey) -> Result<ClassSnapshot, CentreServiceError> {
        Ok(self.gateway.load(class)?.unwrap_or_default())
    }

    pub fn request_course(
        &self,
        class: &ClassKey,
        student_id: &StudentId,
        draft: CourseDraft,
    ) -> Result<Course, CentreServiceError> {
        let course = self.mutate(class, |snapshot| {
            let student = find_student(snapshot, student_id)?.clone();
            Ok(enrollment::request_course(
                &mut snapshot.courses,
                &student,
                draft,
            )?)
        })?;
        info!(%class, course_id = %course.id.0, student_id = %student_id.0, "course requested");
        Ok(course)
    }

    pub fn approve_course(
        &self,
        class: &ClassKey,
        course_id: &CourseId,
    ) -> Result<Course, CentreServiceError> {
        let course = self.mutate(class, |snapshot| {
            Ok(enrollment::approve_course(&mut snapshot.courses, course_id)?)
        })?;
        info!(%class, course_id = %course_id.0, "course approved");
        Ok(course)
    }

    pub fn reject_course(
        &self,
        class: &ClassKey,
        course_id: &CourseId,
    ) -> Result<Course, CentreServiceError> {
        let course = self.mutate(class, |snapshot| {
            Ok(enrollment::reject_course(&mut snapshot.courses, course_id)?)
        })?;
        info!(%class, course_id = %course_id.0, "course request rejected");
        Ok(course)
    }

    pub fn cancel_course(
        &self,
        class: &ClassKey,
        course_id: &CourseId,
    ) -> Result<Course, CentreServiceError> {
        let course = self.mutate(class, |snapshot| {
            Ok(enrollment::cancel_course(&mut snapshot.courses, course_id)?)
        })?;
        info!(%class, course_id = %course_id.0, "course cancelled");
        Ok(course)
    }

    pub fn apply_to_course(
        &self,
        class: &ClassKey,
        course_id: &CourseId,
        student_id: &StudentId,
    ) -> Result<Course, CentreServiceError> {
        let course = self.mutate(class, |snapshot| {
            find_student(snapshot, student_id)?;
            Ok(enrollment::apply_to_course(
                &mut snapshot.courses,
                course_id,
                student_id,
            )?)
        })?;
        info!(%class, course_id = %course_id.0, student_id = %student_id.0, "applied to course");
        Ok(course)
    }

    pub fn approve_applicant(
        &self,
        class: &ClassKey,
        course_id: &CourseId,
        student_id: &StudentId,
    ) -> Result<Course, CentreServiceError> {
        let course = self.mutate(class, |snapshot| {
            Ok(enrollment::approve_applicant(
                &mut snapshot.courses,
                course_id,
                student_id,
            )?)
        })?;
        info!(%class, course_id = %course_id.0, student_id = %student_id.0, "applicant enrolled");
        Ok(course)
    }

    pub fn reject_applicant(
        &self,
        class: &ClassKey,
        course_id: &CourseId,
        student_id: &StudentId,
    ) -> Result<Course, CentreServiceError> {
        let course = self.mutate(class, |snapshot| {
            Ok(enrollment::reject_applicant(
                &mut snapshot.courses,
                course_id,
                student_id,
            )?)
        })?;
        info!(%class, course_id = %course_id.0, student_id = %student_id.0, "applicant rejected");
        Ok(course)
    }

    pub fn add_student(
        &self,
        class: &ClassKey,
        new_student: NewStudent,
    ) -> Result<Student, CentreServiceError> {
        self.ensure_username_unclaimed(class, new_student.username.trim())?;
        let student = self.mutate(class, |snapshot| {
            Ok(roster::add_student(&mut snapshot.students, new_student)?)
        })?;
        info!(%class, student_id = %student.id.0, "student added");
        Ok(student)
    }

    /// Bulk-add students from a CSV export. The batch is rejected as a whole on any bad row.
    pub fn import_students<R: Read>(
        &self,
        class: &ClassKey,
        reader: R,
    ) -> Result<Vec<Student>, CentreServiceError> {
        let batch = roster::parse_students_csv(reader)?;
        for new_student in &batch {
            self.ensure_username_unclaimed(class, &new_student.username)?;
        }

        let added = self.mutate(class, |snapshot| {
            Ok(roster::add_students(&mut snapshot.students, batch)?)
        })?;
        info!(%class, count = added.len(), "students imported");
        Ok(added)
    }

    pub fn update_student(
        &self,
        class: &ClassKey,
        student_id: &StudentId,
        edit: StudentEdit,
    ) -> Result<Student, CentreServiceError> {
        self.ensure_username_unclaimed(class, edit.username.trim())?;
        let student = self.mutate(class, |snapshot| {
            Ok(roster::update_student(
                &mut snapshot.students,
                student_id,
                edit,
            )?)
        })?;
        info!(%class, student_id = %student_id.0, "student updated");
        Ok(student)
    }

    pub fn delete_student(
        &self,
        class: &ClassKey,
        student_id: &StudentId,
    ) -> Result<Student, CentreServiceError> {
        let student = self.mutate(class, |snapshot| {
            Ok(roster::delete_student(&mut snapshot.students, student_id)?)
        })?;
        info!(%class, student_id = %student_id.0, "student deleted");
        Ok(student)
    }

    pub fn visible_courses(
        &self,
        class: &ClassKey,
        student_id: &StudentId,
        today: NaiveDate,
    ) -> Result<Vec<StudentCourseView>, CentreServiceError> {
        let snapshot = self.snapshot(class)?;
        Ok(views::student_course_list(
            &snapshot.courses,
            student_id,
            today,
        ))
    }

    pub fn student_dashboard<R: Rng + ?Sized>(
        &self,
        class: &ClassKey,
        student_id: &StudentId,
        today: NaiveDate,
        rng: &mut R,
    ) -> Result<StudentDashboard, CentreServiceError> {
        let snapshot = self.snapshot(class)?;
        find_student(&snapshot, student_id)?;
        Ok(views::student_dashboard(
            &snapshot.courses,
            student_id,
            today,
            rng,
        ))
    }

    pub fn teacher_dashboard(
        &self,
        class: &ClassKey,
    ) -> Result<TeacherDashboard, CentreServiceError> {
        let snapshot = self.snapshot(class)?;
        Ok(views::teacher_dashboard(&snapshot.courses))
    }

    /// Resolve a student's class through the login index.
    ///
    /// Unknown usernames and wrong passwords produce the same error.
    pub fn login_student(
        &self,
        username: &str,
        password: &str,
    ) -> Result<StudentSession, CentreServiceError> {
        let record = match self.gateway.lookup_login(username.trim())? {
            Some(record) if record.password == password => record,
            _ => {
                warn!("student login rejected");
                return Err(CentreServiceError::CredentialsIncorrect);
            }
        };

        let class = record.class_key();
        let snapshot = self.snapshot(&class)?;
        let student = snapshot
            .students
            .iter()
            .find(|student| student.username == username.trim())
            .ok_or(CentreServiceError::CredentialsIncorrect)?;

        info!(%class, student_id = %student.id.0, "student logged in");
        Ok(StudentSession {
            class,
            student: student.profile(),
        })
    }

    pub fn login_teacher(
        &self,
        class: ClassKey,
        passcode: &str,
    ) -> Result<Teacher, CentreServiceError> {
        let school_missing = class.school.trim().is_empty();
        let grade_missing = class.grade.trim().is_empty();
        if school_missing || grade_missing {
            return Err(ValidationError::MissingField(if school_missing {
                "school"
            } else {
                "grade"
            })
            .into());
        }

        match self.teacher_passcode.as_deref() {
            Some(expected) if expected == passcode => {
                info!(%class, "teacher logged in");
                Ok(Teacher { class })
            }
            _ => {
                warn!(%class, "teacher login rejected");
                Err(CentreServiceError::CredentialsIncorrect)
            }
        }
    }

    fn mutate<T>(
        &self,
        class: &ClassKey,
        transition: impl FnOnce(&mut ClassSnapshot) -> Result<T, CentreServiceError>,
    ) -> Result<T, CentreServiceError> {
        let mut snapshot = self.snapshot(class)?;
        let outcome = transition(&mut snapshot)?;
        if let Err(err) = self.gateway.save(class, &snapshot) {
            warn!(%class, error = %err, "failed to save class data");
            return Err(err.into());
        }
        Ok(outcome)
    }

    /// Usernames are global login keys; an index entry owned by another class is a conflict.
    fn ensure_username_unclaimed(
        &self,
        class: &ClassKey,
        username: &str,
    ) -> Result<(), CentreServiceError> {
        match self.gateway.lookup_login(username)? {
            Some(record) if record.class_key().storage_key() != class.storage_key() => Err(
                ValidationError::DuplicateUsername(username.to_string()).into(),
            ),
            _ => Ok(()),
        }
    }
}

fn find_student<'a>(
    snapshot: &'a ClassSnapshot,
    student_id: &StudentId,
) -> Result<&'a Student, ValidationError> {
    snapshot
        .student(student_id)
        .ok_or_else(|| ValidationError::StudentNotFound(student_id.0.clone()))
}

/// Local copy of one class kept current by a gateway subscription.
///
/// Each delivery replaces the held snapshot wholesale.
pub struct ClassReplica {
    state: Arc<RwLock<Option<ClassSnapshot>>>,
    _subscription: Subscription,
}

impl ClassReplica {
    pub fn attach<G>(gateway: &G, class: &ClassKey) -> Result<Self, GatewayError>
    where
        G: ClassGateway + ?Sized,
    {
        let state: Arc<RwLock<Option<ClassSnapshot>>> = Arc::new(RwLock::new(None));
        let sink = state.clone();
        let subscription = gateway.subscribe(
            class,
            Arc::new(move |snapshot: Option<ClassSnapshot>| {
                if let Ok(mut guard) = sink.write() {
                    *guard = snapshot;
                }
            }),
        );

        let initial = gateway.load(class)?;
        if let Ok(mut guard) = state.write() {
            if guard.is_none() {
                *guard = initial;
            }
        }

        Ok(Self {
            state,
            _subscription: subscription,
        })
    }

    pub fn current(&self) -> Option<ClassSnapshot> {
        self.state.read().ok().and_then(|guard| guard.clone())
    }
}

/// Error raised by the centre service.
#[derive(Debug, thiserror::Error)]
pub enum CentreServiceError {
    #[error(transparent)]
    Enrollment(#[from] EnrollmentError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("class data unavailable: {0}")]
    Gateway(#[from] GatewayError),
    #[error("credentials incorrect")]
    CredentialsIncorrect,
}
