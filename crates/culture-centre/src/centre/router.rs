use std::io::Cursor;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{ClassKey, CourseDraft, CourseId, StudentId, StudentProfile};
use super::enrollment::EnrollmentError;
use super::gateway::{ClassGateway, GatewayError};
use super::roster::{NewStudent, StudentEdit, ValidationError};
use super::service::{CentreService, CentreServiceError};

/// Router builder exposing the class, roster, and enrollment endpoints.
pub fn centre_router<G>(service: Arc<CentreService<G>>) -> Router
where
    G: ClassGateway + 'static,
{
    let class = "/api/v1/classes/:school/:grade";
    Router::new()
        .route("/api/v1/login/student", post(student_login_handler::<G>))
        .route("/api/v1/login/teacher", post(teacher_login_handler::<G>))
        .route(class, get(snapshot_handler::<G>))
        .route(
            &format!("{class}/dashboard"),
            get(teacher_dashboard_handler::<G>),
        )
        .route(
            &format!("{class}/students"),
            post(add_student_handler::<G>),
        )
        .route(
            &format!("{class}/students/import"),
            post(import_students_handler::<G>),
        )
        .route(
            &format!("{class}/students/:student_id"),
            put(update_student_handler::<G>).delete(delete_student_handler::<G>),
        )
        .route(
            &format!("{class}/students/:student_id/courses"),
            get(student_courses_handler::<G>),
        )
        .route(
            &format!("{class}/students/:student_id/dashboard"),
            get(student_dashboard_handler::<G>),
        )
        .route(
            &format!("{class}/courses"),
            post(request_course_handler::<G>),
        )
        .route(
            &format!("{class}/courses/:course_id/approve"),
            post(approve_course_handler::<G>),
        )
        .route(
            &format!("{class}/courses/:course_id/reject"),
            post(reject_course_handler::<G>),
        )
        .route(
            &format!("{class}/courses/:course_id/cancel"),
            post(cancel_course_handler::<G>),
        )
        .route(
            &format!("{class}/courses/:course_id/applicants"),
            post(apply_handler::<G>),
        )
        .route(
            &format!("{class}/courses/:course_id/applicants/:student_id/approve"),
            post(approve_applicant_handler::<G>),
        )
        .route(
            &format!("{class}/courses/:course_id/applicants/:student_id"),
            delete(reject_applicant_handler::<G>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct StudentLoginRequest {
    pub(crate) username: String,
    pub(crate) password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TeacherLoginRequest {
    pub(crate) school: String,
    pub(crate) grade: String,
    pub(crate) passcode: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CourseRequest {
    pub(crate) student_id: StudentId,
    #[serde(flatten)]
    pub(crate) draft: CourseDraft,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApplicantRequest {
    pub(crate) student_id: StudentId,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TodayQuery {
    #[serde(default)]
    pub(crate) today: Option<NaiveDate>,
}

impl TodayQuery {
    fn resolve(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }
}

type ServiceState<G> = State<Arc<CentreService<G>>>;

/// Run a service call on the blocking pool. File-backed gateways write to disk under a lock.
async fn blocking<G, T, F>(service: Arc<CentreService<G>>, call: F) -> Result<T, CentreServiceError>
where
    G: ClassGateway + 'static,
    T: Send + 'static,
    F: FnOnce(&CentreService<G>) -> Result<T, CentreServiceError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || call(&service))
        .await
        .map_err(|err| GatewayError::Unavailable(format!("storage task failed: {err}")))?
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, CentreServiceError>) -> Response {
    match result {
        Ok(body) => (status, Json(body)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn student_login_handler<G>(
    State(service): ServiceState<G>,
    Json(request): Json<StudentLoginRequest>,
) -> Response
where
    G: ClassGateway + 'static,
{
    if request.username.trim().is_empty() || request.password.is_empty() {
        return error_response(ValidationError::MissingField("username and password").into());
    }

    let result = blocking(service, move |service| {
        service.login_student(&request.username, &request.password)
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn teacher_login_handler<G>(
    State(service): ServiceState<G>,
    Json(request): Json<TeacherLoginRequest>,
) -> Response
where
    G: ClassGateway + 'static,
{
    let class = ClassKey::new(request.school.trim(), request.grade.trim());
    match service.login_teacher(class, &request.passcode) {
        Ok(teacher) => (
            StatusCode::OK,
            Json(json!({ "class": teacher.class, "user": teacher.as_user() })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn snapshot_handler<G>(
    State(service): ServiceState<G>,
    Path((school, grade)): Path<(String, String)>,
) -> Response
where
    G: ClassGateway + 'static,
{
    let class = ClassKey::new(school, grade);
    let result = blocking(service, move |service| service.snapshot(&class)).await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn teacher_dashboard_handler<G>(
    State(service): ServiceState<G>,
    Path((school, grade)): Path<(String, String)>,
) -> Response
where
    G: ClassGateway + 'static,
{
    let class = ClassKey::new(school, grade);
    let result = blocking(service, move |service| service.teacher_dashboard(&class)).await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn add_student_handler<G>(
    State(service): ServiceState<G>,
    Path((school, grade)): Path<(String, String)>,
    Json(new_student): Json<NewStudent>,
) -> Response
where
    G: ClassGateway + 'static,
{
    let class = ClassKey::new(school, grade);
    let result = blocking(service, move |service| {
        service.add_student(&class, new_student)
    })
    .await;
    respond(StatusCode::CREATED, result.map(|student| student.profile()))
}

pub(crate) async fn import_students_handler<G>(
    State(service): ServiceState<G>,
    Path((school, grade)): Path<(String, String)>,
    body: String,
) -> Response
where
    G: ClassGateway + 'static,
{
    let class = ClassKey::new(school, grade);
    let result = blocking(service, move |service| {
        service.import_students(&class, Cursor::new(body.into_bytes()))
    })
    .await;
    let result = result.map(|students| {
        let added: Vec<StudentProfile> = students.iter().map(|s| s.profile()).collect();
        json!({ "added": added })
    });
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn update_student_handler<G>(
    State(service): ServiceState<G>,
    Path((school, grade, student_id)): Path<(String, String, String)>,
    Json(edit): Json<StudentEdit>,
) -> Response
where
    G: ClassGateway + 'static,
{
    let class = ClassKey::new(school, grade);
    let result = blocking(service, move |service| {
        service.update_student(&class, &StudentId(student_id), edit)
    })
    .await;
    respond(StatusCode::OK, result.map(|student| student.profile()))
}

pub(crate) async fn delete_student_handler<G>(
    State(service): ServiceState<G>,
    Path((school, grade, student_id)): Path<(String, String, String)>,
) -> Response
where
    G: ClassGateway + 'static,
{
    let class = ClassKey::new(school, grade);
    let result = blocking(service, move |service| {
        service.delete_student(&class, &StudentId(student_id))
    })
    .await;
    match result {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn student_courses_handler<G>(
    State(service): ServiceState<G>,
    Path((school, grade, student_id)): Path<(String, String, String)>,
    Query(query): Query<TodayQuery>,
) -> Response
where
    G: ClassGateway + 'static,
{
    let class = ClassKey::new(school, grade);
    let today = query.resolve();
    let result = blocking(service, move |service| {
        service.visible_courses(&class, &StudentId(student_id), today)
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn student_dashboard_handler<G>(
    State(service): ServiceState<G>,
    Path((school, grade, student_id)): Path<(String, String, String)>,
    Query(query): Query<TodayQuery>,
) -> Response
where
    G: ClassGateway + 'static,
{
    let class = ClassKey::new(school, grade);
    let today = query.resolve();
    let result = blocking(service, move |service| {
        let mut rng = rand::thread_rng();
        service.student_dashboard(&class, &StudentId(student_id), today, &mut rng)
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn request_course_handler<G>(
    State(service): ServiceState<G>,
    Path((school, grade)): Path<(String, String)>,
    Json(request): Json<CourseRequest>,
) -> Response
where
    G: ClassGateway + 'static,
{
    let class = ClassKey::new(school, grade);
    let result = blocking(service, move |service| {
        service.request_course(&class, &request.student_id, request.draft)
    })
    .await;
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn approve_course_handler<G>(
    State(service): ServiceState<G>,
    Path((school, grade, course_id)): Path<(String, String, String)>,
) -> Response
where
    G: ClassGateway + 'static,
{
    let class = ClassKey::new(school, grade);
    let result = blocking(service, move |service| {
        service.approve_course(&class, &CourseId(course_id))
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn reject_course_handler<G>(
    State(service): ServiceState<G>,
    Path((school, grade, course_id)): Path<(String, String, String)>,
) -> Response
where
    G: ClassGateway + 'static,
{
    let class = ClassKey::new(school, grade);
    let result = blocking(service, move |service| {
        service.reject_course(&class, &CourseId(course_id))
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn cancel_course_handler<G>(
    State(service): ServiceState<G>,
    Path((school, grade, course_id)): Path<(String, String, String)>,
) -> Response
where
    G: ClassGateway + 'static,
{
    let class = ClassKey::new(school, grade);
    let result = blocking(service, move |service| {
        service.cancel_course(&class, &CourseId(course_id))
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn apply_handler<G>(
    State(service): ServiceState<G>,
    Path((school, grade, course_id)): Path<(String, String, String)>,
    Json(request): Json<ApplicantRequest>,
) -> Response
where
    G: ClassGateway + 'static,
{
    let class = ClassKey::new(school, grade);
    let result = blocking(service, move |service| {
        service.apply_to_course(&class, &CourseId(course_id), &request.student_id)
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn approve_applicant_handler<G>(
    State(service): ServiceState<G>,
    Path((school, grade, course_id, student_id)): Path<(String, String, String, String)>,
) -> Response
where
    G: ClassGateway + 'static,
{
    let class = ClassKey::new(school, grade);
    let result = blocking(service, move |service| {
        service.approve_applicant(&class, &CourseId(course_id), &StudentId(student_id))
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) async fn reject_applicant_handler<G>(
    State(service): ServiceState<G>,
    Path((school, grade, course_id, student_id)): Path<(String, String, String, String)>,
) -> Response
where
    G: ClassGateway + 'static,
{
    let class = ClassKey::new(school, grade);
    let result = blocking(service, move |service| {
        service.reject_applicant(&class, &CourseId(course_id), &StudentId(student_id))
    })
    .await;
    respond(StatusCode::OK, result)
}

pub(crate) fn error_status(err: &CentreServiceError) -> StatusCode {
    match err {
        CentreServiceError::Validation(ValidationError::StudentNotFound(_))
        | CentreServiceError::Enrollment(EnrollmentError::CourseNotFound(_)) => {
            StatusCode::NOT_FOUND
        }
        CentreServiceError::Validation(ValidationError::DuplicateUsername(_)) => {
            StatusCode::CONFLICT
        }
        CentreServiceError::Validation(_)
        | CentreServiceError::Enrollment(EnrollmentError::Validation(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        CentreServiceError::Enrollment(_) => StatusCode::CONFLICT,
        CentreServiceError::CredentialsIncorrect => StatusCode::UNAUTHORIZED,
        CentreServiceError::Gateway(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: CentreServiceError) -> Response {
    let status = error_status(&err);
    let payload = json!({ "error": err.to_string() });
    (status, Json(payload)).into_response()
}
