use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::centre::domain::{
    ClassKey, ClassSnapshot, Course, CourseDraft, CourseId, CourseStatus, LoginRecord, Student,
    StudentId, PLACEHOLDER_IMAGE_URL,
};
use crate::centre::gateway::{
    ClassGateway, GatewayError, ListenerRegistry, SnapshotListener, Subscription,
};
use crate::centre::store::InMemoryClassGateway;
use crate::centre::{centre_router, CentreService};

pub(super) const TEACHER_PASSCODE: &str = "art-room-key";

pub(super) fn class() -> ClassKey {
    ClassKey::new("Hanbit Elementary", "5-2")
}

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn sid(value: &str) -> StudentId {
    StudentId(value.to_string())
}

pub(super) fn cid(value: &str) -> CourseId {
    CourseId(value.to_string())
}

pub(super) fn student(id: &str, username: &str) -> Student {
    Student {
        id: sid(id),
        name: format!("Student {id}"),
        username: username.to_string(),
        password: format!("{username}-pw"),
    }
}

pub(super) fn draft(name: &str, on: NaiveDate) -> CourseDraft {
    CourseDraft {
        name: name.to_string(),
        instructor: "Ms. Park".to_string(),
        date: on,
        location: "Art room".to_string(),
        supplies: "Apron".to_string(),
        image_url: None,
    }
}

/// Course with no creator and no members.
pub(super) fn course(id: &str, status: CourseStatus, on: NaiveDate) -> Course {
    Course {
        id: cid(id),
        name: format!("Course {id}"),
        instructor: "Ms. Park".to_string(),
        date: on,
        location: "Gym".to_string(),
        supplies: String::new(),
        image_url: PLACEHOLDER_IMAGE_URL.to_string(),
        status,
        creator_id: None,
        enrolled_student_ids: Vec::new(),
        applicants: Vec::new(),
    }
}

pub(super) fn roster_snapshot() -> ClassSnapshot {
    ClassSnapshot {
        students: vec![
            student("s1", "alice"),
            student("s2", "bora"),
            student("s3", "chul"),
        ],
        courses: Vec::new(),
    }
}

pub(super) fn build_service() -> (
    CentreService<InMemoryClassGateway>,
    Arc<InMemoryClassGateway>,
) {
    let gateway = Arc::new(InMemoryClassGateway::new());
    gateway
        .save(&class(), &roster_snapshot())
        .expect("seed snapshot saves");
    let service = CentreService::new(gateway.clone())
        .with_teacher_passcode(Some(TEACHER_PASSCODE.to_string()));
    (service, gateway)
}

pub(super) fn router_with_service(service: CentreService<InMemoryClassGateway>) -> axum::Router {
    centre_router(Arc::new(service))
}

/// Reads succeed from a fixed snapshot, every save fails.
pub(super) struct ReadOnlyGateway {
    pub(super) snapshot: ClassSnapshot,
    pub(super) save_attempts: Mutex<usize>,
    listeners: ListenerRegistry,
}

impl ReadOnlyGateway {
    pub(super) fn new(snapshot: ClassSnapshot) -> Self {
        Self {
            snapshot,
            save_attempts: Mutex::new(0),
            listeners: ListenerRegistry::default(),
        }
    }
}

impl ClassGateway for ReadOnlyGateway {
    fn load(&self, _class: &ClassKey) -> Result<Option<ClassSnapshot>, GatewayError> {
        Ok(Some(self.snapshot.clone()))
    }

    fn save(&self, _class: &ClassKey, _snapshot: &ClassSnapshot) -> Result<(), GatewayError> {
        *self.save_attempts.lock().expect("counter mutex poisoned") += 1;
        Err(GatewayError::Unavailable("database offline".to_string()))
    }

    fn subscribe(&self, class: &ClassKey, listener: SnapshotListener) -> Subscription {
        self.listeners.register(class, listener)
    }

    fn lookup_login(&self, _username: &str) -> Result<Option<LoginRecord>, GatewayError> {
        Ok(None)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
