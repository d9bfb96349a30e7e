//! Integration scenarios for course requests, applications, and the class roster.
//!
//! Everything goes through the public service and router so storage, login indexing, and read
//! models are exercised together.

mod common {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use culture_centre::centre::{
        CentreService, ClassGateway, ClassKey, ClassSnapshot, CourseDraft, InMemoryClassGateway,
        Student, StudentId,
    };

    pub(super) const PASSCODE: &str = "staff-only";

    pub(super) fn class() -> ClassKey {
        ClassKey::new("Seoul Haneul", "4-1")
    }

    pub(super) fn on(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    pub(super) fn student_id(value: &str) -> StudentId {
        StudentId(value.to_string())
    }

    pub(super) fn pottery(date: NaiveDate) -> CourseDraft {
        CourseDraft {
            name: "Pottery".to_string(),
            instructor: "Mr. Kim".to_string(),
            date,
            location: "Studio 2".to_string(),
            supplies: "Apron".to_string(),
            image_url: None,
        }
    }

    fn roster() -> ClassSnapshot {
        let student = |id: &str, username: &str| Student {
            id: student_id(id),
            name: username.to_uppercase(),
            username: username.to_string(),
            password: "pw1234".to_string(),
        };
        ClassSnapshot {
            students: vec![student("s1", "minji"), student("s2", "jisoo")],
            courses: Vec::new(),
        }
    }

    pub(super) fn build_service() -> (
        Arc<CentreService<InMemoryClassGateway>>,
        Arc<InMemoryClassGateway>,
    ) {
        let gateway = Arc::new(InMemoryClassGateway::new());
        gateway.save(&class(), &roster()).expect("roster seeded");
        let service = CentreService::new(gateway.clone())
            .with_teacher_passcode(Some(PASSCODE.to_string()));
        (Arc::new(service), gateway)
    }
}

mod enrollment {
    use super::common::*;
    use culture_centre::centre::{
        CentreServiceError, ClassReplica, CourseStatus, EnrollmentError, StudentCourseState,
    };

    #[test]
    fn pottery_course_moves_from_request_to_full_class() {
        let (service, gateway) = build_service();
        let replica = ClassReplica::attach(gateway.as_ref(), &class()).expect("replica attaches");

        let course = service
            .request_course(&class(), &student_id("s1"), pottery(on(2024, 6, 1)))
            .expect("request stored");
        assert_eq!(service.teacher_dashboard(&class()).expect("dashboard").requests.len(), 1);

        service.approve_course(&class(), &course.id).expect("approved");
        service
            .apply_to_course(&class(), &course.id, &student_id("s2"))
            .expect("applied");

        let listing = service
            .visible_courses(&class(), &student_id("s2"), on(2024, 5, 30))
            .expect("course list");
        assert_eq!(listing[0].state, StudentCourseState::AwaitingApproval);

        service
            .approve_applicant(&class(), &course.id, &student_id("s2"))
            .expect("enrolled");

        let mirrored = replica.current().expect("replica received snapshot");
        let stored = mirrored.course(&course.id).expect("course mirrored");
        assert_eq!(stored.status, CourseStatus::Approved);
        assert_eq!(
            stored.enrolled_student_ids,
            vec![student_id("s1"), student_id("s2")]
        );

        let active = service.teacher_dashboard(&class()).expect("dashboard").active;
        assert_eq!(active[0].enrolled_count, 2);
        assert_eq!(active[0].waiting_count, 0);
    }

    #[test]
    fn cancelled_courses_disappear_for_students() {
        let (service, _) = build_service();
        let course = service
            .request_course(&class(), &student_id("s1"), pottery(on(2024, 6, 1)))
            .expect("request stored");
        service.approve_course(&class(), &course.id).expect("approved");
        service.cancel_course(&class(), &course.id).expect("cancelled");

        let listing = service
            .visible_courses(&class(), &student_id("s2"), on(2024, 5, 30))
            .expect("course list");
        assert!(listing.is_empty());

        match service.apply_to_course(&class(), &course.id, &student_id("s2")) {
            Err(CentreServiceError::Enrollment(EnrollmentError::InvalidStatus { .. })) => {}
            other => panic!("expected invalid status, got {other:?}"),
        }
    }
}

mod roster {
    use super::common::*;
    use culture_centre::centre::{CentreServiceError, StudentEdit};

    #[test]
    fn password_change_takes_effect_on_next_login() {
        let (service, _) = build_service();
        service
            .update_student(
                &class(),
                &student_id("s2"),
                StudentEdit {
                    name: "JISOO".to_string(),
                    username: "jisoo".to_string(),
                    password: Some("newpass".to_string()),
                },
            )
            .expect("password rotated");

        assert!(matches!(
            service.login_student("jisoo", "pw1234"),
            Err(CentreServiceError::CredentialsIncorrect)
        ));
        let session = service.login_student("jisoo", "newpass").expect("logs in");
        assert_eq!(session.class, class());
    }

    #[test]
    fn csv_import_students_can_log_in() {
        let (service, _) = build_service();
        let csv = "name,username,password\nHong Gildong,student5,pass123\n";
        service
            .import_students(&class(), csv.as_bytes())
            .expect("imported");

        let session = service.login_student("student5", "pass123").expect("logs in");
        assert_eq!(session.student.name, "Hong Gildong");
    }
}

mod routing {
    use super::common::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use culture_centre::centre::centre_router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    #[tokio::test]
    async fn teacher_dashboard_lists_pending_requests() {
        let (service, _) = build_service();
        service
            .request_course(&class(), &student_id("s1"), pottery(on(2024, 6, 1)))
            .expect("request stored");
        let router = centre_router(service);

        let response = router
            .clone()
            .oneshot(
                Request::post("/api/v1/login/teacher")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        serde_json::to_vec(&json!({
                            "school": "Seoul Haneul",
                            "grade": "4-1",
                            "passcode": PASSCODE,
                        }))
                        .unwrap(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(
                Request::get("/api/v1/classes/Seoul%20Haneul/4-1/dashboard")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        let payload: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload["requests"][0]["name"], "Pottery");
        assert_eq!(payload["requests"][0]["status"], "requested");
        assert!(payload["active"].as_array().unwrap().is_empty());
    }
}
