use rand::rngs::StdRng;
use rand::SeedableRng;

use super::common::*;
use crate::centre::domain::{Course, CourseStatus};
use crate::centre::views::{
    is_completed, is_in_progress, is_upcoming_for, is_visible_to_students, recommend,
    student_course_list, student_dashboard, teacher_dashboard, visible_courses,
    StudentCourseState,
};

fn today() -> chrono::NaiveDate {
    date(2024, 6, 10)
}

fn ids(list: &[Course]) -> Vec<String> {
    list.iter().map(|course| course.id.0.clone()).collect()
}

#[test]
fn visibility_cutoff_is_strictly_under_five_days() {
    let four_days = course("c4", CourseStatus::Approved, date(2024, 6, 6));
    let five_days = course("c5", CourseStatus::Approved, date(2024, 6, 5));
    let six_days = course("c6", CourseStatus::Approved, date(2024, 6, 4));
    let next_week = course("c7", CourseStatus::Approved, date(2024, 6, 17));

    assert!(is_visible_to_students(&four_days, today()));
    assert!(!is_visible_to_students(&five_days, today()));
    assert!(!is_visible_to_students(&six_days, today()));
    assert!(is_visible_to_students(&next_week, today()));
}

#[test]
fn cancelled_and_requested_courses_are_never_visible() {
    for status in [CourseStatus::Cancelled, CourseStatus::Requested] {
        for offset in [-3, 0, 3] {
            let on = today() + chrono::Duration::days(offset);
            let hidden = course("c1", status, on);
            assert!(!is_visible_to_students(&hidden, today()));
            assert!(!is_in_progress(&hidden, today()));
            assert!(!is_completed(&hidden, today()));
        }
    }
}

#[test]
fn completion_and_progress_follow_the_calendar_day() {
    let yesterday = course("c1", CourseStatus::Approved, date(2024, 6, 9));
    let same_day = course("c2", CourseStatus::Approved, today());
    let tomorrow = course("c3", CourseStatus::Approved, date(2024, 6, 11));

    assert!(is_completed(&yesterday, today()));
    assert!(!is_in_progress(&yesterday, today()));
    assert!(is_in_progress(&same_day, today()));
    assert!(!is_completed(&same_day, today()));
    assert!(!is_completed(&tomorrow, today()));
}

#[test]
fn upcoming_window_covers_today_through_a_week() {
    let mut within = course("c1", CourseStatus::Approved, date(2024, 6, 17));
    within.enrolled_student_ids = vec![sid("s1")];
    let mut beyond = course("c2", CourseStatus::Approved, date(2024, 6, 18));
    beyond.enrolled_student_ids = vec![sid("s1")];
    let mut past = course("c3", CourseStatus::Approved, date(2024, 6, 9));
    past.enrolled_student_ids = vec![sid("s1")];
    let mut same_day = course("c4", CourseStatus::Approved, today());
    same_day.enrolled_student_ids = vec![sid("s1")];

    assert!(is_upcoming_for(&within, &sid("s1"), today()));
    assert!(is_upcoming_for(&same_day, &sid("s1"), today()));
    assert!(!is_upcoming_for(&beyond, &sid("s1"), today()));
    assert!(!is_upcoming_for(&past, &sid("s1"), today()));
    assert!(!is_upcoming_for(&within, &sid("s2"), today()));
}

#[test]
fn visible_courses_are_sorted_by_date() {
    let courses = vec![
        course("late", CourseStatus::Approved, date(2024, 6, 20)),
        course("early", CourseStatus::Approved, date(2024, 6, 8)),
        course("gone", CourseStatus::Cancelled, date(2024, 6, 12)),
    ];

    let ids: Vec<&str> = visible_courses(&courses, today())
        .iter()
        .map(|course| course.id.0.as_str())
        .collect();

    assert_eq!(ids, vec!["early", "late"]);
}

#[test]
fn course_card_state_prefers_membership_over_dates() {
    let mut running = course("c1", CourseStatus::Approved, today());
    running.enrolled_student_ids = vec![sid("s1")];
    let mut waiting = course("c2", CourseStatus::Approved, date(2024, 6, 8));
    waiting.applicants = vec![sid("s1")];
    let ended = course("c3", CourseStatus::Approved, date(2024, 6, 8));
    let open = course("c4", CourseStatus::Approved, date(2024, 6, 12));

    assert_eq!(
        StudentCourseState::of(&running, &sid("s1"), today()),
        StudentCourseState::InProgress
    );
    assert_eq!(
        StudentCourseState::of(&waiting, &sid("s1"), today()),
        StudentCourseState::AwaitingApproval
    );
    assert_eq!(
        StudentCourseState::of(&ended, &sid("s1"), today()),
        StudentCourseState::Ended
    );
    assert!(StudentCourseState::of(&open, &sid("s1"), today()).can_apply());

    let list = student_course_list(&[ended, open], &sid("s1"), today());
    assert!(list[0].completed);
    assert!(!list[0].can_apply);
    assert_eq!(list[1].state, StudentCourseState::Open);
    assert!(list[1].can_apply);
}

#[test]
fn recommendation_only_picks_unjoined_approved_courses() {
    let mut joined = course("joined", CourseStatus::Approved, date(2024, 6, 12));
    joined.enrolled_student_ids = vec![sid("s1")];
    let courses = vec![
        joined,
        course("open-a", CourseStatus::Approved, date(2024, 6, 12)),
        course("open-b", CourseStatus::Approved, date(2024, 6, 13)),
        course("pending", CourseStatus::Requested, date(2024, 6, 12)),
        course("cancelled", CourseStatus::Cancelled, date(2024, 6, 12)),
    ];

    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..32 {
        let pick = recommend(&courses, &sid("s1"), &mut rng).expect("a candidate exists");
        assert!(matches!(pick.id.0.as_str(), "open-a" | "open-b"));
    }
}

#[test]
fn recommendation_is_empty_without_candidates() {
    let mut joined = course("joined", CourseStatus::Approved, date(2024, 6, 12));
    joined.enrolled_student_ids = vec![sid("s1")];
    let mut rng = StdRng::seed_from_u64(1);
    assert!(recommend(&[joined], &sid("s1"), &mut rng).is_none());
}

#[test]
fn student_dashboard_groups_courses() {
    let mut led = course("led", CourseStatus::Approved, date(2024, 6, 12));
    led.creator_id = Some(sid("s1"));
    led.enrolled_student_ids = vec![sid("s1")];
    let mut todays = course("today", CourseStatus::Approved, today());
    todays.enrolled_student_ids = vec![sid("s1")];
    let mut waiting = course("waiting", CourseStatus::Approved, date(2024, 6, 14));
    waiting.applicants = vec![sid("s1")];
    let mut far = course("far", CourseStatus::Approved, date(2024, 7, 1));
    far.enrolled_student_ids = vec![sid("s1")];
    let mut cancelled = course("cancelled", CourseStatus::Cancelled, date(2024, 6, 12));
    cancelled.enrolled_student_ids = vec![sid("s1")];

    let courses = vec![led, todays, waiting, far, cancelled];
    let mut rng = StdRng::seed_from_u64(3);
    let dashboard = student_dashboard(&courses, &sid("s1"), today(), &mut rng);

    assert_eq!(ids(&dashboard.enrolled), vec!["led", "today", "far"]);
    assert_eq!(ids(&dashboard.pending_applications), vec!["waiting"]);
    assert_eq!(dashboard.today.map(|course| course.id.0), Some("today".to_string()));
    assert_eq!(ids(&dashboard.upcoming), vec!["led"]);
    assert_eq!(ids(&dashboard.leading), vec!["led"]);
    assert_eq!(
        dashboard.recommended.map(|course| course.id.0),
        Some("waiting".to_string())
    );
}

#[test]
fn upcoming_is_capped_at_three() {
    let courses: Vec<_> = (11..=15)
        .map(|day| {
            let mut enrolled = course(&format!("d{day}"), CourseStatus::Approved, date(2024, 6, day));
            enrolled.enrolled_student_ids = vec![sid("s1")];
            enrolled
        })
        .collect();
    let mut rng = StdRng::seed_from_u64(5);

    let dashboard = student_dashboard(&courses, &sid("s1"), today(), &mut rng);

    let ids: Vec<&str> = dashboard.upcoming.iter().map(|c| c.id.0.as_str()).collect();
    assert_eq!(ids, vec!["d11", "d12", "d13"]);
}

#[test]
fn teacher_dashboard_counts_waiting_applicants() {
    let mut active = course("active", CourseStatus::Approved, date(2024, 6, 12));
    active.applicants = vec![sid("s1"), sid("s2"), sid("s3")];
    active.enrolled_student_ids = vec![sid("s1"), sid("s4")];
    let courses = vec![
        active,
        course("request", CourseStatus::Requested, date(2024, 6, 20)),
        course("cancelled", CourseStatus::Cancelled, date(2024, 6, 1)),
    ];

    let dashboard = teacher_dashboard(&courses);

    assert_eq!(dashboard.requests.len(), 1);
    assert_eq!(dashboard.cancelled.len(), 1);
    assert_eq!(dashboard.active.len(), 1);
    assert_eq!(dashboard.active[0].enrolled_count, 2);
    assert_eq!(dashboard.active[0].waiting_count, 2);
}
