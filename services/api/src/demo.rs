use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use culture_centre::centre::{
    CentreService, ClassKey, ClassReplica, CourseDraft, InMemoryClassGateway,
    JsonFileClassGateway, NewStudent, StudentCourseState,
};
use culture_centre::error::AppError;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Override the reporting date (defaults to today).
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Seed for the course recommendation.
    #[arg(long)]
    pub(crate) seed: Option<u64>,
}

#[derive(Args, Debug)]
pub(crate) struct RosterImportArgs {
    /// School name of the class
    #[arg(long)]
    pub(crate) school: String,
    /// Grade and class label, e.g. 5-2
    #[arg(long)]
    pub(crate) grade: String,
    /// CSV file with a header row and name,username,password columns
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// JSON store to update
    #[arg(long)]
    pub(crate) data_path: PathBuf,
}

pub(crate) fn run_roster_import(args: RosterImportArgs) -> Result<(), AppError> {
    let RosterImportArgs {
        school,
        grade,
        csv,
        data_path,
    } = args;

    let class = ClassKey::new(school.trim(), grade.trim());
    let gateway = Arc::new(JsonFileClassGateway::open(data_path)?);
    let service = CentreService::new(gateway.clone());

    let added = service.import_students(&class, File::open(&csv)?)?;
    println!(
        "Imported {} students into {} ({})",
        added.len(),
        class,
        gateway.path().display()
    );
    for student in &added {
        println!("  - {} ({})", student.name, student.username);
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { today, seed } = args;
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let gateway = Arc::new(InMemoryClassGateway::new());
    let service = CentreService::new(gateway.clone());
    let class = ClassKey::new("Hanbit Elementary", "5-2");
    let replica = ClassReplica::attach(gateway.as_ref(), &class)?;

    println!("Culture centre demo for {class} on {today}");
    let mut students = Vec::new();
    for (name, username) in [("Minji", "minji"), ("Jisoo", "jisoo"), ("Doyun", "doyun")] {
        let student = service.add_student(
            &class,
            NewStudent {
                name: name.to_string(),
                username: username.to_string(),
                password: format!("{username}-1234"),
            },
        )?;
        students.push(student);
    }
    println!("- Roster: {} students", students.len());
    let (creator, applicant) = (&students[0], &students[1]);

    let draft = CourseDraft {
        name: "Pottery".to_string(),
        instructor: "Mr. Kim".to_string(),
        date: today + Duration::days(2),
        location: "Studio 2".to_string(),
        supplies: "Apron, towel".to_string(),
        image_url: None,
    };
    let course = service.request_course(&class, &creator.id, draft)?;
    println!(
        "- {} requested {} on {} -> {}",
        creator.name, course.name, course.date, course.status
    );

    let course = service.approve_course(&class, &course.id)?;
    println!(
        "- Teacher approved {} -> {} enrolled",
        course.name,
        course.enrolled_student_ids.len()
    );

    service.apply_to_course(&class, &course.id, &applicant.id)?;
    let card = service
        .visible_courses(&class, &applicant.id, today)?
        .into_iter()
        .find(|view| view.course.id == course.id)
        .map(|view| view.state);
    println!(
        "- {} applied, card shows {}",
        applicant.name,
        describe_state(card)
    );

    service.approve_applicant(&class, &course.id, &applicant.id)?;
    let course = service.reject_applicant(&class, &course.id, &creator.id)?;
    println!(
        "- Teacher enrolled {} and cleared {}'s application: {} enrolled, {} applicants",
        applicant.name,
        creator.name,
        course.enrolled_student_ids.len(),
        course.applicants.len()
    );

    let dashboard = service.student_dashboard(&class, &applicant.id, today, &mut rng)?;
    println!("\nDashboard for {}", applicant.name);
    println!("  Enrolled: {}", dashboard.enrolled.len());
    for upcoming in &dashboard.upcoming {
        println!("  Upcoming: {} on {}", upcoming.name, upcoming.date);
    }
    match &dashboard.recommended {
        Some(course) => println!("  Recommended: {}", course.name),
        None => println!("  Recommended: nothing new to suggest"),
    }

    let teacher = service.teacher_dashboard(&class)?;
    println!("\nTeacher dashboard");
    println!(
        "  {} requests | {} active | {} cancelled",
        teacher.requests.len(),
        teacher.active.len(),
        teacher.cancelled.len()
    );
    for summary in &teacher.active {
        println!(
            "  - {}: {} enrolled, {} waiting",
            summary.course.name, summary.enrolled_count, summary.waiting_count
        );
    }

    if let Some(snapshot) = replica.current() {
        println!(
            "\nReplica holds {} students and {} courses",
            snapshot.students.len(),
            snapshot.courses.len()
        );
    }
    Ok(())
}

fn describe_state(state: Option<StudentCourseState>) -> &'static str {
    match state {
        Some(StudentCourseState::InProgress) => "in progress",
        Some(StudentCourseState::Enrolled) => "enrolled",
        Some(StudentCourseState::AwaitingApproval) => "awaiting approval",
        Some(StudentCourseState::Ended) => "ended",
        Some(StudentCourseState::Open) => "open for applications",
        None => "not listed",
    }
}
