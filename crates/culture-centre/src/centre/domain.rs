use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Image shown for courses requested without one.
pub const PLACEHOLDER_IMAGE_URL: &str = "https://picsum.photos/400/300";

/// Identifier wrapper for students.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub String);

impl StudentId {
    pub fn generate() -> Self {
        Self(format!("s{}", Uuid::new_v4().simple()))
    }
}

/// Identifier wrapper for courses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(pub String);

impl CourseId {
    pub fn generate() -> Self {
        Self(format!("c{}", Uuid::new_v4().simple()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Teacher,
    Student,
}

/// Identity shared by both roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub role: Role,
}

/// A student account belonging to one class roster.
///
/// `username` is the login key and is unique across every class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub username: String,
    pub password: String,
}

impl Student {
    pub fn as_user(&self) -> User {
        User {
            id: self.id.0.clone(),
            name: self.name.clone(),
            role: Role::Student,
        }
    }

    /// Public projection without the password.
    pub fn profile(&self) -> StudentProfile {
        StudentProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            username: self.username.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: StudentId,
    pub name: String,
    pub username: String,
}

/// Teacher identity for one class session. Teachers are not part of the stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    pub class: ClassKey,
}

impl Teacher {
    pub fn as_user(&self) -> User {
        User {
            id: format!("teacher-{}", self.class.storage_key()),
            name: "Teacher".to_string(),
            role: Role::Teacher,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseStatus {
    Requested,
    Approved,
    /// Reserved. No transition produces it; completion is derived from the date.
    Completed,
    Cancelled,
}

impl CourseStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CourseStatus::Requested => "requested",
            CourseStatus::Approved => "approved",
            CourseStatus::Completed => "completed",
            CourseStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub instructor: String,
    #[serde(
        serialize_with = "serialize_calendar_date",
        deserialize_with = "deserialize_calendar_date"
    )]
    pub date: NaiveDate,
    pub location: String,
    #[serde(default)]
    pub supplies: String,
    #[serde(alias = "imageUrl")]
    pub image_url: String,
    pub status: CourseStatus,
    #[serde(default, alias = "creatorId", skip_serializing_if = "Option::is_none")]
    pub creator_id: Option<StudentId>,
    #[serde(default, alias = "enrolledStudentIds")]
    pub enrolled_student_ids: Vec<StudentId>,
    #[serde(default)]
    pub applicants: Vec<StudentId>,
}

impl Course {
    pub fn is_enrolled(&self, student_id: &StudentId) -> bool {
        self.enrolled_student_ids.contains(student_id)
    }

    pub fn has_applied(&self, student_id: &StudentId) -> bool {
        self.applicants.contains(student_id)
    }

    /// Applicants still waiting for a decision.
    pub fn waiting_applicants(&self) -> impl Iterator<Item = &StudentId> + '_ {
        self.applicants
            .iter()
            .filter(move |id| !self.enrolled_student_ids.contains(id))
    }
}

/// Fields a student supplies when requesting a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseDraft {
    pub name: String,
    pub instructor: String,
    pub date: NaiveDate,
    pub location: String,
    #[serde(default)]
    pub supplies: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// A (school, grade) pair identifying one isolated roster and course collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassKey {
    pub school: String,
    pub grade: String,
}

impl ClassKey {
    pub fn new(school: impl Into<String>, grade: impl Into<String>) -> Self {
        Self {
            school: school.into(),
            grade: grade.into(),
        }
    }

    /// Key under which the class document is stored.
    pub fn storage_key(&self) -> String {
        format!(
            "{}_{}",
            sanitize_key_part(&self.school),
            sanitize_key_part(&self.grade)
        )
    }
}

impl std::fmt::Display for ClassKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}", self.school, self.grade)
    }
}

fn sanitize_key_part(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '.' | '#' | '$' | '[' | ']' | '/' => '_',
            other => other,
        })
        .collect()
}

/// Whole-document unit of persistence for one class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSnapshot {
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub courses: Vec<Course>,
}

impl ClassSnapshot {
    pub fn student(&self, id: &StudentId) -> Option<&Student> {
        self.students.iter().find(|student| &student.id == id)
    }

    pub fn course(&self, id: &CourseId) -> Option<&Course> {
        self.courses.iter().find(|course| &course.id == id)
    }
}

/// Entry of the global student login index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRecord {
    pub school: String,
    pub grade: String,
    pub password: String,
}

impl LoginRecord {
    pub fn class_key(&self) -> ClassKey {
        ClassKey::new(self.school.clone(), self.grade.clone())
    }
}

fn serialize_calendar_date<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&date.format("%Y-%m-%d"))
}

fn deserialize_calendar_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_calendar_date(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!(
            "'{raw}' is neither YYYY-MM-DD nor an RFC 3339 timestamp"
        ))
    })
}

/// Parse a stored course date. Older documents carry full timestamps; only the day is kept.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }

    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.date_naive())
}
