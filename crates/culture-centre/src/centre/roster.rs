use std::io::Read;

use serde::{Deserialize, Serialize};

use super::domain::{Student, StudentId};
use super::enrollment::required;

/// Input rejected before it reaches the class snapshot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("username '{0}' is already taken")]
    DuplicateUsername(String),
    #[error("student {0} not found")]
    StudentNotFound(String),
    #[error("row {line} must contain a name, username, and password")]
    MalformedRow { line: usize },
    #[error("no students found in the import file")]
    EmptyImport,
    #[error("import file could not be read: {0}")]
    Unreadable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudent {
    pub name: String,
    pub username: String,
    pub password: String,
}

/// Teacher edit of an existing account. A blank password keeps the current one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentEdit {
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
}

pub fn add_student(
    roster: &mut Vec<Student>,
    new_student: NewStudent,
) -> Result<Student, ValidationError> {
    let student = build_student(new_student)?;
    ensure_username_free(roster, &student.username, None)?;
    roster.push(student.clone());
    Ok(student)
}

/// Append a batch of students. Either every student is added or none is.
pub fn add_students(
    roster: &mut Vec<Student>,
    batch: Vec<NewStudent>,
) -> Result<Vec<Student>, ValidationError> {
    if batch.is_empty() {
        return Err(ValidationError::EmptyImport);
    }

    let mut staged = roster.clone();
    let mut added = Vec::with_capacity(batch.len());
    for new_student in batch {
        added.push(add_student(&mut staged, new_student)?);
    }

    *roster = staged;
    Ok(added)
}

/// Parse a spreadsheet export of `name, username, password` rows. The first row is a header.
pub fn parse_students_csv<R: Read>(reader: R) -> Result<Vec<NewStudent>, ValidationError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut students = Vec::new();
    for (index, record) in csv_reader.records().enumerate() {
        let record = record.map_err(|err| ValidationError::Unreadable(err.to_string()))?;
        // blank lines are skipped by the reader, so count from the record's own position
        let line = record
            .position()
            .map(|position| position.line() as usize)
            .unwrap_or(index + 2);

        let cells: Vec<&str> = record.iter().take(3).collect();
        if cells.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        match cells.as_slice() {
            [name, username, password]
                if !name.is_empty() && !username.is_empty() && !password.is_empty() =>
            {
                students.push(NewStudent {
                    name: name.to_string(),
                    username: username.to_string(),
                    password: password.to_string(),
                });
            }
            _ => return Err(ValidationError::MalformedRow { line }),
        }
    }

    Ok(students)
}

pub fn update_student(
    roster: &mut [Student],
    student_id: &StudentId,
    edit: StudentEdit,
) -> Result<Student, ValidationError> {
    let name = required("name", &edit.name)?;
    let username = required("username", &edit.username)?;
    ensure_username_free(roster, &username, Some(student_id))?;

    let student = roster
        .iter_mut()
        .find(|student| &student.id == student_id)
        .ok_or_else(|| ValidationError::StudentNotFound(student_id.0.clone()))?;

    student.name = name;
    student.username = username;
    if let Some(password) = edit.password.as_deref().map(str::trim) {
        if !password.is_empty() {
            student.password = password.to_string();
        }
    }
    Ok(student.clone())
}

/// Remove a student from the roster. Course membership lists are not rewritten.
pub fn delete_student(
    roster: &mut Vec<Student>,
    student_id: &StudentId,
) -> Result<Student, ValidationError> {
    let index = roster
        .iter()
        .position(|student| &student.id == student_id)
        .ok_or_else(|| ValidationError::StudentNotFound(student_id.0.clone()))?;
    Ok(roster.remove(index))
}

fn build_student(new_student: NewStudent) -> Result<Student, ValidationError> {
    Ok(Student {
        id: StudentId::generate(),
        name: required("name", &new_student.name)?,
        username: required("username", &new_student.username)?,
        password: required("password", &new_student.password)?,
    })
}

fn ensure_username_free(
    roster: &[Student],
    username: &str,
    except: Option<&StudentId>,
) -> Result<(), ValidationError> {
    let taken = roster
        .iter()
        .any(|student| student.username == username && Some(&student.id) != except);
    if taken {
        return Err(ValidationError::DuplicateUsername(username.to_string()));
    }
    Ok(())
}
