//! Edits over the grade tree.
//!
//! Every operation consumes an `AppData` and hands back a new one. Branches the
//! edit does not touch are moved across untouched; the edited path is rebuilt
//! from the root down.

use thiserror::Error;

use crate::model::{new_id, AppData, EntityKind, Grade, SubPeriod, Subject, Student, Year};

pub const DEFAULT_SUBJECT_NAME: &str = "Nouvelle Matière";
pub const DEFAULT_GRADE_VALUE: f64 = 10.0;
pub const DEFAULT_COEFFICIENT: f64 = 1.0;
/// Substituted when a grade coefficient cannot be parsed.
pub const FALLBACK_GRADE_COEFFICIENT: f64 = 0.1;

#[derive(Debug, Error, PartialEq)]
pub enum TreeError {
    #[error("{} not found: {id}", .kind.label())]
    NotFound { kind: EntityKind, id: String },

    #[error("no {} selected", .0.label())]
    NoSelection(EntityKind),

    #[error("{0}")]
    BadParams(String),
}

impl TreeError {
    pub fn code(&self) -> &'static str {
        match self {
            TreeError::NotFound { .. } => "not_found",
            TreeError::NoSelection(_) => "no_selection",
            TreeError::BadParams(_) => "bad_params",
        }
    }

    fn not_found(kind: EntityKind, id: &str) -> Self {
        TreeError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

pub type TreeResult = Result<(AppData, String), TreeError>;

#[derive(Debug, Clone, Default)]
pub struct SubjectPatch {
    pub name: Option<String>,
    pub coefficient: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct GradePatch {
    pub value: Option<f64>,
    pub coefficient: Option<f64>,
}

/// Blank names are refused; accepted names are stored as typed.
fn clean_name(name: &str) -> Result<String, TreeError> {
    if name.trim().is_empty() {
        return Err(TreeError::BadParams("name must not be empty".into()));
    }
    Ok(name.to_string())
}

fn selected(id: &Option<String>, kind: EntityKind) -> Result<String, TreeError> {
    id.clone().ok_or(TreeError::NoSelection(kind))
}

/// Replace the single entry whose id matches, failing if none does.
fn replace_by_id<T, F>(
    items: Vec<T>,
    id: &str,
    kind: EntityKind,
    id_of: fn(&T) -> &str,
    f: F,
) -> Result<Vec<T>, TreeError>
where
    F: FnOnce(T) -> Result<T, TreeError>,
{
    let mut f = Some(f);
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if id_of(&item) == id {
            if let Some(f) = f.take() {
                out.push(f(item)?);
                continue;
            }
        }
        out.push(item);
    }
    if f.is_some() {
        return Err(TreeError::not_found(kind, id));
    }
    Ok(out)
}

fn remove_by_id<T>(
    items: Vec<T>,
    id: &str,
    kind: EntityKind,
    id_of: fn(&T) -> &str,
) -> Result<Vec<T>, TreeError> {
    let before = items.len();
    let out: Vec<T> = items.into_iter().filter(|it| id_of(it) != id).collect();
    if out.len() == before {
        return Err(TreeError::not_found(kind, id));
    }
    Ok(out)
}

fn student_id(s: &Student) -> &str {
    &s.id
}
fn year_id(y: &Year) -> &str {
    &y.id
}
fn sub_period_id(sp: &SubPeriod) -> &str {
    &sp.id
}
fn subject_id(s: &Subject) -> &str {
    &s.id
}
fn grade_id(g: &Grade) -> &str {
    &g.id
}

fn with_selected_student<F>(data: AppData, f: F) -> Result<AppData, TreeError>
where
    F: FnOnce(Student) -> Result<Student, TreeError>,
{
    let sid = selected(&data.selected_student_id, EntityKind::Student)?;
    let students = replace_by_id(data.students, &sid, EntityKind::Student, student_id, f)?;
    Ok(AppData { students, ..data })
}

fn with_selected_year<F>(data: AppData, f: F) -> Result<AppData, TreeError>
where
    F: FnOnce(Year) -> Result<Year, TreeError>,
{
    let yid = selected(&data.selected_year_id, EntityKind::Year)?;
    with_selected_student(data, |s| {
        let years = replace_by_id(s.years, &yid, EntityKind::Year, year_id, f)?;
        Ok(Student { years, ..s })
    })
}

fn with_selected_sub_period<F>(data: AppData, f: F) -> Result<AppData, TreeError>
where
    F: FnOnce(SubPeriod) -> Result<SubPeriod, TreeError>,
{
    let spid = selected(&data.selected_sub_period_id, EntityKind::SubPeriod)?;
    with_selected_year(data, |y| {
        let sub_periods =
            replace_by_id(y.sub_periods, &spid, EntityKind::SubPeriod, sub_period_id, f)?;
        Ok(Year { sub_periods, ..y })
    })
}

fn with_subject<F>(data: AppData, subject: &str, f: F) -> Result<AppData, TreeError>
where
    F: FnOnce(Subject) -> Result<Subject, TreeError>,
{
    with_selected_sub_period(data, |sp| {
        let subjects = replace_by_id(sp.subjects, subject, EntityKind::Subject, subject_id, f)?;
        Ok(SubPeriod { subjects, ..sp })
    })
}

pub fn add_student(data: AppData, name: &str) -> TreeResult {
    let name = clean_name(name)?;
    let id = new_id(EntityKind::Student);
    let mut students = data.students;
    students.push(Student {
        id: id.clone(),
        name,
        years: Vec::new(),
    });
    Ok((
        AppData {
            students,
            selected_student_id: Some(id.clone()),
            selected_year_id: None,
            selected_sub_period_id: None,
        },
        id,
    ))
}

pub fn add_year(data: AppData, name: &str) -> TreeResult {
    let name = clean_name(name)?;
    let id = new_id(EntityKind::Year);
    let year = Year {
        id: id.clone(),
        name,
        sub_periods: Vec::new(),
    };
    let data = with_selected_student(data, |mut s| {
        s.years.push(year);
        Ok(s)
    })?;
    Ok((
        AppData {
            selected_year_id: Some(id.clone()),
            selected_sub_period_id: None,
            ..data
        },
        id,
    ))
}

pub fn add_sub_period(data: AppData, name: &str) -> TreeResult {
    let name = clean_name(name)?;
    let id = new_id(EntityKind::SubPeriod);
    let sp = SubPeriod {
        id: id.clone(),
        name,
        subjects: Vec::new(),
    };
    let data = with_selected_year(data, |mut y| {
        y.sub_periods.push(sp);
        Ok(y)
    })?;
    Ok((
        AppData {
            selected_sub_period_id: Some(id.clone()),
            ..data
        },
        id,
    ))
}

pub fn add_subject(data: AppData, patch: SubjectPatch) -> TreeResult {
    let id = new_id(EntityKind::Subject);
    let subject = Subject {
        id: id.clone(),
        name: patch
            .name
            .unwrap_or_else(|| DEFAULT_SUBJECT_NAME.to_string()),
        coefficient: patch.coefficient.unwrap_or(DEFAULT_COEFFICIENT),
        grades: Vec::new(),
    };
    let data = with_selected_sub_period(data, |mut sp| {
        sp.subjects.push(subject);
        Ok(sp)
    })?;
    Ok((data, id))
}

/// Subject names are free text; the front-end edits them keystroke by keystroke,
/// so an empty name is allowed here.
pub fn update_subject(data: AppData, subject: &str, patch: SubjectPatch) -> TreeResult {
    let data = with_subject(data, subject, |s| {
        Ok(Subject {
            name: patch.name.unwrap_or(s.name),
            coefficient: patch.coefficient.unwrap_or(s.coefficient),
            ..s
        })
    })?;
    Ok((data, subject.to_string()))
}

pub fn delete_subject(data: AppData, subject: &str) -> TreeResult {
    let data = with_selected_sub_period(data, |sp| {
        let subjects = remove_by_id(sp.subjects, subject, EntityKind::Subject, subject_id)?;
        Ok(SubPeriod { subjects, ..sp })
    })?;
    Ok((data, subject.to_string()))
}

pub fn add_grade(data: AppData, subject: &str, patch: GradePatch) -> TreeResult {
    let id = new_id(EntityKind::Grade);
    let grade = Grade {
        id: id.clone(),
        value: patch.value.unwrap_or(DEFAULT_GRADE_VALUE),
        coefficient: patch.coefficient.unwrap_or(DEFAULT_COEFFICIENT),
    };
    let data = with_subject(data, subject, |mut s| {
        s.grades.push(grade);
        Ok(s)
    })?;
    Ok((data, id))
}

pub fn update_grade(data: AppData, subject: &str, grade: &str, patch: GradePatch) -> TreeResult {
    let data = with_subject(data, subject, |s| {
        let grades = replace_by_id(s.grades, grade, EntityKind::Grade, grade_id, |g| {
            Ok(Grade {
                value: patch.value.unwrap_or(g.value),
                coefficient: patch.coefficient.unwrap_or(g.coefficient),
                ..g
            })
        })?;
        Ok(Subject { grades, ..s })
    })?;
    Ok((data, grade.to_string()))
}

pub fn delete_grade(data: AppData, subject: &str, grade: &str) -> TreeResult {
    let data = with_subject(data, subject, |s| {
        let grades = remove_by_id(s.grades, grade, EntityKind::Grade, grade_id)?;
        Ok(Subject { grades, ..s })
    })?;
    Ok((data, grade.to_string()))
}

pub fn delete_sub_period(data: AppData, sub_period: &str) -> TreeResult {
    let data = with_selected_year(data, |y| {
        let sub_periods =
            remove_by_id(y.sub_periods, sub_period, EntityKind::SubPeriod, sub_period_id)?;
        Ok(Year { sub_periods, ..y })
    })?;
    Ok((
        AppData {
            selected_sub_period_id: None,
            ..data
        },
        sub_period.to_string(),
    ))
}

pub fn delete_year(data: AppData, year: &str) -> TreeResult {
    let data = with_selected_student(data, |s| {
        let years = remove_by_id(s.years, year, EntityKind::Year, year_id)?;
        Ok(Student { years, ..s })
    })?;
    Ok((
        AppData {
            selected_year_id: None,
            selected_sub_period_id: None,
            ..data
        },
        year.to_string(),
    ))
}

pub fn delete_student(data: AppData, student: &str) -> TreeResult {
    let students = remove_by_id(data.students, student, EntityKind::Student, student_id)?;
    let first = students.first().map(|s| s.id.clone());
    Ok((
        AppData {
            students,
            selected_student_id: first,
            selected_year_id: None,
            selected_sub_period_id: None,
        },
        student.to_string(),
    ))
}

pub fn rename_student(data: AppData, student: &str, name: &str) -> TreeResult {
    let name = clean_name(name)?;
    let students = replace_by_id(
        data.students,
        student,
        EntityKind::Student,
        student_id,
        |s| Ok(Student { name, ..s }),
    )?;
    Ok((AppData { students, ..data }, student.to_string()))
}

pub fn rename_year(data: AppData, year: &str, name: &str) -> TreeResult {
    let name = clean_name(name)?;
    let data = with_selected_student(data, |s| {
        let years = replace_by_id(s.years, year, EntityKind::Year, year_id, |y| {
            Ok(Year { name, ..y })
        })?;
        Ok(Student { years, ..s })
    })?;
    Ok((data, year.to_string()))
}

pub fn rename_sub_period(data: AppData, sub_period: &str, name: &str) -> TreeResult {
    let name = clean_name(name)?;
    let data = with_selected_year(data, |y| {
        let sub_periods = replace_by_id(
            y.sub_periods,
            sub_period,
            EntityKind::SubPeriod,
            sub_period_id,
            |sp| Ok(SubPeriod { name, ..sp }),
        )?;
        Ok(Year { sub_periods, ..y })
    })?;
    Ok((data, sub_period.to_string()))
}

pub fn select_student(data: AppData, student: &str) -> TreeResult {
    if !data.students.iter().any(|s| s.id == student) {
        return Err(TreeError::not_found(EntityKind::Student, student));
    }
    Ok((
        AppData {
            selected_student_id: Some(student.to_string()),
            selected_year_id: None,
            selected_sub_period_id: None,
            ..data
        },
        student.to_string(),
    ))
}

/// Selecting a year also opens its first sub-period, if any.
pub fn select_year(data: AppData, year: &str) -> TreeResult {
    let student = data
        .current_student()
        .ok_or(TreeError::NoSelection(EntityKind::Student))?;
    let y = student
        .years
        .iter()
        .find(|y| y.id == year)
        .ok_or_else(|| TreeError::not_found(EntityKind::Year, year))?;
    let first = y.sub_periods.first().map(|sp| sp.id.clone());
    Ok((
        AppData {
            selected_year_id: Some(year.to_string()),
            selected_sub_period_id: first,
            ..data
        },
        year.to_string(),
    ))
}

pub fn select_sub_period(data: AppData, sub_period: &str) -> TreeResult {
    let y = data
        .current_year()
        .ok_or(TreeError::NoSelection(EntityKind::Year))?;
    if !y.sub_periods.iter().any(|sp| sp.id == sub_period) {
        return Err(TreeError::not_found(EntityKind::SubPeriod, sub_period));
    }
    Ok((
        AppData {
            selected_sub_period_id: Some(sub_period.to_string()),
            ..data
        },
        sub_period.to_string(),
    ))
}
