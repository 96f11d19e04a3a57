use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub id: String,
    pub value: f64,
    pub coefficient: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub coefficient: f64,
    #[serde(default)]
    pub grades: Vec<Grade>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubPeriod {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subjects: Vec<Subject>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Year {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sub_periods: Vec<SubPeriod>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub years: Vec<Year>,
}

/// The single persisted root: every student plus the current selection.
///
/// Field names match the JSON blob the browser front-end has always written,
/// so stored data round-trips without a migration step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppData {
    pub students: Vec<Student>,
    #[serde(default)]
    pub selected_student_id: Option<String>,
    #[serde(default)]
    pub selected_year_id: Option<String>,
    #[serde(default)]
    pub selected_sub_period_id: Option<String>,
}

impl AppData {
    pub fn current_student(&self) -> Option<&Student> {
        let id = self.selected_student_id.as_deref()?;
        self.students.iter().find(|s| s.id == id)
    }

    pub fn current_year(&self) -> Option<&Year> {
        let id = self.selected_year_id.as_deref()?;
        self.current_student()?.years.iter().find(|y| y.id == id)
    }

    pub fn current_sub_period(&self) -> Option<&SubPeriod> {
        let id = self.selected_sub_period_id.as_deref()?;
        self.current_year()?.sub_periods.iter().find(|sp| sp.id == id)
    }

    /// Subjects of the selected sub-period, empty when nothing is selected.
    pub fn current_subjects(&self) -> &[Subject] {
        self.current_sub_period()
            .map(|sp| sp.subjects.as_slice())
            .unwrap_or(&[])
    }

    pub fn all_subjects(&self) -> impl Iterator<Item = &Subject> {
        self.students
            .iter()
            .flat_map(|s| s.years.iter())
            .flat_map(|y| y.sub_periods.iter())
            .flat_map(|sp| sp.subjects.iter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Student,
    Year,
    SubPeriod,
    Subject,
    Grade,
}

impl EntityKind {
    pub fn id_prefix(self) -> &'static str {
        match self {
            EntityKind::Student => "s",
            EntityKind::Year => "y",
            EntityKind::SubPeriod => "sp",
            EntityKind::Subject => "sb",
            EntityKind::Grade => "g",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Student => "student",
            EntityKind::Year => "year",
            EntityKind::SubPeriod => "sub-period",
            EntityKind::Subject => "subject",
            EntityKind::Grade => "grade",
        }
    }
}

pub fn new_id(kind: EntityKind) -> String {
    format!("{}{}", kind.id_prefix(), Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_browser_blob_with_camel_case_fields() {
        let raw = r#"{
            "students": [{
                "id": "s1", "name": "Lea",
                "years": [{
                    "id": "y1", "name": "2025/2026",
                    "subPeriods": [{
                        "id": "sp1", "name": "T1",
                        "subjects": [{
                            "id": "sb1", "name": "Maths", "coefficient": 4,
                            "grades": [{ "id": "g1", "value": 14.5, "coefficient": 2 }]
                        }]
                    }]
                }]
            }],
            "selectedStudentId": "s1",
            "selectedYearId": "y1",
            "selectedSubPeriodId": "sp1"
        }"#;
        let data: AppData = serde_json::from_str(raw).expect("parse blob");
        assert_eq!(data.current_student().map(|s| s.name.as_str()), Some("Lea"));
        assert_eq!(data.current_subjects().len(), 1);
        assert_eq!(data.current_subjects()[0].grades[0].value, 14.5);

        let back = serde_json::to_value(&data).expect("serialize");
        assert!(back["students"][0]["years"][0].get("subPeriods").is_some());
        assert_eq!(back["selectedSubPeriodId"], "sp1");
    }

    #[test]
    fn stale_selection_resolves_to_nothing() {
        let data = AppData {
            students: vec![],
            selected_student_id: Some("gone".into()),
            selected_year_id: Some("gone".into()),
            selected_sub_period_id: Some("gone".into()),
        };
        assert!(data.current_year().is_none());
        assert!(data.current_subjects().is_empty());
    }

    #[test]
    fn ids_carry_kind_prefix_and_are_fresh() {
        let a = new_id(EntityKind::SubPeriod);
        let b = new_id(EntityKind::SubPeriod);
        assert!(a.starts_with("sp"));
        assert_ne!(a, b);
    }
}
