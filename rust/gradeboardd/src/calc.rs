use serde::Serialize;
use std::collections::HashMap;

use crate::model::{AppData, Grade, SubPeriod, Subject, Year};

/// Absolute band inside which a subject average counts as unchanged.
pub const TREND_EPSILON: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AverageBand {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectResult {
    pub subject_id: String,
    pub average: Option<f64>,
    pub trend: Option<Trend>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AveragesReport {
    pub subjects: Vec<SubjectResult>,
    pub sub_period: Option<f64>,
    pub year: Option<f64>,
}

/// Previously observed per-subject averages, keyed by subject id.
///
/// Owned by the caller and captured once per update cycle; the engine only
/// reads it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrendMemory {
    previous: HashMap<String, f64>,
}

impl TrendMemory {
    pub fn capture(data: &AppData) -> Self {
        let previous = data
            .all_subjects()
            .filter_map(|s| subject_average(&s.grades).map(|avg| (s.id.clone(), avg)))
            .collect();
        Self { previous }
    }

    pub fn get(&self, subject_id: &str) -> Option<f64> {
        self.previous.get(subject_id).copied()
    }

    pub fn len(&self) -> usize {
        self.previous.len()
    }
}

impl FromIterator<(String, f64)> for TrendMemory {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        Self {
            previous: iter.into_iter().collect(),
        }
    }
}

pub fn subject_average(grades: &[Grade]) -> Option<f64> {
    let mut weighted_sum = 0.0;
    let mut coef_total = 0.0;
    for g in grades {
        weighted_sum += g.value * g.coefficient;
        coef_total += g.coefficient;
    }
    if coef_total > 0.0 {
        Some(weighted_sum / coef_total)
    } else {
        None
    }
}

/// Coefficient-weighted mean of the subject averages.
///
/// Subjects without an average are skipped entirely: they add nothing to the
/// weighted sum and nothing to the coefficient total.
pub fn sub_period_average(subjects: &[Subject]) -> Option<f64> {
    weighted_mean(
        subjects
            .iter()
            .map(|s| (subject_average(&s.grades), s.coefficient)),
    )
}

fn weighted_mean<I>(entries: I) -> Option<f64>
where
    I: IntoIterator<Item = (Option<f64>, f64)>,
{
    let mut weighted_sum = 0.0;
    let mut coef_total = 0.0;
    for (avg, coef) in entries {
        let Some(avg) = avg else {
            continue;
        };
        weighted_sum += avg * coef;
        coef_total += coef;
    }
    if coef_total > 0.0 {
        Some(weighted_sum / coef_total)
    } else {
        None
    }
}

/// Every sub-period of the year weighs 1, whatever its internal coefficients.
pub fn year_average(sub_periods: &[SubPeriod]) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for sp in sub_periods {
        if let Some(avg) = sub_period_average(&sp.subjects) {
            sum += avg;
            count += 1;
        }
    }
    if count > 0 {
        Some(sum / count as f64)
    } else {
        None
    }
}

pub fn classify_trend(previous: Option<f64>, current: Option<f64>) -> Option<Trend> {
    let (prev, cur) = (previous?, current?);
    if cur > prev + TREND_EPSILON {
        Some(Trend::Up)
    } else if cur < prev - TREND_EPSILON {
        Some(Trend::Down)
    } else {
        Some(Trend::Stable)
    }
}

/// Averages for one sub-period's subjects plus the enclosing year.
///
/// The year path re-aggregates every sub-period from its own grades, so the
/// result does not depend on which sub-period is selected.
pub fn compute_averages(
    subjects: &[Subject],
    year: Option<&Year>,
    memory: &TrendMemory,
) -> AveragesReport {
    let results: Vec<SubjectResult> = subjects
        .iter()
        .map(|s| {
            let average = subject_average(&s.grades);
            SubjectResult {
                subject_id: s.id.clone(),
                average,
                trend: classify_trend(memory.get(&s.id), average),
            }
        })
        .collect();

    let sub_period = weighted_mean(
        subjects
            .iter()
            .zip(results.iter())
            .map(|(s, r)| (r.average, s.coefficient)),
    );

    AveragesReport {
        subjects: results,
        sub_period,
        year: year.and_then(|y| year_average(&y.sub_periods)),
    }
}

pub fn compute_for_selection(data: &AppData, memory: &TrendMemory) -> AveragesReport {
    compute_averages(data.current_subjects(), data.current_year(), memory)
}

pub fn format_average(avg: Option<f64>) -> String {
    match avg {
        // Ties round away from zero, not to even.
        Some(v) => format!("{:.2}", (v * 100.0).round() / 100.0),
        None => "--".to_string(),
    }
}

pub fn average_band(avg: Option<f64>) -> Option<AverageBand> {
    let v = avg?;
    Some(if v < 10.0 {
        AverageBand::Low
    } else if v < 14.0 {
        AverageBand::Medium
    } else {
        AverageBand::High
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grade(value: f64, coefficient: f64) -> Grade {
        Grade {
            id: format!("g-{value}-{coefficient}"),
            value,
            coefficient,
        }
    }

    fn subject(id: &str, coefficient: f64, grades: Vec<Grade>) -> Subject {
        Subject {
            id: id.to_string(),
            name: id.to_uppercase(),
            coefficient,
            grades,
        }
    }

    fn sub_period(id: &str, subjects: Vec<Subject>) -> SubPeriod {
        SubPeriod {
            id: id.to_string(),
            name: id.to_string(),
            subjects,
        }
    }

    #[test]
    fn subject_without_grades_has_no_average() {
        assert_eq!(subject_average(&[]), None);
    }

    #[test]
    fn zero_coefficients_have_no_average() {
        assert_eq!(subject_average(&[grade(12.0, 0.0), grade(18.0, 0.0)]), None);
    }

    #[test]
    fn subject_average_is_coefficient_weighted() {
        assert_eq!(subject_average(&[grade(10.0, 1.0), grade(20.0, 1.0)]), Some(15.0));
        let avg = subject_average(&[grade(10.0, 2.0), grade(0.0, 1.0)]).expect("avg");
        assert!((avg - 20.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn sub_period_skips_subjects_without_average() {
        let subjects = vec![
            subject("a", 2.0, vec![grade(10.0, 1.0)]),
            subject("b", 5.0, vec![]),
        ];
        assert_eq!(sub_period_average(&subjects), Some(10.0));
    }

    #[test]
    fn sub_period_weights_subjects_by_coefficient() {
        let subjects = vec![
            subject("a", 3.0, vec![grade(12.0, 1.0)]),
            subject("b", 1.0, vec![grade(8.0, 1.0)]),
        ];
        assert_eq!(sub_period_average(&subjects), Some(11.0));
    }

    #[test]
    fn sub_period_with_zero_subject_coefficients_is_undefined() {
        let subjects = vec![subject("a", 0.0, vec![grade(12.0, 1.0)])];
        assert_eq!(sub_period_average(&subjects), None);
    }

    #[test]
    fn year_weighs_sub_periods_equally() {
        let sps = vec![
            sub_period(
                "t1",
                vec![
                    subject("a", 1.0, vec![grade(10.0, 1.0)]),
                    subject("b", 7.0, vec![grade(10.0, 3.0), grade(10.0, 1.0)]),
                ],
            ),
            sub_period("t2", vec![subject("c", 1.0, vec![grade(16.0, 1.0)])]),
            sub_period("t3", vec![subject("d", 1.0, vec![])]),
        ];
        assert_eq!(year_average(&sps), Some(13.0));
        assert_eq!(year_average(&[]), None);
    }

    #[test]
    fn trend_uses_absolute_band() {
        assert_eq!(classify_trend(Some(12.0), Some(12.005)), Some(Trend::Stable));
        assert_eq!(classify_trend(Some(12.0), Some(12.02)), Some(Trend::Up));
        assert_eq!(classify_trend(Some(12.0), Some(11.98)), Some(Trend::Down));
        assert_eq!(classify_trend(None, Some(12.0)), None);
        assert_eq!(classify_trend(Some(12.0), None), None);
    }

    #[test]
    fn report_is_stable_across_recomputation() {
        let subjects = vec![
            subject("a", 2.0, vec![grade(14.0, 1.0)]),
            subject("b", 1.0, vec![grade(9.0, 2.0)]),
        ];
        let year = Year {
            id: "y".into(),
            name: "2025".into(),
            sub_periods: vec![sub_period("t1", subjects.clone())],
        };
        let memory: TrendMemory = [("a".to_string(), 13.0)].into_iter().collect();

        let first = compute_averages(&subjects, Some(&year), &memory);
        let second = compute_averages(&subjects, Some(&year), &memory);
        assert_eq!(first, second);
        assert_eq!(first.subjects[0].trend, Some(Trend::Up));
        assert_eq!(first.subjects[1].trend, None);
        assert_eq!(first.sub_period, first.year);
    }

    #[test]
    fn removed_subject_drops_out_of_average_and_trends() {
        let mut subjects = vec![
            subject("a", 1.0, vec![grade(10.0, 1.0)]),
            subject("b", 1.0, vec![grade(20.0, 1.0)]),
        ];
        let memory: TrendMemory = [("b".to_string(), 20.0)].into_iter().collect();
        assert_eq!(compute_averages(&subjects, None, &memory).sub_period, Some(15.0));

        subjects.retain(|s| s.id != "b");
        let report = compute_averages(&subjects, None, &memory);
        assert_eq!(report.sub_period, Some(10.0));
        assert!(report.subjects.iter().all(|r| r.subject_id != "b"));
        assert_eq!(report.year, None);
    }

    #[test]
    fn capture_records_only_defined_averages() {
        let data = AppData {
            students: vec![crate::model::Student {
                id: "s".into(),
                name: "S".into(),
                years: vec![Year {
                    id: "y".into(),
                    name: "Y".into(),
                    sub_periods: vec![sub_period(
                        "t1",
                        vec![
                            subject("a", 1.0, vec![grade(11.0, 1.0)]),
                            subject("b", 1.0, vec![]),
                        ],
                    )],
                }],
            }],
            ..AppData::default()
        };
        let memory = TrendMemory::capture(&data);
        assert_eq!(memory.len(), 1);
        assert_eq!(memory.get("a"), Some(11.0));
        assert_eq!(memory.get("b"), None);
    }

    #[test]
    fn display_rounds_only_at_format_time() {
        assert_eq!(format_average(Some(20.0 / 3.0)), "6.67");
        let avg = subject_average(&[grade(12.25, 1.0), grade(12.0, 1.0)]);
        assert_eq!(avg, Some(12.125));
        assert_eq!(format_average(avg), "12.13");
        assert_eq!(format_average(None), "--");
        assert_eq!(average_band(Some(9.99)), Some(AverageBand::Low));
        assert_eq!(average_band(Some(10.0)), Some(AverageBand::Medium));
        assert_eq!(average_band(Some(14.0)), Some(AverageBand::High));
        assert_eq!(average_band(None), None);
    }
}
