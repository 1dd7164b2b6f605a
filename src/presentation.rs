//! Republishes the latest fetch as individually named values.

use serde::Serialize;
use serde_json::Value;

use crate::{portal_data::GradeEntry, scheduler::DataState};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sensor {
    pub key: String,
    pub name: String,
    pub icon: &'static str,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<SubjectAttributes>,
    pub available: bool,
}

/// Extra detail attached to a subject's sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectAttributes {
    pub latest_grade_date: String,
    pub latest_grade_comment: String,
    pub latest_grade_value: String,
    pub history: Vec<GradeEntry>,
}

/// Reads a grade as a plain decimal number, accepting a decimal comma.
pub fn numeric_grade(grade: &str) -> Option<f64> {
    grade
        .replace(',', ".")
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Mean of the numeric grades, rounded to two places. Grades such as `1-`
/// or `A` are left out.
pub fn average(grades: &[&GradeEntry]) -> Option<f64> {
    let values: Vec<f64> = grades
        .iter()
        .filter_map(|entry| numeric_grade(&entry.grade))
        .collect();
    if values.is_empty() {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    Some((mean * 100.0).round() / 100.0)
}

/// Subjects in order of first appearance.
fn subjects(grades: &[GradeEntry]) -> Vec<&str> {
    let mut seen: Vec<&str> = Vec::new();
    for entry in grades {
        if !seen.contains(&entry.subject.as_str()) {
            seen.push(&entry.subject);
        }
    }
    seen
}

fn sensor(key: &str, name: &str, icon: &'static str, value: Value, available: bool) -> Sensor {
    Sensor {
        key: key.to_string(),
        name: format!("Home.InfoPoint {name}"),
        icon,
        value,
        attributes: None,
        available,
    }
}

fn subject_sensor(subject: &str, grades: &[GradeEntry], available: bool) -> Sensor {
    let history: Vec<&GradeEntry> = grades.iter().filter(|g| g.subject == subject).collect();
    let value = average(&history).map_or(Value::Null, Value::from);
    // Newest first, as listed on the portal.
    let attributes = history.first().map(|latest| SubjectAttributes {
        latest_grade_date: latest.date.clone(),
        latest_grade_comment: latest.comment.clone(),
        latest_grade_value: latest.grade.clone(),
        history: history.iter().map(|&g| g.clone()).collect(),
    });
    Sensor {
        key: format!("subject_{}", subject.replace(' ', "_")),
        name: format!("Home.InfoPoint {subject}"),
        icon: "mdi:book-open-variant",
        value,
        attributes,
        available,
    }
}

/// Every value of the latest data. Stale data is still reported, marked
/// unavailable.
pub fn sensors(state: &DataState) -> Vec<Sensor> {
    let Some(data) = &state.data else {
        return Vec::new();
    };
    let available = state.is_available();
    let absences = &data.absences;
    let mut out = vec![
        sensor(
            "last_update",
            "Last Update",
            "mdi:clock-outline",
            Value::from(data.last_update.clone()),
            available,
        ),
        sensor(
            "absence_days",
            "Absences (Days)",
            "mdi:calendar-remove",
            Value::from(absences.days),
            available,
        ),
        sensor(
            "absence_unexcused_days",
            "Unexcused Absences (Days)",
            "mdi:calendar-alert",
            Value::from(absences.unexcused_days),
            available,
        ),
        sensor(
            "absence_hours",
            "Absences (Hours)",
            "mdi:clock-remove",
            Value::from(absences.hours.clone()),
            available,
        ),
        sensor(
            "absence_unexcused_hours",
            "Unexcused Absences (Hours)",
            "mdi:clock-alert",
            Value::from(absences.unexcused_hours.clone()),
            available,
        ),
    ];
    out.extend(
        subjects(&data.grades)
            .into_iter()
            .map(|subject| subject_sensor(subject, &data.grades, available)),
    );
    out
}
