use serde::{Deserialize, Serialize};

/// Shown as last update when the page carries no timestamp.
pub const LAST_UPDATE_CONNECTED: &str = "Connected";
/// Shown when the timestamp marker exists but no token follows it.
pub const LAST_UPDATE_UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResult {
    pub last_update: String,
    pub absences: Absences,
    /// Document order; the portal lists each subject's grades newest first.
    pub grades: Vec<GradeEntry>,
}

/// Absence counters. Hours stay text since the portal may use fractions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Absences {
    pub days: i64,
    pub unexcused_days: i64,
    pub hours: String,
    pub unexcused_hours: String,
}

impl Default for Absences {
    fn default() -> Self {
        Self {
            days: 0,
            unexcused_days: 0,
            hours: "0".to_string(),
            unexcused_hours: "0".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeEntry {
    pub subject: String,
    pub date: String,
    /// Raw cell text; grades are not always numeric.
    pub grade: String,
    pub comment: String,
}
