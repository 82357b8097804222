use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    pub id: Uuid,
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub name: String,
    pub max_score: Option<f64>,
    pub weight: Option<f64>,
}

/// A recorded score joined with everything the engine needs about its
/// assessment. Assessment fields are `None` when the reference could not be
/// resolved by the data layer.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeRecord {
    pub student: StudentNumber,
    pub score: f64,
    pub subject_id: Option<Uuid>,
    pub subject_name: Option<String>,
    pub assessment_name: Option<String>,
    pub max_score: Option<f64>,
    pub weight: Option<f64>,
}

impl GradeRecord {
    /// Weight toward the subject total; missing weights count as zero.
    pub fn weight_or_zero(&self) -> f64 {
        self.weight.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GpaBreakdown {
    pub gpa: f64,
    pub percentage: f64,
    pub recorded_weight: f64,
    pub graded_assessments: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSummary {
    pub gpa: f64,
    pub total_assessments: usize,
    pub best_subject: String,
    pub worst_subject: String,
    pub text: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StudentNumberError {
    #[error("student number must be exactly 11 digits, got {0} characters")]
    Length(usize),
    #[error("student number may only contain digits: {0:?}")]
    NonDigit(String),
}

/// Matriculation number, e.g. `22010301001`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub struct StudentNumber(String);

impl StudentNumber {
    pub const LEN: usize = 11;

    pub fn parse(raw: &str) -> Result<Self, StudentNumberError> {
        let trimmed = raw.trim();
        if !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(StudentNumberError::NonDigit(trimmed.to_string()));
        }
        if trimmed.len() != Self::LEN {
            return Err(StudentNumberError::Length(trimmed.len()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StudentNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for StudentNumber {
    type Err = StudentNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for StudentNumber {
    type Error = StudentNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}
