use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{Assessment, GradeRecord, StudentNumber, Subject};
use crate::store::Snapshot;

pub const SUBJECTS_FILE: &str = "subjects.csv";
pub const ASSESSMENTS_FILE: &str = "assessments.csv";
pub const GRADES_FILE: &str = "grades.csv";

#[derive(Deserialize)]
struct SubjectRow {
    code: String,
    name: String,
}

#[derive(Deserialize)]
struct AssessmentRow {
    subject_code: String,
    name: String,
    max_score: Option<f64>,
    weight: Option<f64>,
}

#[derive(Deserialize)]
struct GradeRow {
    student_number: StudentNumber,
    subject_code: String,
    assessment: String,
    score: f64,
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut rows = Vec::new();
    for (idx, result) in reader.deserialize::<T>().enumerate() {
        // Line 1 is the header.
        let row = result.with_context(|| format!("{} line {}", path.display(), idx + 2))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Builds a snapshot from `subjects.csv`, `assessments.csv` and `grades.csv`
/// in `dir`.
pub fn load_dir(dir: &Path) -> anyhow::Result<Snapshot> {
    let subject_rows: Vec<SubjectRow> = read_rows(&dir.join(SUBJECTS_FILE))?;
    let assessment_rows: Vec<AssessmentRow> = read_rows(&dir.join(ASSESSMENTS_FILE))?;
    let grade_rows: Vec<GradeRow> = read_rows(&dir.join(GRADES_FILE))?;

    let mut subjects = Vec::with_capacity(subject_rows.len());
    let mut by_code: HashMap<String, usize> = HashMap::new();
    for row in subject_rows {
        if by_code.contains_key(&row.code) {
            bail!("duplicate subject code {} in {}", row.code, SUBJECTS_FILE);
        }
        by_code.insert(row.code.clone(), subjects.len());
        subjects.push(Subject {
            id: Uuid::new_v4(),
            name: row.name,
            code: row.code,
        });
    }

    let mut assessments = Vec::with_capacity(assessment_rows.len());
    let mut by_key: HashMap<(String, String), usize> = HashMap::new();
    for row in assessment_rows {
        let Some(&subject_idx) = by_code.get(&row.subject_code) else {
            bail!(
                "assessment {} refers to unknown subject {} in {}",
                row.name,
                row.subject_code,
                ASSESSMENTS_FILE
            );
        };
        let key = (row.subject_code, row.name.clone());
        if by_key.contains_key(&key) {
            bail!(
                "duplicate assessment {} for subject {} in {}",
                key.1,
                key.0,
                ASSESSMENTS_FILE
            );
        }
        by_key.insert(key, assessments.len());
        assessments.push(Assessment {
            id: Uuid::new_v4(),
            subject_id: subjects[subject_idx].id,
            name: row.name,
            max_score: row.max_score,
            weight: row.weight,
        });
    }

    let mut grades = Vec::with_capacity(grade_rows.len());
    for row in grade_rows {
        let key = (row.subject_code, row.assessment);
        let record = match by_key.get(&key) {
            Some(&idx) => {
                let assessment = &assessments[idx];
                let subject = &subjects[by_code[&key.0]];
                GradeRecord {
                    student: row.student_number,
                    score: row.score,
                    subject_id: Some(subject.id),
                    subject_name: Some(subject.name.clone()),
                    assessment_name: Some(assessment.name.clone()),
                    max_score: assessment.max_score,
                    weight: assessment.weight,
                }
            }
            None => {
                warn!(
                    subject = %key.0,
                    assessment = %key.1,
                    "grade refers to an unknown assessment"
                );
                GradeRecord {
                    student: row.student_number,
                    score: row.score,
                    subject_id: None,
                    subject_name: None,
                    assessment_name: None,
                    max_score: None,
                    weight: None,
                }
            }
        };
        grades.push(record);
    }

    debug!(
        subjects = subjects.len(),
        assessments = assessments.len(),
        grades = grades.len(),
        dir = %dir.display(),
        "loaded snapshot from CSV"
    );

    Ok(Snapshot::new(subjects, assessments, grades))
}
