use uuid::Uuid;

use crate::models::{Assessment, GradeRecord, StudentNumber, Subject};

/// Read-only lookups the interpreter needs from the storage layer.
///
/// Results come back in storage order. Subject matching is a case-insensitive
/// substring match on the name, or on the code when a code fragment is given.
pub trait GradeSource {
    fn find_subjects(&self, name: &str, code: Option<&str>) -> anyhow::Result<Vec<Subject>>;

    fn find_grades(
        &self,
        student: &StudentNumber,
        subject_id: Uuid,
    ) -> anyhow::Result<Vec<GradeRecord>>;

    fn find_assessments(&self, subject_id: Uuid) -> anyhow::Result<Vec<Assessment>>;

    fn find_all_grades(&self, student: &StudentNumber) -> anyhow::Result<Vec<GradeRecord>>;
}

/// A consistent read view assembled once per request.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub subjects: Vec<Subject>,
    pub assessments: Vec<Assessment>,
    pub grades: Vec<GradeRecord>,
}

impl Snapshot {
    pub fn new(
        subjects: Vec<Subject>,
        assessments: Vec<Assessment>,
        grades: Vec<GradeRecord>,
    ) -> Self {
        Self {
            subjects,
            assessments,
            grades,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty() && self.grades.is_empty()
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl GradeSource for Snapshot {
    fn find_subjects(&self, name: &str, code: Option<&str>) -> anyhow::Result<Vec<Subject>> {
        Ok(self
            .subjects
            .iter()
            .filter(|subject| {
                contains_ignore_case(&subject.name, name)
                    || code.is_some_and(|code| contains_ignore_case(&subject.code, code))
            })
            .cloned()
            .collect())
    }

    fn find_grades(
        &self,
        student: &StudentNumber,
        subject_id: Uuid,
    ) -> anyhow::Result<Vec<GradeRecord>> {
        Ok(self
            .grades
            .iter()
            .filter(|grade| &grade.student == student && grade.subject_id == Some(subject_id))
            .cloned()
            .collect())
    }

    fn find_assessments(&self, subject_id: Uuid) -> anyhow::Result<Vec<Assessment>> {
        Ok(self
            .assessments
            .iter()
            .filter(|assessment| assessment.subject_id == subject_id)
            .cloned()
            .collect())
    }

    fn find_all_grades(&self, student: &StudentNumber) -> anyhow::Result<Vec<GradeRecord>> {
        Ok(self
            .grades
            .iter()
            .filter(|grade| &grade.student == student)
            .cloned()
            .collect())
    }
}
