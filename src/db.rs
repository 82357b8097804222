use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::debug;

use crate::models::{Assessment, GradeRecord, StudentNumber, Subject};
use crate::store::Snapshot;

pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

/// Reads every subject and assessment plus one student's grades.
///
/// Grades are LEFT JOINed to their assessment and subject, so a dangling
/// reference comes back with empty assessment fields instead of vanishing.
pub async fn load_snapshot(pool: &PgPool, student: &StudentNumber) -> anyhow::Result<Snapshot> {
    let subjects = fetch_subjects(pool).await?;
    let assessments = fetch_assessments(pool).await?;
    let grades = fetch_grades(pool, student).await?;

    debug!(
        subjects = subjects.len(),
        assessments = assessments.len(),
        grades = grades.len(),
        %student,
        "loaded snapshot from Postgres"
    );

    Ok(Snapshot::new(subjects, assessments, grades))
}

async fn fetch_subjects(pool: &PgPool) -> anyhow::Result<Vec<Subject>> {
    let rows = sqlx::query("SELECT id, name, code FROM gradebook.subjects ORDER BY code")
        .fetch_all(pool)
        .await
        .context("failed to load subjects")?;

    Ok(rows
        .into_iter()
        .map(|row| Subject {
            id: row.get("id"),
            name: row.get("name"),
            code: row.get("code"),
        })
        .collect())
}

async fn fetch_assessments(pool: &PgPool) -> anyhow::Result<Vec<Assessment>> {
    let rows = sqlx::query(
        r#"
        SELECT a.id, a.subject_id, a.name, a.max_score, a.weight
        FROM gradebook.assessments a
        JOIN gradebook.subjects s ON s.id = a.subject_id
        ORDER BY s.code, a.created_at, a.id
        "#,
    )
    .fetch_all(pool)
    .await
    .context("failed to load assessments")?;

    Ok(rows
        .into_iter()
        .map(|row| Assessment {
            id: row.get("id"),
            subject_id: row.get("subject_id"),
            name: row.get("name"),
            max_score: row.get("max_score"),
            weight: row.get("weight"),
        })
        .collect())
}

async fn fetch_grades(pool: &PgPool, student: &StudentNumber) -> anyhow::Result<Vec<GradeRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT g.score, s.id AS subject_id, s.name AS subject_name,
               a.name AS assessment_name, a.max_score, a.weight
        FROM gradebook.grades g
        JOIN gradebook.students st ON st.id = g.student_id
        LEFT JOIN gradebook.assessments a ON a.id = g.assessment_id
        LEFT JOIN gradebook.subjects s ON s.id = a.subject_id
        WHERE st.student_number = $1
        ORDER BY g.recorded_at, g.id
        "#,
    )
    .bind(student.as_str())
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to load grades for student {student}"))?;

    Ok(rows
        .into_iter()
        .map(|row| GradeRecord {
            student: student.clone(),
            score: row.get("score"),
            subject_id: row.get("subject_id"),
            subject_name: row.get("subject_name"),
            assessment_name: row.get("assessment_name"),
            max_score: row.get("max_score"),
            weight: row.get("weight"),
        })
        .collect())
}
