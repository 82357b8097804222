use std::fmt::Write;

use chrono::NaiveDate;

use crate::grading;
use crate::models::{GradeRecord, StudentNumber};
use crate::store::GradeSource;

fn grade_line(grade: &GradeRecord) -> String {
    let pct = grading::normalized_percentage(grade.score, grade.max_score);
    let weight = match grade.weight {
        Some(w) if w > 0.0 => format!("weight {}%", grading::round2(w)),
        _ => "unweighted".to_string(),
    };
    format!(
        "- {}: {} ({}%, {}), {}",
        grade.assessment_name.as_deref().unwrap_or("Unknown assessment"),
        grading::round2(grade.score),
        grading::round2(pct),
        grading::letter_grade(pct),
        weight
    )
}

/// Markdown transcript covering every subject for one student.
pub fn build_transcript(
    source: &impl GradeSource,
    student: &StudentNumber,
    generated_on: NaiveDate,
) -> anyhow::Result<String> {
    let all_grades = source.find_all_grades(student)?;
    let overall = grading::gpa_breakdown(&all_grades);

    let mut output = String::new();
    let _ = writeln!(output, "# Transcript for {student}");
    let _ = writeln!(output, "Generated on {generated_on}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overall");

    match grading::performance_summary(&all_grades) {
        None => {
            let _ = writeln!(output, "No grades recorded yet.");
        }
        Some(summary) => {
            let _ = writeln!(output, "- GPA: {} / 5", overall.gpa);
            let _ = writeln!(output, "- Percentage: {}%", overall.percentage);
            let _ = writeln!(output, "- Recorded weight: {}", overall.recorded_weight);
            let _ = writeln!(output, "- Graded assessments: {}", overall.graded_assessments);
            let _ = writeln!(output, "- Strongest: {}", summary.best_subject);
            let _ = writeln!(output, "- Needs improvement: {}", summary.worst_subject);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Subjects");

    let subjects = source.find_subjects("", None)?;
    if subjects.is_empty() {
        let _ = writeln!(output, "No subjects on record.");
    }

    for subject in subjects {
        let _ = writeln!(output);
        let _ = writeln!(output, "### {} ({})", subject.name, subject.code);

        let grades = source.find_grades(student, subject.id)?;
        if grades.is_empty() {
            let assessments = source.find_assessments(subject.id)?;
            if assessments.is_empty() {
                let _ = writeln!(output, "No assessments set up.");
            } else {
                let pending = assessments
                    .iter()
                    .map(|a| format!("{} ({}%)", a.name, grading::round2(a.weight.unwrap_or(0.0))))
                    .collect::<Vec<_>>()
                    .join(", ");
                let _ = writeln!(output, "No grades recorded yet. Pending: {pending}.");
            }
            continue;
        }

        for grade in &grades {
            let _ = writeln!(output, "{}", grade_line(grade));
        }
        let breakdown = grading::gpa_breakdown(&grades);
        let _ = writeln!(
            output,
            "Subject standing: {}% ({}) over {} weight",
            breakdown.percentage,
            grading::letter_grade(breakdown.percentage),
            breakdown.recorded_weight
        );
    }

    let unresolved: Vec<&GradeRecord> = all_grades
        .iter()
        .filter(|grade| grade.subject_id.is_none())
        .collect();
    if !unresolved.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Unassigned Grades");
        for grade in unresolved {
            let _ = writeln!(output, "{}", grade_line(grade));
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::{campus, student};

    fn generated_on() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    #[test]
    fn transcript_covers_overall_and_subjects() {
        let report = build_transcript(&campus(), &student(), generated_on()).unwrap();

        assert!(report.starts_with("# Transcript for 22010301001\nGenerated on 2026-03-02\n"));
        assert!(report.contains("- GPA: 4.17 / 5"));
        assert!(report.contains("- Percentage: 83.44%"));
        assert!(report.contains("- Recorded weight: 160"));
        assert!(report.contains("- Graded assessments: 5"));
        assert!(report.contains("- Strongest: Mathematics"));
        assert!(report.contains("- Needs improvement: Physics"));

        assert!(report.contains("### Mathematics (MATH101)\n- Midterm Exam: 85 (85%, B), weight 30%"));
        assert!(report.contains("Subject standing: 88.3% (B) over 100 weight"));
        assert!(report.contains("Subject standing: 75.33% (C) over 60 weight"));
        assert!(report.contains(
            "### Computer Science (CS101)\nNo grades recorded yet. Pending: Midterm Exam (30%), Project (70%)."
        ));
        assert!(report.contains("### Chemistry (CHEM101)\nNo assessments set up."));
        assert!(!report.contains("## Unassigned Grades"));
    }

    #[test]
    fn transcript_for_student_without_grades() {
        let nobody = StudentNumber::parse("22010301999").unwrap();
        let report = build_transcript(&campus(), &nobody, generated_on()).unwrap();
        assert!(report.contains("## Overall\nNo grades recorded yet."));
    }

    #[test]
    fn unresolved_grades_get_their_own_section() {
        let mut snapshot = campus();
        snapshot.grades.push(GradeRecord {
            student: student(),
            score: 64.0,
            subject_id: None,
            subject_name: None,
            assessment_name: None,
            max_score: None,
            weight: None,
        });

        let report = build_transcript(&snapshot, &student(), generated_on()).unwrap();
        assert!(report.contains("## Unassigned Grades\n- Unknown assessment: 64 (64%, D), unweighted"));
    }
}
