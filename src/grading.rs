use std::fmt;

use crate::models::{GpaBreakdown, GradeRecord, PerformanceSummary};

const GPA_SCALE: f64 = 5.0;
const PROJECTION_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LetterGrade {
    A,
    B,
    C,
    D,
    F,
}

impl LetterGrade {
    pub fn from_percentage(pct: f64) -> Self {
        if pct >= 90.0 {
            LetterGrade::A
        } else if pct >= 80.0 {
            LetterGrade::B
        } else if pct >= 70.0 {
            LetterGrade::C
        } else if pct >= 60.0 {
            LetterGrade::D
        } else {
            LetterGrade::F
        }
    }

    /// Minimum final percentage for this letter. `F` has none.
    pub fn threshold(self) -> Option<f64> {
        match self {
            LetterGrade::A => Some(90.0),
            LetterGrade::B => Some(80.0),
            LetterGrade::C => Some(70.0),
            LetterGrade::D => Some(60.0),
            LetterGrade::F => None,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "A" => Some(LetterGrade::A),
            "B" => Some(LetterGrade::B),
            "C" => Some(LetterGrade::C),
            "D" => Some(LetterGrade::D),
            "F" => Some(LetterGrade::F),
            _ => None,
        }
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            LetterGrade::A => "A",
            LetterGrade::B => "B",
            LetterGrade::C => "C",
            LetterGrade::D => "D",
            LetterGrade::F => "F",
        };
        f.write_str(letter)
    }
}

pub fn letter_grade(pct: f64) -> LetterGrade {
    LetterGrade::from_percentage(pct)
}

// Without a positive maximum the score is already a percentage.
pub fn normalized_percentage(score: f64, max_score: Option<f64>) -> f64 {
    match max_score {
        Some(max) if max > 0.0 => score / max * 100.0,
        _ => score,
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Blends weighted and unweighted grades into one percentage and a 5-point GPA.
///
/// Weighted grades form a weight-averaged percentage. Grades with no positive
/// weight are averaged on their own and, when both groups exist, the two
/// averages are combined with equal say. That is a fixed policy, not a true
/// combined weighted mean, and the output depends on it.
pub fn gpa_breakdown(grades: &[GradeRecord]) -> GpaBreakdown {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    let mut unweighted = Vec::new();

    for grade in grades {
        let pct = normalized_percentage(grade.score, grade.max_score);
        let weight = grade.weight_or_zero();
        if weight > 0.0 {
            weighted_sum += pct * weight;
            weight_total += weight;
        } else {
            unweighted.push(pct);
        }
    }

    let unweighted_mean = if unweighted.is_empty() {
        None
    } else {
        Some(unweighted.iter().sum::<f64>() / unweighted.len() as f64)
    };

    let final_pct = if weight_total > 0.0 {
        let weighted_avg = weighted_sum / weight_total;
        match unweighted_mean {
            Some(mean) => (weighted_avg + mean) / 2.0,
            None => weighted_avg,
        }
    } else {
        unweighted_mean.unwrap_or(0.0)
    };

    GpaBreakdown {
        gpa: round2(final_pct / 100.0 * GPA_SCALE),
        percentage: round2(final_pct),
        recorded_weight: round2(weight_total),
        graded_assessments: grades.len(),
    }
}

pub fn calculate_gpa(grades: &[GradeRecord]) -> f64 {
    gpa_breakdown(grades).gpa
}

/// Strongest and weakest subject go by raw score. `None` without grades.
pub fn performance_summary(grades: &[GradeRecord]) -> Option<PerformanceSummary> {
    let first = grades.first()?;
    let mut best = first;
    let mut worst = first;

    for grade in &grades[1..] {
        if grade.score > best.score {
            best = grade;
        }
        // `<=` so the last of several equal minimums wins, matching a stable
        // descending sort that takes its tail.
        if grade.score <= worst.score {
            worst = grade;
        }
    }

    let gpa = calculate_gpa(grades);
    let best_subject = subject_label(best);
    let worst_subject = subject_label(worst);
    let text = format!("Current GPA is {gpa}. Best performance in {best_subject}.");

    Some(PerformanceSummary {
        gpa,
        total_assessments: grades.len(),
        best_subject,
        worst_subject,
        text,
    })
}

fn subject_label(grade: &GradeRecord) -> String {
    grade
        .subject_name
        .clone()
        .unwrap_or_else(|| "N/A".to_string())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    NotApplicable,
    Completed,
    Unreachable { required: f64 },
    Secured,
    Required { average: f64, remaining_weight: f64 },
}

/// Solves `points + needed * remaining / 100 = target` for `needed`.
///
/// `points` are weighted percentage points already earned (each grade adds
/// `pct * weight / 100`) and `current_weight` is the weight they cover.
pub fn project(points: f64, current_weight: f64, target: LetterGrade) -> Projection {
    let Some(target_score) = target.threshold() else {
        return Projection::NotApplicable;
    };

    let remaining_weight = 100.0 - current_weight;
    if remaining_weight <= 0.0 {
        return Projection::Completed;
    }

    let required = (target_score - points) / remaining_weight * 100.0;
    if required > 100.0 + PROJECTION_TOLERANCE {
        Projection::Unreachable { required }
    } else if required < -PROJECTION_TOLERANCE {
        Projection::Secured
    } else {
        Projection::Required {
            average: required.clamp(0.0, 100.0),
            remaining_weight,
        }
    }
}

pub fn projected_requirement(current_score: f64, current_weight: f64, target: LetterGrade) -> String {
    project(current_score * current_weight / 100.0, current_weight, target).to_string()
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Projection::NotApplicable => {
                write!(f, "An F has no minimum score, so there is nothing to project.")
            }
            Projection::Completed => {
                write!(f, "You have completed all assessments for this course.")
            }
            Projection::Unreachable { required } => write!(
                f,
                "It's effectively impossible. You'd need {required:.1}% on remaining work."
            ),
            Projection::Secured => write!(f, "You've already secured that grade!"),
            Projection::Required {
                average,
                remaining_weight,
            } => write!(
                f,
                "You need to average {average:.1}% on the remaining {}% of the course.",
                round2(*remaining_weight)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StudentNumber;

    fn grade(subject: &str, score: f64, max_score: Option<f64>, weight: Option<f64>) -> GradeRecord {
        GradeRecord {
            student: StudentNumber::parse("22010301001").unwrap(),
            score,
            subject_id: None,
            subject_name: Some(subject.to_string()),
            assessment_name: Some("Exam".to_string()),
            max_score,
            weight,
        }
    }

    #[test]
    fn letter_thresholds_are_inclusive() {
        assert_eq!(letter_grade(90.0), LetterGrade::A);
        assert_eq!(letter_grade(89.99), LetterGrade::B);
        assert_eq!(letter_grade(80.0), LetterGrade::B);
        assert_eq!(letter_grade(70.0), LetterGrade::C);
        assert_eq!(letter_grade(60.0), LetterGrade::D);
        assert_eq!(letter_grade(59.9), LetterGrade::F);
    }

    #[test]
    fn out_of_hundred_scores_are_already_percentages() {
        for score in [0.0, 45.5, 60.0, 79.0, 100.0] {
            let pct = normalized_percentage(score, Some(100.0));
            assert_eq!(pct, score);
            assert_eq!(letter_grade(pct), letter_grade(score));
        }
    }

    #[test]
    fn missing_or_zero_max_keeps_raw_score() {
        assert_eq!(normalized_percentage(42.0, None), 42.0);
        assert_eq!(normalized_percentage(42.0, Some(0.0)), 42.0);
        assert_eq!(normalized_percentage(15.0, Some(20.0)), 75.0);
    }

    #[test]
    fn empty_breakdown_is_all_zero() {
        assert_eq!(
            gpa_breakdown(&[]),
            GpaBreakdown {
                gpa: 0.0,
                percentage: 0.0,
                recorded_weight: 0.0,
                graded_assessments: 0,
            }
        );
    }

    #[test]
    fn mathematics_scenario_rounds_half_away_from_zero() {
        let grades = vec![
            grade("Mathematics", 85.0, Some(100.0), Some(30.0)),
            grade("Mathematics", 88.0, Some(100.0), Some(40.0)),
            grade("Mathematics", 92.0, Some(100.0), Some(30.0)),
        ];
        let breakdown = gpa_breakdown(&grades);
        assert_eq!(breakdown.percentage, 88.3);
        assert_eq!(breakdown.gpa, 4.42);
        assert_eq!(breakdown.recorded_weight, 100.0);
        assert_eq!(breakdown.graded_assessments, 3);
    }

    #[test]
    fn weighted_only_matches_weighted_sum() {
        let grades = vec![
            grade("Physics", 18.0, Some(20.0), Some(25.0)),
            grade("Physics", 70.0, Some(100.0), Some(75.0)),
        ];
        let breakdown = gpa_breakdown(&grades);
        let expected = (90.0 * 25.0 + 70.0 * 75.0) / 100.0;
        assert_eq!(breakdown.percentage, expected);
    }

    #[test]
    fn unweighted_entries_are_blended_equally() {
        let grades = vec![
            grade("Physics", 80.0, Some(100.0), Some(50.0)),
            grade("Physics", 60.0, None, None),
            grade("Physics", 40.0, Some(100.0), Some(0.0)),
        ];
        let breakdown = gpa_breakdown(&grades);
        assert_eq!(breakdown.percentage, 65.0);
        assert_eq!(breakdown.gpa, 3.25);
        assert_eq!(breakdown.recorded_weight, 50.0);
    }

    #[test]
    fn no_weights_falls_back_to_plain_mean() {
        let grades = vec![
            grade("Art", 70.0, None, None),
            grade("Art", 9.0, Some(10.0), None),
        ];
        let breakdown = gpa_breakdown(&grades);
        assert_eq!(breakdown.percentage, 80.0);
        assert_eq!(breakdown.gpa, 4.0);
        assert_eq!(breakdown.recorded_weight, 0.0);
    }

    #[test]
    fn raising_a_score_never_lowers_gpa() {
        let base = vec![
            grade("Mathematics", 55.0, Some(100.0), Some(30.0)),
            grade("Mathematics", 12.0, Some(20.0), Some(20.0)),
            grade("Physics", 68.0, None, None),
            grade("Physics", 74.0, Some(80.0), Some(0.0)),
        ];
        let before = calculate_gpa(&base);
        for idx in 0..base.len() {
            let mut bumped = base.clone();
            bumped[idx].score += 5.0;
            assert!(calculate_gpa(&bumped) >= before, "index {idx}");
        }
    }

    #[test]
    fn summary_picks_best_and_worst_by_raw_score() {
        let grades = vec![
            grade("Mathematics", 85.0, Some(100.0), Some(30.0)),
            grade("Physics", 95.0, Some(100.0), Some(30.0)),
            grade("Chemistry", 61.0, Some(100.0), Some(30.0)),
        ];
        let summary = performance_summary(&grades).unwrap();
        assert_eq!(summary.best_subject, "Physics");
        assert_eq!(summary.worst_subject, "Chemistry");
        assert_eq!(summary.total_assessments, 3);
        assert_eq!(summary.gpa, 4.02);
        assert_eq!(summary.text, "Current GPA is 4.02. Best performance in Physics.");
    }

    #[test]
    fn summary_ties_follow_storage_order() {
        let grades = vec![
            grade("Mathematics", 70.0, None, None),
            grade("Physics", 70.0, None, None),
        ];
        let summary = performance_summary(&grades).unwrap();
        assert_eq!(summary.best_subject, "Mathematics");
        assert_eq!(summary.worst_subject, "Physics");
    }

    #[test]
    fn single_grade_is_both_best_and_worst() {
        let grades = vec![grade("Biology", 50.0, None, None)];
        let summary = performance_summary(&grades).unwrap();
        assert_eq!(summary.best_subject, "Biology");
        assert_eq!(summary.worst_subject, "Biology");
    }

    #[test]
    fn summary_of_nothing_is_none() {
        assert!(performance_summary(&[]).is_none());
    }

    #[test]
    fn exactly_one_hundred_percent_is_still_reachable() {
        let projection = project(50.0, 60.0, LetterGrade::A);
        assert_eq!(
            projection,
            Projection::Required {
                average: 100.0,
                remaining_weight: 40.0,
            }
        );
        assert_eq!(
            projection.to_string(),
            "You need to average 100.0% on the remaining 40% of the course."
        );
    }

    #[test]
    fn rounding_noise_does_not_flip_the_bounds() {
        assert_eq!(
            project(49.99999999999999, 60.0, LetterGrade::A),
            Projection::Required {
                average: 100.0,
                remaining_weight: 40.0,
            }
        );
        assert_eq!(
            project(80.00000000000001, 60.0, LetterGrade::B),
            Projection::Required {
                average: 0.0,
                remaining_weight: 40.0,
            }
        );
    }

    #[test]
    fn projection_edge_cases() {
        assert_eq!(project(40.0, 100.0, LetterGrade::B), Projection::Completed);
        assert_eq!(project(85.0, 90.0, LetterGrade::B), Projection::Secured);
        assert_eq!(
            project(30.0, 50.0, LetterGrade::A),
            Projection::Unreachable { required: 120.0 }
        );
        assert_eq!(project(30.0, 50.0, LetterGrade::F), Projection::NotApplicable);
    }

    #[test]
    fn unreachable_reports_exact_requirement() {
        assert_eq!(
            project(30.0, 50.0, LetterGrade::A).to_string(),
            "It's effectively impossible. You'd need 120.0% on remaining work."
        );
    }

    #[test]
    fn projected_requirement_from_average() {
        // 75% average over 60% of the course is 45 points; a B needs 35 more
        // over the remaining 40.
        assert_eq!(
            projected_requirement(75.0, 60.0, LetterGrade::B),
            "You need to average 87.5% on the remaining 40% of the course."
        );
    }

    #[test]
    fn parses_letters_case_insensitively() {
        assert_eq!(LetterGrade::parse("b"), Some(LetterGrade::B));
        assert_eq!(LetterGrade::parse("F"), Some(LetterGrade::F));
        assert_eq!(LetterGrade::parse("e"), None);
    }
}
