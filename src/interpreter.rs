//! Maps free-text questions onto a small fixed set of grade queries.
//!
//! Patterns are tried in priority order and the first match wins: grade
//! lookup, performance summary, grade projection, then the fallback answer.

use std::fmt::Write;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::grading::{self, LetterGrade};
use crate::models::{GradeRecord, StudentNumber};
use crate::store::GradeSource;

pub const FALLBACK_RESPONSE: &str = "I'm not sure I understand. Try asking about your grades in a specific subject or your overall performance.";

const PERFORMANCE_KEYWORDS: [&str; 3] = ["performing", "performance", "summary"];

static GRADE_LOOKUP_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"grades? (?:in|for) (.+)").expect("Invalid regex"));
static PARENTHESIZED_CODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*\(([^)]+)\)$").expect("Invalid regex"));
static PROJECTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"need.*get a ([a-df]) in (.+)").expect("Invalid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectQuery {
    pub raw: String,
    pub name: String,
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    GradeLookup(SubjectQuery),
    PerformanceSummary,
    Projection { target: LetterGrade, subject: String },
    Unknown,
}

fn clean_subject(raw: &str) -> String {
    raw.trim_matches('?').trim().to_string()
}

/// Splits a subject reference into a name fragment and an optional code,
/// accepting both `name (code)` and a trailing alphanumeric `name code`.
pub fn parse_subject_query(raw: &str) -> SubjectQuery {
    let raw = clean_subject(raw);

    if let Some(caps) = PARENTHESIZED_CODE_PATTERN.captures(&raw) {
        return SubjectQuery {
            name: caps[1].trim().to_string(),
            code: Some(caps[2].trim().to_string()),
            raw,
        };
    }

    let parts: Vec<&str> = raw.split_whitespace().collect();
    if let [head @ .., last] = parts.as_slice() {
        if !head.is_empty() && last.chars().all(|c| c.is_ascii_alphanumeric()) {
            return SubjectQuery {
                name: head.join(" "),
                code: Some(last.to_string()),
                raw,
            };
        }
    }

    SubjectQuery {
        name: raw.clone(),
        code: None,
        raw,
    }
}

pub fn parse_projection(question: &str) -> Option<(LetterGrade, String)> {
    let caps = PROJECTION_PATTERN.captures(question)?;
    let target = LetterGrade::parse(&caps[1])?;
    Some((target, clean_subject(&caps[2])))
}

fn mentions_performance(question: &str) -> bool {
    PERFORMANCE_KEYWORDS
        .iter()
        .any(|keyword| question.contains(keyword))
}

pub fn classify(question: &str) -> Intent {
    let question = question.to_lowercase();

    if let Some(caps) = GRADE_LOOKUP_PATTERN.captures(&question) {
        return Intent::GradeLookup(parse_subject_query(&caps[1]));
    }

    if mentions_performance(&question) {
        return Intent::PerformanceSummary;
    }

    if let Some((target, subject)) = parse_projection(&question) {
        return Intent::Projection { target, subject };
    }

    Intent::Unknown
}

/// Answers a question for one student.
///
/// Lookup failures from the source are returned as errors; everything else,
/// including missing data, is an ordinary answer.
pub fn interpret(
    source: &impl GradeSource,
    question: &str,
    student: &StudentNumber,
) -> anyhow::Result<String> {
    let intent = classify(question);
    debug!(?intent, %student, "classified question");

    match intent {
        Intent::GradeLookup(query) => grade_lookup(source, &query, student),
        Intent::PerformanceSummary => performance(source, student),
        Intent::Projection { target, subject } => projection(source, target, &subject, student),
        Intent::Unknown => Ok(FALLBACK_RESPONSE.to_string()),
    }
}

pub fn ask(source: &impl GradeSource, question: &str, student: &StudentNumber) -> String {
    match interpret(source, question, student) {
        Ok(answer) => answer,
        Err(err) => internal_error_response(&err),
    }
}

pub fn internal_error_response(err: &anyhow::Error) -> String {
    warn!(error = %format!("{err:#}"), "failed to answer question");
    format!("I encountered an internal error: {err}")
}

fn grade_lookup(
    source: &impl GradeSource,
    query: &SubjectQuery,
    student: &StudentNumber,
) -> anyhow::Result<String> {
    let subjects = source.find_subjects(&query.name, query.code.as_deref())?;
    if subjects.is_empty() {
        return Ok(format!(
            "I couldn't find any subject matching '{}'.",
            query.raw
        ));
    }

    let mut blocks = Vec::with_capacity(subjects.len());
    for subject in subjects {
        let grades = source.find_grades(student, subject.id)?;
        if !grades.is_empty() {
            blocks.push(render_graded_subject(&subject.name, &subject.code, &grades));
            continue;
        }

        let assessments = source.find_assessments(subject.id)?;
        if assessments.is_empty() {
            blocks.push(format!(
                "**{}**: No grades or assessments found.",
                subject.name
            ));
        } else {
            let listing = assessments
                .iter()
                .map(|a| format!("{} ({}%)", a.name, grading::round2(a.weight.unwrap_or(0.0))))
                .collect::<Vec<_>>()
                .join(", ");
            blocks.push(format!(
                "**{}**: No grades recorded yet. Assessments: {listing}.",
                subject.name
            ));
        }
    }

    Ok(blocks.join("\n\n"))
}

fn render_graded_subject(name: &str, code: &str, grades: &[GradeRecord]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "**{name}** ({code}):");

    for grade in grades {
        let pct = grading::normalized_percentage(grade.score, grade.max_score);
        let _ = writeln!(
            output,
            "- {}: {} ({})",
            grade.assessment_name.as_deref().unwrap_or("Unknown assessment"),
            grading::round2(grade.score),
            grading::letter_grade(pct)
        );
    }

    let (points, weight) = weighted_points(grades);
    let _ = write!(
        output,
        "Current Weighted Score: {points:.1} (out of {} weight so far)",
        grading::round2(weight)
    );
    output
}

/// Weighted percentage points earned and the weight they cover.
fn weighted_points(grades: &[GradeRecord]) -> (f64, f64) {
    // Divide once at the end; per-grade division drifts off exact totals.
    let (weighted_sum, weight) = grades.iter().fold((0.0, 0.0), |(sum, weight), grade| {
        let pct = grading::normalized_percentage(grade.score, grade.max_score);
        let w = grade.weight_or_zero();
        (sum + pct * w, weight + w)
    });
    (weighted_sum / 100.0, weight)
}

fn performance(source: &impl GradeSource, student: &StudentNumber) -> anyhow::Result<String> {
    let grades = source.find_all_grades(student)?;
    let Some(summary) = grading::performance_summary(&grades) else {
        return Ok("No grades recorded yet.".to_string());
    };

    Ok(format!(
        "Performance Summary:\nGPA: {}\nBest Subject: {}\nNeeds Improvement: {}",
        summary.gpa, summary.best_subject, summary.worst_subject
    ))
}

fn projection(
    source: &impl GradeSource,
    target: LetterGrade,
    subject_name: &str,
    student: &StudentNumber,
) -> anyhow::Result<String> {
    let mut grades = Vec::new();
    for subject in source.find_subjects(subject_name, None)? {
        grades.extend(source.find_grades(student, subject.id)?);
    }

    if grades.is_empty() {
        return Ok(format!(
            "No grades found for {subject_name} to base a prediction on."
        ));
    }

    let (points, weight) = weighted_points(&grades);
    Ok(grading::project(points, weight, target).to_string())
}
