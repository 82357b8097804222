use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod db;
mod grading;
mod import;
mod interpreter;
mod models;
mod report;
mod store;

use grading::LetterGrade;
use models::StudentNumber;
use store::{GradeSource, Snapshot};

#[derive(Parser)]
#[command(name = "gradebook-assistant")]
#[command(about = "Answers questions about student grades and performance", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DataSource {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,
    /// Directory holding subjects.csv, assessments.csv and grades.csv; takes
    /// precedence over the database
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question in plain English
    Ask {
        #[arg(long)]
        student: StudentNumber,
        #[command(flatten)]
        source: DataSource,
        #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
        question: Vec<String>,
    },
    /// Print the GPA breakdown as JSON
    Gpa {
        #[arg(long)]
        student: StudentNumber,
        #[command(flatten)]
        source: DataSource,
    },
    /// Print the performance summary
    Summary {
        #[arg(long)]
        student: StudentNumber,
        #[command(flatten)]
        source: DataSource,
    },
    /// Work out the average needed on the remaining weight for a target letter
    Project {
        /// Average percentage achieved so far
        #[arg(long)]
        current_score: f64,
        /// Weight (out of 100) already graded
        #[arg(long)]
        current_weight: f64,
        #[arg(long, value_parser = parse_letter)]
        target: LetterGrade,
    },
    /// Write a markdown transcript
    Report {
        #[arg(long)]
        student: StudentNumber,
        #[command(flatten)]
        source: DataSource,
        #[arg(long, default_value = "transcript.md")]
        out: PathBuf,
    },
}

fn parse_letter(raw: &str) -> Result<LetterGrade, String> {
    LetterGrade::parse(raw).ok_or_else(|| format!("expected one of A, B, C, D, F, got {raw:?}"))
}

async fn load(source: &DataSource, student: &StudentNumber) -> anyhow::Result<Snapshot> {
    let snapshot = if let Some(dir) = &source.data_dir {
        import::load_dir(dir).with_context(|| format!("failed to load {}", dir.display()))?
    } else if let Some(url) = &source.database_url {
        let pool = db::connect(url).await?;
        db::load_snapshot(&pool, student).await?
    } else {
        bail!("no data source: pass --data-dir or set DATABASE_URL");
    };

    if snapshot.is_empty() {
        warn!("data source has no subjects or grades");
    }
    Ok(snapshot)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gradebook_assistant=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ask {
            student,
            source,
            question,
        } => {
            let question = question.join(" ");
            let answer = match load(&source, &student).await {
                Ok(snapshot) => interpreter::ask(&snapshot, &question, &student),
                Err(err) => interpreter::internal_error_response(&err),
            };
            println!("{answer}");
        }
        Commands::Gpa { student, source } => {
            let snapshot = load(&source, &student).await?;
            let grades = snapshot.find_all_grades(&student)?;
            let breakdown = grading::gpa_breakdown(&grades);
            println!("{}", serde_json::to_string_pretty(&breakdown)?);
        }
        Commands::Summary { student, source } => {
            let snapshot = load(&source, &student).await?;
            let grades = snapshot.find_all_grades(&student)?;
            match grading::performance_summary(&grades) {
                None => println!("No grades recorded yet."),
                Some(summary) => {
                    println!("{}", summary.text);
                    println!("Graded assessments: {}", summary.total_assessments);
                    println!("Needs improvement: {}", summary.worst_subject);
                }
            }
        }
        Commands::Project {
            current_score,
            current_weight,
            target,
        } => {
            println!(
                "{}",
                grading::projected_requirement(current_score, current_weight, target)
            );
        }
        Commands::Report {
            student,
            source,
            out,
        } => {
            let snapshot = load(&source, &student).await?;
            let today = chrono::Utc::now().date_naive();
            let transcript = report::build_transcript(&snapshot, &student, today)?;
            std::fs::write(&out, transcript)
                .with_context(|| format!("failed to write {}", out.display()))?;
            info!(path = %out.display(), %student, "transcript written");
            println!("Transcript written to {}.", out.display());
        }
    }

    Ok(())
}
