use std::fmt;
use std::path::PathBuf;

use course_core::model::{
    Catalog, GateRejection, LessonSession, Ordinal, PASS_THRESHOLD_PERCENT, StepMove,
    SubmitOutcome,
};
use course_core::reachability::Reachability;
use services::{AppServices, Clock, LessonCompletion, LessonFlowError, load_catalog, parse_catalog};
use tracing::warn;
use tracing_subscriber::EnvFilter;

const BUNDLED_CATALOG: &str = include_str!("../assets/catalog.json");

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    MissingOrdinal,
    InvalidOrdinal { raw: String },
    InvalidAnswers { raw: String },
    TooManyAnswers { expected: usize, found: usize },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::MissingOrdinal => write!(f, "lesson requires a lesson number"),
            ArgsError::InvalidOrdinal { raw } => write!(f, "invalid lesson number: {raw}"),
            ArgsError::InvalidAnswers { raw } => {
                write!(f, "invalid --answers value (expected e.g. 0,2,1): {raw}")
            }
            ArgsError::TooManyAnswers { expected, found } => {
                write!(f, "--answers has {found} values but the quiz has {expected} questions")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  course status                              [--db <sqlite_url>] [--catalog <path>]");
    eprintln!("  course lesson <n> [--answers <i,j,...>]    [--db <sqlite_url>] [--catalog <path>]");
    eprintln!("  course reset --yes                         [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://course.sqlite3");
    eprintln!("  --catalog <bundled course>");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  COURSE_DB_URL, COURSE_CATALOG, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Status,
    Lesson {
        ordinal: Ordinal,
        answers: Option<Vec<usize>>,
    },
    Reset {
        confirmed: bool,
    },
}

#[derive(Debug)]
struct Args {
    db_url: String,
    catalog: Option<PathBuf>,
    command: Command,
}

impl Args {
    fn parse(argv: Vec<String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("COURSE_DB_URL")
            .ok()
            .map_or_else(|| normalize_sqlite_url("course.sqlite3".into()), normalize_sqlite_url);
        let mut catalog = std::env::var("COURSE_CATALOG").ok().map(PathBuf::from);

        let mut args = argv.into_iter().peekable();
        // No subcommand (or flags only) means `status`.
        let has_subcommand = args.peek().is_some_and(|first| !first.starts_with("--"));
        let command_name = if has_subcommand {
            args.next().unwrap_or_default()
        } else {
            "status".to_string()
        };

        let mut ordinal: Option<Ordinal> = None;
        let mut answers: Option<Vec<usize>> = None;
        let mut confirmed = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--catalog" => {
                    catalog = Some(PathBuf::from(require_value(&mut args, "--catalog")?));
                }
                "--answers" if command_name == "lesson" => {
                    let value = require_value(&mut args, "--answers")?;
                    answers = Some(parse_answers(&value)?);
                }
                "--yes" if command_name == "reset" => confirmed = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                raw if command_name == "lesson" && ordinal.is_none() && !raw.starts_with("--") => {
                    ordinal = Some(raw.parse().map_err(|_| ArgsError::InvalidOrdinal {
                        raw: raw.to_string(),
                    })?);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let command = match command_name.as_str() {
            "status" => Command::Status,
            "lesson" => Command::Lesson {
                ordinal: ordinal.ok_or(ArgsError::MissingOrdinal)?,
                answers,
            },
            "reset" => Command::Reset { confirmed },
            other => return Err(ArgsError::UnknownCommand(other.to_string())),
        };

        Ok(Self {
            db_url,
            catalog,
            command,
        })
    }
}

fn parse_answers(raw: &str) -> Result<Vec<usize>, ArgsError> {
    raw.split(',')
        .map(|part| part.trim().parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ArgsError::InvalidAnswers {
            raw: raw.to_string(),
        })
}

/// Missing answers are left for the quiz to report; extra ones are an input error.
fn check_answer_count(expected: usize, answers: &[usize]) -> Result<(), ArgsError> {
    if answers.len() > expected {
        return Err(ArgsError::TooManyAnswers {
            expected,
            found: answers.len(),
        });
    }
    Ok(())
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn load_course(path: Option<&PathBuf>) -> Result<Catalog, Box<dyn std::error::Error>> {
    let catalog = match path {
        Some(path) => load_catalog(path)?,
        None => parse_catalog(BUNDLED_CATALOG)?,
    };
    Ok(catalog)
}

fn print_status(app: &AppServices) {
    let overview = app.progress().overview(&app.catalog());
    for row in &overview.lessons {
        let marker = match row.status {
            Reachability::Completed => "[x]",
            Reachability::Current => "[>]",
            Reachability::Locked => "[ ]",
        };
        println!(
            "{marker} {:>2}. {:<32} {}",
            row.ordinal.value(),
            row.title,
            row.status.label()
        );
    }
    println!(
        "{}/{} lessons completed ({}%)",
        overview.completed,
        overview.total,
        overview.percent()
    );
    if overview.is_finished() {
        println!("Course finished.");
    }
}

fn run_quiz(
    session: &mut LessonSession,
    answers: Option<&[usize]>,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(questions) = session.questions().cloned() else {
        return Ok(());
    };
    let Some(answers) = answers else {
        println!(
            "This lesson ends with a {}-question check; pass it with --answers.",
            questions.len()
        );
        return Ok(());
    };

    check_answer_count(questions.len(), answers)?;
    for (index, option) in answers.iter().enumerate() {
        session.answer(index, *option)?;
    }

    match session.submit_quiz()? {
        SubmitOutcome::Incomplete { unanswered } => {
            println!("{unanswered} question(s) still unanswered; quiz not submitted.");
        }
        SubmitOutcome::Scored(outcome) => {
            println!(
                "Score: {}/{} ({}%)",
                outcome.correct(),
                outcome.total(),
                outcome.percent()
            );
            if let Some(quiz) = session.quiz() {
                for missed in quiz.missed(&questions) {
                    println!("  Q{}: {}", missed.index + 1, missed.question.prompt);
                    if let Some(explanation) = missed.explanation() {
                        println!("      {explanation}");
                    }
                }
            }
        }
    }
    Ok(())
}

async fn run_lesson(
    app: &mut AppServices,
    ordinal: Ordinal,
    answers: Option<&[usize]>,
) -> Result<(), Box<dyn std::error::Error>> {
    let lessons = app.lessons();
    let mut session = match lessons.open_lesson(app.progress(), ordinal) {
        Ok(session) => session,
        Err(LessonFlowError::Locked(ordinal)) => {
            println!("Lesson {ordinal} is locked. Finish the earlier lessons first.");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    if let Some(lesson) = lessons.catalog().get(ordinal) {
        println!("Lesson {ordinal}: {}", lesson.title);
    }
    println!("  step {}/{}", session.current_step(), session.total_steps());
    while let StepMove::Moved(step) = session.next()? {
        println!("  step {step}/{}", session.total_steps());
    }

    run_quiz(&mut session, answers)?;

    match lessons.complete_lesson(app.progress_mut(), &mut session).await {
        Ok(LessonCompletion::Recorded(event)) => {
            println!("Lesson {} completed.", event.ordinal);
        }
        Ok(LessonCompletion::Rejected(GateRejection::QuizNotPassed)) => {
            println!("Score at least {PASS_THRESHOLD_PERCENT}% to continue.");
        }
        Ok(LessonCompletion::Rejected(GateRejection::NotOnFinalStep { current, total })) => {
            println!("Finish all steps first ({current}/{total}).");
        }
        Err(LessonFlowError::Progress(err)) => {
            eprintln!("warning: {err}. Your progress may not survive a restart.");
        }
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let parsed = Args::parse(argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let catalog = load_course(parsed.catalog.as_ref())?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    // An unusable database path is not fatal; services fall back to unsaved progress.
    if let Err(err) = prepare_sqlite_file(&parsed.db_url) {
        warn!(db_url = %parsed.db_url, error = %err, "could not prepare progress database");
    }
    let mut app = AppServices::new_sqlite(&parsed.db_url, catalog, Clock::system()).await;

    match parsed.command {
        Command::Status => print_status(&app),
        Command::Lesson { ordinal, answers } => {
            run_lesson(&mut app, ordinal, answers.as_deref()).await?;
        }
        Command::Reset { confirmed: false } => {
            println!("Reset erases all progress and cannot be undone. Re-run with --yes to confirm.");
        }
        Command::Reset { confirmed: true } => match app.progress_mut().reset().await {
            Ok(()) => println!("Progress cleared."),
            Err(err) => eprintln!("warning: {err}. The reset may not survive a restart."),
        },
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,services=info,storage=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
