use std::sync::Arc;

use clap::Parser;
use skilltree_quiz::api::connection::{Connection, RecordAttempt, ValidateContent};
use skilltree_quiz::commands::Command;
use skilltree_quiz::render;
use skilltree_quiz::runner::{QuizRunner, RunnerSettings, StartOutcome, SubmitOutcome};
use skilltree_quiz::{HandlerResult, Settings};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::instrument;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;

/// Takes a skills quiz or survey from the terminal.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Id of the quiz or survey to take.
    quiz_id: String,
}

enum Flow {
    Continue,
    Finished,
    Cancel,
}

#[tokio::main]
async fn main() -> HandlerResult {
    let args = Args::parse();
    let settings = Settings::from_env()?;

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(settings.log_level.parse::<LevelFilter>()?)
        .json()
        .with_span_events(FmtSpan::ENTER)
        .log_internal_errors(true)
        .with_line_number(true)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;

    let connection = Arc::new(Connection::connect(&settings)?);
    log::info!("Starting quiz runner against {}", settings.api_url);

    let started = QuizRunner::start(
        Arc::clone(&connection),
        &args.quiz_id,
        RunnerSettings::from(&settings),
    )
    .await?;
    let mut runner = match started {
        StartOutcome::Ready(runner) => runner,
        StartOutcome::AlreadyCompleted(quiz) => {
            println!("{}", render::already_completed(&quiz));
            return Ok(());
        }
    };

    println!("{}\n{}", render::splash(runner.quiz()), runner.quiz());
    println!("Enter /help to see usages.");

    let mut agreement_shown = false;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    runner.cancel();
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match handle_line(&mut runner, &line).await {
                    Flow::Continue => {}
                    Flow::Finished => break,
                    Flow::Cancel => {
                        println!("Cancelling the attempt");
                        runner.cancel();
                        break;
                    }
                }
            }
            question = runner.next_check() => {
                println!("{}", render::check_update(runner.state(), question));
            }
        }

        if !agreement_shown && connection.user_agreement().is_raised() {
            println!("Please review and accept the updated user agreement.");
            agreement_shown = true;
        }
    }

    Ok(())
}

#[instrument(level = "info", skip(runner))]
async fn handle_line<B>(runner: &mut QuizRunner<B>, line: &str) -> Flow
where
    B: RecordAttempt + ValidateContent + Send + Sync + 'static,
{
    let command = match Command::parse_line(line) {
        Ok(command) => command,
        Err(e) => {
            log::info!("Invalid input '{}'", line);
            println!("{e}");
            return Flow::Continue;
        }
    };

    let edited = match command {
        Command::Help => {
            println!("{}", Command::descriptions());
            return Flow::Continue;
        }
        Command::Cancel => return Flow::Cancel,
        Command::Status => {
            println!("{}", render::status(runner.quiz(), runner.state()));
            return Flow::Continue;
        }
        Command::Submit => {
            println!("Submitting...");
            return match runner.submit().await {
                Ok(outcome) => {
                    println!("{}", render::outcome(runner.quiz(), &outcome));
                    match outcome {
                        SubmitOutcome::Completed { .. } => Flow::Finished,
                        SubmitOutcome::Rejected { .. } => Flow::Continue,
                    }
                }
                Err(e) => {
                    log::error!("Submit failed: {}", e);
                    println!("{e}");
                    Flow::Continue
                }
            };
        }
        Command::Select { question, option } => runner.select_option(question, option),
        Command::Text { question, words } => runner.set_text(question, words.join(" ")),
        Command::Clear { question } => runner.clear_answer(question),
    };

    if let Err(e) = edited {
        println!("{e}");
    }
    Flow::Continue
}
