//! CLI command implementations.
//!
//! | Function   | Command handled                                        |
//! |------------|--------------------------------------------------------|
//! | `cmd_run`  | `run` — provision the whole batch                      |
//! | `cmd_plan` | `plan` — expand directives without touching anything   |

use repogen::config::{self, RunSettings};
use repogen::hosting::GitHubClient;
use repogen::manifest::RollbackManifest;
use repogen::naming::RandomNameGenerator;
use repogen::orchestrator::{expand_tasks, Orchestrator, RunSummary};
use repogen::throttle::ThrottleGate;
use repogen::workcopy::{SystemGit, WorkingCopyManager};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

/// Exit status for a fatal rate-limit abort, distinct from the generic
/// precondition failure status.
const EXIT_FATAL_ABORT: u8 = 2;
const EXIT_PRECONDITION: u8 = 1;

/// Provision the full batch: prerequisite checks, expansion, concurrent
/// execution, cleanup, manifest flush, summary.
pub async fn cmd_run(settings: &RunSettings) -> ExitCode {
    let start = Instant::now();

    if let Err(e) = config::ensure_git() {
        eprintln!("{}", e);
        return ExitCode::from(EXIT_PRECONDITION);
    }
    let token = match config::load_token() {
        Ok(token) => token,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(EXIT_PRECONDITION);
        }
    };
    let directives = match config::load_directives(&settings.config_path) {
        Ok(directives) => directives,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(EXIT_PRECONDITION);
        }
    };

    for directive in directives.iter().filter(|d| d.count > 0) {
        println!(
            "Processing source repository {} {} time(s)",
            directive.url, directive.count
        );
    }

    let tasks = match expand_tasks(&directives, &RandomNameGenerator) {
        Ok(tasks) => tasks,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(EXIT_PRECONDITION);
        }
    };

    let hosting = match GitHubClient::new(token) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            eprintln!("Failed to build the GitHub HTTP client: {}", e);
            return ExitCode::from(EXIT_PRECONDITION);
        }
    };

    let workcopy = Arc::new(WorkingCopyManager::new(
        settings.cache_dir.clone(),
        Arc::new(SystemGit),
    ));
    let manifest = Arc::new(RollbackManifest::new());
    let orchestrator = Orchestrator::new(
        hosting,
        workcopy.clone(),
        Arc::new(ThrottleGate::new(settings.throttle_interval)),
        manifest.clone(),
    );

    println!("Processing, please wait...\n");
    let summary = orchestrator.run(tasks).await;

    workcopy.teardown_all();

    match manifest.flush(&settings.manifest_dir) {
        Ok(Some(path)) => println!("{} created\n", path.display()),
        Ok(None) => {}
        Err(e) => eprintln!("Failed to write rollback manifest: {:#}", e),
    }

    print_summary(&summary, start.elapsed().as_secs_f64() / 60.0);

    if summary.is_fatal() {
        ExitCode::from(EXIT_FATAL_ABORT)
    } else {
        ExitCode::SUCCESS
    }
}

/// Expand the directives and print what would run, without touching the
/// network or the filesystem cache.
pub fn cmd_plan(settings: &RunSettings) -> ExitCode {
    let directives = match config::load_directives(&settings.config_path) {
        Ok(directives) => directives,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(EXIT_PRECONDITION);
        }
    };

    let tasks = match expand_tasks(&directives, &RandomNameGenerator) {
        Ok(tasks) => tasks,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(EXIT_PRECONDITION);
        }
    };

    if tasks.is_empty() {
        println!("Nothing to do: every directive has count 0.");
        return ExitCode::SUCCESS;
    }

    println!("{} task(s) would run:", tasks.len());
    for task in &tasks {
        println!(
            "    {}/{}  (source {}, copy {})",
            task.organization, task.resolved_name, task.source_key, task.index
        );
    }
    ExitCode::SUCCESS
}

fn print_summary(summary: &RunSummary, minutes: f64) {
    println!("repogen duration in minutes: {:.1}", minutes);
    let mut line = format!(
        "Total repositories processed: {}, {} successful, {} failures",
        summary.total, summary.succeeded, summary.failed
    );
    if summary.aborted > 0 {
        line.push_str(&format!(", {} aborted", summary.aborted));
    }
    println!("{}", line);
}
