//! The replication orchestrator: expands directives into provisioning
//! tasks, runs them concurrently through the throttle gate, and aggregates
//! their outcomes.
//!
//! Every per-task error is converted to a [`TaskOutcome`] at the task
//! boundary; nothing escapes to terminate sibling tasks. The single global
//! signal is the fatal-abort flag, set once on rate-limit exhaustion: it
//! releases queued tasks immediately, without letting them sit out their
//! throttle slots, while in-flight mirrors run to completion, so no remote
//! is ever left half-pushed without a manifest decision.

use crate::config::ReplicationDirective;
use crate::errors::SourceError;
use crate::hosting::{ApiFailure, CreateRepoRequest, HostingApi, RateLimitSnapshot};
use crate::manifest::RollbackManifest;
use crate::naming::{resolve_name, NameGenerator};
use crate::source::source_key;
use crate::throttle::ThrottleGate;
use crate::workcopy::WorkingCopyManager;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio::task::JoinSet;

/// One concrete instance of provisioning a single target repository.
/// Derived from a directive during expansion; owned by its task.
#[derive(Debug, Clone)]
pub struct ProvisioningTask {
    pub url: String,
    pub organization: String,
    pub description: String,
    pub is_private: bool,
    pub index: u32,
    pub resolved_name: String,
    pub source_key: String,
}

/// Terminal state of one provisioning task.
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    /// Remote created and mirror pushed; recorded in the manifest.
    Created { organization: String, name: String },
    /// Recoverable failure, isolated to this task.
    Failed {
        organization: String,
        name: String,
        cause: String,
    },
    /// The global abort flag was set before this task reached the API.
    Aborted,
}

/// Aggregate result of one batch run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub aborted: usize,
    /// Set when the run was cut short by rate-limit exhaustion.
    pub fatal: Option<RateLimitSnapshot>,
}

impl RunSummary {
    pub fn is_fatal(&self) -> bool {
        self.fatal.is_some()
    }
}

/// One-way abort signal: set once on the fatal path, never cleared.
/// Tasks race it against their gate wait and observe it as soon as it
/// fires, even while queued.
struct AbortFlag {
    flag: AtomicBool,
    snapshot: Mutex<Option<RateLimitSnapshot>>,
    notify: Notify,
}

impl AbortFlag {
    fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
            snapshot: Mutex::new(None),
            notify: Notify::new(),
        }
    }

    fn trigger(&self, snapshot: RateLimitSnapshot) {
        // First writer wins; later rate-limit failures from in-flight
        // calls keep the original snapshot.
        if let Ok(mut slot) = self.snapshot.lock() {
            slot.get_or_insert(snapshot);
        }
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Resolves once the flag is set, whether the trigger happened before
    /// or after this call. The waiter is registered before the flag is
    /// re-checked, so the wakeup from `trigger` cannot be missed.
    async fn aborted(&self) {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_set() {
            return;
        }
        notified.await;
    }

    fn snapshot(&self) -> Option<RateLimitSnapshot> {
        self.snapshot.lock().ok().and_then(|s| s.clone())
    }
}

/// Expand directives into one task per requested copy.
///
/// Directives with `count == 0` are skipped entirely. Unnamed directives
/// invoke the generator once per copy, so their copies get unrelated
/// generated names rather than a shared stem with an index.
pub fn expand_tasks(
    directives: &[ReplicationDirective],
    generator: &dyn NameGenerator,
) -> Result<Vec<ProvisioningTask>, SourceError> {
    let mut tasks = Vec::new();
    for directive in directives {
        if directive.count == 0 {
            continue;
        }
        let key = source_key(&directive.url)?;
        for index in 1..=directive.count {
            tasks.push(ProvisioningTask {
                url: directive.url.clone(),
                organization: directive.organization.clone(),
                description: directive.description.clone(),
                is_private: directive.is_private,
                index,
                resolved_name: resolve_name(
                    directive.base_name(),
                    index,
                    directive.count,
                    generator,
                ),
                source_key: key.clone(),
            });
        }
    }
    Ok(tasks)
}

/// Runs a batch of provisioning tasks to completion.
pub struct Orchestrator {
    hosting: Arc<dyn HostingApi>,
    workcopy: Arc<WorkingCopyManager>,
    gate: Arc<ThrottleGate>,
    manifest: Arc<RollbackManifest>,
    abort: Arc<AbortFlag>,
}

impl Orchestrator {
    pub fn new(
        hosting: Arc<dyn HostingApi>,
        workcopy: Arc<WorkingCopyManager>,
        gate: Arc<ThrottleGate>,
        manifest: Arc<RollbackManifest>,
    ) -> Self {
        Self {
            hosting,
            workcopy,
            gate,
            manifest,
            abort: Arc::new(AbortFlag::new()),
        }
    }

    /// Run every task concurrently and join them all before reporting.
    ///
    /// The summary is only computed after every launched task has reached
    /// a terminal state; totals never race still-running work.
    pub async fn run(&self, tasks: Vec<ProvisioningTask>) -> RunSummary {
        let total = tasks.len();
        let mut set = JoinSet::new();

        for task in tasks {
            let hosting = self.hosting.clone();
            let workcopy = self.workcopy.clone();
            let gate = self.gate.clone();
            let manifest = self.manifest.clone();
            let abort = self.abort.clone();
            set.spawn(async move {
                execute_task(task, hosting, workcopy, gate, manifest, abort).await
            });
        }

        let mut summary = RunSummary {
            total,
            succeeded: 0,
            failed: 0,
            aborted: 0,
            fatal: None,
        };

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(TaskOutcome::Created { .. }) => summary.succeeded += 1,
                Ok(TaskOutcome::Failed { .. }) => summary.failed += 1,
                Ok(TaskOutcome::Aborted) => summary.aborted += 1,
                Err(e) => {
                    // A panicked task still counts against the batch.
                    eprintln!("Provisioning task panicked: {}", e);
                    summary.failed += 1;
                }
            }
        }

        summary.fatal = self.abort.snapshot();
        summary
    }
}

/// Drive one task through its states: throttle wait, remote creation,
/// mirroring, and terminal outcome.
async fn execute_task(
    task: ProvisioningTask,
    hosting: Arc<dyn HostingApi>,
    workcopy: Arc<WorkingCopyManager>,
    gate: Arc<ThrottleGate>,
    manifest: Arc<RollbackManifest>,
    abort: Arc<AbortFlag>,
) -> TaskOutcome {
    // A fatal failure elsewhere releases every queued task at once: the
    // gate wait is raced against the abort signal, so aborted tasks never
    // consume a throttle slot or sit out its pacing sleep.
    tokio::select! {
        biased;
        _ = abort.aborted() => return TaskOutcome::Aborted,
        _ = gate.acquire() => {}
    }
    if abort.is_set() {
        return TaskOutcome::Aborted;
    }

    println!(
        "    Creating target repository {} in organization {}",
        task.resolved_name, task.organization
    );

    let request = CreateRepoRequest {
        name: task.resolved_name.clone(),
        description: task.description.clone(),
        private: task.is_private,
    };

    if let Err(failure) = hosting.create_repo(&task.organization, &request).await {
        report_api_failure(&task, &failure);
        if failure.is_rate_limit() {
            if let Some(snapshot) = failure.rate_limit() {
                abort.trigger(snapshot.clone());
            }
        }
        return TaskOutcome::Failed {
            organization: task.organization,
            name: task.resolved_name,
            cause: failure.to_string(),
        };
    }

    // Remote exists from here on. A mirror failure leaves it empty; that
    // is a known, accepted inconsistency and the entry is not manifested.
    let local_path = match workcopy.ensure_cloned(&task.source_key, &task.url).await {
        Ok(path) => path,
        Err(e) => {
            eprintln!(
                "Error processing {}/{}\n    {}",
                task.organization, task.resolved_name, e
            );
            return TaskOutcome::Failed {
                organization: task.organization,
                name: task.resolved_name,
                cause: e.to_string(),
            };
        }
    };

    if let Err(e) = workcopy
        .publish(&local_path, &task.organization, &task.resolved_name)
        .await
    {
        eprintln!(
            "Error processing {}/{}\n    {}",
            task.organization, task.resolved_name, e
        );
        return TaskOutcome::Failed {
            organization: task.organization,
            name: task.resolved_name,
            cause: e.to_string(),
        };
    }

    manifest.record(&task.organization, &task.resolved_name);
    TaskOutcome::Created {
        organization: task.organization,
        name: task.resolved_name,
    }
}

/// Print per-failure detail as it occurs, including the rate-limit header
/// diagnostics GitHub attaches to a 403.
fn report_api_failure(task: &ProvisioningTask, failure: &ApiFailure) {
    eprintln!(
        "Error processing {}/{}",
        task.organization, task.resolved_name
    );
    eprintln!("    {}", failure);

    if let ApiFailure::Status { errors, .. } = failure {
        for message in errors {
            eprintln!("    {}", message);
        }
    }

    if failure.is_rate_limit() {
        if let Some(s) = failure.rate_limit() {
            eprintln!(
                "    x-ratelimit-limit: {}   Maximum number of requests permitted per hour",
                s.limit
            );
            eprintln!(
                "    x-ratelimit-remaining: {}   Requests remaining in the current window",
                s.remaining
            );
            eprintln!(
                "    x-ratelimit-used: {}   Requests made in the current window",
                s.used
            );
            eprintln!(
                "    x-ratelimit-reset: {}   Window reset in UTC epoch seconds",
                s.reset_epoch_secs
            );
            eprintln!("    local reset time: {}", s.reset_local_time());
            eprintln!("*** Aborting: rate limit exhausted, no further repositories will be created.");
        }
    }
}
