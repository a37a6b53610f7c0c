//! Bounded background execution for accepted commands.
//!
//! Every accepted invocation becomes one tokio task. A semaphore caps how many
//! run at once; the rest wait for a permit without blocking the HTTP handler.
//! Each task ends by posting exactly one notification to the originating channel.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use slackbridge_core::{BridgeError, CommandInvocation, Messenger, OutboundNotification};
use tokio::sync::{oneshot, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub type CommandWork = BoxFuture<'static, Result<String, BridgeError>>;

pub struct CommandJob {
    pub invocation: CommandInvocation,
    pub failure_prefix: &'static str,
    pub work: CommandWork,
}

impl CommandJob {
    pub fn new(
        invocation: CommandInvocation,
        failure_prefix: &'static str,
        work: CommandWork,
    ) -> Self {
        Self { invocation, failure_prefix, work }
    }

    /// A job that only posts `text`, used for usage replies.
    pub fn notice(invocation: CommandInvocation, text: impl Into<String>) -> Self {
        let text = text.into();
        let work: CommandWork = Box::pin(async move { Ok::<_, BridgeError>(text) });
        Self { invocation, failure_prefix: "", work }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskOutcome {
    pub request_id: String,
    pub status: TaskStatus,
    pub notification: OutboundNotification,
    pub delivered: bool,
}

pub struct TaskHandle {
    request_id: String,
    outcome: oneshot::Receiver<TaskOutcome>,
}

impl TaskHandle {
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Resolves once the task has posted (or failed to post) its notification.
    /// `None` means the task was aborted before finishing.
    pub async fn outcome(self) -> Option<TaskOutcome> {
        self.outcome.await.ok()
    }
}

pub struct TaskRunner {
    messenger: Arc<dyn Messenger>,
    permits: Arc<Semaphore>,
    tasks: Mutex<JoinSet<()>>,
}

impl TaskRunner {
    pub fn new(messenger: Arc<dyn Messenger>, max_in_flight: usize) -> Self {
        Self {
            messenger,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Schedules the job and returns immediately. Must be called inside a tokio runtime.
    pub fn submit(&self, job: CommandJob) -> TaskHandle {
        let (sender, receiver) = oneshot::channel();
        let request_id = job.invocation.request_id.clone();
        let messenger = Arc::clone(&self.messenger);
        let permits = Arc::clone(&self.permits);

        let mut tasks = match self.tasks.lock() {
            Ok(tasks) => tasks,
            Err(poisoned) => poisoned.into_inner(),
        };
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            let outcome = run_job(job, messenger.as_ref(), permits).await;
            let _ = sender.send(outcome);
        });
        drop(tasks);

        debug!(correlation_id = %request_id, "background task submitted");
        TaskHandle { request_id, outcome: receiver }
    }

    /// Waits up to `grace` for in-flight tasks; anything still running is aborted.
    /// Returns `true` when every task finished in time.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        let mut tasks = {
            let mut guard = match self.tasks.lock() {
                Ok(tasks) => tasks,
                Err(poisoned) => poisoned.into_inner(),
            };
            std::mem::take(&mut *guard)
        };
        let pending = tasks.len();

        let drained = tokio::time::timeout(grace, async {
            while tasks.join_next().await.is_some() {}
        })
        .await
        .is_ok();

        if drained {
            info!(
                event_name = "system.runner.drained",
                correlation_id = "shutdown",
                pending,
                "background tasks drained"
            );
        } else {
            warn!(
                event_name = "system.runner.drain_timeout",
                correlation_id = "shutdown",
                remaining = tasks.len(),
                "aborting background tasks still running after grace period"
            );
            tasks.abort_all();
        }
        drained
    }
}

async fn run_job(
    job: CommandJob,
    messenger: &dyn Messenger,
    permits: Arc<Semaphore>,
) -> TaskOutcome {
    let CommandJob { invocation, failure_prefix, work } = job;
    // The semaphore is never closed.
    let _permit = permits.acquire_owned().await.ok();

    let (status, text) = match work.await {
        Ok(text) => (TaskStatus::Succeeded, text),
        Err(error) => {
            warn!(
                event_name = "task.command.failed",
                correlation_id = %invocation.request_id,
                command = %invocation.command,
                error_kind = error.kind().as_str(),
                error = %error,
                "command workflow failed"
            );
            (TaskStatus::Failed, format!("{failure_prefix} {error}"))
        }
    };

    let notification = invocation.notify(text);
    let delivered = match messenger.post(&notification).await {
        Ok(()) => true,
        Err(error) => {
            warn!(
                event_name = "egress.slack.post_failed",
                correlation_id = %invocation.request_id,
                channel_id = %invocation.channel_id,
                error = %error,
                "failed to deliver notification"
            );
            false
        }
    };

    info!(
        event_name = "task.command.completed",
        correlation_id = %invocation.request_id,
        command = %invocation.command,
        status = status.as_str(),
        delivered,
        "background task completed"
    );

    TaskOutcome { request_id: invocation.request_id, status, notification, delivered }
}
