//! Waiting on platform tasks
//!
//! Create, edit and delete calls start an asynchronous task and return its
//! UUID. [`wait_for_task`] polls it until it reaches a terminal status or the
//! operation's deadline passes.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::time::Instant;

use crate::error::ApiError;
use crate::models::{SubtaskFailure, TaskStatus};

/// Default time between two task polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Task queries used while waiting
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn task_status(&self, task_uuid: &str) -> Result<TaskStatus, ApiError>;

    async fn failed_subtasks(&self, task_uuid: &str) -> Result<Vec<SubtaskFailure>, ApiError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskOutcome {
    Succeeded,
    Failed,
    Running,
}

fn classify(status: &str) -> TaskOutcome {
    match status {
        "Success" => TaskOutcome::Succeeded,
        "Failure" | "Aborted" => TaskOutcome::Failed,
        _ => TaskOutcome::Running,
    }
}

/// Block until the task succeeds, fails or `timeout` elapses.
///
/// A failed task surfaces the error strings of its failed sub-tasks. Sleeps
/// are cut short so the last poll happens at the deadline, and a status call
/// still pending at the deadline is abandoned.
pub async fn wait_for_task<A: TaskApi + ?Sized>(
    api: &A,
    task_uuid: &str,
    timeout: Duration,
    interval: Duration,
) -> Result<(), ApiError> {
    let deadline = Instant::now() + timeout;
    let timed_out = || ApiError::TaskTimeout {
        task_uuid: task_uuid.to_string(),
        timeout,
    };

    loop {
        // A status call that hangs must not outlive the deadline
        let remaining = deadline.saturating_duration_since(Instant::now());
        let task = tokio::time::timeout(remaining, api.task_status(task_uuid))
            .await
            .map_err(|_| timed_out())??;
        debug!(
            "Task {} ({}) is {} at {}%",
            task_uuid,
            task.title.as_deref().unwrap_or("untitled"),
            task.status,
            task.percent.unwrap_or_default()
        );

        match classify(&task.status) {
            TaskOutcome::Succeeded => return Ok(()),
            TaskOutcome::Failed => {
                let details = failure_details(api, task_uuid).await;
                return Err(ApiError::TaskFailed {
                    task_uuid: task_uuid.to_string(),
                    status: task.status,
                    details,
                });
            }
            TaskOutcome::Running => {}
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(timed_out());
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

async fn failure_details<A: TaskApi + ?Sized>(api: &A, task_uuid: &str) -> String {
    match api.failed_subtasks(task_uuid).await {
        Ok(subtasks) => {
            let errors: Vec<String> = subtasks
                .into_iter()
                .filter_map(|s| s.error_string)
                .filter(|e| !e.is_empty())
                .collect();
            if errors.is_empty() {
                "no failure details reported".to_string()
            } else {
                errors.join("; ")
            }
        }
        Err(e) => {
            warn!("Failed to fetch failure details of task {}: {}", task_uuid, e);
            "failure details unavailable".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a fixed sequence of statuses, repeating the last one
    struct ScriptedTasks {
        statuses: Mutex<Vec<&'static str>>,
        polls: AtomicUsize,
        subtasks: Vec<SubtaskFailure>,
    }

    impl ScriptedTasks {
        fn new(statuses: &[&'static str]) -> Self {
            Self {
                statuses: Mutex::new(statuses.iter().rev().copied().collect()),
                polls: AtomicUsize::new(0),
                subtasks: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl TaskApi for ScriptedTasks {
        async fn task_status(&self, _task_uuid: &str) -> Result<TaskStatus, ApiError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let mut statuses = self.statuses.lock().unwrap();
            let status = if statuses.len() > 1 {
                statuses.pop().unwrap()
            } else {
                statuses[0]
            };
            Ok(TaskStatus {
                status: status.to_string(),
                percent: Some(50.0),
                title: Some("Creating universe".to_string()),
            })
        }

        async fn failed_subtasks(&self, _task_uuid: &str) -> Result<Vec<SubtaskFailure>, ApiError> {
            Ok(self.subtasks.clone())
        }
    }

    #[tokio::test]
    async fn test_wait_until_success() {
        let api = ScriptedTasks::new(&["Created", "Running", "Success"]);
        wait_for_task(&api, "t-1", Duration::from_secs(5), Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(api.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failure_reports_subtask_errors() {
        let mut api = ScriptedTasks::new(&["Running", "Failure"]);
        api.subtasks = vec![
            SubtaskFailure {
                error_string: Some("Node n1 unreachable".to_string()),
                sub_task_type: Some("AnsibleSetupServer".to_string()),
            },
            SubtaskFailure {
                error_string: Some("Node n2 unreachable".to_string()),
                sub_task_type: None,
            },
        ];

        let err = wait_for_task(&api, "t-1", Duration::from_secs(5), Duration::from_millis(10))
            .await
            .unwrap_err();
        match err {
            ApiError::TaskFailed {
                status, details, ..
            } => {
                assert_eq!(status, "Failure");
                assert_eq!(details, "Node n1 unreachable; Node n2 unreachable");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_aborted_is_terminal() {
        let api = ScriptedTasks::new(&["Aborted"]);
        let err = wait_for_task(&api, "t-1", Duration::from_secs(5), Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::TaskFailed { .. }));
        assert_eq!(api.polls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_respects_deadline() {
        let api = ScriptedTasks::new(&["Running"]);
        let started = std::time::Instant::now();

        let err = wait_for_task(&api, "t-1", Duration::from_secs(1), Duration::from_millis(300))
            .await
            .unwrap_err();

        let elapsed = started.elapsed();
        assert!(matches!(err, ApiError::TaskTimeout { .. }));
        assert!(elapsed >= Duration::from_secs(1), "returned early: {elapsed:?}");
        assert!(elapsed < Duration::from_millis(1500), "overshot: {elapsed:?}");
    }

    #[tokio::test]
    async fn test_slow_status_call_is_cut_at_deadline() {
        use crate::client::YbaClient;
        use ::httpmock::prelude::*;
        use serde_json::json;

        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/customers/c-1/tasks/t-1");
            then.status(200)
                .delay(Duration::from_secs(4))
                .json_body(json!({"status": "Running", "percent": 10.0}));
        });
        let api = YbaClient::with_base_url(server.base_url()).customer("c-1", "token");
        let started = std::time::Instant::now();

        let err = wait_for_task(&api, "t-1", Duration::from_secs(1), Duration::from_millis(100))
            .await
            .unwrap_err();

        let elapsed = started.elapsed();
        assert!(matches!(err, ApiError::TaskTimeout { .. }));
        assert!(elapsed < Duration::from_millis(1500), "overshot: {elapsed:?}");
    }

    #[test]
    fn test_unknown_statuses_keep_polling() {
        assert_eq!(classify("Initializing"), TaskOutcome::Running);
        assert_eq!(classify("Abort"), TaskOutcome::Running);
        assert_eq!(classify("Success"), TaskOutcome::Succeeded);
    }
}
