//! Task runner: schedules response tasks onto background workers

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::request::RequestSpec;
use crate::task::ResponseTask;
use crate::transport::Transport;

type Registry = Arc<Mutex<HashMap<u64, Arc<ResponseTask>>>>;

/// A fired request: its reference id and the task executing it
#[derive(Debug, Clone)]
pub struct Submission {
    pub reference_id: u64,
    pub task: Arc<ResponseTask>,
}

/// TaskRunner fires requests on background workers
///
/// Flow:
/// 1. Caller calls `runner.submit(&spec)`
/// 2. Runner validates the spec (no id is consumed on failure)
/// 3. Runner assigns the next reference id and copies the spec into a task
/// 4. The task runs on its own Tokio task, in parallel with everything else
/// 5. When the task settles it is announced once on the completion channel
///
/// There is no limit on concurrent tasks and no ordering between them beyond
/// reference ids following submission order.
pub struct TaskRunner {
    transport: Arc<dyn Transport>,
    next_reference: AtomicU64,
    in_flight: Registry,
    completions: Option<mpsc::UnboundedSender<Arc<ResponseTask>>>,
}

impl TaskRunner {
    /// Runner without a completion channel; use [`ResponseTask::wait`]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            next_reference: AtomicU64::new(1),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            completions: None,
        }
    }

    /// Runner that announces every settled task on the returned receiver
    pub fn with_completions(
        transport: Arc<dyn Transport>,
    ) -> (Self, mpsc::UnboundedReceiver<Arc<ResponseTask>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let runner = Self {
            completions: Some(tx),
            ..Self::new(transport)
        };
        (runner, rx)
    }

    /// Fire a request.
    ///
    /// Validation failures (`NotActionable`, `MalformedEndpoint`) are returned
    /// here and no task is created. Otherwise returns immediately with the
    /// reference id and the task handle.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, spec: &RequestSpec) -> Result<Submission> {
        let url = spec.validate().inspect_err(|e| {
            warn!(error = %e, "Request rejected");
        })?;

        let reference_id = self.next_reference.fetch_add(1, Ordering::Relaxed);
        let task = Arc::new(ResponseTask::new(reference_id, spec));

        lock(&self.in_flight).insert(reference_id, Arc::clone(&task));

        let transport = Arc::clone(&self.transport);
        let in_flight = Arc::clone(&self.in_flight);
        let completions = self.completions.clone();
        let worker_task = Arc::clone(&task);

        tokio::spawn(async move {
            let running = Arc::clone(&worker_task);
            let worker = tokio::spawn(async move { running.run(transport.as_ref()).await });

            if let Err(e) = worker.await {
                error!(reference_id, error = %e, "Worker aborted");
                worker_task.abandon(e.to_string());
            }

            lock(&in_flight).remove(&reference_id);

            if let Some(tx) = completions {
                if tx.send(worker_task).is_err() {
                    debug!(reference_id, "Completion receiver dropped");
                }
            }
        });

        info!(reference_id, method = spec.method(), %url, "Request submitted");

        Ok(Submission { reference_id, task })
    }

    /// Cancel an in-flight request.
    ///
    /// Returns false when the id is unknown or the task already settled.
    pub fn cancel(&self, reference_id: u64) -> bool {
        let task = lock(&self.in_flight).get(&reference_id).cloned();

        match task {
            Some(task) => {
                let cancelled = task.cancel();
                if cancelled {
                    info!(reference_id, "Cancellation requested");
                }
                cancelled
            }
            None => {
                debug!(reference_id, "Cancel ignored, task not in flight");
                false
            }
        }
    }

    /// Look up a task that has not settled yet
    pub fn get(&self, reference_id: u64) -> Option<Arc<ResponseTask>> {
        lock(&self.in_flight).get(&reference_id).cloned()
    }

    /// Reference ids of tasks still running, ascending
    pub fn in_flight(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = lock(&self.in_flight).keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
