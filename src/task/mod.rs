//! Response task: one fired request and its outcome
//!
//! A task moves `Pending -> Running -> Completed | Failed` exactly once.
//! Execution is four strictly ordered steps: prepare the client, invoke the
//! call (the only timed and the only suspending step), record the outcome,
//! release the client. Decoding the response into text is deferred until
//! [`ResponseTask::headers`] or [`ResponseTask::body`] is first called and
//! happens at most once.

mod decode;

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::request::RequestSpec;
use crate::transport::{
    ClientSettings, DecodedResponse, OutboundRequest, RawResponse, Transport, TransportError,
};

/// Why a task ended in [`TaskState::Failed`]
#[derive(Debug, Clone, Error)]
pub enum TaskFailure {
    #[error("client setup failed: {0}")]
    ClientSetup(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("request cancelled")]
    Cancelled,

    #[error("worker aborted: {0}")]
    Aborted(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskState {
    const fn as_u8(self) -> u8 {
        match self {
            TaskState::Pending => 0,
            TaskState::Running => 1,
            TaskState::Completed => 2,
            TaskState::Failed => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => TaskState::Pending,
            1 => TaskState::Running,
            2 => TaskState::Completed,
            _ => TaskState::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }
}

/// Written once by the worker
struct Outcome {
    elapsed_millis: u64,
    result: Result<Box<dyn RawResponse>, TaskFailure>,
}

pub struct ResponseTask {
    reference_id: u64,
    spec: RequestSpec,
    fired_at: OffsetDateTime,
    state: AtomicU8,
    outcome: OnceLock<Outcome>,
    decoded: OnceLock<DecodedResponse>,
    done: watch::Sender<bool>,
    cancel: CancellationToken,
}

impl ResponseTask {
    /// New pending task owning a copy of `spec`
    pub fn new(reference_id: u64, spec: &RequestSpec) -> Self {
        let (done, _) = watch::channel(false);

        Self {
            reference_id,
            spec: spec.copy(),
            fired_at: OffsetDateTime::now_utc(),
            state: AtomicU8::new(TaskState::Pending.as_u8()),
            outcome: OnceLock::new(),
            decoded: OnceLock::new(),
            done,
            cancel: CancellationToken::new(),
        }
    }

    /// Execute the request. Only the first call does anything.
    pub async fn run(&self, transport: &dyn Transport) {
        if self
            .state
            .compare_exchange(
                TaskState::Pending.as_u8(),
                TaskState::Running.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            warn!(reference_id = self.reference_id, "Task already started, ignoring run");
            return;
        }

        let request = match self.outbound_request() {
            Ok(request) => request,
            Err(failure) => return self.record(0, Err(failure)),
        };

        if self.cancel.is_cancelled() {
            return self.record(0, Err(TaskFailure::Cancelled));
        }

        // Prepare
        let connection = match transport.prepare(&self.client_settings()) {
            Ok(connection) => connection,
            Err(e) => return self.record(0, Err(TaskFailure::ClientSetup(e.to_string()))),
        };

        info!(
            reference_id = self.reference_id,
            method = %request.method,
            endpoint = %request.url,
            "Firing request"
        );

        // Invoke
        let started = Instant::now();
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(TaskFailure::Cancelled),
            response = connection.invoke(request) => response.map_err(TaskFailure::from),
        };
        let elapsed_millis = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        // Record, then release
        self.record(elapsed_millis, result);
        connection.close().await;
    }

    /// Settle a task whose worker died without recording an outcome
    pub(crate) fn abandon(&self, reason: String) {
        if self.outcome.get().is_none() {
            self.record(0, Err(TaskFailure::Aborted(reason)));
        }
    }

    fn record(&self, elapsed_millis: u64, result: Result<Box<dyn RawResponse>, TaskFailure>) {
        let state = match &result {
            Ok(raw) => {
                info!(
                    reference_id = self.reference_id,
                    status = raw.status(),
                    elapsed_ms = elapsed_millis,
                    "Request completed"
                );
                TaskState::Completed
            }
            Err(e) => {
                warn!(
                    reference_id = self.reference_id,
                    elapsed_ms = elapsed_millis,
                    error = %e,
                    "Request failed"
                );
                TaskState::Failed
            }
        };

        if self
            .outcome
            .set(Outcome {
                elapsed_millis,
                result,
            })
            .is_err()
        {
            warn!(reference_id = self.reference_id, "Outcome already recorded");
            return;
        }

        self.state.store(state.as_u8(), Ordering::Release);
        self.done.send_replace(true);
    }

    fn outbound_request(&self) -> Result<OutboundRequest, TaskFailure> {
        let spec = &self.spec;
        let url = spec
            .validate()
            .map_err(|e| TaskFailure::ClientSetup(e.to_string()))?;

        let method = reqwest::Method::from_bytes(spec.method().trim().as_bytes()).map_err(|_| {
            TaskFailure::ClientSetup(format!("invalid HTTP method '{}'", spec.method()))
        })?;

        let mut headers = vec![(
            "Content-Type".to_string(),
            spec.content_type().trim().to_string(),
        )];

        if !spec.http_user().trim().is_empty() {
            let credentials = format!("{}:{}", spec.http_user(), spec.http_password());
            headers.push((
                "Authorization".to_string(),
                format!("Basic {}", BASE64_STANDARD.encode(credentials)),
            ));
        }

        let body = spec.transmitted_body();

        Ok(OutboundRequest {
            method,
            url,
            headers,
            body: (!body.is_empty()).then_some(body),
        })
    }

    fn client_settings(&self) -> ClientSettings {
        let timeout = match self.spec.timeout_seconds() {
            0 => None,
            secs => Some(Duration::from_secs(u64::from(secs))),
        };

        ClientSettings::builder()
            .maybe_proxy(self.spec.proxy().cloned())
            .maybe_identity(self.spec.identity().cloned())
            .maybe_timeout(timeout)
            .build()
    }

    /// Request cancellation.
    ///
    /// An in-flight call is abandoned and the task settles as
    /// [`TaskFailure::Cancelled`]; a task that has not started yet fails
    /// without touching the network. Returns false if the task had already
    /// finished.
    ///
    /// `true` only means the request was accepted. A response that completes
    /// before the worker observes the cancellation still wins, and the task
    /// then settles [`TaskState::Completed`]. Check [`state`](Self::state)
    /// after [`wait`](Self::wait) for the actual outcome.
    pub fn cancel(&self) -> bool {
        if self.is_complete() {
            return false;
        }
        self.cancel.cancel();
        true
    }

    /// Wait until the task reaches a terminal state
    pub async fn wait(&self) {
        let mut done = self.done.subscribe();
        // The sender lives as long as `self`, so this only returns once done.
        let _ = done.wait_for(|finished| *finished).await;
    }

    pub fn reference_id(&self) -> u64 {
        self.reference_id
    }

    pub fn request_spec(&self) -> &RequestSpec {
        &self.spec
    }

    pub fn fired_at(&self) -> OffsetDateTime {
        self.fired_at
    }

    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_complete(&self) -> bool {
        self.state().is_terminal()
    }

    /// Duration of the network call, once the task is terminal
    pub fn elapsed_millis(&self) -> Option<u64> {
        self.outcome.get().map(|o| o.elapsed_millis)
    }

    /// HTTP status of a completed task
    pub fn status(&self) -> Option<u16> {
        match &self.outcome.get()?.result {
            Ok(raw) => Some(raw.status()),
            Err(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&TaskFailure> {
        self.outcome.get()?.result.as_ref().err()
    }

    /// Response headers as text, decoded on first access.
    ///
    /// Empty until the task is terminal and for failed tasks.
    pub fn headers(&self) -> &str {
        self.decoded().map_or("", |d| d.headers.as_str())
    }

    /// Response body as text, decoded on first access.
    ///
    /// Empty until the task is terminal; failed tasks yield a description of
    /// the failure.
    pub fn body(&self) -> &str {
        self.decoded().map_or("", |d| d.body.as_str())
    }

    fn decoded(&self) -> Option<&DecodedResponse> {
        let outcome = self.outcome.get()?;
        Some(
            self.decoded
                .get_or_init(|| decode::materialize(self.reference_id, &outcome.result)),
        )
    }

    /// Snapshot for display or serialization. Decodes the response.
    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            reference_id: self.reference_id,
            method: self.spec.method().to_string(),
            endpoint: self.spec.endpoint().to_string(),
            fired_at: self
                .fired_at
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_default(),
            state: self.state(),
            status: self.status(),
            elapsed_ms: self.elapsed_millis(),
            error: self.failure().map(|e| e.to_string()),
            headers: self.headers().to_string(),
            body: self.body().to_string(),
        }
    }
}

impl fmt::Debug for ResponseTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseTask")
            .field("reference_id", &self.reference_id)
            .field("spec", &self.spec)
            .field("state", &self.state())
            .field("elapsed_millis", &self.elapsed_millis())
            .finish_non_exhaustive()
    }
}

/// Serializable view of a task
#[derive(Debug, Clone, Serialize)]
pub struct TaskSummary {
    pub reference_id: u64,
    pub method: String,
    pub endpoint: String,
    pub fired_at: String,
    pub state: TaskState,
    pub status: Option<u16>,
    pub elapsed_ms: Option<u64>,
    pub error: Option<String>,
    pub headers: String,
    pub body: String,
}
