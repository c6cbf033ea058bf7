//! In-memory transport for tests and offline runs
//!
//! Answers every call from a responder closure after an optional fixed
//! delay, and counts prepares, invokes, closes and decodes.

use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::{
    ClientSettings, Connection, HttpResponse, OutboundRequest, RawResponse, ResponseText, Result,
    Transport, TransportError,
};

type Responder = dyn Fn(&OutboundRequest) -> Result<HttpResponse> + Send + Sync;

/// Call counters shared by a stub transport and everything it hands out
#[derive(Debug, Default)]
pub struct StubStats {
    prepares: AtomicUsize,
    invokes: AtomicUsize,
    closes: AtomicUsize,
    decodes: AtomicUsize,
    requests: Mutex<Vec<OutboundRequest>>,
}

impl StubStats {
    pub fn prepares(&self) -> usize {
        self.prepares.load(Ordering::SeqCst)
    }

    pub fn invokes(&self) -> usize {
        self.invokes.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn decodes(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }

    /// Requests seen by `invoke`, in call order
    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[derive(Clone)]
pub struct StubTransport {
    responder: Arc<Responder>,
    delay: Duration,
    setup_error: Option<String>,
    stats: Arc<StubStats>,
}

impl StubTransport {
    pub fn new(
        responder: impl Fn(&OutboundRequest) -> Result<HttpResponse> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Arc::new(responder),
            delay: Duration::ZERO,
            setup_error: None,
            stats: Arc::new(StubStats::default()),
        }
    }

    /// Every call answers `200` with `body` and an `x-stub: true` header
    pub fn ok(body: &'static str) -> Self {
        Self::new(move |_| {
            Ok(HttpResponse::new(200, body)
                .with_header("content-type", "text/plain")
                .with_header("x-stub", "true"))
        })
    }

    /// Every call fails with `error`
    pub fn failing(error: TransportError) -> Self {
        Self::new(move |_| Err(error.clone()))
    }

    /// Wait `delay` inside `invoke` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Make `prepare` fail with a client setup error
    pub fn with_setup_error(mut self, reason: impl Into<String>) -> Self {
        self.setup_error = Some(reason.into());
        self
    }

    pub fn stats(&self) -> Arc<StubStats> {
        Arc::clone(&self.stats)
    }
}

impl fmt::Debug for StubTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubTransport")
            .field("delay", &self.delay)
            .field("setup_error", &self.setup_error)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Transport for StubTransport {
    fn prepare(&self, _settings: &ClientSettings) -> Result<Box<dyn Connection>> {
        self.stats.prepares.fetch_add(1, Ordering::SeqCst);

        if let Some(reason) = &self.setup_error {
            return Err(TransportError::ClientSetup(reason.clone()));
        }

        Ok(Box::new(StubConnection {
            transport: self.clone(),
        }))
    }
}

struct StubConnection {
    transport: StubTransport,
}

#[async_trait]
impl Connection for StubConnection {
    async fn invoke(&self, request: OutboundRequest) -> Result<Box<dyn RawResponse>> {
        let stats = &self.transport.stats;
        stats.invokes.fetch_add(1, Ordering::SeqCst);
        stats
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        if !self.transport.delay.is_zero() {
            tokio::time::sleep(self.transport.delay).await;
        }

        let response = (self.transport.responder)(&request)?;
        Ok(Box::new(CountingResponse {
            inner: response,
            stats: Arc::clone(stats),
        }))
    }

    async fn close(self: Box<Self>) {
        self.transport.stats.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
struct CountingResponse {
    inner: HttpResponse,
    stats: Arc<StubStats>,
}

impl RawResponse for CountingResponse {
    fn status(&self) -> u16 {
        self.inner.status
    }

    fn decode(&self) -> ResponseText {
        self.stats.decodes.fetch_add(1, Ordering::SeqCst);
        self.inner.decode()
    }
}
