//! Instrumented fake completion services for unit tests.

use super::{CompletionRequest, CompletionService};
use crate::error::ServiceError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// What a scripted call does.
pub(crate) enum Step {
    Reply(Result<String, ServiceError>),
    /// Sleep, then reply.
    After(Duration, Result<String, ServiceError>),
    /// Never resolve.
    Hang,
}

impl Step {
    pub(crate) fn ok(text: impl Into<String>) -> Self {
        Step::Reply(Ok(text.into()))
    }

    pub(crate) fn err(error: ServiceError) -> Self {
        Step::Reply(Err(error))
    }
}

type Handler = Box<dyn Fn(&CompletionRequest, usize) -> Step + Send + Sync>;

/// Fake service driven by a closure of (request, global call number).
///
/// Records every request and the highest number of calls in flight at once.
pub(crate) struct ScriptedService {
    handler: Handler,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedService {
    pub(crate) fn new<F>(handler: F) -> Self
    where
        F: Fn(&CompletionRequest, usize) -> Step + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Replies with the given steps in call order; extra calls get an error.
    pub(crate) fn sequence(steps: Vec<Step>) -> Self {
        let steps = Mutex::new(steps.into_iter());
        Self::new(move |_, _| {
            steps
                .lock()
                .unwrap()
                .next()
                .unwrap_or_else(|| Step::err(ServiceError::invalid_request("script exhausted")))
        })
    }

    /// Echo the first line of the prompt.
    pub(crate) fn echo() -> Self {
        Self::new(|req, _| {
            let prompt = req
                .system_prompt
                .as_deref()
                .filter(|_| req.user_prompt.is_empty())
                .unwrap_or(req.user_prompt.as_str());
            Step::ok(prompt.lines().next().unwrap_or_default().to_string())
        })
    }

    /// Sleep this long inside every call before answering.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CompletionService for ScriptedService {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match (self.handler)(request, call) {
            Step::Reply(reply) => reply,
            Step::After(delay, reply) => {
                tokio::time::sleep(delay).await;
                reply
            }
            Step::Hang => futures::future::pending().await,
        }
    }
}
