//! Multi-instance fan-out reducer.
//!
//! Sends one logical operation to every active instance, strictly
//! sequentially in the caller-supplied order, and combines the per-instance
//! outcomes into a single result plus an append-only progress log:
//!
//! - the first instance to produce a result short-circuits the loop;
//! - "not found" failures are non-fatal and never recorded as the last
//!   error — the loop simply moves on;
//! - any other failure overwrites the previously recorded last error
//!   (last-write-wins);
//! - with no success at all, the reported message is the last recorded
//!   error, or a generic "no instance responded" text when every failure
//!   was a not-found (or the instance list was empty).
//!
//! Sequential execution is deliberate: it keeps the incremental log
//! deterministic and readable, at the cost of per-instance latency.

use async_trait::async_trait;

use crate::error::PanelError;
use crate::types::Instance;

/// Message reported when the loop exhausts all instances without a
/// success and without a recorded non-"not found" error.
pub const NO_INSTANCE_RESPONDED: &str = "No instance responded.";

/// Substring marking an application-level "entity does not exist" error.
pub const NOT_FOUND_MARKER: &str = "not found";

/// Semantic channel of one incrementally parsed stream event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChannel {
    /// Progress text; appended to the log, does not end the operation.
    Log(String),
    /// Terminal success for this instance.
    Result(String),
    /// Terminal failure for this instance.
    Error { code: Option<u16>, message: String },
}

/// Failure classification driving the combination policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NotFound,
    Other,
}

/// Classifies a per-instance failure: code 404 or a message carrying the
/// not-found marker is non-fatal for the fan-out.
pub fn classify_failure(code: Option<u16>, message: &str) -> FailureKind {
    if code == Some(404) || message.to_ascii_lowercase().contains(NOT_FOUND_MARKER) {
        return FailureKind::NotFound;
    }
    FailureKind::Other
}

/// A remembered per-instance failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceFailure {
    pub instance_id: String,
    pub code: Option<u16>,
    pub message: String,
    pub kind: FailureKind,
}

/// Terminal outcome of one instance invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceReply {
    Result(String),
    Failure { code: Option<u16>, message: String },
}

/// Append-only progress log for one fan-out run. An optional observer is
/// notified per line so the caller can repaint incrementally while the
/// stream is still open.
pub struct FanOutLog<'a> {
    lines: Vec<String>,
    observer: Option<&'a mut (dyn FnMut(&str) + Send)>,
}

impl std::fmt::Debug for FanOutLog<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanOutLog")
            .field("lines", &self.lines)
            .field("observed", &self.observer.is_some())
            .finish()
    }
}

impl Default for FanOutLog<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> FanOutLog<'a> {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            observer: None,
        }
    }

    pub fn with_observer(observer: &'a mut (dyn FnMut(&str) + Send)) -> Self {
        Self {
            lines: Vec::new(),
            observer: Some(observer),
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        if let Some(observer) = self.observer.as_mut() {
            observer(&line);
        }
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// One logical operation invoked once per instance during a fan-out.
#[async_trait]
pub trait InstanceOp: Send + Sync {
    async fn invoke(&self, instance: &Instance, log: &mut FanOutLog<'_>) -> InstanceReply;
}

/// Combined outcome of a first-success fan-out run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FanOutOutcome {
    Success {
        instance_id: String,
        text: String,
    },
    Failed {
        failures: Vec<InstanceFailure>,
    },
}

impl FanOutOutcome {
    /// User-facing message for the failed case: the last failure that was
    /// not a not-found, else the generic no-responder text.
    pub fn failure_report(&self) -> Option<String> {
        let Self::Failed { failures } = self else {
            return None;
        };
        let last_other = failures
            .iter()
            .rev()
            .find(|failure| failure.kind == FailureKind::Other)
            .map(|failure| failure.message.clone());
        Some(last_other.unwrap_or_else(|| NO_INSTANCE_RESPONDED.to_string()))
    }
}

/// Runs `op` against each instance in order, applying the first-success
/// combination policy. `instances` is the caller's snapshot of the active
/// set, fixed for the whole run.
pub async fn fan_out(
    instances: &[Instance],
    op: &dyn InstanceOp,
    log: &mut FanOutLog<'_>,
) -> FanOutOutcome {
    let mut failures: Vec<InstanceFailure> = Vec::new();

    for site in instances {
        log.push(format!("Instance {}: starting analysis...", site.label()));

        match op.invoke(site, log).await {
            InstanceReply::Result(text) => {
                log.push(format!("Instance {}: result received.", site.label()));
                return FanOutOutcome::Success {
                    instance_id: site.id.clone(),
                    text,
                };
            }
            InstanceReply::Failure { code, message } => {
                let kind = classify_failure(code, &message);
                match kind {
                    FailureKind::NotFound => {
                        log.push(format!("Instance {}: issue not found.", site.label()));
                    }
                    FailureKind::Other => {
                        log.push(format!("Instance {}: error: {message}", site.label()));
                    }
                }
                failures.push(InstanceFailure {
                    instance_id: site.id.clone(),
                    code,
                    message,
                    kind,
                });
            }
        }
    }

    FanOutOutcome::Failed { failures }
}

/// One gathered per-instance success of an aggregate fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceSuccess<T> {
    pub instance_id: String,
    pub value: T,
}

/// Combined outcome of an aggregate fan-out: every instance is visited,
/// successes are gathered, and only the last error is remembered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectOutcome<T> {
    pub successes: Vec<InstanceSuccess<T>>,
    pub last_error: Option<String>,
}

impl<T> CollectOutcome<T> {
    /// Whether nothing succeeded and an error should be surfaced.
    pub fn all_failed(&self) -> bool {
        self.successes.is_empty() && self.last_error.is_some()
    }
}

/// Aggregate policy used by JQL search and AI summary: visit every
/// instance sequentially, keep all successes, remember the last error.
pub async fn fan_out_collect<T, F, Fut>(instances: &[Instance], mut call: F) -> CollectOutcome<T>
where
    F: FnMut(Instance) -> Fut,
    Fut: std::future::Future<Output = Result<T, PanelError>>,
{
    let mut successes = Vec::new();
    let mut last_error = None;

    for site in instances {
        match call(site.clone()).await {
            Ok(value) => successes.push(InstanceSuccess {
                instance_id: site.id.clone(),
                value,
            }),
            Err(err) => last_error = Some(err.to_string()),
        }
    }

    CollectOutcome {
        successes,
        last_error,
    }
}
