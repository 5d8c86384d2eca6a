//! Isolated JavaScript interpreter for evaluating extracted fragments.
//!
//! A [`Sandbox`] owns a worker thread running one fresh `boa_engine` context
//! with no host bindings (no filesystem, network, process or console
//! objects). Every evaluation is bounded by interpreter limits and a
//! wall-clock timeout. Only plain values ([`Completion`]) leave the worker.

use crate::config::SandboxLimits;
use crate::error::{DiscoveryError, EvaluationFailure, Result};
use boa_engine::vm::RuntimeLimits;
use boa_engine::{Context, JsValue, Source};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;

const WORKER_STACK_BYTES: usize = 8 * 1024 * 1024;

/// Plain value produced by an evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    String(String),
    Number(f64),
    Boolean(bool),
    Undefined,
    Null,
    Object,
    Other,
}

impl Completion {
    fn from_value(value: &JsValue) -> Self {
        if let Some(string) = value.as_string() {
            Completion::String(string.to_std_string_escaped())
        } else if let Some(number) = value.as_number() {
            Completion::Number(number)
        } else if let Some(boolean) = value.as_boolean() {
            Completion::Boolean(boolean)
        } else if value.is_undefined() {
            Completion::Undefined
        } else if value.is_null() {
            Completion::Null
        } else if value.is_object() {
            Completion::Object
        } else {
            Completion::Other
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Completion::String(_) => "string",
            Completion::Number(_) => "number",
            Completion::Boolean(_) => "boolean",
            Completion::Undefined => "undefined",
            Completion::Null => "null",
            Completion::Object => "object",
            Completion::Other => "other",
        }
    }
}

type JobReply = std::result::Result<Completion, String>;

struct Job {
    code: String,
    reply: mpsc::Sender<JobReply>,
}

struct Worker {
    jobs: mpsc::Sender<Job>,
}

impl Worker {
    fn spawn(limits: &SandboxLimits) -> Result<Self> {
        let (jobs, inbox) = mpsc::channel::<Job>();
        let limits = limits.clone();
        thread::Builder::new()
            .name("chunk-sandbox".to_string())
            .stack_size(WORKER_STACK_BYTES)
            .spawn(move || run_worker(&inbox, &limits))
            .map_err(|e| DiscoveryError::sandbox(format!("Failed to spawn worker: {e}")))?;
        Ok(Self { jobs })
    }
}

fn run_worker(inbox: &mpsc::Receiver<Job>, limits: &SandboxLimits) {
    let mut context = Context::default();
    let mut runtime_limits = RuntimeLimits::default();
    runtime_limits.set_loop_iteration_limit(limits.loop_iteration_limit);
    runtime_limits.set_recursion_limit(limits.recursion_limit);
    runtime_limits.set_stack_size_limit(limits.stack_size_limit);
    context.set_runtime_limits(runtime_limits);

    for job in inbox {
        let reply = context
            .eval(Source::from_bytes(job.code.as_bytes()))
            .map(|value| Completion::from_value(&value))
            .map_err(|err| err.to_string());
        // The caller may have given up on this job
        let _ = job.reply.send(reply);
    }
}

/// Scoped interpreter instance; dropping it shuts the worker down
pub struct Sandbox {
    limits: SandboxLimits,
    worker: Worker,
}

impl Sandbox {
    /// Start a fresh, empty interpreter
    pub fn acquire(limits: &SandboxLimits) -> Result<Self> {
        Ok(Self {
            limits: limits.clone(),
            worker: Worker::spawn(limits)?,
        })
    }

    /// Evaluate a script and return its completion value.
    ///
    /// On timeout the busy worker is abandoned (the loop limit stops it
    /// eventually) and replaced, so later evaluations still run.
    pub fn eval(&mut self, code: &str) -> std::result::Result<Completion, EvaluationFailure> {
        let (reply, outcome) = mpsc::channel();
        let job = Job {
            code: code.to_string(),
            reply,
        };
        if self.worker.jobs.send(job).is_err() {
            self.respawn();
            return Err(EvaluationFailure::SandboxUnavailable);
        }

        match outcome.recv_timeout(self.limits.timeout()) {
            Ok(Ok(completion)) => Ok(completion),
            Ok(Err(message)) => Err(EvaluationFailure::Thrown(message)),
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "Sandbox evaluation exceeded {}ms, restarting interpreter",
                    self.limits.timeout_ms
                );
                self.respawn();
                Err(EvaluationFailure::TimedOut {
                    timeout_ms: self.limits.timeout_ms,
                })
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.respawn();
                Err(EvaluationFailure::SandboxUnavailable)
            }
        }
    }

    fn respawn(&mut self) {
        match Worker::spawn(&self.limits) {
            Ok(worker) => self.worker = worker,
            Err(err) => log::warn!("Failed to restart sandbox worker: {err}"),
        }
    }
}
