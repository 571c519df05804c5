//! Per-invocation test context
//!
//! Threads the current name path, parameter bindings, logging and pending
//! assertion state through the invoker tree. Contexts branch as the tree
//! recurses: `Clone` shares pending state, the branching constructors start
//! fresh.

mod cancel;

pub use cancel::CancellationToken;

use std::any::Any;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

use crate::hosts::{TestInstance, TestValue};
use crate::models::{TestName, TestParameter, TestResult};

/// Diagnostic sink consumed by invokers.
///
/// Best-effort: implementations never fail and never block progress.
pub trait LogSink: Send + Sync {
    fn debug(&self, level: u8, message: &str);
    fn log(&self, message: &str);
    fn log_error(&self, result: &TestResult);
}

/// Default sink mapping onto the `tracing` macros.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLog;

impl LogSink for TracingLog {
    fn debug(&self, level: u8, message: &str) {
        debug!(level, "{message}");
    }

    fn log(&self, message: &str) {
        info!("{message}");
    }

    fn log_error(&self, result: &TestResult) {
        error!("{result}");
    }
}

/// Sink that drops everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullLog;

impl LogSink for NullLog {
    fn debug(&self, _level: u8, _message: &str) {}
    fn log(&self, _message: &str) {}
    fn log_error(&self, _result: &TestResult) {}
}

/// In-memory sink for assertions in tests.
#[derive(Debug, Default)]
pub struct BufferLog {
    entries: Mutex<Vec<String>>,
}

impl BufferLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().expect("log poisoned").clone()
    }
}

impl LogSink for BufferLog {
    fn debug(&self, level: u8, message: &str) {
        self.entries
            .lock()
            .expect("log poisoned")
            .push(format!("debug[{level}] {message}"));
    }

    fn log(&self, message: &str) {
        self.entries
            .lock()
            .expect("log poisoned")
            .push(message.to_string());
    }

    fn log_error(&self, result: &TestResult) {
        self.entries
            .lock()
            .expect("log poisoned")
            .push(format!("error: {result}"));
    }
}

#[derive(Debug, Default)]
struct PendingState {
    failures: Vec<String>,
    warnings: Vec<String>,
}

/// Environment of one invocation step.
#[derive(Clone)]
pub struct TestContext {
    name: TestName,
    instance: Option<Arc<TestInstance>>,
    logger: Arc<dyn LogSink>,
    pending: Arc<Mutex<PendingState>>,
}

impl TestContext {
    /// Root context for a fresh run.
    pub fn root(logger: Arc<dyn LogSink>) -> Self {
        Self {
            name: TestName::empty(),
            instance: None,
            logger,
            pending: Arc::new(Mutex::new(PendingState::default())),
        }
    }

    pub fn current_name(&self) -> TestName {
        self.name.clone()
    }

    pub fn instance(&self) -> Option<Arc<TestInstance>> {
        self.instance.clone()
    }

    pub fn logger(&self) -> Arc<dyn LogSink> {
        self.logger.clone()
    }

    /// Branch into a named child step with fresh pending state.
    pub fn child(&self, segment: &str) -> TestContext {
        TestContext {
            name: self.name.child(segment),
            instance: self.instance.clone(),
            logger: self.logger.clone(),
            pending: Arc::new(Mutex::new(PendingState::default())),
        }
    }

    /// Same step, with an instance attached to the chain.
    pub fn with_instance(&self, instance: Arc<TestInstance>) -> TestContext {
        TestContext {
            name: self.name.clone(),
            instance: Some(instance),
            logger: self.logger.clone(),
            pending: self.pending.clone(),
        }
    }

    /// Branch for one parameter value: annotates the name, attaches the
    /// instance, starts fresh pending state.
    pub fn branch_parameter(
        &self,
        parameter: TestParameter,
        instance: Arc<TestInstance>,
    ) -> TestContext {
        TestContext {
            name: self.name.with_parameter(parameter),
            instance: Some(instance),
            logger: self.logger.clone(),
            pending: Arc::new(Mutex::new(PendingState::default())),
        }
    }

    /// Nearest parameter in the instance chain assignable to `T`.
    pub fn try_get_parameter<T: Any>(&self) -> Option<&T> {
        let mut current = self.instance.as_deref();
        while let Some(instance) = current {
            if let Some(value) = instance.value().downcast_ref::<T>() {
                return Some(value);
            }
            current = instance.parent().map(Arc::as_ref);
        }
        None
    }

    /// Parameter value supplied by the host with the given id.
    pub fn parameter_named(&self, id: &str) -> Option<&TestValue> {
        let mut current = self.instance.as_deref();
        while let Some(instance) = current {
            if instance.host_id() == id {
                return Some(instance.value());
            }
            current = instance.parent().map(Arc::as_ref);
        }
        None
    }

    /// Record an assertion failure; surfaced as an Error by the leaf invoker.
    pub fn fail(&self, message: impl Into<String>) {
        self.pending
            .lock()
            .expect("context poisoned")
            .failures
            .push(message.into());
    }

    /// Assert a condition, recording a failure when it does not hold.
    pub fn expect(&self, condition: bool, message: impl Into<String>) -> bool {
        if !condition {
            self.fail(message);
        }
        condition
    }

    /// Record a warning; surfaced as a Warning on an otherwise green leaf.
    pub fn warn(&self, message: impl Into<String>) {
        self.pending
            .lock()
            .expect("context poisoned")
            .warnings
            .push(message.into());
    }

    pub fn take_failures(&self) -> Vec<String> {
        std::mem::take(&mut self.pending.lock().expect("context poisoned").failures)
    }

    pub fn take_warnings(&self) -> Vec<String> {
        std::mem::take(&mut self.pending.lock().expect("context poisoned").warnings)
    }

    pub fn debug(&self, level: u8, message: impl AsRef<str>) {
        self.logger.debug(level, message.as_ref());
    }

    pub fn log(&self, message: impl AsRef<str>) {
        self.logger.log(message.as_ref());
    }

    pub fn log_error(&self, result: &TestResult) {
        self.logger.log_error(result);
    }
}

impl std::fmt::Debug for TestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestContext")
            .field("name", &self.name.full_name())
            .field("instance", &self.instance)
            .finish()
    }
}
