//! Test execution engine
//!
//! Ties a discovered suite, its configuration and a logger into runnable
//! sessions, sequential or parallel across fixtures.

mod parallel;

pub use parallel::ParallelExecutor;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{SettingsBag, TestFilter};
use crate::context::{CancellationToken, LogSink, TestContext, TracingLog};
use crate::discovery::{DiscoveryError, HostRegistry};
use crate::hosts::RepeatedHost;
use crate::invokers::{ParameterizedInvoker, TestInvoker};
use crate::models::{ResultCounts, TestResult};
use crate::suite::TestSuite;

#[derive(Debug, Error)]
pub enum RunError {
    /// The run was cancelled; teardown has completed and the results
    /// collected so far are carried along.
    #[error("run aborted after {} results", .partial.counts().total)]
    Aborted { partial: TestResult },

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

/// One configured run of a suite.
pub struct TestSession {
    suite: TestSuite,
    settings: SettingsBag,
    filter: TestFilter,
    registry: HostRegistry,
    logger: Arc<dyn LogSink>,
}

impl TestSession {
    pub fn new(suite: TestSuite) -> Self {
        Self {
            suite,
            settings: SettingsBag::new(),
            filter: TestFilter::default(),
            registry: HostRegistry::new(),
            logger: Arc::new(TracingLog),
        }
    }

    pub fn with_settings(mut self, settings: SettingsBag) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_filter(mut self, filter: TestFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_registry(mut self, registry: HostRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn LogSink>) -> Self {
        self.logger = logger;
        self
    }

    pub fn suite(&self) -> &TestSuite {
        &self.suite
    }

    pub fn settings(&self) -> &SettingsBag {
        &self.settings
    }

    /// Resolve the suite, honoring the settings-level default repeat.
    fn resolve(&self) -> Result<Arc<dyn TestInvoker>, DiscoveryError> {
        let mut invoker = self.suite.resolve(&self.filter, &self.registry)?;
        if let Some(repeat) = self.settings.get_int("repeat").filter(|r| *r > 1) {
            invoker = Arc::new(ParameterizedInvoker::new(
                Arc::new(RepeatedHost::new(repeat as u32)),
                invoker,
            ));
        }
        Ok(invoker)
    }

    /// Run the whole suite sequentially.
    ///
    /// Cancellation inside the tree only stops enumeration; this is the one
    /// place an observed cancellation turns into an error, after all
    /// teardown has run, with the partial tree attached.
    pub async fn run(&self, token: &CancellationToken) -> Result<TestResult, RunError> {
        let invoker = self.resolve()?;
        let ctx = TestContext::root(self.logger.clone());
        let result = invoker.invoke(&ctx, token).await;
        if token.is_cancelled() {
            return Err(RunError::Aborted { partial: result });
        }
        Ok(result)
    }

    /// Run fixtures concurrently (never cases within one fixture).
    pub async fn run_parallel(
        &self,
        max_concurrent: usize,
        token: &CancellationToken,
    ) -> Result<TestResult, RunError> {
        let executor = ParallelExecutor::new(max_concurrent);
        let result = executor
            .run_fixtures(
                &self.suite,
                &self.filter,
                &self.registry,
                self.logger.clone(),
                token,
            )
            .await?;
        if token.is_cancelled() {
            return Err(RunError::Aborted { partial: result });
        }
        Ok(result)
    }
}

/// Timestamps and derived counts for one completed run.
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    pub counts: ResultCounts,
}

impl RunSummary {
    pub fn over(result: &TestResult, started: DateTime<Utc>) -> Self {
        Self {
            started,
            finished: Utc::now(),
            counts: result.counts(),
        }
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished - self.started).num_milliseconds()
    }

    pub fn pass_rate(&self) -> f64 {
        let judged = self.counts.total - self.counts.ignored;
        if judged == 0 {
            return 100.0;
        }
        (self.counts.success + self.counts.warnings) as f64 / judged as f64 * 100.0
    }

    pub fn all_passed(&self) -> bool {
        self.counts.errors == 0
    }
}
