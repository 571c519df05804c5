//! Parallel fixture execution
//!
//! Concurrency is only ever cross-fixture: each fixture's invoker runs on
//! its own task under a concurrency cap, while the ordering and reuse
//! guarantees inside each aggregate stay intact. Results are reassembled
//! in declaration order.

#![allow(dead_code)]

use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use super::RunError;
use crate::config::TestFilter;
use crate::context::{CancellationToken, LogSink, TestContext};
use crate::discovery::HostRegistry;
use crate::models::TestResult;
use crate::suite::TestSuite;

/// Runs fixtures concurrently under a permit cap.
pub struct ParallelExecutor {
    max_concurrent: usize,
}

impl ParallelExecutor {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Resolve each fixture separately and run them concurrently; the
    /// returned collection keeps declaration order regardless of which
    /// fixture finished first.
    pub async fn run_fixtures(
        &self,
        suite: &TestSuite,
        filter: &TestFilter,
        registry: &HostRegistry,
        logger: Arc<dyn LogSink>,
        token: &CancellationToken,
    ) -> Result<TestResult, RunError> {
        info!(
            "Running {} fixtures (max {} concurrent)",
            suite.fixtures().len(),
            self.max_concurrent
        );
        let start = Instant::now();

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let root = TestContext::root(logger).child(suite.name());

        let mut handles = Vec::with_capacity(suite.fixtures().len());
        for fixture in suite.fixtures() {
            let invoker = fixture.resolve(filter, registry)?;
            let semaphore = semaphore.clone();
            let ctx = root.clone();
            let token = token.clone();
            let fixture_name = fixture.name().to_string();

            handles.push(tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return TestResult::error(
                        ctx.current_name().child(&fixture_name),
                        "executor shut down",
                        None,
                    );
                };
                debug!("Starting fixture {fixture_name}");
                invoker.invoke(&ctx, &token).await
            }));
        }

        let suite_name = root.current_name();
        let results: Vec<TestResult> = join_all(handles)
            .await
            .into_iter()
            .zip(suite.fixtures())
            .map(|(joined, fixture)| match joined {
                Ok(result) => result,
                Err(error) => TestResult::error(
                    suite_name.child(fixture.name()),
                    "Test failed",
                    Some(error.to_string()),
                ),
            })
            .collect();

        let result = TestResult::collection(suite_name, results);
        info!(
            "Parallel run completed in {}ms - {} results",
            start.elapsed().as_millis(),
            result.counts().total
        );
        Ok(result)
    }
}

impl Default for ParallelExecutor {
    fn default() -> Self {
        Self::new(4)
    }
}
