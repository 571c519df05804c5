//! Aggregate invoker
//!
//! Runs an ordered list of child invokers under shared SetUp/TearDown,
//! driving the `SetUp → (reuse → run child → advance) → TearDown` loop.
//! TearDown runs whenever SetUp succeeded, including after a loop break or
//! an observed cancellation; the child cursor advances exactly once per
//! iteration, instance reuse never repeats a child.

use async_trait::async_trait;
use std::sync::Arc;

use super::{invoke_guarded, TestInvoker};
use crate::context::{CancellationToken, TestContext};
use crate::hosts::ParameterHost;
use crate::models::{TestName, TestResult, TestStatus};

pub struct AggregatedInvoker {
    name: String,
    host: Option<Arc<dyn ParameterHost>>,
    children: Vec<Arc<dyn TestInvoker>>,
    continue_on_error: bool,
}

impl AggregatedInvoker {
    pub fn new(name: impl Into<String>, children: Vec<Arc<dyn TestInvoker>>) -> Self {
        Self {
            name: name.into(),
            host: None,
            children,
            continue_on_error: false,
        }
    }

    pub fn with_host(mut self, host: Arc<dyn ParameterHost>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    pub fn children(&self) -> &[Arc<dyn TestInvoker>] {
        &self.children
    }
}

#[async_trait]
impl TestInvoker for AggregatedInvoker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, ctx: &TestContext, token: &CancellationToken) -> TestResult {
        let name = ctx.current_name();

        if self.children.is_empty() {
            return TestResult::success(name);
        }

        let mut results: Vec<TestResult> = Vec::with_capacity(self.children.len());

        // SetUp: construct the shared instance; failure aborts before any
        // child runs and skips TearDown.
        let instance = match &self.host {
            Some(host) => {
                ctx.debug(3, format!("SetUp {}: {}", self.name, host.id()));
                match host.create_instance(ctx).await {
                    Ok(instance) => Some(instance),
                    Err(error) => {
                        let failed = TestResult::from_error(name.clone(), "SetUp failed", &error);
                        ctx.log_error(&failed);
                        results.push(failed);
                        return TestResult::collection(name, results);
                    }
                }
            }
            None => None,
        };

        let run_ctx = match &instance {
            Some(instance) => ctx.with_instance(instance.clone()),
            None => ctx.clone(),
        };

        for child in &self.children {
            // Cooperative: checked at loop-top only; TearDown still runs.
            if token.is_cancelled() {
                ctx.debug(3, format!("{}: cancelled, stopping loop", self.name));
                break;
            }

            if let (Some(host), Some(instance)) = (&self.host, &instance) {
                if host.reusable() {
                    ctx.debug(3, format!("ReuseInstance {}: {}", self.name, host.id()));
                    if let Err(error) = host.reuse(instance, &run_ctx).await {
                        let failed =
                            TestResult::from_error(name.clone(), "ReuseInstance failed", &error);
                        ctx.log_error(&failed);
                        results.push(failed);
                        break;
                    }
                }
            }

            ctx.debug(3, format!("Running {} / {}", self.name, child.name()));
            // Synthetic failures (a panicking child) report under the
            // "<aggregate> / <child>" form, not the dotted path the child
            // would have named itself.
            let child_result = invoke_guarded(
                child.as_ref(),
                &run_ctx,
                token,
                TestName::new(format!("{} / {}", name.name(), child.name())),
            )
            .await;

            let failed = child_result.status() == TestStatus::Error;
            if failed {
                ctx.log_error(&child_result);
            }
            results.push(child_result);

            if failed && !self.continue_on_error {
                break;
            }
        }

        // TearDown runs whenever SetUp succeeded; its failure is recorded
        // without masking earlier results.
        if let (Some(host), Some(instance)) = (&self.host, &instance) {
            ctx.debug(3, format!("TearDown {}: {}", self.name, host.id()));
            if let Err(error) = host.destroy(instance, &run_ctx).await {
                let failed = TestResult::from_error(name.clone(), "TearDown failed", &error);
                ctx.log_error(&failed);
                results.push(failed);
            }
        }

        TestResult::collection(name, results)
    }
}
