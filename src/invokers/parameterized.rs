//! Parameterized invoker
//!
//! Wraps an inner invoker once per value produced by a parameter host.
//! Each value gets its own branch context (name annotation, instance chain
//! link, fresh pending state); destruction of every constructed instance is
//! guaranteed, whatever the inner invocation did.

use async_trait::async_trait;
use std::sync::Arc;

use super::{invoke_guarded, TestInvoker};
use crate::context::{CancellationToken, TestContext};
use crate::hosts::{ParameterHost, TestInstance};
use crate::models::{TestParameter, TestResult, TestStatus};

pub struct ParameterizedInvoker {
    host: Arc<dyn ParameterHost>,
    inner: Arc<dyn TestInvoker>,
    continue_on_error: bool,
    hidden: bool,
}

impl ParameterizedInvoker {
    pub fn new(host: Arc<dyn ParameterHost>, inner: Arc<dyn TestInvoker>) -> Self {
        Self {
            host,
            inner,
            continue_on_error: false,
            hidden: false,
        }
    }

    pub fn continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Keep the parameter out of rendered names.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

#[async_trait]
impl TestInvoker for ParameterizedInvoker {
    fn name(&self) -> &str {
        self.host.id()
    }

    async fn invoke(&self, ctx: &TestContext, token: &CancellationToken) -> TestResult {
        let name = ctx.current_name();

        let values = match self.host.values(ctx).await {
            Ok(values) => values,
            Err(error) => {
                let failed = TestResult::from_error(name, "Parameter source failed", &error);
                ctx.log_error(&failed);
                return failed;
            }
        };

        let mut results: Vec<TestResult> = Vec::with_capacity(values.len());

        for value in values {
            if token.is_cancelled() {
                break;
            }

            let parameter = if self.hidden {
                TestParameter::hidden(self.host.id(), value.display())
            } else {
                TestParameter::new(self.host.id(), value.display())
            };

            let instance = Arc::new(TestInstance::new(self.host.id(), value, ctx.instance()));
            let branch = ctx.branch_parameter(parameter, instance.clone());

            if let Err(error) = self.host.initialize(&instance, &branch).await {
                let failed = TestResult::from_error(
                    branch.current_name(),
                    "Initialize failed",
                    &error,
                );
                ctx.log_error(&failed);
                results.push(failed);
                if self.continue_on_error {
                    continue;
                }
                break;
            }

            let result = self.run_one(&instance, &branch, token).await;

            // Destroy is guaranteed, whatever happened inside.
            if let Err(error) = self.host.destroy(&instance, &branch).await {
                let failed =
                    TestResult::from_error(branch.current_name(), "Destroy failed", &error);
                ctx.log_error(&failed);
                results.push(result);
                results.push(failed);
                if self.continue_on_error {
                    continue;
                }
                break;
            }

            let failed = result.status() == TestStatus::Error;
            results.push(result);
            if failed && !self.continue_on_error {
                break;
            }
        }

        TestResult::collection(name, results)
    }
}

impl ParameterizedInvoker {
    async fn run_one(
        &self,
        instance: &Arc<TestInstance>,
        branch: &TestContext,
        token: &CancellationToken,
    ) -> TestResult {
        if let Err(error) = self.host.pre_run(instance, branch).await {
            return TestResult::from_error(branch.current_name(), "PreRun failed", &error);
        }

        let result = invoke_guarded(
            self.inner.as_ref(),
            branch,
            token,
            branch.current_name().child(self.inner.name()),
        )
        .await;

        if let Err(error) = self.host.post_run(instance, branch).await {
            let failed = TestResult::from_error(branch.current_name(), "PostRun failed", &error);
            branch.log_error(&failed);
            if result.status() != TestStatus::Error {
                return failed;
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NullLog;
    use crate::hosts::{EnumeratedHost, ParameterSource, RepeatedHost, TestValue};
    use crate::invokers::{test_fn, CaseInvoker};
    use anyhow::Result;
    use std::fmt;
    use std::sync::Mutex;

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Mode {
        P,
        Q,
    }

    impl fmt::Display for Mode {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Mode::P => write!(f, "P"),
                Mode::Q => write!(f, "Q"),
            }
        }
    }

    fn ctx() -> TestContext {
        TestContext::root(Arc::new(NullLog)).child("case")
    }

    fn recording_case(seen: Arc<Mutex<Vec<(bool, Mode)>>>) -> Arc<dyn TestInvoker> {
        Arc::new(CaseInvoker::new(
            "body",
            test_fn(move |ctx, _token| {
                let seen = seen.clone();
                async move {
                    let x = *ctx.try_get_parameter::<bool>().expect("bool parameter");
                    let y = *ctx.try_get_parameter::<Mode>().expect("mode parameter");
                    seen.lock().unwrap().push((x, y));
                    Ok(None)
                }
            }),
        ))
    }

    #[tokio::test]
    async fn test_nesting_order_last_parameter_varies_fastest() {
        let seen = Arc::new(Mutex::new(Vec::new()));

        // Innermost host applied first: y (rightmost) inside, x outside.
        let inner = ParameterizedInvoker::new(
            Arc::new(EnumeratedHost::enum_host(
                "y",
                vec![TestValue::new(Mode::P), TestValue::new(Mode::Q)],
            )),
            recording_case(seen.clone()),
        );
        let outer = ParameterizedInvoker::new(
            Arc::new(EnumeratedHost::bool_host("x")),
            Arc::new(inner),
        );

        let result = outer.invoke(&ctx(), &CancellationToken::new()).await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (false, Mode::P),
                (false, Mode::Q),
                (true, Mode::P),
                (true, Mode::Q),
            ]
        );
        assert_eq!(result.counts().total, 4);
        assert_eq!(result.counts().success, 4);

        let leaves = result.leaves();
        assert_eq!(leaves[0].name().full_name(), "case(x=false,y=P)");
        assert_eq!(leaves[3].name().full_name(), "case(x=true,y=Q)");
    }

    #[tokio::test]
    async fn test_repeat_yields_n_success_leaves() {
        let invoker = ParameterizedInvoker::new(
            Arc::new(RepeatedHost::new(3)),
            Arc::new(CaseInvoker::new(
                "body",
                test_fn(|_ctx, _token| async { Ok(None) }),
            )),
        );

        let result = invoker.invoke(&ctx(), &CancellationToken::new()).await;

        let children = result.children();
        assert_eq!(children.len(), 3);
        assert!(children
            .iter()
            .all(|c| matches!(c, TestResult::Success { .. })));
    }

    #[tokio::test]
    async fn test_failing_iteration_stops_later_values() {
        let invoker = ParameterizedInvoker::new(
            Arc::new(RepeatedHost::new(3)),
            Arc::new(CaseInvoker::new(
                "body",
                test_fn(|ctx, _token| async move {
                    let iteration = *ctx.try_get_parameter::<u32>().unwrap();
                    if iteration == 2 {
                        anyhow::bail!("iteration 2 broke");
                    }
                    Ok(None)
                }),
            )),
        );

        let result = invoker.invoke(&ctx(), &CancellationToken::new()).await;
        let children = result.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].status(), TestStatus::Success);
        assert_eq!(children[1].status(), TestStatus::Error);
    }

    #[tokio::test]
    async fn test_continue_on_error_runs_all_iterations() {
        let invoker = ParameterizedInvoker::new(
            Arc::new(RepeatedHost::new(3)),
            Arc::new(CaseInvoker::new(
                "body",
                test_fn(|ctx, _token| async move {
                    let iteration = *ctx.try_get_parameter::<u32>().unwrap();
                    if iteration == 2 {
                        anyhow::bail!("iteration 2 broke");
                    }
                    Ok(None)
                }),
            )),
        )
        .continue_on_error(true);

        let result = invoker.invoke(&ctx(), &CancellationToken::new()).await;
        assert_eq!(result.children().len(), 3);
        assert_eq!(result.counts().errors, 1);
        assert_eq!(result.counts().success, 2);
    }

    #[tokio::test]
    async fn test_destroy_runs_even_when_inner_fails() {
        struct TrackingHost {
            destroyed: Mutex<Vec<String>>,
        }

        #[async_trait]
        impl ParameterHost for TrackingHost {
            fn id(&self) -> &str {
                "n"
            }

            async fn values(&self, _ctx: &TestContext) -> Result<Vec<TestValue>> {
                Ok(vec![TestValue::new(1u32), TestValue::new(2u32)])
            }

            async fn destroy(&self, instance: &TestInstance, _ctx: &TestContext) -> Result<()> {
                self.destroyed
                    .lock()
                    .unwrap()
                    .push(instance.value().display().to_string());
                Ok(())
            }
        }

        let host = Arc::new(TrackingHost {
            destroyed: Mutex::new(Vec::new()),
        });
        let invoker = ParameterizedInvoker::new(
            host.clone(),
            Arc::new(CaseInvoker::new(
                "body",
                test_fn(|_ctx, _token| async { anyhow::bail!("always fails") }),
            )),
        );

        let result = invoker.invoke(&ctx(), &CancellationToken::new()).await;

        // First value fails, loop stops, but its instance was destroyed.
        assert_eq!(result.children().len(), 1);
        assert_eq!(*host.destroyed.lock().unwrap(), vec!["1".to_string()]);
    }

    #[tokio::test]
    async fn test_cancellation_stops_enumeration() {
        let token = CancellationToken::new();
        let cancel = token.clone();
        let invoker = ParameterizedInvoker::new(
            Arc::new(RepeatedHost::new(5)),
            Arc::new(CaseInvoker::new(
                "body",
                test_fn(move |_ctx, _token| {
                    let cancel = cancel.clone();
                    async move {
                        cancel.cancel();
                        Ok(None)
                    }
                }),
            )),
        );

        let result = invoker.invoke(&ctx(), &token).await;
        assert_eq!(result.children().len(), 1);
    }

    #[tokio::test]
    async fn test_source_failure_is_an_error_node() {
        let source = ParameterSource::new("broken", |_ctx| anyhow::bail!("no values"));
        let invoker = ParameterizedInvoker::new(
            Arc::new(EnumeratedHost::new("broken", source)),
            Arc::new(CaseInvoker::new(
                "body",
                test_fn(|_ctx, _token| async { Ok(None) }),
            )),
        );

        let result = invoker.invoke(&ctx(), &CancellationToken::new()).await;
        assert_eq!(result.status(), TestStatus::Error);
        assert_eq!(result.message(), Some("Parameter source failed"));
    }
}
