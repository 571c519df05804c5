//! Leaf invoker
//!
//! Binds the resolved parameter values (via the context's instance chain),
//! runs the test body and maps its outcome to a result. Two modes, chosen
//! at discovery time: expecting success, or expecting a declared failure
//! type.

use anyhow::anyhow;
use async_trait::async_trait;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;

use super::{panic_message, TestFn, TestInvoker};
use crate::context::{CancellationToken, TestContext};
use crate::models::{TestResult, TestStatus};

/// Declared expectation that the body fails with a particular error type.
#[derive(Clone, Copy, Debug)]
pub struct ExpectedError {
    type_name: &'static str,
    matcher: fn(&anyhow::Error) -> bool,
}

impl ExpectedError {
    /// Expect a failure whose chain contains `E`.
    pub fn of<E>() -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            type_name: std::any::type_name::<E>(),
            matcher: |error| error.chain().any(|cause| cause.downcast_ref::<E>().is_some()),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn matches(&self, error: &anyhow::Error) -> bool {
        (self.matcher)(error)
    }
}

/// Leaf of the invoker tree.
pub struct CaseInvoker {
    name: String,
    body: TestFn,
    expected: Option<ExpectedError>,
}

impl CaseInvoker {
    pub fn new(name: impl Into<String>, body: TestFn) -> Self {
        Self {
            name: name.into(),
            body,
            expected: None,
        }
    }

    pub fn expecting(name: impl Into<String>, body: TestFn, expected: ExpectedError) -> Self {
        Self {
            name: name.into(),
            body,
            expected: Some(expected),
        }
    }

    async fn run_body(
        &self,
        ctx: &TestContext,
        token: &CancellationToken,
    ) -> anyhow::Result<Option<TestResult>> {
        let future = (self.body)(ctx.clone(), token.clone());
        let outcome = match AssertUnwindSafe(future).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => Err(anyhow!("test body panicked: {}", panic_message(payload))),
        };

        // Recorded assertion failures fail the test even when the body
        // itself completed.
        let failures = ctx.take_failures();
        match outcome {
            Ok(_) if !failures.is_empty() => {
                Err(anyhow!("assertion failed: {}", failures.join("; ")))
            }
            other => other,
        }
    }
}

#[async_trait]
impl TestInvoker for CaseInvoker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, ctx: &TestContext, token: &CancellationToken) -> TestResult {
        let name = ctx.current_name();
        ctx.debug(5, format!("invoke {}", name.full_name()));

        let outcome = self.run_body(ctx, token).await;

        match self.expected {
            None => match outcome {
                Ok(Some(result)) => result,
                Ok(None) => {
                    let warnings = ctx.take_warnings();
                    if warnings.is_empty() {
                        TestResult::success(name)
                    } else {
                        TestResult::warning(name, warnings.join("; "))
                    }
                }
                Err(error) => {
                    let message = if token.is_cancelled() {
                        "Test cancelled"
                    } else {
                        "Test failed"
                    };
                    let result = TestResult::from_error(name, message, &error);
                    ctx.log_error(&result);
                    result
                }
            },
            Some(expected) => match outcome {
                Ok(propagated) => {
                    if let Some(result) = propagated {
                        if result.status() == TestStatus::Error {
                            return TestResult::error(
                                name,
                                format!(
                                    "Expected an exception of type {}, but got an untyped failure",
                                    expected.type_name()
                                ),
                                result.message().map(str::to_string),
                            );
                        }
                    }
                    TestResult::error(
                        name,
                        format!("Expected an exception of type {}", expected.type_name()),
                        None,
                    )
                }
                Err(error) => {
                    if expected.matches(&error) {
                        TestResult::success(name)
                    } else {
                        TestResult::error(
                            name,
                            format!(
                                "Expected an exception of type {}, but got: {error:#}",
                                expected.type_name()
                            ),
                            None,
                        )
                    }
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NullLog;
    use crate::invokers::test_fn;
    use crate::models::TestName;
    use std::sync::Arc;
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("foo went wrong")]
    struct FooError;

    #[derive(Debug, Error)]
    #[error("bar went wrong")]
    struct BarError;

    fn ctx() -> TestContext {
        TestContext::root(Arc::new(NullLog)).child("case")
    }

    #[tokio::test]
    async fn test_plain_completion_is_success() {
        let invoker = CaseInvoker::new("case", test_fn(|_ctx, _token| async { Ok(None) }));
        let result = invoker.invoke(&ctx(), &CancellationToken::new()).await;
        assert_eq!(result, TestResult::success(TestName::new("case")));
    }

    #[tokio::test]
    async fn test_propagated_result_passes_through() {
        let invoker = CaseInvoker::new(
            "case",
            test_fn(|ctx, _token| async move {
                Ok(Some(TestResult::ignored(ctx.current_name())))
            }),
        );
        let result = invoker.invoke(&ctx(), &CancellationToken::new()).await;
        assert_eq!(result.status(), TestStatus::Ignored);
    }

    #[tokio::test]
    async fn test_failure_becomes_error() {
        let invoker = CaseInvoker::new(
            "case",
            test_fn(|_ctx, _token| async { Err(anyhow::Error::new(FooError)) }),
        );
        let result = invoker.invoke(&ctx(), &CancellationToken::new()).await;
        assert_eq!(result.status(), TestStatus::Error);
        assert_eq!(result.message(), Some("Test failed"));
    }

    #[tokio::test]
    async fn test_panic_is_trapped() {
        let invoker = CaseInvoker::new(
            "case",
            test_fn(|_ctx, _token| async { panic!("boom") }),
        );
        let result = invoker.invoke(&ctx(), &CancellationToken::new()).await;
        assert_eq!(result.status(), TestStatus::Error);
        let TestResult::Error { cause, .. } = &result else {
            panic!("expected error result");
        };
        assert!(cause.as_deref().unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn test_recorded_assertion_fails_test() {
        let invoker = CaseInvoker::new(
            "case",
            test_fn(|ctx, _token| async move {
                ctx.expect(1 + 1 == 3, "arithmetic is broken");
                Ok(None)
            }),
        );
        let result = invoker.invoke(&ctx(), &CancellationToken::new()).await;
        assert_eq!(result.status(), TestStatus::Error);
        let TestResult::Error { cause, .. } = &result else {
            panic!("expected error result");
        };
        assert!(cause.as_deref().unwrap().contains("arithmetic is broken"));
    }

    #[tokio::test]
    async fn test_warning_on_green_body() {
        let invoker = CaseInvoker::new(
            "case",
            test_fn(|ctx, _token| async move {
                ctx.warn("slow path taken");
                Ok(None)
            }),
        );
        let result = invoker.invoke(&ctx(), &CancellationToken::new()).await;
        assert_eq!(result.status(), TestStatus::Warning);
    }

    #[tokio::test]
    async fn test_expected_exception_thrown() {
        let invoker = CaseInvoker::expecting(
            "case",
            test_fn(|_ctx, _token| async { Err(anyhow::Error::new(FooError)) }),
            ExpectedError::of::<FooError>(),
        );
        let result = invoker.invoke(&ctx(), &CancellationToken::new()).await;
        assert_eq!(result.status(), TestStatus::Success);
    }

    #[tokio::test]
    async fn test_expected_exception_matches_through_chain() {
        let invoker = CaseInvoker::expecting(
            "case",
            test_fn(|_ctx, _token| async {
                Err(anyhow::Error::new(FooError).context("while connecting"))
            }),
            ExpectedError::of::<FooError>(),
        );
        let result = invoker.invoke(&ctx(), &CancellationToken::new()).await;
        assert_eq!(result.status(), TestStatus::Success);
    }

    #[tokio::test]
    async fn test_expected_exception_wrong_type() {
        let invoker = CaseInvoker::expecting(
            "case",
            test_fn(|_ctx, _token| async { Err(anyhow::Error::new(BarError)) }),
            ExpectedError::of::<FooError>(),
        );
        let result = invoker.invoke(&ctx(), &CancellationToken::new()).await;
        assert_eq!(result.status(), TestStatus::Error);
        let message = result.message().unwrap();
        assert!(message.contains("FooError"));
        assert!(message.contains("bar went wrong"));
    }

    #[tokio::test]
    async fn test_expected_exception_not_thrown() {
        let invoker = CaseInvoker::expecting(
            "case",
            test_fn(|_ctx, _token| async { Ok(None) }),
            ExpectedError::of::<FooError>(),
        );
        let result = invoker.invoke(&ctx(), &CancellationToken::new()).await;
        assert_eq!(result.status(), TestStatus::Error);
        assert!(result.message().unwrap().contains("Expected an exception"));
    }
}
