//! Test invokers
//!
//! The composable, cancellable execution units produced by resolving test
//! metadata. An invoker tree is built once per fixture and is safe to
//! re-invoke: per-run state lives in contexts and instances, never on the
//! invoker.

mod aggregated;
mod case;
mod parameterized;
mod proxy;

pub use aggregated::AggregatedInvoker;
pub use case::{CaseInvoker, ExpectedError};
pub use parameterized::ParameterizedInvoker;
pub use proxy::ProxyInvoker;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::context::{CancellationToken, TestContext};
use crate::models::{TestName, TestResult};

/// One executable unit of the resolved tree.
#[async_trait]
pub trait TestInvoker: Send + Sync {
    fn name(&self) -> &str;

    /// Execute under the given context; failures become result nodes, they
    /// never escape.
    async fn invoke(&self, ctx: &TestContext, token: &CancellationToken) -> TestResult;
}

impl std::fmt::Debug for dyn TestInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestInvoker")
            .field("name", &self.name())
            .finish()
    }
}

/// Registered body of a test case.
///
/// `Ok(None)` means plain completion, `Ok(Some(result))` propagates a
/// result the body produced itself, `Err` is the test failing.
pub type TestFn = Arc<
    dyn Fn(TestContext, CancellationToken) -> BoxFuture<'static, anyhow::Result<Option<TestResult>>>
        + Send
        + Sync,
>;

/// Wrap an async closure as a [`TestFn`].
pub fn test_fn<F, Fut>(f: F) -> TestFn
where
    F: Fn(TestContext, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Option<TestResult>>> + Send + 'static,
{
    Arc::new(move |ctx, token| Box::pin(f(ctx, token)))
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run a child invoker, converting a panic into an Error node so the
/// caller's loop keeps its ordering and teardown guarantees.
pub(crate) async fn invoke_guarded(
    invoker: &dyn TestInvoker,
    ctx: &TestContext,
    token: &CancellationToken,
    error_name: TestName,
) -> TestResult {
    match AssertUnwindSafe(invoker.invoke(ctx, token)).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => TestResult::error(error_name, "Test failed", Some(panic_message(payload))),
    }
}
