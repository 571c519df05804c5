//! Proxy invoker
//!
//! Prefixes the context's name with its own segment before delegating, so
//! the inner tree reports under a stable dotted path.

use async_trait::async_trait;
use std::sync::Arc;

use super::TestInvoker;
use crate::context::{CancellationToken, TestContext};
use crate::models::TestResult;

pub struct ProxyInvoker {
    name: String,
    inner: Arc<dyn TestInvoker>,
}

impl ProxyInvoker {
    pub fn new(name: impl Into<String>, inner: Arc<dyn TestInvoker>) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }
}

#[async_trait]
impl TestInvoker for ProxyInvoker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, ctx: &TestContext, token: &CancellationToken) -> TestResult {
        let scoped = ctx.child(&self.name);
        self.inner.invoke(&scoped, token).await
    }
}
