//! Fixture instance host
//!
//! Constructs the fixture value shared by a fixture's test cases; attached
//! to the fixture's aggregate so SetUp builds it once and TearDown releases
//! it.

use anyhow::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use super::{ParameterHost, TestInstance, TestValue};
use crate::context::TestContext;

/// Builds the fixture value.
pub type FixtureFactory =
    Arc<dyn Fn(TestContext) -> BoxFuture<'static, Result<TestValue>> + Send + Sync>;

/// Releases the fixture value during TearDown.
pub type FixtureTeardown =
    Arc<dyn Fn(TestContext, TestValue) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Wrap an async closure as a [`FixtureFactory`].
pub fn fixture_fn<F, Fut>(f: F) -> FixtureFactory
where
    F: Fn(TestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<TestValue>> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

/// Wrap an async closure as a [`FixtureTeardown`].
pub fn fixture_teardown<F, Fut>(f: F) -> FixtureTeardown
where
    F: Fn(TestContext, TestValue) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |ctx, value| Box::pin(f(ctx, value)))
}

/// Host constructing the fixture instance itself.
#[derive(Clone)]
pub struct FixtureHost {
    id: String,
    factory: FixtureFactory,
    teardown: Option<FixtureTeardown>,
}

impl FixtureHost {
    pub fn new(id: impl Into<String>, factory: FixtureFactory) -> Self {
        Self {
            id: id.into(),
            factory,
            teardown: None,
        }
    }

    pub fn with_teardown(mut self, teardown: FixtureTeardown) -> Self {
        self.teardown = Some(teardown);
        self
    }
}

impl fmt::Debug for FixtureHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixtureHost")
            .field("id", &self.id)
            .field("teardown", &self.teardown.is_some())
            .finish()
    }
}

#[async_trait]
impl ParameterHost for FixtureHost {
    fn id(&self) -> &str {
        &self.id
    }

    async fn values(&self, ctx: &TestContext) -> Result<Vec<TestValue>> {
        Ok(vec![(self.factory)(ctx.clone()).await?])
    }

    async fn destroy(&self, instance: &TestInstance, ctx: &TestContext) -> Result<()> {
        if let Some(teardown) = &self.teardown {
            (teardown)(ctx.clone(), instance.value().clone()).await?;
        }
        Ok(())
    }

    fn reusable(&self) -> bool {
        // One fixture value serves every case in the aggregate.
        true
    }
}
