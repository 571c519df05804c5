//! Parameter hosts
//!
//! A host supplies one axis of parameterization: an ordered, finite
//! sequence of typed values plus the lifecycle hooks around each
//! constructed instance. Hosts carry no per-run state; everything mutable
//! lives in the instances they create.

mod custom;
mod enumerated;
mod fixed;
mod fixture;
mod instance;
mod repeated;

pub use custom::{CustomHost, InstanceLifecycle};
pub use enumerated::{EnumeratedHost, ParameterSource, SourceFn, ValueFilter};
pub use fixed::FixedValueHost;
pub use fixture::{fixture_fn, fixture_teardown, FixtureFactory, FixtureHost, FixtureTeardown};
pub use instance::{TestInstance, TestValue};
pub use repeated::RepeatedHost;

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;

use crate::context::TestContext;

/// One axis of parameterization.
///
/// `values` enumerates the axis; the lifecycle hooks default to no-ops so
/// simple value hosts implement nothing else. Invokers guarantee `destroy`
/// runs for every instance they construct, even when the inner invocation
/// fails or the run is cancelled.
#[async_trait]
pub trait ParameterHost: Send + Sync {
    /// Stable identifier; used as the parameter key in test names and for
    /// chain lookups.
    fn id(&self) -> &str;

    /// Ordered values of this axis for the given context.
    async fn values(&self, ctx: &TestContext) -> Result<Vec<TestValue>>;

    /// Called once after an instance is constructed.
    async fn initialize(&self, _instance: &TestInstance, _ctx: &TestContext) -> Result<()> {
        Ok(())
    }

    /// Called before each invocation using the instance.
    async fn pre_run(&self, _instance: &TestInstance, _ctx: &TestContext) -> Result<()> {
        Ok(())
    }

    /// Called after each invocation using the instance.
    async fn post_run(&self, _instance: &TestInstance, _ctx: &TestContext) -> Result<()> {
        Ok(())
    }

    /// Refresh a reusable instance before it serves the next sibling.
    async fn reuse(&self, _instance: &TestInstance, _ctx: &TestContext) -> Result<()> {
        Ok(())
    }

    /// Release whatever the instance holds.
    async fn destroy(&self, _instance: &TestInstance, _ctx: &TestContext) -> Result<()> {
        Ok(())
    }

    /// Whether one constructed instance may be handed from sibling to
    /// sibling inside an aggregate instead of being rebuilt.
    fn reusable(&self) -> bool {
        false
    }

    /// SetUp path for aggregate-attached hosts: construct and initialize a
    /// single instance from the first value of the axis.
    async fn create_instance(&self, ctx: &TestContext) -> Result<Arc<TestInstance>> {
        let mut values = self.values(ctx).await?;
        if values.is_empty() {
            bail!("host '{}' produced no values", self.id());
        }
        let value = values.remove(0);
        let instance = Arc::new(TestInstance::new(self.id(), value, ctx.instance()));
        self.initialize(&instance, ctx).await?;
        Ok(instance)
    }
}
