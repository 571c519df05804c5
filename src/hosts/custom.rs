//! Attribute-driven custom hosts
//!
//! For parameters whose type manages real resources (a connection, a
//! server), a registered lifecycle builds, refreshes and tears down the
//! instance. Reuse is a strict hand-off between siblings, never concurrent
//! sharing: an aggregate holds at most one live instance per host.

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use super::{ParameterHost, TestInstance, TestValue};
use crate::context::TestContext;

/// User-supplied lifecycle for a heavyweight parameter type.
#[async_trait]
pub trait InstanceLifecycle: Send + Sync {
    /// Build the value; runs once per aggregate (or once per enumeration
    /// step when the host is not reusable).
    async fn create(&self, ctx: &TestContext) -> Result<TestValue>;

    async fn initialize(&self, _value: &TestValue, _ctx: &TestContext) -> Result<()> {
        Ok(())
    }

    /// Refresh before the value serves the next sibling invocation.
    async fn reuse(&self, _value: &TestValue, _ctx: &TestContext) -> Result<()> {
        Ok(())
    }

    async fn destroy(&self, _value: &TestValue, _ctx: &TestContext) -> Result<()> {
        Ok(())
    }
}

/// Host delegating the whole instance lifecycle to a registered
/// [`InstanceLifecycle`].
#[derive(Clone)]
pub struct CustomHost {
    id: String,
    lifecycle: Arc<dyn InstanceLifecycle>,
    reusable: bool,
}

impl CustomHost {
    pub fn new(id: impl Into<String>, lifecycle: Arc<dyn InstanceLifecycle>) -> Self {
        Self {
            id: id.into(),
            lifecycle,
            reusable: false,
        }
    }

    /// Allow one constructed instance to thread through sibling
    /// invocations.
    pub fn reusable(mut self) -> Self {
        self.reusable = true;
        self
    }
}

impl fmt::Debug for CustomHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomHost")
            .field("id", &self.id)
            .field("reusable", &self.reusable)
            .finish()
    }
}

#[async_trait]
impl ParameterHost for CustomHost {
    fn id(&self) -> &str {
        &self.id
    }

    async fn values(&self, ctx: &TestContext) -> Result<Vec<TestValue>> {
        Ok(vec![self.lifecycle.create(ctx).await?])
    }

    async fn initialize(&self, instance: &TestInstance, ctx: &TestContext) -> Result<()> {
        self.lifecycle.initialize(instance.value(), ctx).await
    }

    async fn reuse(&self, instance: &TestInstance, ctx: &TestContext) -> Result<()> {
        self.lifecycle.reuse(instance.value(), ctx).await
    }

    async fn destroy(&self, instance: &TestInstance, ctx: &TestContext) -> Result<()> {
        self.lifecycle.destroy(instance.value(), ctx).await
    }

    fn reusable(&self) -> bool {
        self.reusable
    }
}
