//! Repetition as a parameter axis

use anyhow::Result;
use async_trait::async_trait;

use super::{ParameterHost, TestValue};
use crate::context::TestContext;

/// Runs the wrapped invocation `count` times; the iteration number is the
/// parameter value. Repetition is explicit parameterization, never failure
/// recovery.
#[derive(Clone, Debug)]
pub struct RepeatedHost {
    count: u32,
}

impl RepeatedHost {
    pub fn new(count: u32) -> Self {
        Self { count }
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

#[async_trait]
impl ParameterHost for RepeatedHost {
    fn id(&self) -> &str {
        "iteration"
    }

    async fn values(&self, _ctx: &TestContext) -> Result<Vec<TestValue>> {
        Ok((1..=self.count).map(TestValue::new).collect())
    }
}
