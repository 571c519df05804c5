//! Single fixed value host

use anyhow::Result;
use async_trait::async_trait;

use super::{ParameterHost, TestValue};
use crate::context::TestContext;

/// Host whose axis has exactly one, pre-built value.
#[derive(Clone, Debug)]
pub struct FixedValueHost {
    id: String,
    value: TestValue,
}

impl FixedValueHost {
    pub fn new(id: impl Into<String>, value: TestValue) -> Self {
        Self {
            id: id.into(),
            value,
        }
    }
}

#[async_trait]
impl ParameterHost for FixedValueHost {
    fn id(&self) -> &str {
        &self.id
    }

    async fn values(&self, _ctx: &TestContext) -> Result<Vec<TestValue>> {
        Ok(vec![self.value.clone()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NullLog;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_single_value() {
        let host = FixedValueHost::new("port", TestValue::new(8080u16));
        let ctx = TestContext::root(Arc::new(NullLog));
        let values = host.values(&ctx).await.unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].downcast_ref::<u16>(), Some(&8080));
    }
}
