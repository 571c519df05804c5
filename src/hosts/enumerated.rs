//! Enumerated parameter sources

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use super::{ParameterHost, TestValue};
use crate::context::TestContext;

/// Produces the raw values of one source.
pub type SourceFn = Arc<dyn Fn(&TestContext) -> Result<Vec<TestValue>> + Send + Sync>;

/// Keeps only matching values.
pub type ValueFilter = Arc<dyn Fn(&TestValue) -> bool + Send + Sync>;

/// A declared parameter source: a value producer plus an optional filter.
#[derive(Clone)]
pub struct ParameterSource {
    name: String,
    values: SourceFn,
    filter: Option<ValueFilter>,
}

impl ParameterSource {
    pub fn new<F>(name: impl Into<String>, values: F) -> Self
    where
        F: Fn(&TestContext) -> Result<Vec<TestValue>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            values: Arc::new(values),
            filter: None,
        }
    }

    /// Source over a fixed value list.
    pub fn fixed(name: impl Into<String>, values: Vec<TestValue>) -> Self {
        Self::new(name, move |_ctx| Ok(values.clone()))
    }

    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&TestValue) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn produce(&self, ctx: &TestContext) -> Result<Vec<TestValue>> {
        let mut values = (self.values)(ctx)?;
        if let Some(filter) = &self.filter {
            values.retain(|v| filter(v));
        }
        Ok(values)
    }
}

impl fmt::Debug for ParameterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterSource")
            .field("name", &self.name)
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}

/// Host over an enumerated parameter source.
#[derive(Clone, Debug)]
pub struct EnumeratedHost {
    id: String,
    source: ParameterSource,
}

impl EnumeratedHost {
    pub fn new(id: impl Into<String>, source: ParameterSource) -> Self {
        Self {
            id: id.into(),
            source,
        }
    }

    /// Implicit host for a bool-typed parameter: `{false, true}`.
    pub fn bool_host(id: impl Into<String>) -> Self {
        let id = id.into();
        Self::new(
            id.clone(),
            ParameterSource::fixed(id, vec![TestValue::new(false), TestValue::new(true)]),
        )
    }

    /// Implicit host enumerating all members of an enum-typed parameter.
    pub fn enum_host(id: impl Into<String>, members: Vec<TestValue>) -> Self {
        let id = id.into();
        Self::new(id.clone(), ParameterSource::fixed(id, members))
    }
}

#[async_trait]
impl ParameterHost for EnumeratedHost {
    fn id(&self) -> &str {
        &self.id
    }

    async fn values(&self, ctx: &TestContext) -> Result<Vec<TestValue>> {
        self.source.produce(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NullLog;

    fn ctx() -> TestContext {
        TestContext::root(Arc::new(NullLog))
    }

    #[tokio::test]
    async fn test_bool_host_order() {
        let host = EnumeratedHost::bool_host("x");
        let values = host.values(&ctx()).await.unwrap();
        let rendered: Vec<&str> = values.iter().map(|v| v.display()).collect();
        assert_eq!(rendered, vec!["false", "true"]);
    }

    #[tokio::test]
    async fn test_filter_applies() {
        let source = ParameterSource::fixed(
            "n",
            (1u32..=5).map(TestValue::new).collect(),
        )
        .with_filter(|v| v.downcast_ref::<u32>().is_some_and(|n| n % 2 == 1));
        let host = EnumeratedHost::new("n", source);
        let values = host.values(&ctx()).await.unwrap();
        let rendered: Vec<&str> = values.iter().map(|v| v.display()).collect();
        assert_eq!(rendered, vec!["1", "3", "5"]);
    }

    #[tokio::test]
    async fn test_source_failure_propagates() {
        let source = ParameterSource::new("broken", |_ctx| anyhow::bail!("no values today"));
        let host = EnumeratedHost::new("broken", source);
        assert!(host.values(&ctx()).await.is_err());
    }
}
