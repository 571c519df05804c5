//! Suite model
//!
//! The run-independent tree built from discovered metadata: a suite of
//! fixtures, each a named group of cases sharing one constructed instance.
//! Resolving the tree against a filter and registry yields the invoker
//! tree; cases excluded by the filter resolve to `Ignored` leaves so
//! consumers can tell skipped from failed.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{TestCategory, TestFilter};
use crate::context::{CancellationToken, TestContext};
use crate::discovery::{
    resolve_case, DiscoveryError, DiscoveryProvider, FixtureDescriptor, HostRegistry,
    MethodDescriptor,
};
use crate::hosts::{FixtureHost, RepeatedHost};
use crate::invokers::{AggregatedInvoker, ParameterizedInvoker, ProxyInvoker, TestInvoker};
use crate::models::TestResult;

/// One runnable test method.
#[derive(Clone, Debug)]
pub struct TestCase {
    method: MethodDescriptor,
}

impl TestCase {
    pub fn name(&self) -> &str {
        self.method.name()
    }

    pub fn categories(&self) -> &[TestCategory] {
        self.method.categories()
    }

    pub fn features(&self) -> &[String] {
        self.method.features()
    }

    pub fn resolve(&self, registry: &HostRegistry) -> Result<Arc<dyn TestInvoker>, DiscoveryError> {
        resolve_case(&self.method, registry)
    }
}

/// A named group of cases sharing one fixture instance.
#[derive(Clone, Debug)]
pub struct TestFixture {
    descriptor: FixtureDescriptor,
    cases: Vec<TestCase>,
}

impl TestFixture {
    /// Keep only methods that qualify as test cases: public, non-static.
    pub fn from_descriptor(descriptor: FixtureDescriptor) -> Self {
        let cases = descriptor
            .methods()
            .iter()
            .filter(|m| m.is_public() && !m.is_static())
            .cloned()
            .map(|method| TestCase { method })
            .collect();
        Self { descriptor, cases }
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn categories(&self) -> &[TestCategory] {
        self.descriptor.categories()
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    /// Build the fixture's invoker: its cases under shared SetUp/TearDown,
    /// wrapped for any fixture-level repeat, behind a name proxy.
    pub fn resolve(
        &self,
        filter: &TestFilter,
        registry: &HostRegistry,
    ) -> Result<Arc<dyn TestInvoker>, DiscoveryError> {
        let mut children: Vec<Arc<dyn TestInvoker>> = Vec::with_capacity(self.cases.len());
        for case in &self.cases {
            if filter.matches(case.categories(), case.features()) {
                children.push(case.resolve(registry)?);
            } else {
                children.push(Arc::new(IgnoredInvoker {
                    name: case.name().to_string(),
                }));
            }
        }

        let mut aggregate =
            AggregatedInvoker::new(self.name(), children).continue_on_error(true);

        if let Some(factory) = self.descriptor.fixture_factory() {
            let mut host = FixtureHost::new(self.name(), factory);
            if let Some(teardown) = self.descriptor.fixture_teardown() {
                host = host.with_teardown(teardown);
            }
            aggregate = aggregate.with_host(Arc::new(host));
        }

        let mut invoker: Arc<dyn TestInvoker> = Arc::new(aggregate);
        if self.descriptor.repeat_count() > 0 {
            invoker = Arc::new(ParameterizedInvoker::new(
                Arc::new(RepeatedHost::new(self.descriptor.repeat_count())),
                invoker,
            ));
        }

        Ok(Arc::new(ProxyInvoker::new(self.name(), invoker)))
    }
}

/// The whole discovered tree.
#[derive(Clone, Debug)]
pub struct TestSuite {
    name: String,
    fixtures: Vec<TestFixture>,
}

impl TestSuite {
    /// Build the suite from a metadata provider. Fixtures are included as
    /// declared; a filter decides inclusion only at resolve time.
    pub fn discover(name: impl Into<String>, provider: &dyn DiscoveryProvider) -> Self {
        let fixtures = provider
            .fixtures()
            .into_iter()
            .map(TestFixture::from_descriptor)
            .collect();
        Self {
            name: name.into(),
            fixtures,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fixtures(&self) -> &[TestFixture] {
        &self.fixtures
    }

    pub fn case_count(&self) -> usize {
        self.fixtures.iter().map(|f| f.cases.len()).sum()
    }

    /// Resolve every fixture under one suite-level aggregate. One fixture
    /// failing never stops its siblings.
    pub fn resolve(
        &self,
        filter: &TestFilter,
        registry: &HostRegistry,
    ) -> Result<Arc<dyn TestInvoker>, DiscoveryError> {
        let mut children: Vec<Arc<dyn TestInvoker>> = Vec::with_capacity(self.fixtures.len());
        for fixture in &self.fixtures {
            if filter.matches(fixture.categories(), self.fixture_features(fixture)) {
                children.push(fixture.resolve(filter, registry)?);
            } else {
                children.push(Arc::new(IgnoredInvoker {
                    name: fixture.name().to_string(),
                }));
            }
        }

        let aggregate = AggregatedInvoker::new(&self.name, children).continue_on_error(true);
        Ok(Arc::new(ProxyInvoker::new(&self.name, Arc::new(aggregate))))
    }

    fn fixture_features<'a>(&self, fixture: &'a TestFixture) -> &'a [String] {
        fixture.descriptor.features()
    }
}

/// Leaf standing in for a filtered-out case or fixture.
struct IgnoredInvoker {
    name: String,
}

#[async_trait]
impl TestInvoker for IgnoredInvoker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, ctx: &TestContext, _token: &CancellationToken) -> TestResult {
        TestResult::ignored(ctx.current_name().child(&self.name))
    }
}
