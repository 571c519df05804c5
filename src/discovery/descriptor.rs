//! Test metadata descriptors
//!
//! The declarative description of fixtures, methods and parameters that
//! discovery consumes. Descriptors carry no execution state; resolving
//! them produces the invoker tree.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use crate::config::TestCategory;
use crate::hosts::{FixtureFactory, FixtureTeardown, ParameterHost, ParameterSource, TestValue};
use crate::invokers::{ExpectedError, TestFn};

/// How a formal parameter of a test method binds.
#[derive(Clone)]
pub enum ParamKind {
    /// Passed through unwrapped.
    Context,
    /// Passed through unwrapped.
    CancelToken,
    /// Needs a lifecycle-managed instance of the named type.
    Instance { type_id: TypeId, type_name: &'static str },
    /// Implicit `{false, true}` axis.
    Bool,
    /// Implicit axis over all members.
    Enum { members: Vec<TestValue> },
    /// Plain typed parameter; needs a declared source.
    Typed { type_id: TypeId, type_name: &'static str },
}

impl fmt::Debug for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Context => f.write_str("Context"),
            ParamKind::CancelToken => f.write_str("CancelToken"),
            ParamKind::Instance { type_name, .. } => write!(f, "Instance({type_name})"),
            ParamKind::Bool => f.write_str("Bool"),
            ParamKind::Enum { members } => write!(f, "Enum({} members)", members.len()),
            ParamKind::Typed { type_name, .. } => write!(f, "Typed({type_name})"),
        }
    }
}

/// One formal parameter, in declaration order.
#[derive(Clone)]
pub struct ParamDescriptor {
    name: String,
    kind: ParamKind,
    host: Option<Arc<dyn ParameterHost>>,
    source: Option<ParameterSource>,
}

impl ParamDescriptor {
    pub fn context() -> Self {
        Self::plain("ctx", ParamKind::Context)
    }

    pub fn cancel_token() -> Self {
        Self::plain("token", ParamKind::CancelToken)
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::plain(name, ParamKind::Bool)
    }

    pub fn enumerated(name: impl Into<String>, members: Vec<TestValue>) -> Self {
        Self::plain(name, ParamKind::Enum { members })
    }

    pub fn typed<T: 'static>(name: impl Into<String>) -> Self {
        Self::plain(
            name,
            ParamKind::Typed {
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
            },
        )
    }

    pub fn instance<T: 'static>(name: impl Into<String>) -> Self {
        Self::plain(
            name,
            ParamKind::Instance {
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
            },
        )
    }

    fn plain(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            host: None,
            source: None,
        }
    }

    /// Attach an explicit per-parameter host.
    pub fn with_host(mut self, host: Arc<dyn ParameterHost>) -> Self {
        self.host = Some(host);
        self
    }

    /// Attach an explicit per-parameter source.
    pub fn with_source(mut self, source: ParameterSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ParamKind {
        &self.kind
    }

    pub fn host(&self) -> Option<&Arc<dyn ParameterHost>> {
        self.host.as_ref()
    }

    pub fn source(&self) -> Option<&ParameterSource> {
        self.source.as_ref()
    }
}

impl fmt::Debug for ParamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("explicit_host", &self.host.is_some())
            .field("explicit_source", &self.source.is_some())
            .finish()
    }
}

/// One test method of a fixture.
#[derive(Clone)]
pub struct MethodDescriptor {
    name: String,
    public: bool,
    static_method: bool,
    categories: Vec<TestCategory>,
    features: Vec<String>,
    repeat: u32,
    expected: Option<ExpectedError>,
    params: Vec<ParamDescriptor>,
    body: TestFn,
}

impl MethodDescriptor {
    pub fn new(name: impl Into<String>, body: TestFn) -> Self {
        Self {
            name: name.into(),
            public: true,
            static_method: false,
            categories: Vec::new(),
            features: Vec::new(),
            repeat: 0,
            expected: None,
            params: Vec::new(),
            body,
        }
    }

    pub fn private(mut self) -> Self {
        self.public = false;
        self
    }

    pub fn static_method(mut self) -> Self {
        self.static_method = true;
        self
    }

    pub fn category(mut self, category: TestCategory) -> Self {
        self.categories.push(category);
        self
    }

    pub fn feature(mut self, feature: impl Into<String>) -> Self {
        self.features.push(feature.into());
        self
    }

    pub fn repeat(mut self, count: u32) -> Self {
        self.repeat = count;
        self
    }

    pub fn expecting(mut self, expected: ExpectedError) -> Self {
        self.expected = Some(expected);
        self
    }

    pub fn param(mut self, param: ParamDescriptor) -> Self {
        self.params.push(param);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    pub fn is_static(&self) -> bool {
        self.static_method
    }

    pub fn categories(&self) -> &[TestCategory] {
        &self.categories
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn repeat_count(&self) -> u32 {
        self.repeat
    }

    pub fn expected(&self) -> Option<ExpectedError> {
        self.expected
    }

    pub fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }

    pub fn body(&self) -> TestFn {
        self.body.clone()
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("public", &self.public)
            .field("static", &self.static_method)
            .field("repeat", &self.repeat)
            .field("params", &self.params)
            .finish()
    }
}

/// One test fixture: a named group of methods sharing an instance.
#[derive(Clone)]
pub struct FixtureDescriptor {
    name: String,
    categories: Vec<TestCategory>,
    features: Vec<String>,
    repeat: u32,
    factory: Option<FixtureFactory>,
    teardown: Option<FixtureTeardown>,
    methods: Vec<MethodDescriptor>,
}

impl FixtureDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            categories: Vec::new(),
            features: Vec::new(),
            repeat: 0,
            factory: None,
            teardown: None,
            methods: Vec::new(),
        }
    }

    pub fn category(mut self, category: TestCategory) -> Self {
        self.categories.push(category);
        self
    }

    pub fn feature(mut self, feature: impl Into<String>) -> Self {
        self.features.push(feature.into());
        self
    }

    pub fn repeat(mut self, count: u32) -> Self {
        self.repeat = count;
        self
    }

    /// Factory building the shared fixture value during SetUp.
    pub fn factory(mut self, factory: FixtureFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn teardown(mut self, teardown: FixtureTeardown) -> Self {
        self.teardown = Some(teardown);
        self
    }

    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn categories(&self) -> &[TestCategory] {
        &self.categories
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn repeat_count(&self) -> u32 {
        self.repeat
    }

    pub fn fixture_factory(&self) -> Option<FixtureFactory> {
        self.factory.clone()
    }

    pub fn fixture_teardown(&self) -> Option<FixtureTeardown> {
        self.teardown.clone()
    }

    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }
}

impl fmt::Debug for FixtureDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixtureDescriptor")
            .field("name", &self.name)
            .field("repeat", &self.repeat)
            .field("methods", &self.methods.len())
            .finish()
    }
}

/// Source of fixture metadata.
pub trait DiscoveryProvider: Send + Sync {
    fn fixtures(&self) -> Vec<FixtureDescriptor>;
}

/// Registration-based provider: fixtures are declared programmatically.
#[derive(Clone, Debug, Default)]
pub struct StaticProvider {
    fixtures: Vec<FixtureDescriptor>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, fixture: FixtureDescriptor) -> &mut Self {
        self.fixtures.push(fixture);
        self
    }
}

impl DiscoveryProvider for StaticProvider {
    fn fixtures(&self) -> Vec<FixtureDescriptor> {
        self.fixtures.clone()
    }
}
