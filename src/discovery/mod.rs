//! Discovery
//!
//! Maps declarative test metadata to an executable invoker chain. Each
//! method's formal parameters are inspected in reverse declaration order
//! and mapped to parameter hosts; unmatched parameters are a fatal
//! configuration error, found at discovery time rather than mid-run.

mod descriptor;

pub use descriptor::{
    DiscoveryProvider, FixtureDescriptor, MethodDescriptor, ParamDescriptor, ParamKind,
    StaticProvider,
};

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::hosts::{EnumeratedHost, ParameterHost, ParameterSource, RepeatedHost};
use crate::invokers::{CaseInvoker, ParameterizedInvoker, ProxyInvoker, TestInvoker};

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("parameter '{parameter}' of '{case}' has no host and no source")]
    UnresolvedParameter { case: String, parameter: String },

    #[error("instance parameter '{parameter}' of '{case}' needs an explicit or registered host")]
    MissingInstanceHost { case: String, parameter: String },
}

/// Per-type hosts and parameter sources, the fallback when a parameter
/// declares nothing itself.
#[derive(Clone, Default)]
pub struct HostRegistry {
    hosts: HashMap<TypeId, Arc<dyn ParameterHost>>,
    sources: HashMap<TypeId, ParameterSource>,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_host<T: 'static>(&mut self, host: Arc<dyn ParameterHost>) -> &mut Self {
        self.hosts.insert(TypeId::of::<T>(), host);
        self
    }

    pub fn register_source<T: 'static>(&mut self, source: ParameterSource) -> &mut Self {
        self.sources.insert(TypeId::of::<T>(), source);
        self
    }
}

/// Resolve one test method into its invoker chain.
///
/// Hosts are collected with the repeat host first, then the parameters in
/// reverse declaration order, and applied to the leaf in that order. The
/// first-collected host ends up innermost, so the repeat loop sits next to
/// the body and the leftmost-declared parameter drives the outermost loop
/// (the rightmost parameter varies fastest).
pub fn resolve_case(
    method: &MethodDescriptor,
    registry: &HostRegistry,
) -> Result<Arc<dyn TestInvoker>, DiscoveryError> {
    let mut hosts: Vec<Arc<dyn ParameterHost>> = Vec::new();

    if method.repeat_count() > 0 {
        hosts.push(Arc::new(RepeatedHost::new(method.repeat_count())));
    }

    for param in method.params().iter().rev() {
        if let Some(host) = host_for(method, param, registry)? {
            hosts.push(host);
        }
    }

    let mut invoker: Arc<dyn TestInvoker> = match method.expected() {
        Some(expected) => Arc::new(CaseInvoker::expecting(
            method.name(),
            method.body(),
            expected,
        )),
        None => Arc::new(CaseInvoker::new(method.name(), method.body())),
    };

    for host in hosts {
        invoker = Arc::new(ParameterizedInvoker::new(host, invoker));
    }

    Ok(Arc::new(ProxyInvoker::new(method.name(), invoker)))
}

fn host_for(
    method: &MethodDescriptor,
    param: &ParamDescriptor,
    registry: &HostRegistry,
) -> Result<Option<Arc<dyn ParameterHost>>, DiscoveryError> {
    match param.kind() {
        // Passed through unwrapped.
        ParamKind::Context | ParamKind::CancelToken => Ok(None),

        ParamKind::Instance { type_id, .. } => {
            if let Some(host) = param.host() {
                return Ok(Some(host.clone()));
            }
            if let Some(host) = registry.hosts.get(type_id) {
                return Ok(Some(host.clone()));
            }
            Err(DiscoveryError::MissingInstanceHost {
                case: method.name().to_string(),
                parameter: param.name().to_string(),
            })
        }

        ParamKind::Bool => Ok(Some(
            explicit(param, registry, None)
                .unwrap_or_else(|| Arc::new(EnumeratedHost::bool_host(param.name()))),
        )),

        ParamKind::Enum { members } => Ok(Some(explicit(param, registry, None).unwrap_or_else(
            || Arc::new(EnumeratedHost::enum_host(param.name(), members.clone())),
        ))),

        ParamKind::Typed { type_id, .. } => {
            match explicit(param, registry, Some(type_id)) {
                Some(host) => Ok(Some(host)),
                None => Err(DiscoveryError::UnresolvedParameter {
                    case: method.name().to_string(),
                    parameter: param.name().to_string(),
                }),
            }
        }
    }
}

/// Per-parameter declaration wins over the per-type registry.
fn explicit(
    param: &ParamDescriptor,
    registry: &HostRegistry,
    type_id: Option<&TypeId>,
) -> Option<Arc<dyn ParameterHost>> {
    if let Some(host) = param.host() {
        return Some(host.clone());
    }
    if let Some(source) = param.source() {
        return Some(Arc::new(EnumeratedHost::new(param.name(), source.clone())));
    }
    if let Some(source) = type_id.and_then(|id| registry.sources.get(id)) {
        return Some(Arc::new(EnumeratedHost::new(param.name(), source.clone())));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{CancellationToken, NullLog, TestContext};
    use crate::hosts::TestValue;
    use crate::invokers::test_fn;
    use std::fmt;

    #[derive(Clone, Copy, Debug)]
    enum Mode {
        P,
        Q,
    }

    impl fmt::Display for Mode {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Mode::P => write!(f, "P"),
                Mode::Q => write!(f, "Q"),
            }
        }
    }

    fn noop_body() -> crate::invokers::TestFn {
        test_fn(|_ctx, _token| async { Ok(None) })
    }

    fn ctx() -> TestContext {
        TestContext::root(Arc::new(NullLog))
    }

    #[tokio::test]
    async fn test_implicit_bool_and_enum_hosts() {
        let method = MethodDescriptor::new("connect", noop_body())
            .param(ParamDescriptor::bool("secure"))
            .param(ParamDescriptor::enumerated(
                "mode",
                vec![TestValue::new(Mode::P), TestValue::new(Mode::Q)],
            ));

        let invoker = resolve_case(&method, &HostRegistry::new()).unwrap();
        let result = invoker.invoke(&ctx(), &CancellationToken::new()).await;

        let leaves = result.leaves();
        let names: Vec<String> = leaves.iter().map(|l| l.name().full_name()).collect();
        assert_eq!(
            names,
            vec![
                "connect(secure=false,mode=P)",
                "connect(secure=false,mode=Q)",
                "connect(secure=true,mode=P)",
                "connect(secure=true,mode=Q)",
            ]
        );
    }

    #[tokio::test]
    async fn test_repeat_host_sits_innermost() {
        let method = MethodDescriptor::new("retry", noop_body())
            .repeat(2)
            .param(ParamDescriptor::bool("secure"));

        let invoker = resolve_case(&method, &HostRegistry::new()).unwrap();
        let result = invoker.invoke(&ctx(), &CancellationToken::new()).await;

        let names: Vec<String> = result
            .leaves()
            .iter()
            .map(|l| l.name().full_name())
            .collect();
        assert_eq!(
            names,
            vec![
                "retry(secure=false,iteration=1)",
                "retry(secure=false,iteration=2)",
                "retry(secure=true,iteration=1)",
                "retry(secure=true,iteration=2)",
            ]
        );
    }

    #[tokio::test]
    async fn test_registered_source_resolves_typed_parameter() {
        let mut registry = HostRegistry::new();
        registry.register_source::<u16>(ParameterSource::fixed(
            "ports",
            vec![TestValue::new(80u16), TestValue::new(443u16)],
        ));

        let method = MethodDescriptor::new("listen", noop_body())
            .param(ParamDescriptor::typed::<u16>("port"));

        let invoker = resolve_case(&method, &registry).unwrap();
        let result = invoker.invoke(&ctx(), &CancellationToken::new()).await;
        assert_eq!(result.counts().total, 2);
    }

    #[test]
    fn test_unresolved_typed_parameter_is_fatal() {
        struct Opaque;
        let method = MethodDescriptor::new("broken", noop_body())
            .param(ParamDescriptor::typed::<Opaque>("what"));

        let error = resolve_case(&method, &HostRegistry::new()).unwrap_err();
        assert!(matches!(
            error,
            DiscoveryError::UnresolvedParameter { ref parameter, .. } if parameter == "what"
        ));
    }

    #[test]
    fn test_instance_parameter_without_host_is_fatal() {
        struct Connection;
        let method = MethodDescriptor::new("query", noop_body())
            .param(ParamDescriptor::instance::<Connection>("conn"));

        let error = resolve_case(&method, &HostRegistry::new()).unwrap_err();
        assert!(matches!(error, DiscoveryError::MissingInstanceHost { .. }));
    }

    #[tokio::test]
    async fn test_context_parameters_pass_through_unwrapped() {
        let method = MethodDescriptor::new("plain", noop_body())
            .param(ParamDescriptor::context())
            .param(ParamDescriptor::cancel_token());

        let invoker = resolve_case(&method, &HostRegistry::new()).unwrap();
        let result = invoker.invoke(&ctx(), &CancellationToken::new()).await;
        // No host axes: the leaf runs exactly once.
        assert_eq!(result.name().full_name(), "plain");
        assert_eq!(result.counts().total, 1);
    }
}
