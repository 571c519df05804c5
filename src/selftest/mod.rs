//! Built-in sample suite
//!
//! A small suite exercising every host kind and result status. Serves as
//! the default target for `run` and `list`, and as a live smoke test of
//! the engine against itself.

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::config::TestCategory;
use crate::context::TestContext;
use crate::discovery::{
    FixtureDescriptor, HostRegistry, MethodDescriptor, ParamDescriptor, StaticProvider,
};
use crate::hosts::{fixture_fn, CustomHost, InstanceLifecycle, ParameterSource, TestValue};
use crate::invokers::{test_fn, ExpectedError};
use crate::suite::TestSuite;

#[derive(Clone, Copy, Debug)]
enum Transport {
    Tcp,
    Udp,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Tcp => write!(f, "tcp"),
            Transport::Udp => write!(f, "udp"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("sample failure")]
struct SampleError;

/// Counter shared by a fixture's cases.
#[derive(Debug, Default)]
struct Scratchpad;

struct ScratchpadLifecycle;

#[async_trait]
impl InstanceLifecycle for ScratchpadLifecycle {
    async fn create(&self, _ctx: &TestContext) -> Result<TestValue> {
        Ok(TestValue::with_display(Scratchpad, "scratchpad"))
    }
}

/// The sample suite plus the registry its typed parameters need.
pub fn sample_suite() -> (TestSuite, HostRegistry) {
    let mut registry = HostRegistry::new();
    registry.register_source::<u16>(ParameterSource::fixed(
        "ports",
        vec![TestValue::new(80u16), TestValue::new(443u16)],
    ));

    let mut provider = StaticProvider::new();

    provider.add(
        FixtureDescriptor::new("arithmetic")
            .factory(fixture_fn(|_ctx| async {
                Ok(TestValue::with_display(vec![1i64, 2, 3], "seed"))
            }))
            .method(MethodDescriptor::new(
                "sums_seed",
                test_fn(|ctx, _token| async move {
                    let seed = ctx
                        .try_get_parameter::<Vec<i64>>()
                        .ok_or_else(|| anyhow::anyhow!("seed missing"))?;
                    ctx.expect(seed.iter().sum::<i64>() == 6, "seed sum changed");
                    Ok(None)
                }),
            ))
            .method(
                MethodDescriptor::new(
                    "repeats",
                    test_fn(|_ctx, _token| async { Ok(None) }),
                )
                .repeat(3),
            ),
    );

    provider.add(
        FixtureDescriptor::new("transport")
            .method(
                MethodDescriptor::new(
                    "connects",
                    test_fn(|ctx, _token| async move {
                        let secure = *ctx
                            .try_get_parameter::<bool>()
                            .ok_or_else(|| anyhow::anyhow!("secure missing"))?;
                        let port = *ctx
                            .try_get_parameter::<u16>()
                            .ok_or_else(|| anyhow::anyhow!("port missing"))?;
                        if secure && port == 80 {
                            ctx.warn("TLS on the cleartext port");
                        }
                        Ok(None)
                    }),
                )
                .param(ParamDescriptor::bool("secure"))
                .param(ParamDescriptor::typed::<u16>("port")),
            )
            .method(
                MethodDescriptor::new(
                    "negotiates",
                    test_fn(|_ctx, _token| async { Ok(None) }),
                )
                .param(ParamDescriptor::enumerated(
                    "transport",
                    vec![TestValue::new(Transport::Tcp), TestValue::new(Transport::Udp)],
                )),
            ),
    );

    provider.add(
        FixtureDescriptor::new("failures")
            .method(
                MethodDescriptor::new(
                    "expected_error",
                    test_fn(|_ctx, _token| async { Err(anyhow::Error::new(SampleError)) }),
                )
                .expecting(ExpectedError::of::<SampleError>()),
            )
            .method(
                MethodDescriptor::new(
                    "scoped_state",
                    test_fn(|ctx, _token| async move {
                        anyhow::ensure!(
                            ctx.try_get_parameter::<Scratchpad>().is_some(),
                            "scratchpad missing"
                        );
                        Ok(None)
                    }),
                )
                .param(
                    ParamDescriptor::instance::<Scratchpad>("pad")
                        .with_host(Arc::new(CustomHost::new(
                            "pad",
                            Arc::new(ScratchpadLifecycle),
                        ))),
                ),
            )
            .method(
                MethodDescriptor::new(
                    "slow_path",
                    test_fn(|_ctx, _token| async { Ok(None) }),
                )
                .category(TestCategory::new("Slow")),
            ),
    );

    (TestSuite::discover("selftest", &provider), registry)
}
