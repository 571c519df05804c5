//! asynctest - Attribute-driven asynchronous test execution
//!
//! Declarative test metadata (parameter sources, expected errors, repeat
//! counts, categories) is discovered into a suite/fixture/case tree,
//! resolved into a tree of cancellable invokers wrapped by parameter
//! hosts, and invoked to produce a result tree - locally, across fixtures
//! in parallel, or on a remote runner over TCP.
//!
//! ## Usage
//!
//! ```bash
//! # Run the built-in suite
//! asynctest run
//!
//! # Select a category, repeat the suite
//! asynctest run --category Network --repeat 10
//!
//! # Fixtures in parallel
//! asynctest run --parallel --concurrent 8
//!
//! # Remote execution
//! asynctest listen --addr 0.0.0.0:8888
//! asynctest connect 10.0.0.5:8888
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod discovery;
pub mod executor;
pub mod hosts;
pub mod invokers;
pub mod models;
pub mod output;
pub mod remoting;
pub mod selftest;
pub mod suite;
pub mod utils;
pub mod wire;

pub use context::{CancellationToken, TestContext};
pub use executor::{RunError, TestSession};
pub use models::{TestName, TestResult, TestStatus};
pub use suite::{TestCase, TestFixture, TestSuite};
