//! Data models for the test framework
//!
//! Names and result trees shared by every other module.

mod name;
mod result;

pub use name::{ParseNameError, TestName, TestParameter};
pub use result::{ResultCounts, ResultVisitor, TestResult, TestStatus};
