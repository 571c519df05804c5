//! Test result tree
//!
//! The output structure mirroring the invocation tree: four leaf kinds plus
//! an ordered collection node, built incrementally during execution and
//! immutable afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::TestName;

/// Leaf-level execution status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Success,
    Error,
    Warning,
    Ignored,
}

impl TestStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            TestStatus::Success => "✓",
            TestStatus::Error => "✗",
            TestStatus::Warning => "!",
            TestStatus::Ignored => "○",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TestStatus::Success)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestStatus::Success => write!(f, "PASS"),
            TestStatus::Error => write!(f, "ERROR"),
            TestStatus::Warning => write!(f, "WARN"),
            TestStatus::Ignored => write!(f, "SKIP"),
        }
    }
}

/// Result of one invocation subtree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TestResult {
    Success {
        name: TestName,
    },
    Error {
        name: TestName,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cause: Option<String>,
    },
    Warning {
        name: TestName,
        message: String,
    },
    Ignored {
        name: TestName,
    },
    Collection {
        name: TestName,
        children: Vec<TestResult>,
    },
}

/// Derived counts over a result tree, computed by a single traversal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultCounts {
    pub total: usize,
    pub success: usize,
    pub errors: usize,
    pub warnings: usize,
    pub ignored: usize,
}

impl TestResult {
    pub fn success(name: TestName) -> Self {
        TestResult::Success { name }
    }

    pub fn error(name: TestName, message: impl Into<String>, cause: Option<String>) -> Self {
        TestResult::Error {
            name,
            message: message.into(),
            cause,
        }
    }

    /// Error from a runtime failure value, keeping the full context chain.
    pub fn from_error(name: TestName, message: impl Into<String>, error: &anyhow::Error) -> Self {
        TestResult::Error {
            name,
            message: message.into(),
            cause: Some(format!("{error:#}")),
        }
    }

    pub fn warning(name: TestName, message: impl Into<String>) -> Self {
        TestResult::Warning {
            name,
            message: message.into(),
        }
    }

    pub fn ignored(name: TestName) -> Self {
        TestResult::Ignored { name }
    }

    pub fn collection(name: TestName, children: Vec<TestResult>) -> Self {
        TestResult::Collection { name, children }
    }

    pub fn name(&self) -> &TestName {
        match self {
            TestResult::Success { name }
            | TestResult::Error { name, .. }
            | TestResult::Warning { name, .. }
            | TestResult::Ignored { name }
            | TestResult::Collection { name, .. } => name,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            TestResult::Error { message, .. } | TestResult::Warning { message, .. } => {
                Some(message)
            }
            _ => None,
        }
    }

    pub fn children(&self) -> &[TestResult] {
        match self {
            TestResult::Collection { children, .. } => children,
            _ => &[],
        }
    }

    /// Effective status; a collection merges its children (any error wins,
    /// then any warning, an empty collection is a success).
    pub fn status(&self) -> TestStatus {
        match self {
            TestResult::Success { .. } => TestStatus::Success,
            TestResult::Error { .. } => TestStatus::Error,
            TestResult::Warning { .. } => TestStatus::Warning,
            TestResult::Ignored { .. } => TestStatus::Ignored,
            TestResult::Collection { children, .. } => {
                let mut status = TestStatus::Success;
                for child in children {
                    match child.status() {
                        TestStatus::Error => return TestStatus::Error,
                        TestStatus::Warning => status = TestStatus::Warning,
                        TestStatus::Success | TestStatus::Ignored => {}
                    }
                }
                status
            }
        }
    }

    /// Walk the tree depth-first, children in order.
    pub fn accept<V: ResultVisitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            TestResult::Success { name } => visitor.visit_success(name),
            TestResult::Error {
                name,
                message,
                cause,
            } => visitor.visit_error(name, message, cause.as_deref()),
            TestResult::Warning { name, message } => visitor.visit_warning(name, message),
            TestResult::Ignored { name } => visitor.visit_ignored(name),
            TestResult::Collection { name, children } => {
                visitor.visit_collection(name, children);
                for child in children {
                    child.accept(visitor);
                }
            }
        }
    }

    /// Compute leaf counts; never cached, stable across repeated calls.
    pub fn counts(&self) -> ResultCounts {
        struct Counter(ResultCounts);
        impl ResultVisitor for Counter {
            fn visit_success(&mut self, _name: &TestName) {
                self.0.total += 1;
                self.0.success += 1;
            }
            fn visit_error(&mut self, _name: &TestName, _message: &str, _cause: Option<&str>) {
                self.0.total += 1;
                self.0.errors += 1;
            }
            fn visit_warning(&mut self, _name: &TestName, _message: &str) {
                self.0.total += 1;
                self.0.warnings += 1;
            }
            fn visit_ignored(&mut self, _name: &TestName) {
                self.0.total += 1;
                self.0.ignored += 1;
            }
        }
        let mut counter = Counter(ResultCounts::default());
        self.accept(&mut counter);
        counter.0
    }

    /// Collapse synthetic wrappers: a single-child collection with an empty
    /// name renders as its child.
    pub fn flattened(&self) -> &TestResult {
        match self {
            TestResult::Collection { name, children }
                if name.is_empty() && children.len() == 1 =>
            {
                children[0].flattened()
            }
            _ => self,
        }
    }

    /// Leaf results in depth-first order.
    pub fn leaves(&self) -> Vec<&TestResult> {
        match self {
            TestResult::Collection { children, .. } => {
                children.iter().flat_map(|c| c.leaves()).collect()
            }
            _ => vec![self],
        }
    }
}

/// Visitor over the closed set of result kinds.
///
/// Collection recursion is driven by [`TestResult::accept`]; the visitor
/// only observes each node.
pub trait ResultVisitor {
    fn visit_success(&mut self, name: &TestName);
    fn visit_error(&mut self, name: &TestName, message: &str, cause: Option<&str>);
    fn visit_warning(&mut self, name: &TestName, message: &str);
    fn visit_ignored(&mut self, name: &TestName);
    fn visit_collection(&mut self, _name: &TestName, _children: &[TestResult]) {}
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status().symbol(), self.name().full_name())?;
        if let Some(message) = self.message() {
            write!(f, " - {message}")?;
        }
        if let TestResult::Collection { children, .. } = self {
            write!(f, " ({} children)", children.len())?;
        }
        Ok(())
    }
}
