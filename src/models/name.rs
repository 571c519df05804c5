//! Test name model
//!
//! A test name is a dotted path plus the ordered parameter annotations
//! accumulated while descending the invoker tree.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One `key=value` annotation attached to a test name.
///
/// Hidden parameters still participate in equality but are omitted from the
/// rendered name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestParameter {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl TestParameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            hidden: false,
        }
    }

    pub fn hidden(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            hidden: true,
        }
    }
}

/// Immutable identifier of one invocation path.
///
/// Two names with identical path and parameters compare equal. Lossless
/// round-trips go through serde; the rendered form drops hidden parameters
/// and [`FromStr`] over it is best-effort (values containing `,`, `=` or
/// `)` are not escaped).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestName {
    name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    parameters: Vec<TestParameter>,
}

impl TestName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.parameters.is_empty()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[TestParameter] {
        &self.parameters
    }

    pub fn has_parameters(&self) -> bool {
        !self.parameters.is_empty()
    }

    pub fn visible_parameters(&self) -> impl Iterator<Item = &TestParameter> {
        self.parameters.iter().filter(|p| !p.hidden)
    }

    /// Extend the dotted path by one segment.
    pub fn child(&self, segment: &str) -> TestName {
        let name = if self.name.is_empty() {
            segment.to_string()
        } else {
            format!("{}.{}", self.name, segment)
        };
        TestName {
            name,
            parameters: self.parameters.clone(),
        }
    }

    /// Append a parameter annotation.
    pub fn with_parameter(&self, parameter: TestParameter) -> TestName {
        let mut parameters = self.parameters.clone();
        parameters.push(parameter);
        TestName {
            name: self.name.clone(),
            parameters,
        }
    }

    /// Full rendered form: `path(key=value,...)` over visible parameters.
    pub fn full_name(&self) -> String {
        let mut visible = self.visible_parameters().peekable();
        if visible.peek().is_none() {
            return self.name.clone();
        }
        let args: Vec<String> = visible.map(|p| format!("{}={}", p.name, p.value)).collect();
        format!("{}({})", self.name, args.join(","))
    }
}

impl fmt::Display for TestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

/// Error parsing a rendered test name.
///
/// Parsing the rendered form is best-effort: hidden parameters were never
/// rendered, and parameter values are split on the first `=` without
/// unescaping. Use serde when the exact name must survive.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("malformed test name: {0}")]
pub struct ParseNameError(String);

impl FromStr for TestName {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some(open) = s.find('(') else {
            return Ok(TestName::new(s));
        };
        if !s.ends_with(')') {
            return Err(ParseNameError(s.to_string()));
        }
        let name = &s[..open];
        let args = &s[open + 1..s.len() - 1];
        let mut parameters = Vec::new();
        for arg in args.split(',').filter(|a| !a.is_empty()) {
            let (key, value) = arg
                .split_once('=')
                .ok_or_else(|| ParseNameError(s.to_string()))?;
            parameters.push(TestParameter::new(key, value));
        }
        Ok(TestName {
            name: name.to_string(),
            parameters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_path() {
        let root = TestName::empty();
        let suite = root.child("suite");
        let case = suite.child("fixture").child("case");
        assert_eq!(case.name(), "suite.fixture.case");
        assert!(root.is_empty());
        assert!(!case.is_empty());
    }

    #[test]
    fn test_full_name_with_parameters() {
        let name = TestName::new("math.add")
            .with_parameter(TestParameter::new("x", "false"))
            .with_parameter(TestParameter::new("y", "P"));
        assert_eq!(name.full_name(), "math.add(x=false,y=P)");
    }

    #[test]
    fn test_hidden_parameters_not_rendered() {
        let name = TestName::new("t")
            .with_parameter(TestParameter::hidden("inner", "1"))
            .with_parameter(TestParameter::new("x", "true"));
        assert_eq!(name.full_name(), "t(x=true)");
        assert_eq!(name.parameters().len(), 2);
    }

    #[test]
    fn test_equality() {
        let a = TestName::new("a.b").with_parameter(TestParameter::new("x", "1"));
        let b = TestName::new("a.b").with_parameter(TestParameter::new("x", "1"));
        let c = TestName::new("a.b").with_parameter(TestParameter::new("x", "2"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_parse_round_trip() {
        let name = TestName::new("suite.fixture.case")
            .with_parameter(TestParameter::new("x", "false"))
            .with_parameter(TestParameter::new("y", "Q"));
        let parsed: TestName = name.full_name().parse().unwrap();
        assert_eq!(parsed, name);

        let plain: TestName = "suite.case".parse().unwrap();
        assert_eq!(plain, TestName::new("suite.case"));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("case(x".parse::<TestName>().is_err());
        assert!("case(x,y)".parse::<TestName>().is_err());
    }

    #[test]
    fn test_rendered_parse_is_best_effort() {
        // Hidden parameters are not rendered, so parsing the rendered form
        // loses them; the serde form keeps everything.
        let name = TestName::new("t")
            .with_parameter(TestParameter::hidden("iteration", "2"))
            .with_parameter(TestParameter::new("x", "true"));
        let parsed: TestName = name.full_name().parse().unwrap();
        assert_eq!(parsed.parameters().len(), 1);
        assert_ne!(parsed, name);

        let json = serde_json::to_string(&name).unwrap();
        let back: TestName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);

        // Values split on the first '=' only.
        let odd: TestName = "t(expr=a=b)".parse().unwrap();
        assert_eq!(odd.parameters()[0].value, "a=b");
    }

    #[test]
    fn test_serde_round_trip() {
        let name = TestName::new("a.b")
            .with_parameter(TestParameter::hidden("i", "3"))
            .with_parameter(TestParameter::new("x", "true"));
        let json = serde_json::to_string(&name).unwrap();
        let back: TestName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }
}
