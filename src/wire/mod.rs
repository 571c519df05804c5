//! Wire representation
//!
//! A structural element tree carrying names, results and run parameters
//! across the process boundary. Conversions are lossless in both
//! directions; a malformed tree fails with a typed error instead of a
//! partial decode.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::{TestName, TestParameter, TestResult, TestStatus};
use crate::remoting::RunParameters;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("unexpected element '{found}', wanted '{wanted}'")]
    UnexpectedElement { wanted: &'static str, found: String },

    #[error("element is missing attribute '{0}'")]
    MissingAttribute(&'static str),

    #[error("element is missing child '{0}'")]
    MissingChild(&'static str),

    #[error("attribute '{attribute}' has invalid value '{value}'")]
    InvalidAttribute { attribute: &'static str, value: String },
}

/// One node of the structural tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn get(&self, key: &'static str) -> Result<&str, WireError> {
        self.attributes
            .get(key)
            .map(String::as_str)
            .ok_or(WireError::MissingAttribute(key))
    }

    pub fn find_child(&self, name: &'static str) -> Result<&Element, WireError> {
        self.children
            .iter()
            .find(|c| c.name == name)
            .ok_or(WireError::MissingChild(name))
    }

    fn expect(&self, wanted: &'static str) -> Result<(), WireError> {
        if self.name == wanted {
            Ok(())
        } else {
            Err(WireError::UnexpectedElement {
                wanted,
                found: self.name.clone(),
            })
        }
    }
}

impl From<&TestName> for Element {
    fn from(name: &TestName) -> Self {
        let mut element = Element::new("TestName").attribute("name", name.name());
        for parameter in name.parameters() {
            let mut child = Element::new("TestParameter")
                .attribute("name", &parameter.name)
                .attribute("value", &parameter.value);
            if parameter.hidden {
                child = child.attribute("hidden", "true");
            }
            element = element.child(child);
        }
        element
    }
}

impl TryFrom<&Element> for TestName {
    type Error = WireError;

    fn try_from(element: &Element) -> Result<Self, WireError> {
        element.expect("TestName")?;
        let mut name = TestName::new(element.get("name")?);
        for child in &element.children {
            child.expect("TestParameter")?;
            let parameter = if child.attributes.get("hidden").is_some_and(|h| h == "true") {
                TestParameter::hidden(child.get("name")?, child.get("value")?)
            } else {
                TestParameter::new(child.get("name")?, child.get("value")?)
            };
            name = name.with_parameter(parameter);
        }
        Ok(name)
    }
}

impl From<&TestResult> for Element {
    fn from(result: &TestResult) -> Self {
        let kind = match result.status() {
            _ if matches!(result, TestResult::Collection { .. }) => "collection",
            TestStatus::Success => "success",
            TestStatus::Error => "error",
            TestStatus::Warning => "warning",
            TestStatus::Ignored => "ignored",
        };
        let mut element = Element::new("TestResult")
            .attribute("kind", kind)
            .child(Element::from(result.name()));
        if let Some(message) = result.message() {
            element = element.attribute("message", message);
        }
        if let TestResult::Error {
            cause: Some(cause), ..
        } = result
        {
            element = element.attribute("cause", cause);
        }
        for child in result.children() {
            element = element.child(Element::from(child));
        }
        element
    }
}

impl TryFrom<&Element> for TestResult {
    type Error = WireError;

    fn try_from(element: &Element) -> Result<Self, WireError> {
        element.expect("TestResult")?;
        let name = TestName::try_from(element.find_child("TestName")?)?;
        let message = || {
            element
                .get("message")
                .map(str::to_string)
                .map_err(|_| WireError::MissingAttribute("message"))
        };

        match element.get("kind")? {
            "success" => Ok(TestResult::success(name)),
            "error" => Ok(TestResult::error(
                name,
                message()?,
                element.attributes.get("cause").cloned(),
            )),
            "warning" => Ok(TestResult::warning(name, message()?)),
            "ignored" => Ok(TestResult::ignored(name)),
            "collection" => {
                let children = element
                    .children
                    .iter()
                    .filter(|c| c.name == "TestResult")
                    .map(TestResult::try_from)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(TestResult::collection(name, children))
            }
            other => Err(WireError::InvalidAttribute {
                attribute: "kind",
                value: other.to_string(),
            }),
        }
    }
}

impl From<&RunParameters> for Element {
    fn from(params: &RunParameters) -> Self {
        let mut element = Element::new("RunParameters").attribute("session", &params.session);
        if let Some(category) = &params.category {
            element = element.attribute("category", category);
        }
        if let Some(repeat) = params.repeat {
            element = element.attribute("repeat", repeat.to_string());
        }
        element
    }
}

impl TryFrom<&Element> for RunParameters {
    type Error = WireError;

    fn try_from(element: &Element) -> Result<Self, WireError> {
        element.expect("RunParameters")?;
        let repeat = match element.attributes.get("repeat") {
            Some(value) => Some(value.parse().map_err(|_| WireError::InvalidAttribute {
                attribute: "repeat",
                value: value.clone(),
            })?),
            None => None,
        };
        Ok(RunParameters {
            session: element.get("session")?.to_string(),
            category: element.attributes.get("category").cloned(),
            repeat,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> TestResult {
        let base = TestName::new("unit.net");
        TestResult::collection(
            base.clone(),
            vec![
                TestResult::success(
                    base.child("connect")
                        .with_parameter(TestParameter::new("secure", "true")),
                ),
                TestResult::error(
                    base.child("handshake"),
                    "Test failed",
                    Some("connection refused".to_string()),
                ),
                TestResult::ignored(base.child("slow")),
            ],
        )
    }

    #[test]
    fn test_result_round_trip() {
        let result = sample_result();
        let element = Element::from(&result);
        let back = TestResult::try_from(&element).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_name_round_trip_keeps_hidden_flag() {
        let name = TestName::new("a.b")
            .with_parameter(TestParameter::hidden("iteration", "2"))
            .with_parameter(TestParameter::new("x", "false"));
        let back = TestName::try_from(&Element::from(&name)).unwrap();
        assert_eq!(back, name);
    }

    #[test]
    fn test_run_parameters_round_trip() {
        let params = RunParameters {
            session: "3f9a".to_string(),
            category: Some("Network".to_string()),
            repeat: Some(5),
        };
        let back = RunParameters::try_from(&Element::from(&params)).unwrap();
        assert_eq!(back, params);
    }

    #[test]
    fn test_element_survives_json() {
        let element = Element::from(&sample_result());
        let json = serde_json::to_string(&element).unwrap();
        let back: Element = serde_json::from_str(&json).unwrap();
        assert_eq!(back, element);
    }

    #[test]
    fn test_malformed_trees_are_typed_errors() {
        let wrong = Element::new("SomethingElse");
        assert_eq!(
            TestResult::try_from(&wrong).unwrap_err(),
            WireError::UnexpectedElement {
                wanted: "TestResult",
                found: "SomethingElse".to_string()
            }
        );

        let no_kind = Element::new("TestResult").child(Element::from(&TestName::new("t")));
        assert_eq!(
            TestResult::try_from(&no_kind).unwrap_err(),
            WireError::MissingAttribute("kind")
        );

        let bad_repeat = Element::new("RunParameters")
            .attribute("session", "s")
            .attribute("repeat", "lots");
        assert!(matches!(
            RunParameters::try_from(&bad_repeat).unwrap_err(),
            WireError::InvalidAttribute { attribute: "repeat", .. }
        ));
    }
}
