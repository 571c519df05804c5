//! Parameter values and instance chains

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Type-erased parameter value with a stable display form.
///
/// Cheap to clone; the display form is what ends up in test names and on
/// the wire.
#[derive(Clone)]
pub struct TestValue {
    value: Arc<dyn Any + Send + Sync>,
    display: String,
}

impl TestValue {
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + Sync + fmt::Display,
    {
        let display = value.to_string();
        Self {
            value: Arc::new(value),
            display,
        }
    }

    /// For values without a natural `Display`.
    pub fn with_display<T>(value: T, display: impl Into<String>) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            value: Arc::new(value),
            display: display.into(),
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    pub fn display(&self) -> &str {
        &self.display
    }
}

impl fmt::Debug for TestValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TestValue({})", self.display)
    }
}

impl fmt::Display for TestValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display)
    }
}

/// One constructed parameter value plus its ownership chain.
///
/// Instances form a singly-linked parent chain mirroring nested
/// parameterization; the chain is built top-down during invocation and
/// never mutated afterwards.
#[derive(Clone, Debug)]
pub struct TestInstance {
    host_id: String,
    value: TestValue,
    parent: Option<Arc<TestInstance>>,
}

impl TestInstance {
    pub fn new(host_id: impl Into<String>, value: TestValue, parent: Option<Arc<TestInstance>>) -> Self {
        Self {
            host_id: host_id.into(),
            value,
            parent,
        }
    }

    pub fn host_id(&self) -> &str {
        &self.host_id
    }

    pub fn value(&self) -> &TestValue {
        &self.value
    }

    pub fn parent(&self) -> Option<&Arc<TestInstance>> {
        self.parent.as_ref()
    }

    /// Number of instances in the chain, this one included.
    pub fn depth(&self) -> usize {
        1 + self.parent.as_ref().map_or(0, |p| p.depth())
    }
}

impl fmt::Display for TestInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.host_id, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_downcast() {
        let value = TestValue::new(42u32);
        assert_eq!(value.downcast_ref::<u32>(), Some(&42));
        assert!(value.downcast_ref::<bool>().is_none());
        assert_eq!(value.display(), "42");
    }

    #[test]
    fn test_value_with_display() {
        #[derive(Debug)]
        struct Opaque;
        let value = TestValue::with_display(Opaque, "opaque");
        assert!(value.is::<Opaque>());
        assert_eq!(value.display(), "opaque");
    }

    #[test]
    fn test_instance_chain() {
        let outer = Arc::new(TestInstance::new("x", TestValue::new(true), None));
        let inner = TestInstance::new("y", TestValue::new(3u8), Some(outer.clone()));
        assert_eq!(inner.depth(), 2);
        assert_eq!(inner.parent().unwrap().host_id(), "x");
        assert_eq!(inner.to_string(), "y=3");
    }
}
