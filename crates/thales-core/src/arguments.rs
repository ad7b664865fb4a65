//! Handler-ready argument sets.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::dependency::DependencyValue;

/// Errors raised while handing bound values to a handler.
///
/// These indicate a mismatch between a handler's declared signature and the
/// types it asks for, not a client error.
#[derive(Error, Debug)]
pub enum ArgumentError {
    /// The argument was never bound.
    #[error("argument '{name}' was not bound")]
    Missing {
        /// Argument name.
        name: String,
    },

    /// The validated value does not deserialize into the requested type.
    #[error("argument '{name}' could not be converted: {reason}")]
    Conversion {
        /// Argument name.
        name: String,
        /// Deserializer message.
        reason: String,
    },

    /// The dependency produced a value of another type.
    #[error("dependency argument '{name}' is not a {expected}")]
    DependencyType {
        /// Argument name.
        name: String,
        /// Requested type.
        expected: &'static str,
    },
}

/// Validated values and resolved dependencies for one call.
///
/// Values are keyed by the Rust parameter name, not the wire name.
///
/// ```
/// use thales_core::BoundArguments;
///
/// let mut args = BoundArguments::new();
/// args.insert_value("skip", serde_json::json!(5));
/// let skip: i64 = args.take("skip").unwrap();
/// assert_eq!(skip, 5);
/// ```
#[derive(Default, Clone)]
pub struct BoundArguments {
    values: IndexMap<String, Value>,
    injected: HashMap<String, DependencyValue>,
}

impl std::fmt::Debug for BoundArguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundArguments")
            .field("values", &self.values)
            .field("injected", &self.injected.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl BoundArguments {
    /// Creates an empty argument set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a validated value.
    pub fn insert_value(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Stores a resolved dependency value.
    pub fn insert_dependency(&mut self, name: impl Into<String>, value: DependencyValue) {
        self.injected.insert(name.into(), value);
    }

    /// Returns a validated value.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns all validated values in declaration order.
    pub fn values(&self) -> &IndexMap<String, Value> {
        &self.values
    }

    /// Number of bound values and dependencies.
    pub fn len(&self) -> usize {
        self.values.len() + self.injected.len()
    }

    /// True when nothing was bound.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.injected.is_empty()
    }

    /// Removes a value and deserializes it.
    ///
    /// An absent value deserializes from `null`, so optional parameters come
    /// out as `None`.
    pub fn take<T: DeserializeOwned>(&mut self, name: &str) -> Result<T, ArgumentError> {
        let value = self.values.shift_remove(name).unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|e| ArgumentError::Conversion {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    /// Returns a shared handle to a dependency value.
    pub fn dependency_arc<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, ArgumentError> {
        let value = self
            .injected
            .get(name)
            .ok_or_else(|| ArgumentError::Missing {
                name: name.to_string(),
            })?;
        Arc::clone(value)
            .downcast::<T>()
            .map_err(|_| ArgumentError::DependencyType {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Returns a clone of a dependency value.
    pub fn dependency<T: Any + Send + Sync + Clone>(&self, name: &str) -> Result<T, ArgumentError> {
        self.dependency_arc::<T>(name).map(|value| T::clone(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_take_value() {
        let mut args = BoundArguments::new();
        args.insert_value("tags", json!(["a", "b"]));
        let tags: Vec<String> = args.take("tags").unwrap();
        assert_eq!(tags, vec!["a", "b"]);
        assert!(args.value("tags").is_none());
    }

    #[test]
    fn test_take_absent_as_option() {
        let mut args = BoundArguments::new();
        let value: Option<i64> = args.take("missing").unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_take_conversion_error() {
        let mut args = BoundArguments::new();
        args.insert_value("id", json!("abc"));
        let err = args.take::<i64>("id").unwrap_err();
        assert!(matches!(err, ArgumentError::Conversion { .. }));
    }

    #[test]
    fn test_dependency_lookup() {
        let mut args = BoundArguments::new();
        args.insert_dependency("user", Arc::new("alice".to_string()));
        assert_eq!(args.dependency::<String>("user").unwrap(), "alice");
        assert!(matches!(
            args.dependency::<i32>("user"),
            Err(ArgumentError::DependencyType { .. })
        ));
        assert!(matches!(
            args.dependency::<String>("other"),
            Err(ArgumentError::Missing { .. })
        ));
        assert_eq!(args.len(), 1);
    }
}
