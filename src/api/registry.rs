//! Registry of API classes keyed by identifier.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::api::ApiClass;
use crate::error::ConfigError;

#[derive(Clone, Default)]
pub struct ClassRegistry {
    classes: IndexMap<String, Arc<dyn ApiClass>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `class` under `identifier`, replacing an earlier registration.
    pub fn register(&mut self, identifier: impl Into<String>, class: Arc<dyn ApiClass>) {
        self.classes.insert(identifier.into(), class);
    }

    pub fn get(&self, identifier: &str) -> Option<&Arc<dyn ApiClass>> {
        self.classes.get(identifier)
    }

    /// Like [`get`](Self::get), but a missing class is a setup error.
    pub fn require(&self, identifier: &str) -> Result<&Arc<dyn ApiClass>, ConfigError> {
        self.get(identifier)
            .ok_or_else(|| ConfigError::MissingClass(identifier.to_string()))
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.classes.contains_key(identifier)
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.classes.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiHandler, MethodInfo};
    use crate::dispatch::RequestContext;
    use crate::error::CallError;
    use serde_json::Value;

    struct Empty;

    impl ApiClass for Empty {
        fn methods(&self) -> Vec<MethodInfo> {
            Vec::new()
        }

        fn instantiate(&self, _ctx: &RequestContext) -> Box<dyn ApiHandler> {
            Box::new(EmptyHandler)
        }
    }

    struct EmptyHandler;

    impl ApiHandler for EmptyHandler {
        fn call(&mut self, _method: &str, _args: &[Value]) -> Result<Value, CallError> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn test_require_missing_class() {
        let mut registry = ClassRegistry::new();
        registry.register("Empty", Arc::new(Empty));

        assert!(registry.require("Empty").is_ok());
        let err = registry.require("Users").err().unwrap();
        assert_eq!(err.to_string(), "API class Users is missing");
        assert_eq!(registry.identifiers().collect::<Vec<_>>(), vec!["Empty"]);
    }
}
