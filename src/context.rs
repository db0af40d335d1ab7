use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use crate::Value;

/// Evaluation context: the attributes flags are resolved against.
///
/// `targeting_key` is the canonical identifier of the evaluated subject.
pub type Context = HashMap<String, Value>;

/// Something that can produce a merged evaluation context.
pub trait ContextProvider: Send + Sync {
    /// Current merged context. Never contains [`Value::Null`] at the top level.
    fn get_context(&self) -> Context;
}

/// One level of a context hierarchy.
///
/// The merged view is the parent's merged view overlaid with the local map, where a `None` entry
/// removes the inherited key.
pub(crate) struct ContextScope {
    parent: Option<Arc<dyn ContextProvider>>,
    local: RwLock<HashMap<String, Option<Value>>>,
}

impl ContextScope {
    pub fn root() -> ContextScope {
        ContextScope {
            parent: None,
            local: RwLock::new(HashMap::new()),
        }
    }

    /// A child scope seeded with `parent`'s current merged view, overlaid with `overlay`.
    pub fn child(parent: Arc<dyn ContextProvider>, overlay: Context) -> ContextScope {
        let mut local: HashMap<String, Option<Value>> = parent
            .get_context()
            .into_iter()
            .map(|(key, value)| (key, Some(value)))
            .collect();
        for (key, value) in overlay {
            local.insert(key, non_null(value));
        }

        ContextScope {
            parent: Some(parent),
            local: RwLock::new(local),
        }
    }

    /// Set `key` in the local map. [`Value::Null`] hides the key from the merged view.
    pub fn put(&self, key: String, value: Value) {
        self.local
            .write()
            .expect("thread holding context lock should not panic")
            .insert(key, non_null(value));
    }
}

impl ContextProvider for ContextScope {
    fn get_context(&self) -> Context {
        let mut context = match &self.parent {
            Some(parent) => parent.get_context(),
            None => Context::new(),
        };

        let local = self
            .local
            .read()
            .expect("thread holding context lock should not panic");
        for (key, value) in local.iter() {
            match value {
                Some(value) => {
                    context.insert(key.clone(), value.clone());
                }
                None => {
                    context.remove(key);
                }
            }
        }

        context
    }
}

fn non_null(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        value => Some(value),
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use super::{Context, ContextProvider, ContextScope};
    use crate::Value;

    fn context(entries: &[(&str, Value)]) -> Context {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn root_starts_empty() {
        assert!(ContextScope::root().get_context().is_empty());
    }

    #[test]
    fn put_and_remove() {
        let scope = ContextScope::root();
        scope.put("user".to_owned(), Value::from("alice"));
        scope.put("age".to_owned(), Value::Integer(30));
        scope.put("age".to_owned(), Value::Null);

        assert_eq!(
            scope.get_context(),
            context(&[("user", Value::from("alice"))])
        );
    }

    #[test]
    fn child_overrides_and_removes() {
        let parent = Arc::new(ContextScope::root());
        parent.put("a".to_owned(), Value::Integer(1));
        parent.put("b".to_owned(), Value::Integer(2));

        let child = ContextScope::child(
            parent.clone(),
            context(&[("b", Value::Integer(3)), ("a", Value::Null)]),
        );

        assert_eq!(child.get_context(), context(&[("b", Value::Integer(3))]));
        assert_eq!(
            parent.get_context(),
            context(&[("a", Value::Integer(1)), ("b", Value::Integer(2))])
        );
    }

    #[test]
    fn later_parent_writes_are_visible_unless_shadowed() {
        let parent = Arc::new(ContextScope::root());
        parent.put("a".to_owned(), Value::Integer(1));
        let child = ContextScope::child(parent.clone(), HashMap::new());

        parent.put("new".to_owned(), Value::Boolean(true));
        parent.put("a".to_owned(), Value::Integer(10));

        assert_eq!(
            child.get_context(),
            context(&[("a", Value::Integer(1)), ("new", Value::Boolean(true))])
        );
    }

    #[test]
    fn child_writes_do_not_leak_to_parent() {
        let parent = Arc::new(ContextScope::root());
        let child = ContextScope::child(parent.clone(), HashMap::new());
        child.put("x".to_owned(), Value::Integer(1));

        assert!(parent.get_context().is_empty());
        assert_eq!(child.get_context(), context(&[("x", Value::Integer(1))]));
    }

    #[test]
    fn merged_view_is_stable() {
        let scope = ContextScope::root();
        scope.put("a".to_owned(), Value::Integer(1));
        assert_eq!(scope.get_context(), scope.get_context());
    }
}
