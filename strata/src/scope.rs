//! Runtime binding environments.

use serde_json::{Map, Value};

/// A binding environment used while rendering.
///
/// Each scope owns its own bindings and may point at a parent. Lookups walk outward
/// through the parents; writes always land in the innermost scope, so bindings made
/// inside a nested scope disappear with it. A top-level scope can also read through to
/// a borrowed map, which it never writes to.
///
/// ```rust
/// use serde_json::{json, Map};
/// use strata::Scope;
///
/// let mut outer = Scope::new(Map::new());
/// outer.set("name", json!("outer"));
/// {
///     let mut inner = outer.nested();
///     inner.set("name", json!("inner"));
///     assert_eq!(inner.get("name"), Some(&json!("inner")));
/// }
/// assert_eq!(outer.get("name"), Some(&json!("outer")));
/// ```
#[derive(Debug)]
pub struct Scope<'p> {
    locals: Map<String, Value>,
    bindings: Option<&'p Map<String, Value>>,
    parent: Option<&'p Scope<'p>>,
}

impl Scope<'static> {
    /// Creates a top-level scope owning `locals`
    pub fn new(locals: Map<String, Value>) -> Self {
        Self {
            locals,
            bindings: None,
            parent: None,
        }
    }
}

impl Default for Scope<'static> {
    fn default() -> Self {
        Self::new(Map::new())
    }
}

impl<'p> Scope<'p> {
    /// Creates a top-level scope that reads `bindings` without copying them
    pub fn over(bindings: &'p Map<String, Value>) -> Self {
        Scope {
            locals: Map::new(),
            bindings: Some(bindings),
            parent: None,
        }
    }

    /// Looks `name` up here, then in each enclosing scope
    pub fn get(&self, name: &str) -> Option<&Value> {
        if let Some(value) = self.locals.get(name) {
            return Some(value);
        }
        if let Some(value) = self.bindings.and_then(|bindings| bindings.get(name)) {
            return Some(value);
        }
        self.parent.and_then(|parent| parent.get(name))
    }

    /// Binds `name` in this scope, shadowing any binding of an enclosing scope
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.locals.insert(name.into(), value);
    }

    /// Opens a child scope that reads through to this one
    pub fn nested(&self) -> Scope<'_> {
        Scope {
            locals: Map::new(),
            bindings: None,
            parent: Some(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_scopes_read_through_and_write_locally() {
        let mut root = Scope::default();
        root.set("a", json!(1));
        root.set("b", json!(2));
        let mut child = root.nested();
        child.set("b", json!(3));
        let grandchild = child.nested();
        assert_eq!(grandchild.get("a"), Some(&json!(1)));
        assert_eq!(grandchild.get("b"), Some(&json!(3)));
        assert_eq!(grandchild.get("c"), None);
        drop(grandchild);
        drop(child);
        assert_eq!(root.get("b"), Some(&json!(2)));
    }

    #[test]
    fn borrowed_bindings_are_shadowed_not_written() {
        let bindings = json!({"a": 1, "b": 2});
        let bindings = bindings.as_object().unwrap();
        let mut root = Scope::over(bindings);
        root.set("a", json!(10));
        assert_eq!(root.get("a"), Some(&json!(10)));
        assert_eq!(root.nested().get("b"), Some(&json!(2)));
        assert_eq!(bindings.get("a"), Some(&json!(1)));
    }
}
