//! View-locals: named markup accessors templates can call.
//!
//! Accessors are grouped by namespace. [`ViewLocals::install`] exposes each
//! namespace to a minijinja [`Environment`] as a global object, so
//! `{{ shipwright.scripts() }}` calls the `scripts` accessor of the
//! `shipwright` namespace on every render. Output is marked safe; accessors
//! are responsible for escaping what they embed.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use minijinja::value::{Object, Value};
use minijinja::{Environment, Error, ErrorKind, State};
use parking_lot::RwLock;

/// A markup-producing accessor.
pub type Accessor = Arc<dyn Fn() -> String + Send + Sync>;

type Namespaces = IndexMap<String, IndexMap<String, Accessor>>;

/// Shared, cloneable registry of view accessors.
#[derive(Clone, Default)]
pub struct ViewLocals {
    namespaces: Arc<RwLock<Namespaces>>,
}

impl ViewLocals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) `namespace.name`.
    pub fn insert<F>(&self, namespace: &str, name: &str, accessor: F)
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.namespaces
            .write()
            .entry(namespace.to_string())
            .or_default()
            .insert(name.to_string(), Arc::new(accessor));
    }

    /// Invoke `namespace.name`, if registered.
    pub fn call(&self, namespace: &str, name: &str) -> Option<String> {
        let accessor = self
            .namespaces
            .read()
            .get(namespace)
            .and_then(|accessors| accessors.get(name))
            .cloned()?;
        Some(accessor())
    }

    pub fn contains(&self, namespace: &str, name: &str) -> bool {
        self.namespaces
            .read()
            .get(namespace)
            .is_some_and(|accessors| accessors.contains_key(name))
    }

    pub fn names(&self, namespace: &str) -> Vec<String> {
        self.namespaces
            .read()
            .get(namespace)
            .map(|accessors| accessors.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Expose every namespace registered so far as a template global.
    ///
    /// Accessors added to an already-installed namespace are picked up on
    /// the next render; namespaces created later need another `install`.
    pub fn install(&self, env: &mut Environment<'_>) {
        let namespaces: Vec<String> = self.namespaces.read().keys().cloned().collect();
        for namespace in namespaces {
            let object = NamespaceObject {
                locals: self.clone(),
                namespace: namespace.clone(),
            };
            env.add_global(namespace, Value::from_object(object));
        }
    }
}

impl fmt::Debug for ViewLocals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let namespaces = self.namespaces.read();
        let mut map = f.debug_map();
        for (namespace, accessors) in namespaces.iter() {
            map.entry(namespace, &accessors.keys().collect::<Vec<_>>());
        }
        map.finish()
    }
}

#[derive(Debug)]
struct NamespaceObject {
    locals: ViewLocals,
    namespace: String,
}

impl Object for NamespaceObject {
    fn call_method(
        self: &Arc<Self>,
        _state: &State<'_, '_>,
        method: &str,
        args: &[Value],
    ) -> Result<Value, Error> {
        if !args.is_empty() {
            return Err(Error::new(
                ErrorKind::TooManyArguments,
                format!("{}.{method} takes no arguments", self.namespace),
            ));
        }
        match self.locals.call(&self.namespace, method) {
            Some(markup) => Ok(Value::from_safe_string(markup)),
            None => Err(Error::new(
                ErrorKind::UnknownMethod,
                format!("{} has no accessor named {method}", self.namespace),
            )),
        }
    }
}
