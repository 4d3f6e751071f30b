// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::{ScopeError, ScopeResult};
use crate::handler::{Handler, Importer, Module};

use std::rc::Rc;

use dashmap::DashMap;
use log::trace;
use thiserror::Error;

/// Errors that can occur when interacting with a Registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{registry} registration failed: An item with the name '{name}' is already registered.")]
    AlreadyExists { name: String, registry: String },
    #[error("{registry} registration failed: The name '{name}' is invalid (empty or whitespace-only names are not allowed).")]
    InvalidName { name: String, registry: String },
}

/// Validates that a name is not empty or whitespace-only.
fn validate_name(name: &str, registry_name: &str) -> Result<(), RegistryError> {
    if name.trim().is_empty() {
        Err(RegistryError::InvalidName {
            name: name.to_owned(),
            registry: registry_name.to_owned(),
        })
    } else {
        Ok(())
    }
}

/// Generic named registry of shared items.
#[derive(Clone)]
pub struct Registry<T> {
    inner: DashMap<Rc<str>, Rc<T>>,
    name: Rc<str>,
}

impl<T> Registry<T> {
    /// Create a new, empty registry with a given name.
    pub fn new(registry_name: impl Into<Rc<str>>) -> Self {
        Self {
            inner: DashMap::new(),
            name: registry_name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register an item with a given name. Returns Err if name already exists.
    pub fn register(&self, name: impl Into<Rc<str>>, item: Rc<T>) -> Result<(), RegistryError> {
        let name = name.into();
        validate_name(&name, &self.name)?;

        use dashmap::mapref::entry::Entry;
        match self.inner.entry(name) {
            Entry::Occupied(e) => Err(RegistryError::AlreadyExists {
                name: e.key().to_string(),
                registry: self.name.to_string(),
            }),
            Entry::Vacant(e) => {
                e.insert(item);
                Ok(())
            }
        }
    }

    /// Retrieve an item by name, if it exists.
    pub fn get(&self, name: &str) -> Option<Rc<T>> {
        self.inner.get(name).map(|entry| Rc::clone(entry.value()))
    }

    /// List all registered item names, sorted.
    pub fn list_names(&self) -> Vec<Rc<str>> {
        let mut names: Vec<Rc<str>> = self.inner.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

/// Default [`Importer`]: modules registered under their dotted paths.
///
/// `import("pkg.views.detail")` looks up module `pkg.views` and returns its
/// `detail` attribute. A path without any `.` separator names nothing
/// importable and is returned unchanged as a symbolic path.
#[derive(Clone)]
pub struct HandlerRegistry {
    modules: Registry<Module>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            modules: Registry::new("MODULE_REGISTRY"),
        }
    }

    /// Register a module under its own path.
    pub fn register(&self, module: Module) -> Result<Rc<Module>, RegistryError> {
        let module = Rc::new(module);
        self.modules
            .register(module.path().to_owned(), Rc::clone(&module))?;
        Ok(module)
    }

    pub fn module(&self, path: &str) -> Option<Rc<Module>> {
        self.modules.get(path)
    }

    pub fn modules(&self) -> Vec<Rc<str>> {
        self.modules.list_names()
    }
}

impl Importer for HandlerRegistry {
    fn import(&self, path: &str) -> ScopeResult<Handler> {
        let (module_path, attr) = match path.rsplit_once('.') {
            Some((m, a)) if !a.is_empty() => (m, a),
            _ => return Ok(Handler::path(path)),
        };
        trace!("importing `{attr}` from `{module_path}`");

        let unresolved = || ScopeError::HandlerResolution(path.to_owned());
        let module = self.modules.get(module_path).ok_or_else(unresolved)?;
        match module.attr(attr) {
            // Modules are containers, not callables.
            Some(Handler::Module(_)) | None => Err(unresolved()),
            Some(handler) => Ok(handler.clone()),
        }
    }
}
