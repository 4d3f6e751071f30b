// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Handler references attached to scopes and entries.
//!
//! A handler is one of
//!
//! * a [`View`]: a callable ready to be registered with a router,
//! * a [`ViewFactory`]: a class-like value that produces the actual view when
//!   materialized,
//! * a dotted path (`"project.app.views"`), possibly a template relative to the
//!   enclosing scope's path, resolved through an [`Importer`],
//! * a [`Module`]: a container whose attributes are looked up by name.

use crate::error::ScopeResult;
use crate::template::Template;
use crate::value::Value;

use core::fmt;
use std::rc::Rc;

use anyhow::{bail, Result};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

type ViewFn = dyn Fn(&[Value]) -> Result<Value>;

/// A callable registered for an entry.
///
/// Two views are equal only when they share the same underlying function.
#[derive(Clone)]
pub struct View {
    name: Rc<str>,
    func: Rc<ViewFn>,
}

impl View {
    pub fn new<F>(name: impl Into<Rc<str>>, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + 'static,
    {
        Self {
            name: name.into(),
            func: Rc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.func)(args)
    }
}

impl PartialEq for View {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "View({})", self.name)
    }
}

/// Class-like handler whose view is produced on demand.
#[derive(Clone)]
pub struct ViewFactory {
    name: Rc<str>,
    make: Rc<dyn Fn() -> View>,
}

impl ViewFactory {
    pub fn new<F>(name: impl Into<Rc<str>>, make: F) -> Self
    where
        F: Fn() -> View + 'static,
    {
        Self {
            name: name.into(),
            make: Rc::new(make),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn as_view(&self) -> View {
        (self.make)()
    }
}

impl PartialEq for ViewFactory {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.make, &other.make)
    }
}

impl fmt::Debug for ViewFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewFactory({})", self.name)
    }
}

/// Named container of handlers, the target of attribute lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    path: Rc<str>,
    members: IndexMap<Rc<str>, Handler>,
}

impl Module {
    pub fn new(path: impl Into<Rc<str>>) -> Self {
        Self {
            path: path.into(),
            members: IndexMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<Rc<str>>, handler: impl Into<Handler>) -> Self {
        self.insert(name, handler);
        self
    }

    pub fn insert(&mut self, name: impl Into<Rc<str>>, handler: impl Into<Handler>) {
        self.members.insert(name.into(), handler.into());
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn attr(&self, name: &str) -> Option<&Handler> {
        self.members.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(|k| k.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Handler {
    View(View),
    Factory(ViewFactory),
    Path(Template),
    Module(Rc<Module>),
}

impl Handler {
    pub fn view<F>(name: impl Into<Rc<str>>, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + 'static,
    {
        Handler::View(View::new(name, func))
    }

    pub fn path(path: impl Into<Template>) -> Self {
        Handler::Path(path.into())
    }

    /// Replace a factory by the view it produces; anything else is returned as is.
    pub fn materialize(self) -> Handler {
        match self {
            Handler::Factory(factory) => Handler::View(factory.as_view()),
            h => h,
        }
    }

    pub fn as_view(&self) -> Option<&View> {
        match self {
            Handler::View(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&str> {
        match self {
            Handler::Path(p) => Some(p.as_str()),
            _ => None,
        }
    }

    pub fn as_module(&self) -> Option<&Module> {
        match self {
            Handler::Module(m) => Some(m.as_ref()),
            _ => None,
        }
    }

    /// Invoke the handler. Only views are callable.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        match self {
            Handler::View(v) => v.call(args),
            Handler::Factory(f) => f.as_view().call(args),
            Handler::Path(p) => bail!("handler `{p}` has not been imported"),
            Handler::Module(m) => bail!("module `{}` is not callable", m.path()),
        }
    }

    /// Human readable identity used in logs and serialized entries.
    pub fn display_name(&self) -> &str {
        match self {
            Handler::View(v) => v.name(),
            Handler::Factory(f) => f.name(),
            Handler::Path(p) => p.as_str(),
            Handler::Module(m) => m.path(),
        }
    }
}

impl fmt::Display for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl Serialize for Handler {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.display_name())
    }
}

impl From<&str> for Handler {
    fn from(path: &str) -> Self {
        Handler::path(path)
    }
}

impl From<String> for Handler {
    fn from(path: String) -> Self {
        Handler::path(path)
    }
}

impl From<Template> for Handler {
    fn from(path: Template) -> Self {
        Handler::Path(path)
    }
}

impl From<View> for Handler {
    fn from(view: View) -> Self {
        Handler::View(view)
    }
}

impl From<ViewFactory> for Handler {
    fn from(factory: ViewFactory) -> Self {
        Handler::Factory(factory)
    }
}

impl From<Module> for Handler {
    fn from(module: Module) -> Self {
        Handler::Module(Rc::new(module))
    }
}

impl From<Rc<Module>> for Handler {
    fn from(module: Rc<Module>) -> Self {
        Handler::Module(module)
    }
}

/// Resolves dotted paths to handlers.
pub trait Importer {
    fn import(&self, path: &str) -> ScopeResult<Handler>;
}
