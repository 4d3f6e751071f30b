// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::context::Context;
use crate::handler::Handler;
use crate::template::Template;
use crate::value::Value;

use std::rc::Rc;

use indexmap::IndexMap;
use serde::Serialize;

/// Call-site arguments of a single entry, before resolution against a scope.
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySpec {
    pub pattern: Template,
    pub handler: Handler,
    pub extra_args: IndexMap<Rc<str>, Value>,
    pub name: Option<Template>,
    pub prefix: Rc<str>,
}

impl EntrySpec {
    pub fn new(pattern: impl Into<Template>, handler: impl Into<Handler>) -> Self {
        Self {
            pattern: pattern.into(),
            handler: handler.into(),
            extra_args: IndexMap::new(),
            name: None,
            prefix: "".into(),
        }
    }

    pub fn name(mut self, name: impl Into<Template>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn arg(mut self, key: impl Into<Rc<str>>, value: impl Into<Value>) -> Self {
        self.extra_args.insert(key.into(), value.into());
        self
    }

    pub fn args(mut self, args: Context) -> Self {
        for (k, v) in args.iter() {
            self.extra_args.insert(k.clone(), v.clone());
        }
        self
    }

    pub fn prefix(mut self, prefix: impl Into<Rc<str>>) -> Self {
        self.prefix = prefix.into();
        self
    }
}

/// A fully resolved entry, ready to be registered with a router.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pattern: Rc<str>,
    handler: Handler,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    extra_args: IndexMap<Rc<str>, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<Rc<str>>,
    #[serde(skip_serializing_if = "str::is_empty")]
    prefix: Rc<str>,
}

impl Entry {
    pub(crate) fn new(
        pattern: impl Into<Rc<str>>,
        handler: Handler,
        extra_args: IndexMap<Rc<str>, Value>,
        name: Option<Rc<str>>,
        prefix: Rc<str>,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            handler,
            extra_args,
            name,
            prefix,
        }
    }

    /// Entry built from the call-site arguments as given.
    pub(crate) fn literal(spec: EntrySpec) -> Self {
        Self {
            pattern: spec.pattern.source().clone(),
            handler: spec.handler,
            extra_args: spec.extra_args,
            name: spec.name.map(|n| n.source().clone()),
            prefix: spec.prefix,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn extra_args(&self) -> &IndexMap<Rc<str>, Value> {
        &self.extra_args
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Dotted path a router should import for a still symbolic handler.
    ///
    /// The prefix, when set, is joined in front of the path.
    pub fn qualified_path(&self) -> Option<String> {
        let path = self.handler.as_path()?;
        Some(match self.prefix.as_ref() {
            "" => path.to_owned(),
            prefix => format!("{prefix}.{path}"),
        })
    }

    /// Compile the pattern as a regular expression.
    #[cfg(feature = "regex")]
    pub fn compile_pattern(&self) -> crate::error::ScopeResult<regex::Regex> {
        regex::Regex::new(&self.pattern).map_err(|e| crate::error::ScopeError::InvalidPattern {
            pattern: self.pattern.to_string(),
            reason: e.to_string(),
        })
    }

    /// Call the handler with the entry's extra arguments appended to `args`.
    pub fn call(&self, args: &[Value]) -> anyhow::Result<Value> {
        let mut all = args.to_vec();
        if !self.extra_args.is_empty() {
            all.push(Value::from(
                self.extra_args
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect::<std::collections::BTreeMap<_, _>>(),
            ));
        }
        self.handler.call(&all)
    }
}
