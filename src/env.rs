// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Environment variables as a source of context values.

use crate::error::{ScopeError, ScopeResult};
use crate::value::Value;

use core::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::Deserialize;

pub trait EnvSource {
    /// Value of `name`, or [`ScopeError::MissingEnvironment`].
    fn lookup(&self, name: &str) -> ScopeResult<String>;
}

/// The environment of the running process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn lookup(&self, name: &str) -> ScopeResult<String> {
        std::env::var(name).map_err(|_| ScopeError::MissingEnvironment(name.to_owned()))
    }
}

/// A fixed set of variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct MapEnv {
    vars: IndexMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapEnv {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl EnvSource for MapEnv {
    fn lookup(&self, name: &str) -> ScopeResult<String> {
        self.vars
            .get(name)
            .cloned()
            .ok_or_else(|| ScopeError::MissingEnvironment(name.to_owned()))
    }
}

type Filter = dyn Fn(Value) -> Value;

#[derive(Deserialize)]
#[serde(untagged)]
enum EnvVarDecl {
    Key(String),
    Full {
        key: String,
        #[serde(default)]
        default: Option<Value>,
    },
}

/// A variable read from the environment, with an optional fallback and filter.
///
/// The filter applies to the fallback as well. Declarations accept either the
/// bare variable name or `{ key, default }`.
#[derive(Clone, Deserialize)]
#[serde(from = "EnvVarDecl")]
pub struct EnvVar {
    key: Rc<str>,
    default: Option<Value>,
    through: Option<Rc<Filter>>,
}

impl From<EnvVarDecl> for EnvVar {
    fn from(decl: EnvVarDecl) -> Self {
        match decl {
            EnvVarDecl::Key(key) => EnvVar::new(key),
            EnvVarDecl::Full { key, default } => {
                let var = EnvVar::new(key);
                match default {
                    Some(d) => var.with_default(d),
                    None => var,
                }
            }
        }
    }
}

impl EnvVar {
    pub fn new(key: impl Into<Rc<str>>) -> Self {
        Self {
            key: key.into(),
            default: None,
            through: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn through<F>(mut self, filter: F) -> Self
    where
        F: Fn(Value) -> Value + 'static,
    {
        self.through = Some(Rc::new(filter));
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn resolve(&self, env: &dyn EnvSource) -> ScopeResult<Value> {
        let value = match (env.lookup(&self.key), &self.default) {
            (Ok(s), _) => Value::from(s),
            (Err(ScopeError::MissingEnvironment(_)), Some(default)) if !default.is_null() => {
                default.clone()
            }
            (Err(e), _) => return Err(e),
        };
        Ok(match &self.through {
            Some(filter) => filter(value),
            None => value,
        })
    }
}

impl fmt::Debug for EnvVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvVar")
            .field("key", &self.key)
            .field("default", &self.default)
            .field("through", &self.through.is_some())
            .finish()
    }
}
