// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::{ScopeError, ScopeResult};
use crate::value::Value;

use core::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Variables owned by a single scope.
///
/// Keys keep their declaration order. Lookups that should fall back to the
/// enclosing scopes go through a [`ContextChain`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    vars: IndexMap<Rc<str>, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<Rc<str>>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    /// Bind or rebind `key`, returning the previous value.
    pub fn set(&mut self, key: impl Into<Rc<str>>, value: impl Into<Value>) -> Option<Value> {
        self.vars.insert(key.into(), value.into())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Rc<str>, &Value)> {
        self.vars.iter()
    }

    pub fn extend(&mut self, other: Context) {
        self.vars.extend(other.vars);
    }
}

impl<K: Into<Rc<str>>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Nearest-first view over a scope's context and the contexts of its ancestors.
#[derive(Debug, Clone, Default)]
pub struct ContextChain<'a> {
    frames: Vec<&'a Context>,
}

impl<'a> ContextChain<'a> {
    /// Create a chain from contexts ordered from the innermost scope outwards.
    pub fn new(frames: Vec<&'a Context>) -> Self {
        Self { frames }
    }

    /// Chain with `child` in front of the contexts of this chain.
    pub fn with_child(&self, child: &'a Context) -> Self {
        let mut frames = Vec::with_capacity(self.frames.len() + 1);
        frames.push(child);
        frames.extend_from_slice(&self.frames);
        Self { frames }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.frames.iter().copied().find_map(|frame| frame.get(key))
    }

    pub fn lookup(&self, key: &str) -> ScopeResult<&'a Value> {
        self.get(key)
            .ok_or_else(|| ScopeError::MissingVariable(key.into()))
    }

    /// Every visible key exactly once, nearest scope first.
    pub fn keys(&self) -> Vec<&'a Rc<str>> {
        let mut keys: Vec<&'a Rc<str>> = vec![];
        for frame in self.frames.iter().copied() {
            for (k, _) in frame.iter() {
                if !keys.contains(&k) {
                    keys.push(k);
                }
            }
        }
        keys
    }

    /// Snapshot of all visible variables where inner scopes shadow outer ones.
    pub fn merged(&self) -> IndexMap<Rc<str>, Value> {
        let mut merged = IndexMap::new();
        for frame in self.frames.iter().copied() {
            for (k, v) in frame.iter() {
                merged.entry(k.clone()).or_insert_with(|| v.clone());
            }
        }
        merged
    }
}

impl fmt::Display for ContextChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self
            .merged()
            .iter()
            .map(|(k, v)| format!("'{k}': {v}"))
            .collect();
        write!(f, "<Context {{{}}}>", items.join(", "))
    }
}
