// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::entry::{Entry, EntrySpec};
use crate::handler::Importer;
use crate::registry::HandlerRegistry;
use crate::scope::{Flatten, Scope, ScopeId, ScopeTree};
use crate::value::Value;

use core::ops::{Deref, DerefMut};
use std::rc::Rc;

use anyhow::{anyhow, Result};
use log::{debug, info};

/// Builds a [`ScopeTree`] while tracking the currently active scope.
///
/// ```
/// use routescope::*;
///
/// # fn main() -> anyhow::Result<()> {
/// let mut builder = ScopeBuilder::new();
/// builder.scope(Scope::new().pattern("^api/"), |b| {
///     b.url(EntrySpec::new("{0}users/$", "users"))?;
///     Ok(())
/// })?;
/// assert_eq!(builder.entries().next().map(|e| e.pattern()), Some("^api/users/$"));
/// # Ok(())
/// # }
/// ```
pub struct ScopeBuilder {
    tree: ScopeTree,
    current: Option<ScopeId>,
}

impl Default for ScopeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeBuilder {
    /// Builder importing handlers from an empty [`HandlerRegistry`].
    pub fn new() -> Self {
        Self::with_importer(Rc::new(HandlerRegistry::new()))
    }

    pub fn with_importer(importer: Rc<dyn Importer>) -> Self {
        Self {
            tree: ScopeTree::new(importer),
            current: None,
        }
    }

    /// The active scope, if any.
    pub fn current(&self) -> Option<ScopeId> {
        self.current
    }

    pub fn tree(&self) -> &ScopeTree {
        &self.tree
    }

    /// Open `scope` as a child of the active scope, or as a new root.
    ///
    /// The scope stays active until the returned guard is dropped.
    pub fn enter(&mut self, scope: Scope) -> ScopeGuard<'_> {
        let previous = self.current;
        let id = self.tree.attach(previous, scope);
        debug!("entering scope #{} (parent {previous:?})", id.index());
        self.current = Some(id);
        ScopeGuard {
            builder: self,
            id,
            previous,
        }
    }

    /// Run `block` with `scope` active.
    ///
    /// The previous scope is restored whether or not the block fails. The
    /// block's error is returned unchanged.
    pub fn scope<F>(&mut self, scope: Scope, block: F) -> Result<ScopeId>
    where
        F: FnOnce(&mut ScopeBuilder) -> Result<()>,
    {
        let mut guard = self.enter(scope);
        let id = guard.id();
        block(&mut *guard)?;
        Ok(id)
    }

    /// Declare an entry in the active scope.
    ///
    /// Outside of any scope the arguments are used as given and the entry is
    /// recorded at the top level.
    pub fn url(&mut self, spec: EntrySpec) -> Result<Entry> {
        let entry = self.tree.resolve_entry(self.current, spec)?;
        debug!(
            "entry `{}` -> `{}` in scope {:?}",
            entry.pattern(),
            entry.handler(),
            self.current.map(|id| id.index())
        );
        self.tree.push_entry(self.current, entry.clone());
        Ok(entry)
    }

    /// Value of `key` as seen from the active scope.
    pub fn get(&self, key: &str) -> Result<&Value> {
        let id = self.current.ok_or_else(|| anyhow!("no active scope"))?;
        Ok(self.tree.lookup(id, key)?)
    }

    /// Bind `key` in the active scope. Entries declared afterwards see the new value.
    pub fn set(&mut self, key: impl Into<Rc<str>>, value: impl Into<Value>) -> Result<Option<Value>> {
        let id = self.current.ok_or_else(|| anyhow!("no active scope"))?;
        Ok(self.tree.context_mut(id)?.set(key, value))
    }

    pub fn urls(&self, id: ScopeId) -> Vec<Entry> {
        self.tree.urls(id)
    }

    pub fn entries(&self) -> Flatten<'_> {
        self.tree.entries()
    }

    pub fn finish(self) -> ScopeTree {
        info!(
            "built {} scopes with {} entries",
            self.tree.len(),
            self.tree.entries().count()
        );
        self.tree
    }
}

/// Keeps a scope active for as long as it lives.
pub struct ScopeGuard<'b> {
    builder: &'b mut ScopeBuilder,
    id: ScopeId,
    previous: Option<ScopeId>,
}

impl ScopeGuard<'_> {
    pub fn id(&self) -> ScopeId {
        self.id
    }
}

impl Deref for ScopeGuard<'_> {
    type Target = ScopeBuilder;

    fn deref(&self) -> &ScopeBuilder {
        &*self.builder
    }
}

impl DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut ScopeBuilder {
        &mut *self.builder
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        debug!("leaving scope #{}", self.id.index());
        self.builder.current = self.previous;
    }
}
