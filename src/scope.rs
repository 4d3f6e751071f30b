// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Scope tree and the inheritance rules of its attributes.
//!
//! Every scope may set its own pattern, handler and name. An unset attribute is
//! inherited from the enclosing scope. A set pattern or name is a [`Template`]
//! rendered with the enclosing scope's resolved value as `{0}` and with the
//! variables visible from the scope as `{name}`. Handlers follow richer rules,
//! see [`ScopeTree::handler`].
//!
//! Nodes live in an arena owned by [`ScopeTree`] and are addressed by
//! [`ScopeId`]. Resolution never mutates the tree.

use crate::context::{Context, ContextChain};
use crate::entry::{Entry, EntrySpec};
use crate::error::{ScopeError, ScopeResult};
use crate::handler::{Handler, Importer};
use crate::template::Template;
use crate::value::Value;

use std::rc::Rc;

use log::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(usize);

impl ScopeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Own attributes of a scope, as declared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    pub pattern: Option<Template>,
    pub handler: Option<Handler>,
    pub name: Option<Template>,
    pub context: Context,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pattern(mut self, pattern: impl Into<Template>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn handler(mut self, handler: impl Into<Handler>) -> Self {
        self.handler = Some(handler.into());
        self
    }

    pub fn name(mut self, name: impl Into<Template>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn var(mut self, key: impl Into<Rc<str>>, value: impl Into<Value>) -> Self {
        self.context.set(key, value);
        self
    }

    pub fn context(mut self, context: Context) -> Self {
        self.context.extend(context);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    Scope(ScopeId),
    Entry(Entry),
}

#[derive(Debug, Clone)]
pub struct ScopeNode {
    scope: Scope,
    parent: Option<ScopeId>,
    children: Vec<Child>,
}

impl ScopeNode {
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn children(&self) -> &[Child] {
        &self.children
    }
}

#[derive(Clone, Copy)]
enum TextAttr {
    Pattern,
    Name,
}

impl TextAttr {
    fn of(self, scope: &Scope) -> Option<&Template> {
        match self {
            TextAttr::Pattern => scope.pattern.as_ref(),
            TextAttr::Name => scope.name.as_ref(),
        }
    }
}

/// Arena of scopes together with the entries declared outside of any scope.
#[derive(Clone)]
pub struct ScopeTree {
    nodes: Vec<ScopeNode>,
    // Root scopes and unscoped entries, in declaration order.
    top: Vec<Child>,
    importer: Rc<dyn Importer>,
}

impl ScopeTree {
    pub fn new(importer: Rc<dyn Importer>) -> Self {
        Self {
            nodes: vec![],
            top: vec![],
            importer,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: ScopeId) -> ScopeResult<&ScopeNode> {
        self.nodes.get(id.0).ok_or(ScopeError::UnknownScope(id.0))
    }

    pub fn roots(&self) -> impl Iterator<Item = ScopeId> + '_ {
        self.top.iter().filter_map(|c| match c {
            Child::Scope(id) => Some(*id),
            Child::Entry(_) => None,
        })
    }

    pub fn add_root(&mut self, scope: Scope) -> ScopeId {
        self.attach(None, scope)
    }

    pub fn add_child(&mut self, parent: ScopeId, scope: Scope) -> ScopeResult<ScopeId> {
        self.node(parent)?;
        Ok(self.attach(Some(parent), scope))
    }

    pub(crate) fn attach(&mut self, parent: Option<ScopeId>, scope: Scope) -> ScopeId {
        let id = ScopeId(self.nodes.len());
        self.nodes.push(ScopeNode {
            scope,
            parent,
            children: vec![],
        });
        self.children_of_mut(parent).push(Child::Scope(id));
        id
    }

    pub(crate) fn push_entry(&mut self, parent: Option<ScopeId>, entry: Entry) {
        self.children_of_mut(parent).push(Child::Entry(entry));
    }

    fn children_of_mut(&mut self, parent: Option<ScopeId>) -> &mut Vec<Child> {
        match parent {
            Some(p) => &mut self.nodes[p.0].children,
            None => &mut self.top,
        }
    }

    /// Move `id` under `parent`, or make it a root when `parent` is `None`.
    ///
    /// The scope is appended after the new parent's existing children. A parent
    /// that is unknown, the scope itself or one of its descendants is rejected.
    ///
    /// Ids are plain arena indices and carry no tree identity. An id taken from
    /// another tree is only rejected when it is out of range here; otherwise it
    /// names whichever scope of this tree has that index.
    pub fn set_parent(&mut self, id: ScopeId, parent: Option<ScopeId>) -> ScopeResult<()> {
        self.node(id)?;
        if let Some(p) = parent {
            self.node(p).map_err(|_| {
                ScopeError::InvalidParentType(format!("scope #{} is not in this tree", p.0))
            })?;
            let mut cursor = Some(p);
            while let Some(c) = cursor {
                if c == id {
                    return Err(ScopeError::InvalidParentType(format!(
                        "scope #{} cannot become a descendant of itself",
                        id.0
                    )));
                }
                cursor = self.nodes[c.0].parent;
            }
        }

        let old_parent = self.nodes[id.0].parent;
        self.children_of_mut(old_parent)
            .retain(|c| !matches!(c, Child::Scope(s) if *s == id));
        self.nodes[id.0].parent = parent;
        self.children_of_mut(parent).push(Child::Scope(id));
        Ok(())
    }

    /// Variables visible from `id`, nearest scope first.
    pub fn context(&self, id: ScopeId) -> ScopeResult<ContextChain<'_>> {
        let mut frames = vec![];
        let mut cursor = Some(id);
        while let Some(c) = cursor {
            let node = self.node(c)?;
            frames.push(&node.scope.context);
            cursor = node.parent;
        }
        Ok(ContextChain::new(frames))
    }

    pub fn context_mut(&mut self, id: ScopeId) -> ScopeResult<&mut Context> {
        self.nodes
            .get_mut(id.0)
            .map(|n| &mut n.scope.context)
            .ok_or(ScopeError::UnknownScope(id.0))
    }

    /// Value of variable `key` as seen from `id`.
    pub fn lookup(&self, id: ScopeId, key: &str) -> ScopeResult<&Value> {
        self.context(id)?.lookup(key)
    }

    pub fn pattern(&self, id: ScopeId) -> ScopeResult<Option<String>> {
        self.resolve_text(id, TextAttr::Pattern)
    }

    pub fn name(&self, id: ScopeId) -> ScopeResult<Option<String>> {
        self.resolve_text(id, TextAttr::Name)
    }

    /// Resolved handler of `id`.
    ///
    /// Starting from the scope's own handler:
    ///
    /// * nothing set: the parent's handler is inherited,
    /// * own path under a parent path: the own path is rendered with the
    ///   parent path as `{0}` and imported,
    /// * own path under a parent module: the module attribute of that name,
    /// * anything else: the own handler as is.
    ///
    /// A factory is finally replaced by the view it produces.
    pub fn handler(&self, id: ScopeId) -> ScopeResult<Option<Handler>> {
        let node = self.node(id)?;
        self.apply_handler(node.parent, node.scope.handler.as_ref(), &self.context(id)?)
    }

    /// Resolve call-site arguments as if they were declared in a scope nested
    /// in `parent`. The tree is left untouched.
    ///
    /// Pattern, handler and name are resolved in that order and the first
    /// failure is returned. Without a parent the arguments are used literally.
    pub fn resolve_entry(&self, parent: Option<ScopeId>, spec: EntrySpec) -> ScopeResult<Entry> {
        let Some(parent) = parent else {
            return Ok(Entry::literal(spec));
        };

        let vars = self.context(parent)?;
        let pattern =
            self.apply_text(Some(parent), Some(&spec.pattern), &vars, TextAttr::Pattern)?;
        let handler = self
            .apply_handler(Some(parent), Some(&spec.handler), &vars)?
            .ok_or_else(|| ScopeError::HandlerResolution(spec.handler.to_string()))?;
        let name = self.apply_text(Some(parent), spec.name.as_ref(), &vars, TextAttr::Name)?;

        Ok(Entry::new(
            pattern.unwrap_or_default(),
            handler,
            spec.extra_args,
            name.map(Rc::from),
            spec.prefix,
        ))
    }

    fn resolve_text(&self, id: ScopeId, attr: TextAttr) -> ScopeResult<Option<String>> {
        let node = self.node(id)?;
        self.apply_text(node.parent, attr.of(&node.scope), &self.context(id)?, attr)
    }

    fn apply_text(
        &self,
        parent: Option<ScopeId>,
        own: Option<&Template>,
        vars: &ContextChain<'_>,
        attr: TextAttr,
    ) -> ScopeResult<Option<String>> {
        let base = match parent {
            Some(p) => self.resolve_text(p, attr)?,
            None => None,
        };
        match own {
            None => Ok(base),
            Some(template) => template.render(base.as_deref(), vars).map(Some),
        }
    }

    fn apply_handler(
        &self,
        parent: Option<ScopeId>,
        own: Option<&Handler>,
        vars: &ContextChain<'_>,
    ) -> ScopeResult<Option<Handler>> {
        let mut handler = own.cloned();
        if let Some(p) = parent {
            let base = self.handler(p)?;
            handler = match (handler, base) {
                (None, base) => base,
                (Some(Handler::Path(own)), Some(Handler::Path(base))) => {
                    let path = own.render(Some(base.as_str()), vars)?;
                    trace!("handler `{own}` under `{base}` resolves to `{path}`");
                    Some(self.importer.import(&path)?)
                }
                (Some(Handler::Path(attr)), Some(Handler::Module(module))) => {
                    match module.attr(attr.as_str()) {
                        Some(h) => Some(h.clone()),
                        None => {
                            return Err(ScopeError::HandlerResolution(format!(
                                "{}.{attr}",
                                module.path()
                            )))
                        }
                    }
                }
                // Non-path handlers, and paths without a path or module above them, are kept.
                (own, _) => own,
            };
        }
        Ok(handler.map(Handler::materialize))
    }

    /// Entries declared in `id` and all its nested scopes, depth-first in
    /// declaration order.
    pub fn flatten(&self, id: ScopeId) -> Flatten<'_> {
        let stack = match self.nodes.get(id.0) {
            Some(node) => vec![node.children.iter()],
            None => vec![],
        };
        Flatten { tree: self, stack }
    }

    /// Every entry of the tree: root scopes and unscoped entries in declaration order.
    pub fn entries(&self) -> Flatten<'_> {
        Flatten {
            tree: self,
            stack: vec![self.top.iter()],
        }
    }

    pub fn urls(&self, id: ScopeId) -> Vec<Entry> {
        self.flatten(id).cloned().collect()
    }
}

/// Depth-first iterator over the entries below a scope.
pub struct Flatten<'a> {
    tree: &'a ScopeTree,
    stack: Vec<std::slice::Iter<'a, Child>>,
}

impl<'a> Iterator for Flatten<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<&'a Entry> {
        loop {
            let next = self.stack.last_mut()?.next();
            match next {
                Some(Child::Entry(entry)) => return Some(entry),
                Some(Child::Scope(id)) => {
                    if let Some(node) = self.tree.nodes.get(id.0) {
                        self.stack.push(node.children.iter());
                    }
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}
