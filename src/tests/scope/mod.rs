// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::*;

use std::rc::Rc;

use anyhow::Result;

fn tree() -> ScopeTree {
    ScopeTree::new(Rc::new(HandlerRegistry::new()))
}

#[test]
fn unset_attributes_are_inherited() -> Result<()> {
    let mut t = tree();
    let root = t.add_root(Scope::new().pattern("^r/").name("root").handler("app"));
    let mid = t.add_child(root, Scope::new())?;
    let leaf = t.add_child(mid, Scope::new())?;

    assert_eq!(t.pattern(leaf)?.as_deref(), Some("^r/"));
    assert_eq!(t.name(leaf)?.as_deref(), Some("root"));
    assert_eq!(t.handler(leaf)?, Some(Handler::path("app")));
    Ok(())
}

#[test]
fn roots_without_attributes_resolve_to_nothing() -> Result<()> {
    let mut t = tree();
    let root = t.add_root(Scope::new());
    assert_eq!(t.pattern(root)?, None);
    assert_eq!(t.name(root)?, None);
    assert_eq!(t.handler(root)?, None);
    Ok(())
}

#[test]
fn ancestor_errors_surface_in_descendants() -> Result<()> {
    let mut t = tree();
    let root = t.add_root(Scope::new().pattern("{0}broken"));
    let child = t.add_child(root, Scope::new().pattern("^literal$"))?;
    assert_eq!(
        t.pattern(child),
        Err(ScopeError::MissingBaseValue("{0}broken".to_string()))
    );
    Ok(())
}

#[test]
fn resolve_entry_leaves_tree_untouched() -> Result<()> {
    let mut t = tree();
    let root = t.add_root(Scope::new().pattern("^a/").var("x", "1"));

    let entry = t.resolve_entry(Some(root), EntrySpec::new("{0}{x}/$", "view"))?;
    assert_eq!(entry.pattern(), "^a/1/$");
    assert_eq!(t.len(), 1);
    assert!(t.node(root)?.children().is_empty());
    assert_eq!(t.flatten(root).count(), 0);
    Ok(())
}

#[test]
fn resolve_entry_without_scope_is_literal() -> Result<()> {
    let t = tree();
    let entry = t.resolve_entry(None, EntrySpec::new("{0}x", "{0}.view").name("{0}"))?;
    assert_eq!(entry.pattern(), "{0}x");
    assert_eq!(entry.handler(), &Handler::path("{0}.view"));
    assert_eq!(entry.name(), Some("{0}"));
    Ok(())
}

#[test]
fn flatten_is_depth_first_and_restartable() -> Result<()> {
    let mut t = tree();
    let root = t.add_root(Scope::new());
    let e = |p: &str| Entry::literal(EntrySpec::new(p, "v"));

    t.push_entry(Some(root), e("1"));
    let a = t.add_child(root, Scope::new())?;
    t.push_entry(Some(a), e("2"));
    let b = t.add_child(a, Scope::new())?;
    t.push_entry(Some(b), e("3"));
    t.push_entry(Some(a), e("4"));
    t.push_entry(Some(root), e("5"));
    let _empty = t.add_child(root, Scope::new())?;

    let first: Vec<&str> = t.flatten(root).map(|e| e.pattern()).collect();
    let second: Vec<&str> = t.flatten(root).map(|e| e.pattern()).collect();
    assert_eq!(first, vec!["1", "2", "3", "4", "5"]);
    assert_eq!(first, second);
    assert_eq!(t.urls(a).len(), 3);
    Ok(())
}

#[test]
fn unknown_scope() {
    let t = tree();
    let other = {
        let mut o = tree();
        o.add_root(Scope::new());
        o.add_root(Scope::new())
    };
    assert_eq!(t.pattern(other), Err(ScopeError::UnknownScope(1)));
    assert_eq!(t.flatten(other).count(), 0);
}

#[test]
fn set_parent_moves_scope() -> Result<()> {
    let mut t = tree();
    let a = t.add_root(Scope::new().pattern("^a/"));
    let b = t.add_root(Scope::new().pattern("^b/"));
    let c = t.add_child(a, Scope::new().pattern("{0}c/"))?;
    t.push_entry(Some(c), Entry::literal(EntrySpec::new("x", "v")));

    assert_eq!(t.pattern(c)?.as_deref(), Some("^a/c/"));
    t.set_parent(c, Some(b))?;
    assert_eq!(t.pattern(c)?.as_deref(), Some("^b/c/"));
    assert_eq!(t.urls(a).len(), 0);
    assert_eq!(t.urls(b).len(), 1);

    t.set_parent(c, None)?;
    assert_eq!(t.roots().count(), 3);
    assert_eq!(t.pattern(c), Err(ScopeError::MissingBaseValue("{0}c/".to_string())));
    Ok(())
}

#[test]
fn set_parent_rejects_cycles() -> Result<()> {
    let mut t = tree();
    let a = t.add_root(Scope::new());
    let b = t.add_child(a, Scope::new())?;

    assert!(matches!(
        t.set_parent(a, Some(a)),
        Err(ScopeError::InvalidParentType(_))
    ));
    assert!(matches!(
        t.set_parent(a, Some(b)),
        Err(ScopeError::InvalidParentType(_))
    ));
    let stranger = {
        let mut o = tree();
        for _ in 0..5 {
            o.add_root(Scope::new());
        }
        o.add_root(Scope::new())
    };
    assert!(matches!(
        t.set_parent(a, Some(stranger)),
        Err(ScopeError::InvalidParentType(_))
    ));
    assert_eq!(t.node(b)?.parent(), Some(a));
    Ok(())
}

#[test]
fn foreign_ids_in_range_name_local_scopes() -> Result<()> {
    let mut t = tree();
    let a = t.add_root(Scope::new().pattern("^a/"));
    let b = t.add_root(Scope::new().pattern("^b/"));
    let foreign = tree().add_root(Scope::new());

    // Index 0 of the other tree is `a` here.
    t.set_parent(b, Some(foreign))?;
    assert_eq!(t.node(b)?.parent(), Some(a));
    assert_eq!(t.pattern(b)?.as_deref(), Some("^b/"));
    Ok(())
}
