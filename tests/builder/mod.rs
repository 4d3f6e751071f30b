// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{bail, Result};
use routescope::*;

fn patterns(entries: &[Entry]) -> Vec<&str> {
    entries.iter().map(|e| e.pattern()).collect()
}

fn scope_error(e: &anyhow::Error) -> Option<&ScopeError> {
    e.downcast_ref::<ScopeError>()
}

#[test]
fn nested_patterns() -> Result<()> {
    let mut b = ScopeBuilder::new();
    let root = b.scope(Scope::new().pattern("r/"), |b| {
        b.scope(Scope::new().pattern("{0}child1/"), |b| {
            b.url(EntrySpec::new("{0}url1/", "view"))?;
            Ok(())
        })?;
        b.scope(Scope::new(), |b| {
            b.url(EntrySpec::new("{0}url2/", "view"))?;
            Ok(())
        })?;
        b.url(EntrySpec::new("absolute", "view"))?;
        Ok(())
    })?;

    let urls = b.urls(root);
    assert_eq!(patterns(&urls), vec!["r/child1/url1/", "r/url2/", "absolute"]);
    Ok(())
}

#[test]
fn positional_without_base() -> Result<()> {
    let mut b = ScopeBuilder::new();
    let root = b.scope(Scope::new(), |b| {
        let err = match b.url(EntrySpec::new("{0}", "view")) {
            Ok(entry) => bail!("unexpected entry {entry:?}"),
            Err(e) => e,
        };
        assert_eq!(
            scope_error(&err),
            Some(&ScopeError::MissingBaseValue("{0}".to_string()))
        );
        b.url(EntrySpec::new("absolute", "view"))?;
        Ok(())
    })?;

    assert_eq!(patterns(&b.urls(root)), vec!["absolute"]);
    Ok(())
}

#[test]
fn named_variables_and_sibling_isolation() -> Result<()> {
    let mut b = ScopeBuilder::new();
    b.scope(Scope::new().var("x", "foo"), |b| {
        b.scope(Scope::new().var("y", "bar"), |b| {
            let entry = b.url(EntrySpec::new("{x}{y}", "view"))?;
            assert_eq!(entry.pattern(), "foobar");
            Ok(())
        })?;
        b.scope(Scope::new(), |b| {
            let err = b
                .url(EntrySpec::new("{y}", "view"))
                .expect_err("y is not visible from a sibling");
            assert_eq!(
                scope_error(&err),
                Some(&ScopeError::MissingVariable("y".to_string()))
            );
            Ok(())
        })?;
        Ok(())
    })?;
    Ok(())
}

#[test]
fn context_shadowing_and_rebinding() -> Result<()> {
    let mut b = ScopeBuilder::new();
    let root = b.scope(Scope::new(), |b| {
        b.scope(Scope::new().var("vasyan", "foo"), |b| {
            assert_eq!(b.get("vasyan")?, &Value::from("foo"));

            b.scope(Scope::new().var("tadasyan", "bar"), |b| {
                assert_eq!(b.get("vasyan")?, &Value::from("foo"));
                assert_eq!(b.get("tadasyan")?, &Value::from("bar"));

                b.scope(Scope::new().var("vasyan", "baz"), |b| {
                    assert_eq!(b.get("tadasyan")?, &Value::from("bar"));
                    assert_eq!(b.get("vasyan")?, &Value::from("baz"));

                    b.url(EntrySpec::new("{vasyan}{tadasyan}", "view"))?;
                    assert_eq!(b.set("tadasyan", "xxx")?, None);
                    b.url(EntrySpec::new("{vasyan}{tadasyan}", "view"))?;
                    Ok(())
                })?;

                b.url(EntrySpec::new("{vasyan}{tadasyan}", "view"))?;
                Ok(())
            })?;

            assert!(b.get("tadasyan").is_err());
            assert!(b.url(EntrySpec::new("{tadasyan}", "view")).is_err());
            Ok(())
        })?;

        assert!(b.get("vasyan").is_err());
        assert!(b.url(EntrySpec::new("{vasyan}", "view")).is_err());
        Ok(())
    })?;

    assert_eq!(patterns(&b.urls(root)), vec!["bazbar", "bazxxx", "foobar"]);
    Ok(())
}

#[test]
fn name_resolution() -> Result<()> {
    let mut b = ScopeBuilder::new();
    let root = b.scope(Scope::new().name("root"), |b| {
        b.scope(Scope::new(), |b| {
            b.url(EntrySpec::new("test-url", "view").name("{0}_child1"))?;
            Ok(())
        })?;
        b.scope(Scope::new().name("{0}_child2"), |b| {
            b.url(EntrySpec::new("test-url", "view").name("{0}_url"))?;
            Ok(())
        })?;
        b.url(EntrySpec::new("test-url", "view").name("absolute"))?;
        Ok(())
    })?;

    let names: Vec<_> = b.urls(root).iter().map(|e| e.name().map(str::to_owned)).collect();
    assert_eq!(
        names,
        vec![
            Some("root_child1".to_owned()),
            Some("root_child2_url".to_owned()),
            Some("absolute".to_owned())
        ]
    );

    b.scope(Scope::new(), |b| {
        let err = b
            .url(EntrySpec::new("test-url", "view").name("{0}"))
            .expect_err("unnamed root");
        assert!(matches!(scope_error(&err), Some(ScopeError::MissingBaseValue(_))));
        Ok(())
    })?;
    Ok(())
}

#[test]
fn full_resolution() -> Result<()> {
    let view = View::new("view", |_| Ok(Value::from("response")));

    let mut b = ScopeBuilder::new();
    let root = b.scope(Scope::new().pattern("url"), |b| {
        b.scope(Scope::new().name("name"), |b| {
            b.scope(Scope::new().handler(view.clone()), |b| {
                b.url(EntrySpec::new("{0}", view.clone()).name("{0}"))?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    })?;

    let urls = b.urls(root);
    assert_eq!(urls.len(), 1);
    assert_eq!(urls[0].pattern(), "url");
    assert_eq!(urls[0].name(), Some("name"));
    assert_eq!(urls[0].handler(), &Handler::View(view));
    Ok(())
}

#[test]
fn passthrough_empty_scopes() -> Result<()> {
    let mut b = ScopeBuilder::new();
    let root = b.scope(Scope::new().pattern("a").handler("b").name("c"), |b| {
        b.scope(Scope::new(), |b| {
            b.scope(Scope::new(), |b| {
                b.scope(Scope::new(), |b| {
                    b.url(EntrySpec::new("{0}", "{0}").name("{0}"))?;
                    Ok(())
                })?;
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(())
    })?;

    let urls = b.urls(root);
    assert_eq!(urls[0].pattern(), "a");
    assert_eq!(urls[0].handler().as_path(), Some("b"));
    assert_eq!(urls[0].name(), Some("c"));
    Ok(())
}

#[test]
fn literal_templates_ignore_parent() -> Result<()> {
    let mut b = ScopeBuilder::new();
    b.scope(Scope::new().pattern("^outer/").var("x", 1), |b| {
        let entry = b.url(EntrySpec::new("^inner$", "view"))?;
        assert_eq!(entry.pattern(), "^inner$");
        Ok(())
    })?;
    Ok(())
}

#[test]
fn urls_outside_scope_are_literal() -> Result<()> {
    let mut b = ScopeBuilder::new();
    let entry = b.url(EntrySpec::new("{0}raw", "{0}.view").prefix("pkg"))?;
    assert_eq!(entry.pattern(), "{0}raw");
    assert_eq!(entry.qualified_path().as_deref(), Some("pkg.{0}.view"));

    b.scope(Scope::new().pattern("^s/"), |b| {
        b.url(EntrySpec::new("{0}x", "v"))?;
        Ok(())
    })?;
    b.url(EntrySpec::new("last", "v"))?;

    let tree = b.finish();
    let all: Vec<&str> = tree.entries().map(|e| e.pattern()).collect();
    assert_eq!(all, vec!["{0}raw", "^s/x", "last"]);
    assert_eq!(tree.roots().count(), 1);
    Ok(())
}

#[test]
fn guard_restores_active_scope() -> Result<()> {
    let mut b = ScopeBuilder::new();
    assert_eq!(b.current(), None);
    {
        let mut outer = b.enter(Scope::new().pattern("^o/"));
        let outer_id = outer.id();
        assert_eq!(outer.current(), Some(outer_id));
        {
            let mut inner = outer.enter(Scope::new().pattern("{0}i/"));
            assert_eq!(inner.current(), Some(inner.id()));
            inner.url(EntrySpec::new("{0}$", "v"))?;
        }
        assert_eq!(outer.current(), Some(outer_id));
    }
    assert_eq!(b.current(), None);
    assert_eq!(b.entries().next().map(|e| e.pattern()), Some("^o/i/$"));
    assert!(b.set("k", 1).is_err());
    Ok(())
}

#[test]
fn scope_error_is_returned_unchanged() -> Result<()> {
    let mut b = ScopeBuilder::new();
    let err = b
        .scope(Scope::new(), |b| {
            b.scope(Scope::new(), |_| bail!("block failed"))?;
            Ok(())
        })
        .expect_err("block error propagates");
    assert_eq!(err.to_string(), "block failed");
    assert_eq!(b.current(), None);
    Ok(())
}

#[test]
fn guard_restores_on_panic() {
    let mut b = ScopeBuilder::new();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _guard = b.enter(Scope::new());
        panic!("declaration panicked");
    }));
    assert!(result.is_err());
    assert_eq!(b.current(), None);
}

#[test]
fn entries_serialize_for_hosts() -> Result<()> {
    let mut b = ScopeBuilder::new();
    b.scope(Scope::new().pattern("^api/").handler("api"), |b| {
        b.url(EntrySpec::new("{0}ping$", "{0}").name("ping").arg("cache", false))?;
        Ok(())
    })?;

    let entries: Vec<&Entry> = b.entries().collect();
    let json = serde_json::to_value(&entries)?;
    assert_eq!(
        json,
        serde_json::json!([{
            "pattern": "^api/ping$",
            "handler": "api",
            "extra_args": { "cache": false },
            "name": "ping"
        }])
    );
    Ok(())
}

#[cfg(feature = "regex")]
#[test]
fn compile_patterns() -> Result<()> {
    let mut b = ScopeBuilder::new();
    let good = b.url(EntrySpec::new("^blog/(?P<slug>[-\\w]+)/$", "v"))?;
    assert!(good.compile_pattern()?.is_match("blog/hello-world/"));

    let bad = b.url(EntrySpec::new("^blog/(", "v"))?;
    assert!(matches!(
        bad.compile_pattern(),
        Err(ScopeError::InvalidPattern { .. })
    ));
    Ok(())
}
