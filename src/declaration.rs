// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Scope trees described as data.
//!
//! A declaration is a list of items, each either a nested scope, an entry or a
//! rebinding of variables in the enclosing scope:
//!
//! ```yaml
//! - scope:
//!     pattern: "^blog/"
//!     handler: "blog.views"
//!     vars: { version: 2 }
//!     env: { secret: { key: BLOG_SECRET, default: "dev" } }
//!     items:
//!       - url: { pattern: "{0}$", handler: "{0}.index", name: "blog" }
//!       - set: { version: 3 }
//! ```

use crate::builder::ScopeBuilder;
use crate::context::Context;
use crate::entry::EntrySpec;
use crate::env::{EnvSource, EnvVar};
use crate::handler::Importer;
use crate::scope::{Scope, ScopeTree};
use crate::template::Template;

use core::fmt;
use std::path::Path;
use std::rc::Rc;

use anyhow::{bail, Context as _, Result};
use indexmap::IndexMap;
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Declaration {
    items: Vec<Item>,
}

/// One declaration item, written as a map with a single `scope`, `url` or
/// `set` key in both JSON and YAML.
#[derive(Debug, Clone)]
pub enum Item {
    Scope(ScopeDecl),
    Url(UrlDecl),
    Set(Context),
}

const ITEM_KINDS: &[&str] = &["scope", "url", "set"];

impl<'de> Deserialize<'de> for Item {
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(ItemVisitor)
    }
}

struct ItemVisitor;

impl<'de> Visitor<'de> for ItemVisitor {
    type Value = Item;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map with a single `scope`, `url` or `set` key")
    }

    fn visit_map<A>(self, mut map: A) -> core::result::Result<Item, A::Error>
    where
        A: MapAccess<'de>,
    {
        let Some(kind) = map.next_key::<String>()? else {
            return Err(de::Error::invalid_length(0, &self));
        };
        let item = match kind.as_str() {
            "scope" => Item::Scope(map.next_value()?),
            "url" => Item::Url(map.next_value()?),
            "set" => Item::Set(map.next_value()?),
            other => return Err(de::Error::unknown_variant(other, ITEM_KINDS)),
        };
        if map.next_key::<IgnoredAny>()?.is_some() {
            return Err(de::Error::invalid_length(2, &self));
        }
        Ok(item)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScopeDecl {
    pub pattern: Option<Template>,
    pub handler: Option<Template>,
    pub name: Option<Template>,
    #[serde(default)]
    pub vars: Context,
    #[serde(default)]
    pub env: IndexMap<String, EnvVar>,
    #[serde(default)]
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UrlDecl {
    pub pattern: Template,
    pub handler: Template,
    #[serde(default)]
    pub kwargs: Context,
    pub name: Option<Template>,
    #[serde(default)]
    pub prefix: String,
}

impl Declaration {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a `.json`, `.yaml` or `.yml` file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&contents),
            #[cfg(feature = "yaml")]
            Some("yaml" | "yml") => Self::from_yaml_str(&contents),
            _ => bail!("unsupported declaration file {}", path.display()),
        }
    }

    /// Replay the declaration into `builder`, below its active scope.
    pub fn apply(&self, builder: &mut ScopeBuilder, env: &dyn EnvSource) -> Result<()> {
        apply_items(&self.items, builder, env)
    }

    pub fn build(&self, importer: Rc<dyn Importer>, env: &dyn EnvSource) -> Result<ScopeTree> {
        let mut builder = ScopeBuilder::with_importer(importer);
        self.apply(&mut builder, env)?;
        Ok(builder.finish())
    }
}

fn apply_items(items: &[Item], builder: &mut ScopeBuilder, env: &dyn EnvSource) -> Result<()> {
    for item in items {
        match item {
            Item::Scope(decl) => {
                let scope = decl.to_scope(env)?;
                builder.scope(scope, |b| apply_items(&decl.items, b, env))?;
            }
            Item::Url(decl) => {
                builder
                    .url(decl.to_spec())
                    .with_context(|| format!("invalid entry `{}`", decl.pattern))?;
            }
            Item::Set(vars) => {
                for (key, value) in vars.iter() {
                    builder.set(key.clone(), value.clone())?;
                }
            }
        }
    }
    Ok(())
}

impl ScopeDecl {
    fn to_scope(&self, env: &dyn EnvSource) -> Result<Scope> {
        let mut scope = Scope {
            pattern: self.pattern.clone(),
            handler: self.handler.clone().map(Into::into),
            name: self.name.clone(),
            context: self.vars.clone(),
        };
        for (var, source) in &self.env {
            let value = source
                .resolve(env)
                .with_context(|| format!("failed to bind `{var}`"))?;
            scope.context.set(var.as_str(), value);
        }
        Ok(scope)
    }
}

impl UrlDecl {
    fn to_spec(&self) -> EntrySpec {
        let mut spec = EntrySpec::new(self.pattern.clone(), self.handler.clone())
            .args(self.kwargs.clone())
            .prefix(self.prefix.as_str());
        if let Some(name) = &self.name {
            spec = spec.name(name.clone());
        }
        spec
    }
}
