// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod builder;
mod context;
mod declaration;
mod entry;
mod env;
mod error;
mod handler;
mod registry;
mod scope;
mod template;
mod value;

pub use builder::{ScopeBuilder, ScopeGuard};
pub use context::{Context, ContextChain};
pub use declaration::{Declaration, Item, ScopeDecl, UrlDecl};
pub use entry::{Entry, EntrySpec};
pub use env::{EnvSource, EnvVar, MapEnv, ProcessEnv};
pub use error::{ScopeError, ScopeResult};
pub use handler::{Handler, Importer, Module, View, ViewFactory};
pub use registry::{HandlerRegistry, Registry, RegistryError};
pub use scope::{Child, Flatten, Scope, ScopeId, ScopeNode, ScopeTree};
pub use template::Template;
pub use value::Value;
