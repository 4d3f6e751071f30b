// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

/// Errors raised while resolving scopes and declaring entries.
///
/// Every variant describes a static declaration error; none of them is
/// transient and the first one encountered aborts the build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// A `{name}` placeholder has no definition in the active context chain.
    #[error("\"{0}\" context variable not found")]
    MissingVariable(String),

    /// A template uses `{0}` but no enclosing scope provides a value for it.
    #[error("Could not format \"{0}\", base value is None")]
    MissingBaseValue(String),

    /// A dotted path cannot be imported or a module has no such attribute.
    #[error("Could not resolve handler \"{0}\"")]
    HandlerResolution(String),

    /// An explicit parent assignment used something that cannot be a parent.
    #[error("Invalid parent: {0}")]
    InvalidParentType(String),

    /// A template with unbalanced braces or an unsupported replacement field.
    #[error("Malformed template \"{0}\"")]
    MalformedTemplate(String),

    /// An environment variable is neither set nor defaulted.
    #[error("Set the {0} env variable")]
    MissingEnvironment(String),

    /// A resolved pattern is not a valid regular expression.
    #[error("Invalid pattern \"{pattern}\": {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A scope id that does not belong to the tree it was used with.
    #[error("Unknown scope #{0}")]
    UnknownScope(usize),
}

pub type ScopeResult<T> = core::result::Result<T, ScopeError>;
