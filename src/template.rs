// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Format-string templates carried by scope patterns, names and handler paths.
//!
//! The accepted syntax is the subset of brace formatting needed to inherit from
//! an enclosing scope:
//!
//! * `{0}` (or `{}`) is replaced by the enclosing scope's resolved value,
//! * `{name}` is replaced by the context variable `name`,
//! * `{{` and `}}` produce literal braces.
//!
//! Conversions (`{x!r}`), format specs (`{x:>4}`) and attribute or index access
//! (`{x.y}`, `{x[0]}`) are rejected.

use crate::context::ContextChain;
use crate::error::{ScopeError, ScopeResult};

use core::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Brace(char),
    Positional(usize),
    Named(&'a str),
}

/// A pattern, name or handler path that may reference its enclosing scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Template(Rc<str>);

impl Template {
    pub fn new(source: impl Into<Rc<str>>) -> Self {
        Self(source.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn source(&self) -> &Rc<str> {
        &self.0
    }

    /// True when the template has no replacement fields at all.
    pub fn is_literal(&self) -> bool {
        match self.segments() {
            Ok(segments) => segments
                .iter()
                .all(|s| matches!(s, Segment::Literal(_) | Segment::Brace(_))),
            Err(_) => false,
        }
    }

    /// True when the template refers to the enclosing scope's value.
    pub fn uses_base(&self) -> bool {
        match self.segments() {
            Ok(segments) => segments
                .iter()
                .any(|s| matches!(s, Segment::Positional(_))),
            Err(_) => false,
        }
    }

    /// Names of the context variables referenced by the template, in order of use.
    pub fn variables(&self) -> ScopeResult<Vec<&str>> {
        let mut names = vec![];
        for segment in self.segments()? {
            if let Segment::Named(name) = segment {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }

    /// Substitute `base` for positional fields and context variables for named fields.
    pub fn render(&self, base: Option<&str>, vars: &ContextChain<'_>) -> ScopeResult<String> {
        let mut out = String::with_capacity(self.0.len());
        for segment in self.segments()? {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Brace(c) => out.push(c),
                Segment::Positional(0) => match base {
                    Some(b) => out.push_str(b),
                    None => return Err(ScopeError::MissingBaseValue(self.0.to_string())),
                },
                // Only a single positional value is ever supplied.
                Segment::Positional(_) => {
                    return Err(ScopeError::MissingBaseValue(self.0.to_string()))
                }
                Segment::Named(name) => match vars.get(name) {
                    Some(v) => out.push_str(&v.to_template_string()),
                    None => return Err(ScopeError::MissingVariable(name.into())),
                },
            }
        }
        Ok(out)
    }

    fn segments(&self) -> ScopeResult<Vec<Segment<'_>>> {
        let src: &str = &self.0;
        let malformed = || ScopeError::MalformedTemplate(self.0.to_string());

        let mut segments = vec![];
        let mut auto_index = 0;
        let mut numbering = None;
        let mut literal_start = 0;
        let mut chars = src.char_indices().peekable();

        while let Some((idx, c)) = chars.next() {
            match c {
                '{' | '}' if matches!(chars.peek(), Some((_, n)) if *n == c) => {
                    chars.next();
                    if literal_start < idx {
                        segments.push(Segment::Literal(&src[literal_start..idx]));
                    }
                    segments.push(Segment::Brace(c));
                    literal_start = idx + 2;
                }
                '}' => return Err(malformed()),
                '{' => {
                    if literal_start < idx {
                        segments.push(Segment::Literal(&src[literal_start..idx]));
                    }
                    let field_start = idx + 1;
                    let field_end = loop {
                        match chars.next() {
                            Some((end, '}')) => break end,
                            Some((_, '{' | '!' | ':' | '.' | '[')) | None => {
                                return Err(malformed())
                            }
                            Some(_) => (),
                        }
                    };
                    let field = &src[field_start..field_end];
                    let segment = if field.is_empty() {
                        auto_index += 1;
                        Segment::Positional(auto_index - 1)
                    } else if let Ok(n) = field.parse::<usize>() {
                        Segment::Positional(n)
                    } else {
                        Segment::Named(field)
                    };

                    // Automatic `{}` and manual `{0}` numbering cannot be mixed.
                    if matches!(segment, Segment::Positional(_)) {
                        let manual = !field.is_empty();
                        match numbering {
                            Some(m) if m != manual => return Err(malformed()),
                            _ => numbering = Some(manual),
                        }
                    }
                    segments.push(segment);
                    literal_start = field_end + 1;
                }
                _ => (),
            }
        }
        if literal_start < src.len() {
            segments.push(Segment::Literal(&src[literal_start..]));
        }
        Ok(segments)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Template {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Template {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<Rc<str>> for Template {
    fn from(s: Rc<str>) -> Self {
        Self(s)
    }
}
