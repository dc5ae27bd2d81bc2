// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Attribute paths and path expressions.
//!
//! An [`AttributePath`] addresses exactly one value in a configuration
//! document. A [`PathExpression`] may contain wildcards and parent steps and
//! resolves to zero or more concrete paths.
//!
//! Expression syntax:
//!
//! ```text
//! radius.auth_servers[*].secret   every secret in the list
//! schedule[0]                     first list element
//! tags["env"]                     map entry by key
//! tags.*                          every map entry
//! ^.security                      sibling of the attribute being checked
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors from parsing or resolving paths.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("invalid path expression '{expr}': {reason}")]
    Parse { expr: String, reason: String },

    #[error("path expression '{expr}' steps above the document root from '{base}'")]
    AboveRoot { expr: String, base: String },

    #[error("path expression '{expr}' is relative and needs a base attribute")]
    Unanchored { expr: String },

    #[error("cannot apply step {step} at '{path}': value is {found}")]
    Mismatch {
        path: String,
        step: String,
        found: &'static str,
    },
}

/// One step of a concrete path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathStep {
    /// Named attribute of a block.
    Name(String),
    /// Element of a list.
    Index(usize),
    /// Entry of a map.
    Key(String),
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Name(name) => write!(f, ".{}", name),
            PathStep::Index(idx) => write!(f, "[{}]", idx),
            PathStep::Key(key) => write!(f, "[\"{}\"]", key),
        }
    }
}

/// Concrete path to a single value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributePath {
    steps: Vec<PathStep>,
}

impl AttributePath {
    /// The document root.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.steps.push(PathStep::Name(name.into()));
        self
    }

    pub fn index(mut self, idx: usize) -> Self {
        self.steps.push(PathStep::Index(idx));
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.steps.push(PathStep::Key(key.into()));
        self
    }

    pub fn push(&mut self, step: PathStep) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    /// Parent path, or `None` at the root.
    pub fn parent(&self) -> Option<AttributePath> {
        let (_, head) = self.steps.split_last()?;
        Some(Self {
            steps: head.to_vec(),
        })
    }

    /// True if `prefix` is this path or one of its ancestors.
    pub fn starts_with(&self, prefix: &AttributePath) -> bool {
        self.steps.starts_with(&prefix.steps)
    }

    /// Expression matching exactly this path.
    pub fn to_expression(&self) -> PathExpression {
        PathExpression {
            source: self.to_string(),
            steps: self.steps.iter().map(ExprStep::from).collect(),
        }
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return f.write_str("<root>");
        }
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                PathStep::Name(name) if i == 0 => f.write_str(name)?,
                other => write!(f, "{}", other)?,
            }
        }
        Ok(())
    }
}

impl FromStr for AttributePath {
    type Err = PathError;

    /// Parse a concrete path; wildcards and parent steps are rejected.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let expr = PathExpression::parse(input)?;
        let mut path = AttributePath::root();
        for step in expr.steps {
            match step {
                ExprStep::Name(name) => path.push(PathStep::Name(name)),
                ExprStep::Index(idx) => path.push(PathStep::Index(idx)),
                ExprStep::Key(key) => path.push(PathStep::Key(key)),
                ExprStep::Any | ExprStep::Parent => {
                    return Err(PathError::Parse {
                        expr: input.to_string(),
                        reason: "a concrete path cannot contain '*' or '^'".to_string(),
                    });
                }
            }
        }
        Ok(path)
    }
}

/// One step of a path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprStep {
    Name(String),
    Index(usize),
    Key(String),
    /// Every element of a list or every entry of a map.
    Any,
    /// Step up from the base attribute. Only valid at the start.
    Parent,
}

impl From<&PathStep> for ExprStep {
    fn from(step: &PathStep) -> Self {
        match step {
            PathStep::Name(name) => ExprStep::Name(name.clone()),
            PathStep::Index(idx) => ExprStep::Index(*idx),
            PathStep::Key(key) => ExprStep::Key(key.clone()),
        }
    }
}

/// Path pattern resolving to zero or more concrete paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpression {
    source: String,
    steps: Vec<ExprStep>,
}

impl PathExpression {
    /// Parse an expression.
    pub fn parse(input: &str) -> Result<Self, PathError> {
        let source = input.trim();
        let err = |reason: String| PathError::Parse {
            expr: input.to_string(),
            reason,
        };
        if source.is_empty() {
            return Err(err("empty expression".to_string()));
        }

        let chars: Vec<char> = source.chars().collect();
        let mut steps = Vec::new();
        let mut i = 0;
        let mut expect_segment = true;

        while i < chars.len() {
            let c = chars[i];
            if expect_segment {
                match c {
                    '^' => {
                        if steps.iter().any(|s| *s != ExprStep::Parent) {
                            return Err(err("'^' is only allowed at the start".to_string()));
                        }
                        steps.push(ExprStep::Parent);
                        i += 1;
                    }
                    '*' => {
                        steps.push(ExprStep::Any);
                        i += 1;
                    }
                    '[' if steps.is_empty() => {
                        // leading bracket, e.g. `[0].name`
                        expect_segment = false;
                        continue;
                    }
                    c if is_ident_char(c) => {
                        let start = i;
                        while i < chars.len() && is_ident_char(chars[i]) {
                            i += 1;
                        }
                        steps.push(ExprStep::Name(chars[start..i].iter().collect()));
                    }
                    other => {
                        return Err(err(format!("unexpected '{}' at offset {}", other, i)));
                    }
                }
                expect_segment = false;
                continue;
            }

            match c {
                '.' => {
                    expect_segment = true;
                    i += 1;
                }
                '[' => {
                    let (step, next) = parse_bracket(&chars, i).map_err(err)?;
                    steps.push(step);
                    i = next;
                }
                other => {
                    return Err(err(format!("unexpected '{}' at offset {}", other, i)));
                }
            }
        }

        if expect_segment {
            return Err(err("expression ends with '.'".to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            steps,
        })
    }

    pub fn steps(&self) -> &[ExprStep] {
        &self.steps
    }

    /// True if the expression starts with parent steps.
    pub fn is_relative(&self) -> bool {
        matches!(self.steps.first(), Some(ExprStep::Parent))
    }

    /// Anchor a relative expression at `base`.
    ///
    /// Absolute expressions are returned unchanged.
    pub fn resolve_relative(
        &self,
        base: Option<&AttributePath>,
    ) -> Result<PathExpression, PathError> {
        if !self.is_relative() {
            return Ok(self.clone());
        }
        let Some(base) = base else {
            return Err(PathError::Unanchored {
                expr: self.source.clone(),
            });
        };

        let ups = self
            .steps
            .iter()
            .take_while(|s| **s == ExprStep::Parent)
            .count();
        if ups > base.steps().len() {
            return Err(PathError::AboveRoot {
                expr: self.source.clone(),
                base: base.to_string(),
            });
        }

        let kept = &base.steps()[..base.steps().len() - ups];
        let steps: Vec<ExprStep> = kept
            .iter()
            .map(ExprStep::from)
            .chain(self.steps[ups..].iter().cloned())
            .collect();

        Ok(PathExpression {
            source: format!("{} from {}", self.source, base),
            steps,
        })
    }
}

impl FromStr for PathExpression {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Parse `[n]`, `[*]` or `["key"]` starting at `open`. Returns the step and
/// the offset just past the closing bracket.
fn parse_bracket(chars: &[char], open: usize) -> Result<(ExprStep, usize), String> {
    let mut i = open + 1;
    let step = match chars.get(i) {
        Some('*') => {
            i += 1;
            ExprStep::Any
        }
        Some('"') => {
            i += 1;
            let start = i;
            while i < chars.len() && chars[i] != '"' {
                i += 1;
            }
            if i >= chars.len() {
                return Err(format!("unterminated key at offset {}", start - 1));
            }
            let key: String = chars[start..i].iter().collect();
            i += 1;
            ExprStep::Key(key)
        }
        Some(c) if c.is_ascii_digit() => {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            let digits: String = chars[start..i].iter().collect();
            let idx = digits
                .parse::<usize>()
                .map_err(|_| format!("index '{}' out of range", digits))?;
            ExprStep::Index(idx)
        }
        _ => return Err(format!("expected index, '*' or quoted key at offset {}", i)),
    };

    match chars.get(i) {
        Some(']') => Ok((step, i + 1)),
        _ => Err(format!("expected ']' at offset {}", i)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_path() {
        let path = AttributePath::root()
            .name("radius")
            .index(0)
            .name("secret");
        assert_eq!(path.to_string(), "radius[0].secret");

        let keyed = AttributePath::root().name("tags").key("env");
        assert_eq!(keyed.to_string(), "tags[\"env\"]");
        assert_eq!(AttributePath::root().to_string(), "<root>");
    }

    #[test]
    fn test_parse_expression() {
        let expr = PathExpression::parse("radius.servers[*].secret").unwrap();
        assert_eq!(
            expr.steps(),
            &[
                ExprStep::Name("radius".into()),
                ExprStep::Name("servers".into()),
                ExprStep::Any,
                ExprStep::Name("secret".into()),
            ]
        );

        let expr = PathExpression::parse("tags[\"a.b\"].*").unwrap();
        assert_eq!(
            expr.steps(),
            &[
                ExprStep::Name("tags".into()),
                ExprStep::Key("a.b".into()),
                ExprStep::Any,
            ]
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "a.", "a..b", "a[", "a[x]", "a[\"k]", "a.^", "a b"] {
            assert!(PathExpression::parse(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_concrete_path_from_str() {
        let path: AttributePath = "radius[0].secret".parse().unwrap();
        assert_eq!(
            path,
            AttributePath::root().name("radius").index(0).name("secret")
        );
        assert!("radius[*]".parse::<AttributePath>().is_err());
    }

    #[test]
    fn test_resolve_relative_sibling() {
        let base = AttributePath::root().name("servers").index(2).name("port");
        let expr = PathExpression::parse("^.host").unwrap();
        let resolved = expr.resolve_relative(Some(&base)).unwrap();
        assert_eq!(
            resolved.steps(),
            &[
                ExprStep::Name("servers".into()),
                ExprStep::Index(2),
                ExprStep::Name("host".into()),
            ]
        );
    }

    #[test]
    fn test_resolve_relative_errors() {
        let expr = PathExpression::parse("^.^.x").unwrap();
        let base = AttributePath::root().name("a");
        assert!(matches!(
            expr.resolve_relative(Some(&base)),
            Err(PathError::AboveRoot { .. })
        ));
        assert!(matches!(
            expr.resolve_relative(None),
            Err(PathError::Unanchored { .. })
        ));

        let absolute = PathExpression::parse("a.b").unwrap();
        assert_eq!(absolute.resolve_relative(None).unwrap(), absolute);
    }

    #[test]
    fn test_parent_and_prefix() {
        let path = AttributePath::root().name("a").index(1);
        assert_eq!(path.parent(), Some(AttributePath::root().name("a")));
        assert!(path.starts_with(&AttributePath::root().name("a")));
        assert!(!AttributePath::root().name("a").starts_with(&path));
        assert_eq!(AttributePath::root().parent(), None);
    }
}
