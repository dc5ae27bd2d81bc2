// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Read access to a configuration document.
//!
//! Rules never see a concrete resource model. They query a [`ConfigDocument`]
//! which answers two questions: which concrete paths an expression resolves
//! to, and what value sits at a concrete path. Values are tri-state because a
//! plan can contain attributes whose value is not known until apply.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

use super::path::{AttributePath, ExprStep, PathError, PathExpression, PathStep};

/// Value of an attribute in a configuration document.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Configured, concrete value.
    Known(Value),
    /// Not configured.
    Null,
    /// Configured, but the value is only known after apply.
    Unknown,
}

impl AttrValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, AttrValue::Unknown)
    }

    /// Known and non-null.
    pub fn is_configured(&self) -> bool {
        matches!(self, AttrValue::Known(_))
    }

    pub fn as_known(&self) -> Option<&Value> {
        match self {
            AttrValue::Known(v) => Some(v),
            _ => None,
        }
    }
}

/// Configuration document queried by rules and attribute version gates.
pub trait ConfigDocument: Send + Sync {
    /// Resolve an absolute expression to concrete paths.
    ///
    /// A missing attribute resolves to its own path (whose value is null); a
    /// wildcard over a null or missing collection resolves to nothing.
    fn path_matches(&self, expr: &PathExpression) -> Result<Vec<AttributePath>, PathError>;

    /// Value at a concrete path.
    fn get_attribute(&self, path: &AttributePath) -> AttrValue;
}

/// [`ConfigDocument`] backed by a JSON value plus a set of unknown subtrees.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonDocument {
    root: Value,
    unknown: BTreeSet<AttributePath>,
}

impl JsonDocument {
    pub fn new(root: Value) -> Self {
        Self {
            root,
            unknown: BTreeSet::new(),
        }
    }

    /// Document with no attributes configured.
    pub fn empty() -> Self {
        Self::new(Value::Object(Default::default()))
    }

    /// Build from any serializable model.
    pub fn from_serialize<T: Serialize>(model: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::to_value(model)?))
    }

    /// Mark `path` and everything below it as unknown.
    pub fn with_unknown(mut self, path: AttributePath) -> Self {
        self.unknown.insert(path);
        self
    }

    pub fn mark_unknown(&mut self, path: AttributePath) {
        self.unknown.insert(path);
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    fn is_unknown(&self, path: &AttributePath) -> bool {
        self.unknown.iter().any(|u| path.starts_with(u))
    }

    fn expand(
        &self,
        node: Option<&Value>,
        at: AttributePath,
        rest: &[ExprStep],
        expr: &PathExpression,
        out: &mut Vec<AttributePath>,
    ) -> Result<(), PathError> {
        let Some((step, tail)) = rest.split_first() else {
            out.push(at);
            return Ok(());
        };

        // Nothing below an unknown value can be enumerated.
        if self.is_unknown(&at) {
            out.push(at);
            return Ok(());
        }

        let node = node.filter(|v| !v.is_null());
        match step {
            ExprStep::Parent => Err(PathError::Unanchored {
                expr: expr.to_string(),
            }),
            ExprStep::Name(name) | ExprStep::Key(name) => {
                let next = match node {
                    None => None,
                    Some(Value::Object(map)) => map.get(name),
                    Some(other) => return Err(mismatch(&at, step, other)),
                };
                let child = match step {
                    ExprStep::Key(_) => at.key(name.clone()),
                    _ => at.name(name.clone()),
                };
                self.expand(next, child, tail, expr, out)
            }
            ExprStep::Index(idx) => {
                let next = match node {
                    None => None,
                    Some(Value::Array(items)) => items.get(*idx),
                    Some(other) => return Err(mismatch(&at, step, other)),
                };
                self.expand(next, at.index(*idx), tail, expr, out)
            }
            ExprStep::Any => match node {
                None => Ok(()),
                Some(Value::Array(items)) => {
                    for (idx, item) in items.iter().enumerate() {
                        self.expand(Some(item), at.clone().index(idx), tail, expr, out)?;
                    }
                    Ok(())
                }
                Some(Value::Object(map)) => {
                    for (key, value) in map {
                        self.expand(Some(value), at.clone().key(key.clone()), tail, expr, out)?;
                    }
                    Ok(())
                }
                Some(other) => Err(mismatch(&at, step, other)),
            },
        }
    }
}

impl ConfigDocument for JsonDocument {
    fn path_matches(&self, expr: &PathExpression) -> Result<Vec<AttributePath>, PathError> {
        let mut out = Vec::new();
        self.expand(
            Some(&self.root),
            AttributePath::root(),
            expr.steps(),
            expr,
            &mut out,
        )?;
        Ok(out)
    }

    fn get_attribute(&self, path: &AttributePath) -> AttrValue {
        if self.is_unknown(path) {
            return AttrValue::Unknown;
        }
        let mut current = &self.root;
        for step in path.steps() {
            let next = match (step, current) {
                (PathStep::Name(name) | PathStep::Key(name), Value::Object(map)) => map.get(name),
                (PathStep::Index(idx), Value::Array(items)) => items.get(*idx),
                _ => None,
            };
            match next {
                Some(value) => current = value,
                None => return AttrValue::Null,
            }
        }
        if current.is_null() {
            AttrValue::Null
        } else {
            AttrValue::Known(current.clone())
        }
    }
}

fn mismatch(at: &AttributePath, step: &ExprStep, found: &Value) -> PathError {
    let step = match step {
        ExprStep::Name(name) => format!("'.{}'", name),
        ExprStep::Key(key) => format!("'[\"{}\"]'", key),
        ExprStep::Index(idx) => format!("'[{}]'", idx),
        ExprStep::Any => "'[*]'".to_string(),
        ExprStep::Parent => "'^'".to_string(),
    };
    PathError::Mismatch {
        path: at.to_string(),
        step,
        found: value_kind(found),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
