// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Conditional rules: "when X, then Y".
//!
//! Each rule has a [`Condition`] on one attribute and a set of target
//! expressions. If the condition attribute is null or unknown, the rule does
//! not apply. If any target is unknown, the rule stays silent; the same
//! configuration is checked again once values are known.

use std::fmt;

use serde_json::Value;

use super::{AttrValue, AttributePath, PathExpression, Rule, RuleContext};
use crate::diagnostics::{Diagnostic, Diagnostics};

/// What the condition attribute must look like.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionMatch {
    /// Any known, non-null value.
    IsSet,
    /// A known value equal to this one. Values of different JSON types are
    /// never equal.
    Equals(Value),
}

/// Trigger for a conditional rule.
#[derive(Debug, Clone)]
pub struct Condition {
    path: PathExpression,
    expected: ConditionMatch,
}

impl Condition {
    pub fn is_set(path: PathExpression) -> Self {
        Self {
            path,
            expected: ConditionMatch::IsSet,
        }
    }

    pub fn equals(path: PathExpression, value: impl Into<Value>) -> Self {
        Self {
            path,
            expected: ConditionMatch::Equals(value.into()),
        }
    }

    /// Whether the rule applies to this document.
    ///
    /// Only the first resolved path is inspected.
    pub fn applies(&self, cx: &RuleContext<'_>) -> Result<bool, Diagnostics> {
        let paths = cx.resolve_matches(&self.path).map_err(|err| {
            Diagnostics::from_error("Invalid rule condition", err.to_string())
        })?;
        let Some(first) = paths.first() else {
            return Ok(false);
        };

        Ok(match (cx.document.get_attribute(first), &self.expected) {
            (AttrValue::Null | AttrValue::Unknown, _) => false,
            (AttrValue::Known(_), ConditionMatch::IsSet) => true,
            (AttrValue::Known(actual), ConditionMatch::Equals(expected)) => actual == *expected,
        })
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.expected {
            ConditionMatch::IsSet => write!(f, "{} is set", self.path),
            ConditionMatch::Equals(value) => write!(f, "{} is {}", self.path, value),
        }
    }
}

/// Target state collected from a document.
struct Resolved {
    /// First resolved path overall, used when no better anchor exists.
    first: Option<AttributePath>,
    configured: Vec<AttributePath>,
    missing: Vec<AttributePath>,
    any_unknown: bool,
}

fn resolve_targets(
    cx: &RuleContext<'_>,
    targets: &[PathExpression],
) -> Result<Resolved, Diagnostics> {
    let mut resolved = Resolved {
        first: None,
        configured: Vec::new(),
        missing: Vec::new(),
        any_unknown: false,
    };
    let mut diags = Diagnostics::new();

    for target in targets {
        let paths = match cx.resolve_matches(target) {
            Ok(paths) => paths,
            Err(err) => {
                diags.add_error("Invalid rule target", err.to_string());
                continue;
            }
        };
        for path in paths {
            if resolved.first.is_none() {
                resolved.first = Some(path.clone());
            }
            match cx.document.get_attribute(&path) {
                AttrValue::Unknown => resolved.any_unknown = true,
                AttrValue::Null => resolved.missing.push(path),
                AttrValue::Known(_) => resolved.configured.push(path),
            }
        }
    }

    if diags.is_empty() { Ok(resolved) } else { Err(diags) }
}

fn join(targets: &[PathExpression]) -> String {
    targets
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// When the condition holds, the targets must be set together: all of them
/// or none of them.
#[derive(Debug, Clone)]
pub struct RequiredTogetherIf {
    condition: Condition,
    targets: Vec<PathExpression>,
}

impl RequiredTogetherIf {
    pub fn new(condition: Condition, targets: Vec<PathExpression>) -> Self {
        Self { condition, targets }
    }
}

impl Rule for RequiredTogetherIf {
    fn evaluate(&self, cx: &RuleContext<'_>) -> Diagnostics {
        match self.condition.applies(cx) {
            Ok(true) => {}
            Ok(false) => return Diagnostics::new(),
            Err(diags) => return diags,
        }
        let resolved = match resolve_targets(cx, &self.targets) {
            Ok(resolved) => resolved,
            Err(diags) => return diags,
        };
        if resolved.any_unknown || resolved.missing.is_empty() || resolved.configured.is_empty() {
            return Diagnostics::new();
        }

        let mut diag = Diagnostic::error(
            "Missing required attributes",
            format!(
                "when {}, these attributes must be set together: {}",
                self.condition,
                join(&self.targets)
            ),
        );
        if let Some(path) = resolved.first {
            diag = diag.at(path);
        }
        diag.into()
    }
}

/// When the condition holds, no target may be configured.
#[derive(Debug, Clone)]
pub struct RequiredNoneIf {
    condition: Condition,
    targets: Vec<PathExpression>,
}

impl RequiredNoneIf {
    pub fn new(condition: Condition, targets: Vec<PathExpression>) -> Self {
        Self { condition, targets }
    }
}

impl Rule for RequiredNoneIf {
    fn evaluate(&self, cx: &RuleContext<'_>) -> Diagnostics {
        match self.condition.applies(cx) {
            Ok(true) => {}
            Ok(false) => return Diagnostics::new(),
            Err(diags) => return diags,
        }
        let resolved = match resolve_targets(cx, &self.targets) {
            Ok(resolved) => resolved,
            Err(diags) => return diags,
        };
        if resolved.any_unknown {
            return Diagnostics::new();
        }
        let Some(conflict) = resolved.configured.into_iter().next() else {
            return Diagnostics::new();
        };

        Diagnostic::error(
            "Conflicting attribute",
            format!(
                "when {}, none of these attributes may be set: {}",
                self.condition,
                join(&self.targets)
            ),
        )
        .at(conflict)
        .into()
    }
}

/// When the condition holds, the target must equal a fixed value.
#[derive(Debug, Clone)]
pub struct RequiredValueIf {
    condition: Condition,
    target: PathExpression,
    expected: Value,
}

impl RequiredValueIf {
    pub fn new(condition: Condition, target: PathExpression, expected: impl Into<Value>) -> Self {
        Self {
            condition,
            target,
            expected: expected.into(),
        }
    }
}

impl Rule for RequiredValueIf {
    fn evaluate(&self, cx: &RuleContext<'_>) -> Diagnostics {
        match self.condition.applies(cx) {
            Ok(true) => {}
            Ok(false) => return Diagnostics::new(),
            Err(diags) => return diags,
        }
        let paths = match cx.resolve_matches(&self.target) {
            Ok(paths) => paths,
            Err(err) => return Diagnostics::from_error("Invalid rule target", err.to_string()),
        };

        let mut diags = Diagnostics::new();
        for path in paths {
            let actual = match cx.document.get_attribute(&path) {
                AttrValue::Unknown => continue,
                AttrValue::Null => Value::Null,
                AttrValue::Known(v) => v,
            };
            if actual != self.expected {
                diags.push(
                    Diagnostic::error(
                        "Invalid attribute value",
                        format!(
                            "when {}, {} must be {} (got {})",
                            self.condition, self.target, self.expected, actual
                        ),
                    )
                    .at(path),
                );
            }
        }
        diags
    }
}

/// When the condition holds, run another rule.
pub struct DelegateIf {
    condition: Condition,
    inner: Box<dyn Rule>,
}

impl DelegateIf {
    pub fn new(condition: Condition, inner: impl Rule + 'static) -> Self {
        Self {
            condition,
            inner: Box::new(inner),
        }
    }
}

impl Rule for DelegateIf {
    fn evaluate(&self, cx: &RuleContext<'_>) -> Diagnostics {
        match self.condition.applies(cx) {
            Ok(true) => self.inner.evaluate(cx),
            Ok(false) => Diagnostics::new(),
            Err(diags) => diags,
        }
    }
}
