// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Declarative configuration rules.
//!
//! A [`Rule`] inspects a [`ConfigDocument`] and reports diagnostics. Rules are
//! declared per resource kind and run during config validation and before
//! every lifecycle verb. Conditional rules live in [`conditional`]; version
//! gates implement [`Rule`] in [`crate::version`].

pub mod conditional;
pub mod document;
pub mod path;

pub use conditional::{
    Condition, ConditionMatch, DelegateIf, RequiredNoneIf, RequiredTogetherIf, RequiredValueIf,
};
pub use document::{AttrValue, ConfigDocument, JsonDocument};
pub use path::{AttributePath, ExprStep, PathError, PathExpression, PathStep};

use crate::diagnostics::Diagnostics;
use crate::version::ControllerVersion;

/// Everything a rule may look at.
#[derive(Clone, Copy)]
pub struct RuleContext<'a> {
    pub document: &'a dyn ConfigDocument,
    /// Attribute a per-attribute rule is attached to. Relative expressions
    /// resolve against it.
    pub base: Option<&'a AttributePath>,
    pub controller_version: Option<&'a ControllerVersion>,
}

impl<'a> RuleContext<'a> {
    pub fn new(document: &'a dyn ConfigDocument) -> Self {
        Self {
            document,
            base: None,
            controller_version: None,
        }
    }

    pub fn with_base(mut self, base: Option<&'a AttributePath>) -> Self {
        self.base = base;
        self
    }

    pub fn with_version(mut self, version: Option<&'a ControllerVersion>) -> Self {
        self.controller_version = version;
        self
    }

    /// Anchor `expr` at the base and resolve it against the document.
    pub fn resolve_matches(&self, expr: &PathExpression) -> Result<Vec<AttributePath>, PathError> {
        let absolute = expr.resolve_relative(self.base)?;
        self.document.path_matches(&absolute)
    }
}

/// A configuration check.
pub trait Rule: Send + Sync {
    fn evaluate(&self, cx: &RuleContext<'_>) -> Diagnostics;
}

impl<R: Rule + ?Sized> Rule for Box<R> {
    fn evaluate(&self, cx: &RuleContext<'_>) -> Diagnostics {
        (**self).evaluate(cx)
    }
}

/// Run `rule` once for every path `attribute` resolves to, with that path as
/// the base.
///
/// Unknown occurrences are skipped. A path crossing an unknown block resolves
/// to the block itself, which is no valid anchor for relative expressions.
pub fn evaluate_each(
    rule: &dyn Rule,
    cx: &RuleContext<'_>,
    attribute: &PathExpression,
) -> Diagnostics {
    let paths = match cx.resolve_matches(attribute) {
        Ok(paths) => paths,
        Err(err) => return Diagnostics::from_error("Invalid attribute path", err.to_string()),
    };

    let mut diags = Diagnostics::new();
    for path in &paths {
        if cx.document.get_attribute(path).is_unknown() {
            continue;
        }
        let scoped = cx.with_base(Some(path));
        diags.merge(rule.evaluate(&scoped));
    }
    diags
}

/// A rule attached to every occurrence of an attribute.
pub struct AttributeRule {
    attribute: PathExpression,
    rule: Box<dyn Rule>,
}

impl AttributeRule {
    pub fn new(attribute: PathExpression, rule: impl Rule + 'static) -> Self {
        Self {
            attribute,
            rule: Box::new(rule),
        }
    }
}

impl Rule for AttributeRule {
    fn evaluate(&self, cx: &RuleContext<'_>) -> Diagnostics {
        evaluate_each(self.rule.as_ref(), cx, &self.attribute)
    }
}

/// Ordered list of rules; every rule runs and all diagnostics are kept.
#[derive(Default)]
pub struct RuleSet {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, rule: impl Rule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn push(&mut self, rule: impl Rule + 'static) {
        self.rules.push(Box::new(rule));
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Rule for RuleSet {
    fn evaluate(&self, cx: &RuleContext<'_>) -> Diagnostics {
        let mut diags = Diagnostics::new();
        for rule in &self.rules {
            diags.merge(rule.evaluate(cx));
        }
        diags
    }
}
