// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Controller versions and version gates.
//!
//! A [`VersionGate`] restricts an operation, or a single attribute, to a range
//! of controller versions. Gates are declared once per resource kind and
//! evaluated against the live controller version on every operation.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::rules::{PathExpression, Rule, RuleContext};

/// Error parsing a dotted version string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid controller version '{input}': {reason}")]
pub struct VersionParseError {
    pub input: String,
    pub reason: String,
}

/// Dotted numeric controller version, e.g. `8.0.26` or `7.4.162-beta.3`.
///
/// Ordering only looks at the numeric core; missing trailing components
/// compare as zero, so `7.0` equals `7.0.0`. Any pre-release or build suffix
/// is kept for display only.
#[derive(Debug, Clone)]
pub struct ControllerVersion {
    components: Vec<u64>,
    raw: String,
}

impl ControllerVersion {
    /// Numeric components of the version.
    pub fn components(&self) -> &[u64] {
        &self.components
    }

    fn component(&self, idx: usize) -> u64 {
        self.components.get(idx).copied().unwrap_or(0)
    }
}

impl FromStr for ControllerVersion {
    type Err = VersionParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let err = |reason: &str| VersionParseError {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        let unprefixed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let core_len = unprefixed
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(unprefixed.len());
        let (core, suffix) = unprefixed.split_at(core_len);

        if core.is_empty() {
            return Err(err("no numeric components"));
        }
        if !suffix.is_empty() && !suffix.starts_with(['-', '+']) {
            return Err(err("unexpected characters after the version number"));
        }

        let components = core
            .split('.')
            .map(|part| {
                if part.is_empty() {
                    return Err(err("empty component"));
                }
                part.parse::<u64>().map_err(|_| err("component out of range"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            components,
            raw: trimmed.to_string(),
        })
    }
}

impl fmt::Display for ControllerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Ord for ControllerVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for ControllerVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ControllerVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ControllerVersion {}

/// Which bound of a gate a version violated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateViolation {
    NotExact(ControllerVersion),
    BelowMinimum(ControllerVersion),
    AboveMaximum(ControllerVersion),
}

impl fmt::Display for GateViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateViolation::NotExact(v) => write!(f, "version {} is required", v),
            GateViolation::BelowMinimum(v) => write!(f, "minimum supported version is {}", v),
            GateViolation::AboveMaximum(v) => write!(f, "maximum supported version is {}", v),
        }
    }
}

/// Version constraint: exact, min, max, or a min/max range.
///
/// When `exact` is set the min/max bounds are ignored. An empty gate accepts
/// every version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionGate {
    min: Option<ControllerVersion>,
    max: Option<ControllerVersion>,
    exact: Option<ControllerVersion>,
}

impl VersionGate {
    /// Gate that accepts any version.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn at_least(min: ControllerVersion) -> Self {
        Self {
            min: Some(min),
            ..Self::default()
        }
    }

    pub fn at_most(max: ControllerVersion) -> Self {
        Self {
            max: Some(max),
            ..Self::default()
        }
    }

    /// Inclusive range `min <= v <= max`.
    pub fn between(min: ControllerVersion, max: ControllerVersion) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            exact: None,
        }
    }

    pub fn exactly(version: ControllerVersion) -> Self {
        Self {
            exact: Some(version),
            ..Self::default()
        }
    }

    /// Parse a minimum-version gate from a string.
    pub fn parse_at_least(min: &str) -> Result<Self, VersionParseError> {
        Ok(Self::at_least(min.parse()?))
    }

    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none() && self.exact.is_none()
    }

    /// First bound `version` violates: exact, then minimum, then maximum.
    pub fn violation(&self, version: &ControllerVersion) -> Option<GateViolation> {
        if let Some(exact) = &self.exact {
            return (version != exact).then(|| GateViolation::NotExact(exact.clone()));
        }
        if let Some(min) = &self.min
            && version < min
        {
            return Some(GateViolation::BelowMinimum(min.clone()));
        }
        if let Some(max) = &self.max
            && version > max
        {
            return Some(GateViolation::AboveMaximum(max.clone()));
        }
        None
    }

    pub fn satisfies(&self, version: &ControllerVersion) -> bool {
        self.violation(version).is_none()
    }

    /// Human-readable form of the constraint.
    pub fn describe(&self) -> String {
        if let Some(exact) = &self.exact {
            return format!("exactly {}", exact);
        }
        match (&self.min, &self.max) {
            (Some(min), Some(max)) => format!(">= {} and <= {}", min, max),
            (Some(min), None) => format!(">= {}", min),
            (None, Some(max)) => format!("<= {}", max),
            (None, None) => "any version".to_string(),
        }
    }

    /// Whole-operation check against the live controller version.
    pub fn check(&self, version: Option<&ControllerVersion>) -> Diagnostics {
        self.diagnose(version, None).into_iter().collect()
    }

    /// Per-attribute check.
    ///
    /// Skipped (no diagnostics) when the attribute is not configured, so a
    /// gate on an optional field never blocks configurations that leave it
    /// unset. Each configured occurrence of a repeated attribute is checked.
    pub fn check_attribute(&self, cx: &RuleContext<'_>, attribute: &PathExpression) -> Diagnostics {
        let mut diags = Diagnostics::new();
        let paths = match cx.resolve_matches(attribute) {
            Ok(paths) => paths,
            Err(err) => {
                diags.add_error("Invalid attribute path", err.to_string());
                return diags;
            }
        };

        for path in paths {
            if !cx.document.get_attribute(&path).is_configured() {
                continue;
            }
            if let Some(diag) = self.diagnose(cx.controller_version, Some(path.to_string())) {
                diags.push(diag.at(path));
                // first violation wins
                break;
            }
        }
        diags
    }

    fn diagnose(
        &self,
        version: Option<&ControllerVersion>,
        attribute: Option<String>,
    ) -> Option<Diagnostic> {
        if self.is_empty() {
            return None;
        }
        let subject = attribute
            .map(|a| format!("attribute {}", a))
            .unwrap_or_else(|| "this resource".to_string());

        let Some(version) = version else {
            return Some(Diagnostic::error(
                "Controller version not available",
                format!(
                    "{} requires controller version {}, but the controller version is not known",
                    subject,
                    self.describe()
                ),
            ));
        };

        self.violation(version).map(|violation| {
            Diagnostic::error(
                "Unsupported controller version",
                format!(
                    "{} is not supported on controller version {}: {}",
                    subject, version, violation
                ),
            )
        })
    }
}

impl Rule for VersionGate {
    fn evaluate(&self, cx: &RuleContext<'_>) -> Diagnostics {
        self.check(cx.controller_version)
    }
}

/// A version gate scoped to one (possibly repeated) attribute.
#[derive(Debug, Clone)]
pub struct AttributeVersionGate {
    attribute: PathExpression,
    gate: VersionGate,
}

impl AttributeVersionGate {
    pub fn new(attribute: PathExpression, gate: VersionGate) -> Self {
        Self { attribute, gate }
    }
}

impl Rule for AttributeVersionGate {
    fn evaluate(&self, cx: &RuleContext<'_>) -> Diagnostics {
        self.gate.check_attribute(cx, &self.attribute)
    }
}
