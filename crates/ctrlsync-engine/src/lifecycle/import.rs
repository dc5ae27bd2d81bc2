// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Import identifiers of the form `<site>:<id>`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportIdError {
    #[error("import id '{0}' must have the form <site>:<id>")]
    MissingSeparator(String),

    #[error("import id '{0}' has more than one ':' separator")]
    TooManySeparators(String),

    #[error("import id '{0}' has an empty site")]
    EmptySite(String),

    #[error("import id '{0}' has an empty resource id")]
    EmptyId(String),
}

/// Parsed import identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportId {
    pub site: String,
    pub id: String,
}

impl ImportId {
    pub fn parse(input: &str) -> Result<Self, ImportIdError> {
        let Some((site, id)) = input.split_once(':') else {
            return Err(ImportIdError::MissingSeparator(input.to_string()));
        };
        if id.contains(':') {
            return Err(ImportIdError::TooManySeparators(input.to_string()));
        }
        if site.is_empty() {
            return Err(ImportIdError::EmptySite(input.to_string()));
        }
        if id.is_empty() {
            return Err(ImportIdError::EmptyId(input.to_string()));
        }
        Ok(Self {
            site: site.to_string(),
            id: id.to_string(),
        })
    }
}

impl FromStr for ImportId {
    type Err = ImportIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ImportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.site, self.id)
    }
}
