//! Validation of user-supplied identifiers against id-keyed mappings.

use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Site,
    PhpVariant,
    DatabaseServer,
    Extension,
}

impl Display for IdKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Site => "site",
            Self::PhpVariant => "PHP variant",
            Self::DatabaseServer => "database server",
            Self::Extension => "managed Drupal extension",
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} identifiers: {}; known: {}", .unknown.join(", "), display_known(.known))]
pub struct UnknownIdError {
    pub kind: IdKind,
    pub unknown: Vec<String>,
    pub known: Vec<String>,
}

fn display_known(known: &[String]) -> String {
    if known.is_empty() {
        "(none)".to_string()
    } else {
        known.join(", ")
    }
}

/// Flattens comma-separated and repeated ids, trimming blanks and duplicates.
pub fn normalize_ids<S: AsRef<str>>(requested: &[S]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for raw in requested {
        for id in raw.as_ref().split(',').map(str::trim).filter(|id| !id.is_empty()) {
            if !ids.iter().any(|existing| existing == id) {
                ids.push(id.to_string());
            }
        }
    }
    ids
}

/// Selects entries by id, in request order. An empty request selects all
/// entries in declaration order.
pub fn select<'a, T, S: AsRef<str>>(
    kind: IdKind,
    requested: &[S],
    available: &'a IndexMap<String, T>,
) -> Result<Vec<&'a T>, UnknownIdError> {
    let ids = normalize_ids(requested);
    if ids.is_empty() {
        return Ok(available.values().collect());
    }

    let unknown: Vec<String> = ids
        .iter()
        .filter(|id| !available.contains_key(id.as_str()))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(UnknownIdError {
            kind,
            unknown,
            known: available.keys().cloned().collect(),
        });
    }

    Ok(ids.iter().filter_map(|id| available.get(id.as_str())).collect())
}

/// Looks up exactly one entry. The id is matched verbatim, so blank or
/// comma-joined ids are unknown.
pub fn get<'a, T>(
    kind: IdKind,
    id: &str,
    available: &'a IndexMap<String, T>,
) -> Result<&'a T, UnknownIdError> {
    available.get(id).ok_or_else(|| UnknownIdError {
        kind,
        unknown: vec![id.to_string()],
        known: available.keys().cloned().collect(),
    })
}
