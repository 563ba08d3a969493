//! Declarative population of configuration entities from TOML tables.
//!
//! Every entity declares a static table of recognised fields. Population walks
//! that table, never the input's keys: unknown keys are ignored and missing
//! keys keep the entity's built-in default.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use thiserror::Error;
use toml::{Table, Value};
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed configuration at '{path}': {reason}")]
    Shape { path: String, reason: String },
    #[error("failed to read config file: {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse TOML config: {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Names the entity type a sub-configuration rule populates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Project,
    Site,
    PhpVariant,
    DatabaseServer,
    DrupalExtension,
    Phpcs,
    SassRoot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// Scalar or collection copied as-is.
    Direct,
    /// Nested table populated into a fresh instance of the named entity.
    SubConfig(EntityKind),
    /// Table of id-keyed nested tables, each populated into the named entity.
    SubConfigMap(EntityKind),
}

pub type Apply<E> = fn(&mut E, &Value, &str) -> Result<(), ConfigError>;

pub struct Field<E: 'static> {
    pub name: &'static str,
    pub rule: FieldRule,
    pub apply: Apply<E>,
}

impl<E> Field<E> {
    pub const fn direct(name: &'static str, apply: Apply<E>) -> Self {
        Self {
            name,
            rule: FieldRule::Direct,
            apply,
        }
    }

    pub const fn sub_config(name: &'static str, kind: EntityKind, apply: Apply<E>) -> Self {
        Self {
            name,
            rule: FieldRule::SubConfig(kind),
            apply,
        }
    }

    pub const fn sub_config_map(name: &'static str, kind: EntityKind, apply: Apply<E>) -> Self {
        Self {
            name,
            rule: FieldRule::SubConfigMap(kind),
            apply,
        }
    }
}

/// A configuration type with a declared field table.
pub trait Entity: Default + Sized + 'static {
    const KIND: EntityKind;
    const FIELDS: &'static [Field<Self>];

    /// Type-specific derivation run after field mapping.
    fn populate_defaults(&mut self) {}
}

/// Populates a fresh default instance of `E` from `table`.
pub fn populate<E: Entity>(table: &Table, path: &str) -> Result<E, ConfigError> {
    let mut entity = E::default();
    populate_into(&mut entity, table, path)?;
    Ok(entity)
}

/// Populates `entity` in place, keeping its values for absent fields.
pub fn populate_into<E: Entity>(
    entity: &mut E,
    table: &Table,
    path: &str,
) -> Result<(), ConfigError> {
    for key in table.keys() {
        if !E::FIELDS.iter().any(|field| field.name == key) {
            debug!(
                "ignoring unknown key '{}' for {:?}",
                join_path(path, key),
                E::KIND
            );
        }
    }

    for field in E::FIELDS {
        let Some(value) = table.get(field.name) else {
            continue;
        };
        let field_path = join_path(path, field.name);

        match field.rule {
            FieldRule::Direct => {}
            FieldRule::SubConfig(kind) | FieldRule::SubConfigMap(kind) => {
                if !value.is_table() {
                    return Err(ConfigError::Shape {
                        path: field_path,
                        reason: format!(
                            "expected a table for {kind:?}, found {}",
                            value.type_str()
                        ),
                    });
                }
            }
        }

        (field.apply)(entity, value, &field_path)?;
    }

    entity.populate_defaults();
    Ok(())
}

/// Copies a direct value into `slot`.
pub fn assign<T: DeserializeOwned>(
    slot: &mut T,
    value: &Value,
    path: &str,
) -> Result<(), ConfigError> {
    *slot = value.clone().try_into().map_err(|e: toml::de::Error| ConfigError::Shape {
        path: path.to_string(),
        reason: e.message().to_string(),
    })?;
    Ok(())
}

/// Replaces `slot` with a fresh instance populated from the nested table.
pub fn assign_sub<S: Entity>(slot: &mut S, value: &Value, path: &str) -> Result<(), ConfigError> {
    let table = expect_table(value, path)?;
    *slot = populate(table, path)?;
    Ok(())
}

/// Replaces `slot` with freshly populated entries, preserving declaration order.
pub fn assign_map<S: Entity>(
    slot: &mut IndexMap<String, S>,
    value: &Value,
    path: &str,
) -> Result<(), ConfigError> {
    let table = expect_table(value, path)?;
    let mut entries = IndexMap::with_capacity(table.len());
    for (key, nested) in table {
        let entry_path = join_path(path, key);
        let nested = expect_table(nested, &entry_path)?;
        entries.insert(key.clone(), populate::<S>(nested, &entry_path)?);
    }
    *slot = entries;
    Ok(())
}

/// Deep-merges `overlay` into `base`. Nested tables merge key by key;
/// every other value in `overlay` replaces the one in `base`.
pub fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, incoming) in overlay {
        match (base.get_mut(&key), incoming) {
            (Some(Value::Table(existing)), Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, incoming) => {
                base.insert(key, incoming);
            }
        }
    }
}

fn expect_table<'v>(value: &'v Value, path: &str) -> Result<&'v Table, ConfigError> {
    value.as_table().ok_or_else(|| ConfigError::Shape {
        path: path.to_string(),
        reason: format!("expected a table, found {}", value.type_str()),
    })
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}
