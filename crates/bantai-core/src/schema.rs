//! Structural schema for Context input records (§4.2, §9).
//!
//! Statically typed hosts need a schema-builder API rather than a runtime
//! type system, so a [`Schema`] is a record of named [`FieldKind`]s built up
//! with plain constructors (`Schema::record([...])`) and validated against
//! untyped `serde_json::Value` input. This mirrors the corpus's preference
//! for a `jsonschema`-validated envelope, specialized here to composable
//! record fields instead of an external schema file, since contexts are
//! merged at runtime (§4.2 `compose_context`).

use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;

/// The shape of one field in a [`Schema`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// A JSON string.
    String,
    /// A JSON integer (no fractional part).
    Int,
    /// A JSON boolean.
    Bool,
    /// A string restricted to one of a fixed set of values.
    Enum(Vec<String>),
    /// A nested record.
    Record(Schema),
    /// Any JSON value, unvalidated — used for open-ended metadata fields.
    Any,
    /// A value checked by a caller-supplied function rather than a built-in
    /// shape (e.g. a duration string's grammar). Runs at schema-validation
    /// time, so a failure here is always `Error::Schema`, never deferred to
    /// rule evaluation.
    Custom(fn(&Value) -> Result<()>),
    /// Wraps another field kind to mark it optional; absent or `null` values
    /// pass validation.
    Optional(Box<FieldKind>),
}

impl FieldKind {
    /// Wrap this field kind as optional.
    pub fn optional(self) -> FieldKind {
        FieldKind::Optional(Box::new(self))
    }

    fn is_optional(&self) -> bool {
        matches!(self, FieldKind::Optional(_))
    }

    fn validate(&self, field: &str, value: &Value) -> Result<()> {
        match self {
            FieldKind::String => {
                if value.is_string() {
                    Ok(())
                } else {
                    Err(Error::Schema(format!("field '{field}' must be a string")))
                }
            }
            FieldKind::Int => {
                if value.as_i64().is_some() {
                    Ok(())
                } else {
                    Err(Error::Schema(format!("field '{field}' must be an integer")))
                }
            }
            FieldKind::Bool => {
                if value.is_boolean() {
                    Ok(())
                } else {
                    Err(Error::Schema(format!("field '{field}' must be a boolean")))
                }
            }
            FieldKind::Enum(variants) => match value.as_str() {
                Some(s) if variants.iter().any(|v| v == s) => Ok(()),
                _ => Err(Error::Schema(format!(
                    "field '{field}' must be one of {variants:?}"
                ))),
            },
            FieldKind::Record(schema) => {
                let obj = value.as_object().ok_or_else(|| {
                    Error::Schema(format!("field '{field}' must be a record"))
                })?;
                schema.validate_object(obj, false)
            }
            FieldKind::Any => Ok(()),
            FieldKind::Custom(validator) => validator(value)
                .map_err(|err| Error::Schema(format!("field '{field}': {err}"))),
            FieldKind::Optional(inner) => {
                if value.is_null() {
                    Ok(())
                } else {
                    inner.validate(field, value)
                }
            }
        }
    }
}

/// A structural record schema: an ordered-by-name map of field name to
/// [`FieldKind`]. Schemas are immutable value types composed with
/// [`Schema::merge`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: BTreeMap<String, FieldKind>,
}

impl Schema {
    /// Build a schema from `(name, kind)` pairs.
    pub fn record<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, FieldKind)>,
        S: Into<String>,
    {
        Self { fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect() }
    }

    /// An empty schema (the identity for [`Schema::merge`]).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Shallow field union: fields in `other` win on name conflicts (§4.2:
    /// "later wins on conflict").
    pub fn merge(&self, other: &Schema) -> Schema {
        let mut fields = self.fields.clone();
        for (name, kind) in &other.fields {
            fields.insert(name.clone(), kind.clone());
        }
        Schema { fields }
    }

    /// Validate `value` (must be a JSON object) against every field.
    /// `partial`: when true, missing required fields are not an error — used
    /// to validate `defaults` (§4.2, "defaults conform ... in partial mode").
    pub fn validate(&self, value: &Value, partial: bool) -> Result<()> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::Schema("input must be a record".into()))?;
        self.validate_object(obj, partial)
    }

    fn validate_object(
        &self,
        obj: &serde_json::Map<String, Value>,
        partial: bool,
    ) -> Result<()> {
        for (name, kind) in &self.fields {
            match obj.get(name) {
                Some(value) => kind.validate(name, value)?,
                None if kind.is_optional() || partial => {}
                None => {
                    return Err(Error::Schema(format!("missing required field '{name}'")))
                }
            }
        }
        Ok(())
    }

    /// Whether every field `other` declares is also present on `self` with
    /// the same [`FieldKind`] (§4.4: a rule's context must be the same as, or
    /// a structural superset of, its policy's context).
    pub fn is_superset_of(&self, other: &Schema) -> bool {
        other.fields.iter().all(|(name, kind)| self.fields.get(name) == Some(kind))
    }

    /// Apply `defaults` under `input`: any field present in `defaults` but
    /// absent from `input` is copied in; `input` always wins on conflict.
    pub fn apply_defaults(&self, input: &Value, defaults: &Value) -> Value {
        let mut merged = defaults.clone();
        if let (Some(merged_obj), Some(input_obj)) = (merged.as_object_mut(), input.as_object()) {
            for (key, value) in input_obj {
                merged_obj.insert(key.clone(), value.clone());
            }
        } else {
            return input.clone();
        }
        merged
    }
}
