//! Reference normalization: authored [`RawSpec`] → resolved [`TypeSpec`].
//!
//! Markers are recognised at any depth of `literally` and
//! `patternProperties` and in field declarations:
//!
//! - `{internal: name}` → `#/definitions/objects/name`
//! - `{external: key}` → `<doc(key)>#/definitions/objects/key`
//! - `{external: key, alias: id}` → `<doc(id)>#/definitions/objects/key`
//! - `{specialize: generic, of: element}` → internal pointer to the
//!   specialization, which is recorded as a demand for the caller to enqueue.
//!
//! A map counts as a marker only when the marker key holds a string, so a
//! literal schema with a property called `internal` passes through untouched.
//! Everything that is not a marker is deep-copied.
use indexmap::IndexSet;
use serde_json::{Map, Value};

use crate::catalog::RawSpec;
use crate::error::{Result, SchemaError};
use crate::ir::{Field, Record, Shape, TypeSpec, RECORD_KEY, SELF_TAG_SENTINEL, TYPE_KEY};
use crate::pointer::{ref_value, Resolver};
use crate::specialize::{Generic, Specialization};

pub struct Normalizer<'a> {
    resolver: &'a Resolver,
    demands: IndexSet<Specialization>,
}

impl<'a> Normalizer<'a> {
    pub fn new(resolver: &'a Resolver) -> Self {
        Self { resolver, demands: IndexSet::new() }
    }

    /// Specializations requested by everything normalized so far, first-seen order.
    pub fn into_demands(self) -> IndexSet<Specialization> {
        self.demands
    }

    pub fn normalize(&mut self, name: &str, raw: &RawSpec) -> Result<TypeSpec> {
        let mut references = indexmap::IndexMap::with_capacity(raw.references.len());
        for (sub_name, sub_spec) in &raw.references {
            references.insert(sub_name.clone(), self.normalize(sub_name, sub_spec)?);
        }

        let shape = match &raw.literally {
            Some(literal) => {
                if !raw.fields.is_empty() {
                    let ignored = raw.fields.keys().map(String::as_str).collect::<Vec<_>>();
                    tracing::warn!(definition = name, ?ignored, "literal spec also declares fields; fields ignored");
                }
                Shape::Literal(self.resolve_value(name, literal)?)
            }
            None => Shape::Record(self.normalize_record(name, raw)?),
        };

        Ok(TypeSpec { comment: raw.comment.clone(), references, shape })
    }

    fn normalize_record(&mut self, name: &str, raw: &RawSpec) -> Result<Record> {
        let mut record = Record {
            not_required: raw.not_required.clone(),
            additional_properties: raw.additional_properties.unwrap_or(false),
            ..Record::default()
        };
        for (key, value) in &raw.fields {
            if !RECORD_KEY.is_match(key) {
                return Err(SchemaError::malformed(name, format!("`{key}` is not a record field identifier")));
            }
            let field = self.normalize_field(name, key, value)?;
            record.fields.insert(key.clone(), field);
        }
        for exempt in &raw.not_required {
            if !record.fields.contains_key(exempt) {
                tracing::warn!(definition = name, field = %exempt, "notRequired names an undeclared field");
            }
        }
        if let Some(patterns) = &raw.pattern_properties {
            let mut out = Map::with_capacity(patterns.len());
            for (pattern, value) in patterns {
                // ECMA-262 patterns may use lookaround, which `regex` does not support
                if let Err(error) = regex::Regex::new(pattern) {
                    tracing::warn!(definition = name, %pattern, %error, "patternProperties key does not compile as a regex");
                }
                out.insert(pattern.clone(), self.resolve_value(name, value)?);
            }
            record.pattern_properties = Some(out);
        }
        Ok(record)
    }

    fn normalize_field(&mut self, name: &str, key: &str, value: &Value) -> Result<Field> {
        match value {
            Value::String(s) if s == SELF_TAG_SENTINEL => {
                if key == TYPE_KEY {
                    Ok(Field::SelfTagged)
                } else {
                    Err(SchemaError::malformed(name, format!("`{SELF_TAG_SENTINEL}` is only allowed on {TYPE_KEY}, found on {key}")))
                }
            }
            Value::Object(map) => match self.marker(name, map)? {
                Some(pointer) => Ok(Field::Ref(pointer)),
                None => match map.get("$ref") {
                    Some(Value::String(pointer)) => {
                        expect_keys(name, map, &["$ref"])?;
                        Ok(Field::Ref(pointer.clone()))
                    }
                    _ => Err(unrecognized_field(name, key, value)),
                },
            },
            _ => Err(unrecognized_field(name, key, value)),
        }
    }

    /// Deep copy of `value` with every marker replaced by `{"$ref": pointer}`.
    pub fn resolve_value(&mut self, name: &str, value: &Value) -> Result<Value> {
        match value {
            Value::Object(map) => {
                if let Some(pointer) = self.marker(name, map)? {
                    return Ok(ref_value(pointer));
                }
                let mut out = Map::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k.clone(), self.resolve_value(name, v)?);
                }
                Ok(Value::Object(out))
            }
            Value::Array(xs) => xs
                .iter()
                .map(|x| self.resolve_value(name, x))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            scalar => Ok(scalar.clone()),
        }
    }

    fn marker(&mut self, name: &str, map: &Map<String, Value>) -> Result<Option<String>> {
        if let Some(Value::String(target)) = map.get("internal") {
            expect_keys(name, map, &["internal"])?;
            return Ok(Some(self.resolver.internal(target)));
        }
        if let Some(Value::String(key)) = map.get("external") {
            expect_keys(name, map, &["external", "alias"])?;
            let alias = match map.get("alias") {
                None => None,
                Some(Value::String(alias)) => Some(alias.as_str()),
                Some(other) => {
                    return Err(SchemaError::malformed(name, format!("external alias must be a string, found {other}")));
                }
            };
            return Ok(Some(self.resolver.external(key, alias)));
        }
        if let Some(Value::String(generic_id)) = map.get("specialize") {
            expect_keys(name, map, &["specialize", "of"])?;
            let Some(generic) = Generic::from_type_id(generic_id) else {
                return Err(SchemaError::malformed(name, format!("`{generic_id}` has no generic specialization")));
            };
            let Some(Value::String(element)) = map.get("of") else {
                return Err(SchemaError::malformed(name, format!("specialization of `{generic_id}` needs a string `of`")));
            };
            let demand = Specialization::new(generic, element.clone());
            let pointer = self.resolver.internal(&demand.name());
            self.demands.insert(demand);
            return Ok(Some(pointer));
        }
        Ok(None)
    }
}

fn expect_keys(name: &str, map: &Map<String, Value>, allowed: &[&str]) -> Result<()> {
    match map.keys().find(|k| !allowed.contains(&k.as_str())) {
        None => Ok(()),
        Some(extra) => Err(SchemaError::malformed(
            name,
            format!("reference marker `{}` carries unexpected key `{extra}`", allowed[0]),
        )),
    }
}

fn unrecognized_field(name: &str, key: &str, value: &Value) -> SchemaError {
    SchemaError::malformed(
        name,
        format!("field {key} must be a reference marker, a `$ref` pointer or `{SELF_TAG_SENTINEL}`, found {value}"),
    )
}
