//! The type catalog: declarative ZType specs keyed by type identifier.
//!
//! Specs are kept in their raw, authored form. Reference markers inside them
//! are only interpreted by [`crate::normalize`], once per `generate` call.
use std::collections::BTreeSet;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Result, SchemaError};

const BUILTIN_SRC: &str = include_str!("../catalog/builtin.yaml");

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// One authored type spec, before reference normalization.
///
/// Every key that is not one of the named options is a field declaration;
/// those land in `fields` and are checked against the record-key pattern
/// during normalization.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSpec {
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub literally: Option<Value>,
    #[serde(default)]
    pub references: IndexMap<String, RawSpec>,
    #[serde(default)]
    pub pattern_properties: Option<Map<String, Value>>,
    #[serde(default)]
    pub not_required: BTreeSet<String>,
    #[serde(default)]
    pub additional_properties: Option<bool>,
    #[serde(flatten)]
    pub fields: IndexMap<String, Value>,
}

#[derive(Clone, Debug, Default)]
pub struct Catalog {
    types: IndexMap<String, RawSpec>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Catalog {
    /// The catalog shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_yaml_str("builtin", BUILTIN_SRC)
    }

    pub fn from_yaml_str(source_name: &str, src: &str) -> Result<Self> {
        let types = crate::path_de::from_yaml_str_with_path::<IndexMap<String, RawSpec>>(src)
            .map_err(|detail| SchemaError::Catalog { source_name: source_name.to_string(), detail })?;
        Ok(Self { types })
    }

    pub fn from_json_str(source_name: &str, src: &str) -> Result<Self> {
        let types = crate::path_de::from_json_str_with_path::<IndexMap<String, RawSpec>>(src)
            .map_err(|detail| SchemaError::Catalog { source_name: source_name.to_string(), detail })?;
        Ok(Self { types })
    }

    /// Load a catalog file; `.json` files are read as JSON, anything else as YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let source_name = path.to_string_lossy().to_string();
        let src = std::fs::read_to_string(path)?;
        let is_json = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let catalog = if is_json {
            Self::from_json_str(&source_name, &src)?
        } else {
            Self::from_yaml_str(&source_name, &src)?
        };
        tracing::debug!(source = %source_name, types = catalog.len(), "loaded catalog");
        Ok(catalog)
    }

    /// Load and merge several catalog files; later files override earlier ids.
    pub fn load_all<I, P>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut out = Self::default();
        for path in paths {
            out.merge(Self::load(path.as_ref())?);
        }
        Ok(out)
    }

    pub fn merge(&mut self, other: Catalog) {
        for (id, spec) in other.types {
            if self.types.contains_key(&id) {
                tracing::debug!(%id, "catalog entry overridden");
            }
            self.types.insert(id, spec);
        }
    }

    pub fn get(&self, type_id: &str) -> Option<&RawSpec> {
        self.types.get(type_id)
    }

    /// Type identifiers in declaration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawSpec)> {
        self.types.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize { self.types.len() }

    pub fn is_empty(&self) -> bool { self.types.is_empty() }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builtin_catalog_parses_in_declaration_order() {
        let catalog = Catalog::builtin().unwrap();
        let ids = catalog.ids().collect::<Vec<_>>();
        assert_eq!(ids.first(), Some(&"Z1"));
        assert_eq!(ids.last(), Some(&"Z99"));
        assert_eq!(catalog.len(), 28);
    }

    #[test]
    fn options_and_fields_are_separated() {
        let catalog = Catalog::builtin().unwrap();
        let z8 = catalog.get("Z8").unwrap();
        assert_eq!(z8.comment.as_deref(), Some("Z8/Function (Z4/Type)"));
        assert!(z8.not_required.contains("Z8K4"));
        assert_eq!(
            z8.fields.keys().map(String::as_str).collect::<Vec<_>>(),
            ["Z1K1", "Z8K1", "Z8K2", "Z8K3", "Z8K4", "Z8K5"],
        );
        assert_eq!(z8.fields["Z1K1"], json!("special"));
        assert_eq!(z8.fields["Z8K1"], json!({"specialize": "Z10", "of": "Z17"}));
    }

    #[test]
    fn nested_references_keep_their_own_fields() {
        let catalog = Catalog::builtin().unwrap();
        let z10 = catalog.get("Z10").unwrap();
        let full = &z10.references["Z10_full"];
        assert_eq!(full.fields["Z10K2"], json!({"internal": "Z10"}));
        assert!(z10.literally.is_some());
    }

    #[test]
    fn json_catalogs_load_and_merge_over_builtin() {
        let mut catalog = Catalog::builtin().unwrap();
        let extra = Catalog::from_json_str(
            "extra",
            r#"{"Z21": {"comment": "overridden", "Z1K1": "special"}, "Z900": {"Z1K1": "special"}}"#,
        ).unwrap();
        catalog.merge(extra);
        assert_eq!(catalog.get("Z21").unwrap().comment.as_deref(), Some("overridden"));
        assert_eq!(catalog.ids().last(), Some("Z900"));
    }

    #[test]
    fn decode_errors_carry_source_and_path() {
        let err = Catalog::from_yaml_str("broken.yaml", "Z1:\n  notRequired: 7\n").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("broken.yaml"), "{msg}");
        assert!(msg.contains("Z1"), "{msg}");
    }
}
