//! Document assembly: one self-contained schema document per type.
use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;

use crate::catalog::Catalog;
use crate::error::{Result, SchemaError};
use crate::expand::BuildContext;
use crate::pointer::{internal_prefix, internal_target, ref_value, Resolver};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// ```yaml
/// $id: <tag_typeId | typeId>
/// $ref: "#/definitions/objects/<typeId>"
/// definitions:
///   objects:
///     <typeId>: { $ref: "#/definitions/objects/<typeId>_literal" }
///     <typeId>_literal: { ... }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaDocument {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "$ref")]
    pub root: String,
    pub definitions: Definitions,
    #[serde(skip)]
    pub type_id: String,
    #[serde(skip)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Definitions {
    pub objects: BTreeMap<String, Value>,
}

/// Compiles catalog types into schema documents.
#[derive(Debug, Clone)]
pub struct SchemaCompiler {
    catalog: Catalog,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

pub fn literal_name(type_id: &str) -> String {
    format!("{type_id}_literal")
}

impl SchemaDocument {
    pub fn objects(&self) -> &BTreeMap<String, Value> {
        &self.definitions.objects
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl SchemaCompiler {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// All type identifiers the catalog knows, in declaration order.
    pub fn list(&self) -> impl Iterator<Item = &str> {
        self.catalog.ids()
    }

    /// Build the document for `type_id`. Nothing is returned unless every
    /// definition expanded and every internal pointer resolves.
    pub fn generate(&self, type_id: &str, tag: Option<&str>) -> Result<SchemaDocument> {
        let raw = self
            .catalog
            .get(type_id)
            .ok_or_else(|| SchemaError::UnknownType(type_id.to_string()))?;
        let resolver = Resolver::new(tag);
        tracing::debug!(type_id, tag, "generating document");

        // Root is the literal form only. The oneOf Z7 | Z9 | literal union is
        // circular across the Z7 and Z9 documents.
        let literal = literal_name(type_id);
        let mut ctx = BuildContext::new(&resolver);
        ctx.define(type_id, ref_value(resolver.internal(&literal)));
        ctx.enqueue_raw(&literal, type_id, raw)?;
        ctx.drain()?;
        let objects = ctx.into_definitions();
        check_closure(&objects)?;

        tracing::debug!(type_id, definitions = objects.len(), "document complete");
        Ok(SchemaDocument {
            id: resolver.document_id(type_id),
            root: resolver.internal(type_id),
            definitions: Definitions { objects },
            type_id: type_id.to_string(),
            comment: raw.comment.clone(),
        })
    }

    /// Every catalog type, in catalog order. Each document is built in its own
    /// context, so the batch runs in parallel.
    pub fn generate_all(&self, tag: Option<&str>) -> Result<Vec<SchemaDocument>> {
        let ids = self.catalog.ids().collect::<Vec<_>>();
        ids.par_iter().map(|id| self.generate(id, tag)).collect()
    }
}

/// Every `$ref` into `#/definitions/objects/` must name a key of `objects`.
/// Other same-document pointers, such as `#`, are left to the schema consumer.
pub fn check_closure(objects: &BTreeMap<String, Value>) -> Result<()> {
    let prefix = internal_prefix();
    for (name, fragment) in objects {
        check_value(objects, &prefix, name, fragment)?;
    }
    Ok(())
}

fn check_value(objects: &BTreeMap<String, Value>, prefix: &str, name: &str, value: &Value) -> Result<()> {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(pointer)) = map.get("$ref") {
                if pointer.starts_with(prefix) {
                    let resolved = internal_target(pointer).filter(|target| objects.contains_key(*target));
                    if resolved.is_none() {
                        return Err(SchemaError::DanglingReference {
                            definition: name.to_string(),
                            target: pointer.clone(),
                        });
                    }
                }
            }
            map.values().try_for_each(|v| check_value(objects, prefix, name, v))
        }
        Value::Array(xs) => xs.iter().try_for_each(|v| check_value(objects, prefix, name, v)),
        _ => Ok(()),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn compiler() -> SchemaCompiler {
        SchemaCompiler::new(Catalog::builtin().unwrap())
    }

    fn custom(src: Value) -> SchemaCompiler {
        SchemaCompiler::new(Catalog::from_json_str("test", &src.to_string()).unwrap())
    }

    #[test]
    fn string_type_is_its_literal() {
        let doc = compiler().generate("Z6", None).unwrap();
        assert_eq!(doc.id, "Z6");
        assert_eq!(doc.root, "#/definitions/objects/Z6");
        assert_eq!(doc.objects().keys().collect::<Vec<_>>(), ["Z6", "Z6_literal"]);
        assert_eq!(doc.objects()["Z6"], json!({"$ref": "#/definitions/objects/Z6_literal"}));
        let lit = &doc.objects()["Z6_literal"];
        assert_eq!(lit["required"], json!(["Z1K1", "Z6K1"]));
        assert_eq!(lit["properties"]["Z1K1"]["enum"], json!(["Z6"]));
        assert_eq!(lit["properties"]["Z6K1"], json!({"type": "string"}));
        assert_eq!(lit["additionalProperties"], false);
    }

    #[test]
    fn reference_type_constrains_its_id_field() {
        let doc = compiler().generate("Z9", None).unwrap();
        let lit = &doc.objects()["Z9_literal"];
        assert_eq!(lit["required"], json!(["Z1K1", "Z9K1"]));
        assert_eq!(lit["properties"]["Z9K1"]["pattern"], "^Z[1-9]\\d*(K[1-9]\\d*)?$");
    }

    #[test]
    fn list_type_tail_points_at_the_list_itself() {
        let doc = compiler().generate("Z10", None).unwrap();
        let objects = doc.objects();
        assert!(objects.contains_key("Z10_empty"));
        assert!(objects.contains_key("Z10_full"));
        assert_eq!(objects["Z10_full"]["properties"]["Z10K2"], json!({"$ref": "#/definitions/objects/Z10"}));
        assert_eq!(objects["Z10_full"]["properties"]["Z10K1"], json!({"$ref": "Z1#/definitions/objects/Z1"}));
        assert_eq!(objects["Z10_literal"], json!({"oneOf": [
            {"$ref": "#/definitions/objects/Z10_empty"},
            {"$ref": "#/definitions/objects/Z10_full"},
        ]}));
        assert_eq!(objects["Z10_empty"]["properties"]["Z1K1"]["allOf"][1]["properties"]["Z9K1"]["enum"], json!(["Z10"]));
    }

    #[test]
    fn tagged_function_type() {
        let doc = compiler().generate("Z8", Some("wf")).unwrap();
        assert_eq!(doc.id, "wf_Z8");
        let value = doc.to_value().unwrap();
        let mut external = Vec::new();
        collect_refs(&value, &mut external);
        let external = external.into_iter().filter(|p| !p.starts_with('#')).collect::<Vec<_>>();
        assert!(!external.is_empty());
        for pointer in external {
            assert!(pointer.starts_with("wf_"), "{pointer}");
        }
        let lit = &doc.objects()["Z8_literal"];
        assert_eq!(lit["required"], json!(["Z1K1", "Z8K1", "Z8K2", "Z8K3", "Z8K5"]));
        assert_eq!(lit["properties"]["Z8K2"], json!({"$ref": "wf_Z4#/definitions/objects/Z4"}));
        let list = &doc.objects()["Z10_of_Z17"];
        assert_eq!(list["allOf"][1]["oneOf"][0], json!({"$ref": "wf_Z10#/definitions/objects/Z10_empty"}));
        assert_eq!(
            list["allOf"][1]["oneOf"][1]["properties"]["Z10K2"],
            json!({"$ref": "#/definitions/objects/Z10_of_Z17"}),
        );
    }

    #[test]
    fn malformed_field_aborts_generation() {
        let err = custom(json!({"Bad": {"Z1K1": "special", "Z2K1": 17}})).generate("Bad", None).unwrap_err();
        assert!(matches!(err, SchemaError::MalformedSpec { ref definition, .. } if definition == "Bad_literal"), "{err}");
    }

    #[test]
    fn unknown_type_is_reported() {
        let err = compiler().generate("Z404", None).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownType(ref id) if id == "Z404"));
    }

    #[test]
    fn dangling_internal_reference_is_reported() {
        let err = custom(json!({"T": {"Z1K1": "special", "Z5K1": {"internal": "nowhere"}}}))
            .generate("T", None)
            .unwrap_err();
        match err {
            SchemaError::DanglingReference { definition, target } => {
                assert_eq!(definition, "T_literal");
                assert_eq!(target, "#/definitions/objects/nowhere");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn authored_pointer_fields_are_kept() {
        let doc = custom(json!({"T": {"Z1K1": "special", "Z2K1": {"$ref": "Z6#/definitions/objects/Z6"}}}))
            .generate("T", None)
            .unwrap();
        assert_eq!(doc.objects()["T_literal"]["properties"]["Z2K1"], json!({"$ref": "Z6#/definitions/objects/Z6"}));
        assert_eq!(doc.objects()["T_literal"]["required"], json!(["Z1K1", "Z2K1"]));
    }

    #[test]
    fn repeated_side_definition_is_skipped() {
        let doc = custom(json!({"T": {
            "references": {
                "a": {"references": {"c": {"Z1K1": "special"}}, "Z1K1": "special"},
                "b": {"references": {"c": {"Z1K2": {"external": "Z6"}}}, "Z1K1": "special"},
            },
            "Z1K1": "special",
        }}))
        .generate("T", None)
        .unwrap();
        assert_eq!(doc.objects().keys().collect::<Vec<_>>(), ["T", "T_literal", "a", "b", "c"]);
    }

    #[test]
    fn root_pointer_in_literal_is_not_dangling() {
        let doc = custom(json!({"T": {"literally": {"type": "array", "items": {"$ref": "#"}}}}))
            .generate("T", None)
            .unwrap();
        assert_eq!(doc.objects()["T_literal"]["items"], json!({"$ref": "#"}));
        let err = check_closure(&BTreeMap::from([
            ("x".to_string(), json!({"$ref": "#/definitions/objects/missing"})),
        ]))
        .unwrap_err();
        assert!(matches!(err, SchemaError::DanglingReference { .. }));
    }

    #[test]
    fn whole_catalog_is_closed_and_deterministic() {
        let c = compiler();
        let first = c.generate_all(None).unwrap();
        let second = c.generate_all(None).unwrap();
        assert_eq!(first.len(), c.catalog().len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(serde_yaml::to_string(a).unwrap(), serde_yaml::to_string(b).unwrap());
            check_closure(a.objects()).unwrap();
        }
    }

    #[test]
    fn every_record_requires_declared_minus_exempt() {
        let c = compiler();
        for (id, raw) in c.catalog().iter() {
            if raw.literally.is_some() {
                continue;
            }
            let doc = c.generate(id, None).unwrap();
            let lit = &doc.objects()[&literal_name(id)];
            let mut expected = raw.fields.keys().filter(|k| !raw.not_required.contains(*k)).cloned().collect::<Vec<_>>();
            expected.sort();
            assert_eq!(lit["required"], json!(expected), "{id}");
            assert_eq!(lit["additionalProperties"], false, "{id}");
        }
    }

    #[test]
    fn literal_specs_derive_nothing() {
        let c = custom(json!({"T": {
            "literally": {"type": "string"},
            "Z1K1": "special",
            "notRequired": ["Z1K1"],
            "patternProperties": {"^Z1$": {"external": "Z1"}},
        }}));
        let doc = c.generate("T", None).unwrap();
        assert_eq!(doc.objects()["T_literal"], json!({"type": "string"}));

        let c = compiler();
        for id in ["Z1", "Z10"] {
            let doc = c.generate(id, None).unwrap();
            let lit = doc.objects()[&literal_name(id)].as_object().unwrap();
            for key in ["properties", "required", "patternProperties", "additionalProperties"] {
                assert!(!lit.contains_key(key), "{id} has {key}");
            }
        }
    }

    #[test]
    fn specialization_shared_between_ancestors() {
        let doc = compiler().generate("Z8", None).unwrap();
        let keys = doc.objects().keys().filter(|k| k.starts_with("Z10_of_")).collect::<Vec<_>>();
        assert_eq!(keys, ["Z10_of_Z14", "Z10_of_Z17", "Z10_of_Z20"]);
    }

    fn collect_refs(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::Object(map) => {
                if let Some(Value::String(p)) = map.get("$ref") {
                    out.push(p.clone());
                }
                map.values().for_each(|v| collect_refs(v, out));
            }
            Value::Array(xs) => xs.iter().for_each(|v| collect_refs(v, out)),
            _ => {}
        }
    }
}
