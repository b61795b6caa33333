//! `$ref` pointer rendering for one generated document.
use serde_json::{json, Value};

/// Where generated definitions live inside every document.
pub const DEFINITIONS_PATH: [&str; 2] = ["definitions", "objects"];

/// Prefix shared by every same-document pointer: `#/definitions/objects/`.
pub fn internal_prefix() -> String {
    let mut out = String::from("#/");
    for segment in DEFINITIONS_PATH {
        out.push_str(segment);
        out.push('/');
    }
    out
}

/// Renders document ids and pointers for one `generate` call.
///
/// With a tag, document ids become `<tag>_<typeId>`; without one they are the
/// bare type id.
#[derive(Clone, Debug, Default)]
pub struct Resolver {
    tag: Option<String>,
}

impl Resolver {
    pub fn new(tag: Option<&str>) -> Self {
        Self { tag: tag.map(str::to_string) }
    }

    pub fn tag(&self) -> Option<&str> { self.tag.as_deref() }

    pub fn document_id(&self, type_id: &str) -> String {
        match &self.tag {
            None => type_id.to_string(),
            Some(tag) => format!("{tag}_{type_id}"),
        }
    }

    /// `#/definitions/objects/<name>`
    pub fn internal(&self, name: &str) -> String {
        format!("{}{name}", internal_prefix())
    }

    /// `<documentId>#/definitions/objects/<key>`, where the document is the
    /// one for `alias` when given and for `key` itself otherwise.
    pub fn external(&self, key: &str, alias: Option<&str>) -> String {
        let document = alias.unwrap_or(key);
        format!("{}{}", self.document_id(document), self.internal(key))
    }
}

pub fn ref_value(pointer: impl Into<String>) -> Value {
    json!({ "$ref": pointer.into() })
}

/// The definition key addressed by a same-document pointer, if it is one.
pub fn internal_target(pointer: &str) -> Option<&str> {
    pointer.strip_prefix(internal_prefix().as_str())
}
