// Resolved spec IR. Markers are gone; every reference is a rendered pointer.
use std::collections::BTreeSet;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// Field that carries a record's own type tag.
pub const TYPE_KEY: &str = "Z1K1";
/// Value of [`TYPE_KEY`] that asks for a self-tag instead of a reference.
pub const SELF_TAG_SENTINEL: &str = "special";
/// The reference-record type and its identifier field.
pub const REFERENCE_TYPE: &str = "Z9";
pub const REFERENCE_ID_KEY: &str = "Z9K1";
/// The list type, its variants and its head/tail fields.
pub const LIST_TYPE: &str = "Z10";
pub const LIST_EMPTY: &str = "Z10_empty";
pub const LIST_HEAD_KEY: &str = "Z10K1";
pub const LIST_TAIL_KEY: &str = "Z10K2";

pub const RECORD_KEY_PATTERN: &str = r"^Z[1-9]\d*(K[1-9]\d*)?$";

pub static RECORD_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(RECORD_KEY_PATTERN).expect("record key pattern is a valid regex")
});

#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpec {
    pub comment: Option<String>,
    /// Side definitions in the same document; never replaces `shape`.
    pub references: IndexMap<String, TypeSpec>,
    pub shape: Shape,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Emitted verbatim; no field derivation.
    Literal(Value),
    Record(Record),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub fields: IndexMap<String, Field>,
    pub pattern_properties: Option<Map<String, Value>>,
    pub not_required: BTreeSet<String>,
    pub additional_properties: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// A rendered `$ref` pointer.
    Ref(String),
    /// Must be a reference record whose id is the displayed type id.
    SelfTagged,
}

/// One queued definition: expand `spec` under `name`, self-tagging as `display`.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    pub name: String,
    pub display: String,
    pub spec: TypeSpec,
}

impl Record {
    /// Declared fields minus the exempted ones, sorted.
    pub fn required(&self) -> BTreeSet<&str> {
        self.fields
            .keys()
            .filter(|k| !self.not_required.contains(*k))
            .map(String::as_str)
            .collect()
    }
}
