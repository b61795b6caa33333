//! Generic specializations: a generic container narrowed to one element type.
//!
//! Names are plain concatenations (`Z10_of_Z3`) so repeated requests agree on
//! the definition key and generated documents stay readable in diffs. The
//! specs are returned in authored form, with markers, and go through the same
//! normalization as catalog specs.
use serde_json::json;

use crate::catalog::RawSpec;
use crate::ir::{LIST_EMPTY, LIST_HEAD_KEY, LIST_TAIL_KEY, LIST_TYPE, REFERENCE_ID_KEY, REFERENCE_TYPE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Generic {
    /// Homogeneous list: empty, or a head plus a tail of the same list.
    List,
    /// Reference record restricted to one target identifier.
    Reference,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Specialization {
    pub generic: Generic,
    pub element: String,
}

impl Generic {
    pub fn from_type_id(type_id: &str) -> Option<Self> {
        match type_id {
            LIST_TYPE => Some(Self::List),
            REFERENCE_TYPE => Some(Self::Reference),
            _ => None,
        }
    }

    pub fn type_id(self) -> &'static str {
        match self {
            Self::List => LIST_TYPE,
            Self::Reference => REFERENCE_TYPE,
        }
    }
}

impl Specialization {
    pub fn new(generic: Generic, element: impl Into<String>) -> Self {
        Self { generic, element: element.into() }
    }

    pub fn name(&self) -> String {
        specialization_name(self.generic, &self.element)
    }

    pub fn spec(&self) -> RawSpec {
        match self.generic {
            Generic::List => list_of(&self.element),
            Generic::Reference => reference_to(&self.element),
        }
    }
}

pub fn specialization_name(generic: Generic, element: &str) -> String {
    format!("{}_of_{element}", generic.type_id())
}

/// A list whose head is `element` and whose tail points back at this same
/// specialization.
pub fn list_of(element: &str) -> RawSpec {
    let name = specialization_name(Generic::List, element);
    literal(json!({
        "allOf": [
            { "external": LIST_TYPE },
            {
                "oneOf": [
                    { "external": LIST_EMPTY, "alias": LIST_TYPE },
                    {
                        "type": "object",
                        "properties": {
                            LIST_HEAD_KEY: { "external": element },
                            LIST_TAIL_KEY: { "internal": name },
                        },
                        "required": [LIST_HEAD_KEY, LIST_TAIL_KEY],
                    },
                ],
            },
        ],
    }))
}

/// A reference record that may only name `element`.
pub fn reference_to(element: &str) -> RawSpec {
    literal(json!({
        "allOf": [
            { "external": REFERENCE_TYPE },
            {
                "type": "object",
                "properties": {
                    REFERENCE_ID_KEY: { "type": "string", "enum": [element] },
                },
            },
        ],
    }))
}

fn literal(value: serde_json::Value) -> RawSpec {
    RawSpec { literally: Some(value), ..RawSpec::default() }
}
