//! Worklist expansion of resolved specs into schema definitions.
//!
//! A [`BuildContext`] is owned by exactly one `generate` call. Items are
//! queued at most once per definition name; `drain` pops and expands until
//! nothing is left. Per item the rules are, in order:
//!
//! 1. every `references` entry is queued under the item's display id
//!    (this never decides the item's own output);
//! 2. a literal shape is copied verbatim and nothing else is derived;
//! 3. a record derives `properties`, `required`, `patternProperties`,
//!    `additionalProperties` and `type: object`.
use std::collections::{BTreeMap, HashMap};

use serde_json::{json, Map, Value};

use crate::catalog::RawSpec;
use crate::error::Result;
use crate::ir::{Field, Record, Shape, TypeSpec, WorkItem, REFERENCE_ID_KEY, REFERENCE_TYPE, TYPE_KEY};
use crate::normalize::Normalizer;
use crate::pointer::{ref_value, Resolver};
use crate::specialize::Specialization;

pub struct BuildContext<'a> {
    resolver: &'a Resolver,
    queue: Vec<WorkItem>,
    /// Every name ever queued or defined, with what it was queued as.
    /// `None` marks names defined directly rather than through the queue.
    known: HashMap<String, Option<(String, TypeSpec)>>,
    definitions: BTreeMap<String, Value>,
}

impl<'a> BuildContext<'a> {
    pub fn new(resolver: &'a Resolver) -> Self {
        Self {
            resolver,
            queue: Vec::new(),
            known: HashMap::new(),
            definitions: BTreeMap::new(),
        }
    }

    /// Insert a finished fragment without going through the worklist.
    /// The first definition of a name wins.
    pub fn define(&mut self, name: &str, fragment: Value) {
        if self.known.contains_key(name) {
            tracing::warn!(definition = name, "name already defined; keeping the first definition");
            return;
        }
        self.known.insert(name.to_string(), None);
        self.definitions.insert(name.to_string(), fragment);
    }

    /// Normalize `raw` and queue it, together with every specialization it demands.
    pub fn enqueue_raw(&mut self, name: &str, display: &str, raw: &RawSpec) -> Result<()> {
        let mut normalizer = Normalizer::new(self.resolver);
        let spec = normalizer.normalize(name, raw)?;
        let demands = normalizer.into_demands();
        let item = WorkItem { name: name.to_string(), display: display.to_string(), spec };
        if self.enqueue(item) {
            for demand in &demands {
                self.enqueue_specialization(demand, display)?;
            }
        }
        Ok(())
    }

    pub fn enqueue_specialization(&mut self, demand: &Specialization, display: &str) -> Result<()> {
        let name = demand.name();
        if !self.known.contains_key(&name) {
            tracing::debug!(specialization = %name, "materializing specialization");
        }
        self.enqueue_raw(&name, display, &demand.spec())
    }

    /// Queue `item` unless its name is already known.
    ///
    /// Returns whether the item was newly queued. A known name is never
    /// overwritten: the first definition wins and later ones are skipped.
    pub fn enqueue(&mut self, item: WorkItem) -> bool {
        match self.known.get(&item.name) {
            Some(Some((display, spec))) if *display == item.display && *spec == item.spec => {
                tracing::trace!(definition = %item.name, "already queued");
                false
            }
            Some(_) => {
                tracing::warn!(definition = %item.name, "name queued again with a different spec; keeping the first definition");
                false
            }
            None => {
                self.known.insert(item.name.clone(), Some((item.display.clone(), item.spec.clone())));
                self.queue.push(item);
                true
            }
        }
    }

    pub fn drain(&mut self) -> Result<()> {
        while let Some(item) = self.queue.pop() {
            self.expand(item)?;
        }
        Ok(())
    }

    pub fn into_definitions(self) -> BTreeMap<String, Value> {
        self.definitions
    }

    fn expand(&mut self, item: WorkItem) -> Result<()> {
        let WorkItem { name, display: shown_as, spec } = item;
        tracing::debug!(definition = %name, display = %shown_as, "expanding");

        // 1. side definitions
        for (sub_name, sub_spec) in spec.references {
            self.enqueue(WorkItem { name: sub_name, display: shown_as.clone(), spec: sub_spec });
        }

        // 2./3. own shape
        let fragment = match spec.shape {
            Shape::Literal(literal) => literal,
            Shape::Record(record) => self.derive_record(&shown_as, &record),
        };
        self.definitions.insert(name, fragment);
        Ok(())
    }

    fn derive_record(&self, display: &str, record: &Record) -> Value {
        let mut properties = Map::new();
        for (key, field) in &record.fields {
            let schema = match field {
                Field::Ref(pointer) => ref_value(pointer.clone()),
                Field::SelfTagged => self.self_tag(display),
            };
            properties.insert(key.clone(), schema);
        }

        let mut out = Map::new();
        if !properties.is_empty() {
            out.insert("properties".into(), Value::Object(properties));
        }
        let required = record.required();
        if !required.is_empty() {
            out.insert("required".into(), json!(required));
        }
        if let Some(patterns) = &record.pattern_properties {
            out.insert("patternProperties".into(), Value::Object(patterns.clone()));
        }
        out.insert("additionalProperties".into(), Value::Bool(record.additional_properties));
        out.insert("type".into(), Value::from("object"));
        Value::Object(out)
    }

    /// Reference-record shape AND a tag naming `display` exactly.
    fn self_tag(&self, display: &str) -> Value {
        json!({
            "allOf": [
                ref_value(self.resolver.external(REFERENCE_TYPE, None)),
                {
                    "type": "object",
                    "required": [TYPE_KEY, REFERENCE_ID_KEY],
                    "properties": {
                        TYPE_KEY: { "type": "string", "enum": [REFERENCE_TYPE] },
                        REFERENCE_ID_KEY: { "type": "string", "enum": [display] },
                    },
                    "additionalProperties": false,
                },
            ],
        })
    }
}
