//! Combine desired and live state into the objects that get written.
//!
//! Every field an entity plan mentions carries its own precedence:
//!
//! - [`Declared::Value`]: declared in the workbook, or derived. Replaces the live value.
//! - [`Declared::Default`]: only fills a field the live object does not have.
//! - [`Declared::Fields`]: overlays individual sub-fields and keeps the rest of the live object.
//! - [`Declared::Absent`]: removes a derived entry that no longer applies.
//!
//! Fields a plan never mentions are carried over from the live object unchanged.

pub mod plans;

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

use crate::live::LiveSnapshot;
use crate::remote::{RemoteObject, ResourceKind, READ_ONLY_FIELDS};

pub use plans::{device_plan, network_plan, site_setting_plan, topology_plan, FabricDevice};

/// Precedence of one planned field
#[derive(Debug, Clone, PartialEq)]
pub enum Declared {
    Value(Value),
    Default(Value),
    Fields(BTreeMap<String, Declared>),
    Absent,
}

impl Declared {
    pub fn value(v: impl Into<Value>) -> Self {
        Declared::Value(v.into())
    }

    pub fn default(v: impl Into<Value>) -> Self {
        Declared::Default(v.into())
    }

    pub fn fields<K: Into<String>>(entries: impl IntoIterator<Item = (K, Declared)>) -> Self {
        Declared::Fields(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// What one run intends for one remote object
#[derive(Debug, Clone, PartialEq)]
pub struct EntityPlan {
    pub kind: ResourceKind,
    pub name: String,
    pub fields: BTreeMap<String, Declared>,
}

impl EntityPlan {
    pub fn new(kind: ResourceKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            fields: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, field: &str, declared: Declared) -> &mut Self {
        self.fields.insert(field.to_string(), declared);
        self
    }
}

/// An object ready to be written
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalObject {
    pub kind: ResourceKind,
    pub name: String,
    pub remote_id: Option<String>,
    pub body: RemoteObject,
}

impl FinalObject {
    /// Value at a nested path, e.g. `["port_config", "et-0/0/0", "usage"]`
    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.body.get(*first)?, |value, key| value.get(*key))
    }
}

/// Everything one run attempted to write
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FinalState {
    pub topology: Option<FinalObject>,
    pub networks: Vec<FinalObject>,
    pub site_setting: Option<FinalObject>,
    pub devices: Vec<FinalObject>,
}

impl FinalState {
    pub fn device(&self, hostname: &str) -> Option<&FinalObject> {
        self.devices.iter().find(|d| d.name == hostname)
    }

    pub fn network(&self, name: &str) -> Option<&FinalObject> {
        self.networks.iter().find(|n| n.name == name)
    }
}

/// Apply a plan on top of a live snapshot. Neither input is modified.
pub fn merge(plan: &EntityPlan, live: Option<&LiveSnapshot>) -> FinalObject {
    let mut body = live.map(|s| s.object.clone()).unwrap_or_default();
    for field in READ_ONLY_FIELDS {
        body.remove(*field);
    }

    apply(&mut body, &plan.fields);

    FinalObject {
        kind: plan.kind,
        name: plan.name.clone(),
        remote_id: live.map(|s| s.id.clone()),
        body,
    }
}

fn apply(target: &mut Map<String, Value>, fields: &BTreeMap<String, Declared>) {
    for (key, declared) in fields {
        match declared {
            Declared::Value(v) => {
                target.insert(key.clone(), v.clone());
            }
            Declared::Default(v) => {
                if target.get(key).map_or(true, Value::is_null) {
                    target.insert(key.clone(), v.clone());
                }
            }
            Declared::Fields(nested) => {
                let entry = target
                    .entry(key.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !entry.is_object() {
                    *entry = Value::Object(Map::new());
                }
                if let Value::Object(map) = entry {
                    apply(map, nested);
                }
            }
            Declared::Absent => {
                target.remove(key);
            }
        }
    }
}

/// Dotted paths whose value differs between the live object and the final body
pub fn changed_fields(before: &RemoteObject, after: &RemoteObject) -> Vec<String> {
    let mut out = Vec::new();
    diff("", before, after, &mut out);
    out
}

fn diff(prefix: &str, before: &Map<String, Value>, after: &Map<String, Value>, out: &mut Vec<String>) {
    let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
    for key in keys {
        if prefix.is_empty() && READ_ONLY_FIELDS.contains(&key.as_str()) {
            continue;
        }
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match (before.get(key), after.get(key)) {
            (Some(Value::Object(b)), Some(Value::Object(a))) => diff(&path, b, a, out),
            (b, a) if b != a => out.push(path),
            _ => {}
        }
    }
}
