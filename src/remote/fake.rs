use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use super::{RemoteApi, RemoteObject, ResourceKind};

fn object_name(object: &RemoteObject) -> Option<&str> {
    object.get("name").and_then(|v| v.as_str())
}

/// One recorded call against the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FindByName(ResourceKind, String),
    Fetch(ResourceKind, String),
    Create(ResourceKind, String),
    Update(ResourceKind, String),
}

#[derive(Default)]
struct State {
    objects: BTreeMap<(ResourceKind, String), RemoteObject>,
    calls: Vec<Call>,
    failing: BTreeSet<String>,
    next_id: usize,
}

/// In-memory `RemoteApi` with a call log and injectable write failures
#[derive(Default)]
pub struct FakeApi {
    state: Mutex<State>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a live object; `id` is added to its fields
    pub fn insert(&self, kind: ResourceKind, id: &str, object: Value) {
        let mut object = match object {
            Value::Object(map) => map,
            _ => RemoteObject::new(),
        };
        object.insert("id".to_string(), Value::String(id.to_string()));
        let mut state = self.state.lock().unwrap();
        state.objects.insert((kind, id.to_string()), object);
    }

    /// Reject every create/update of an object with this name (or id)
    pub fn fail_writes_for(&self, name: &str) {
        self.state.lock().unwrap().failing.insert(name.to_string());
    }

    pub fn object(&self, kind: ResourceKind, id: &str) -> Option<RemoteObject> {
        self.state.lock().unwrap().objects.get(&(kind, id.to_string())).cloned()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn fetches(&self, kind: ResourceKind) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Fetch(k, _) if *k == kind))
            .count()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Create(..) | Call::Update(..)))
            .collect()
    }
}

#[async_trait]
impl RemoteApi for FakeApi {
    async fn find_by_name(&self, kind: ResourceKind, name: &str) -> Result<Option<String>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::FindByName(kind, name.to_string()));
        Ok(state
            .objects
            .iter()
            .find(|((k, _), obj)| *k == kind && object_name(obj) == Some(name))
            .map(|((_, id), _)| id.clone()))
    }

    async fn fetch(&self, kind: ResourceKind, id: &str) -> Result<RemoteObject> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Fetch(kind, id.to_string()));
        state
            .objects
            .get(&(kind, id.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("404 Not Found: {} {}", kind, id))
    }

    async fn create(&self, kind: ResourceKind, object: &RemoteObject) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        let name = object_name(object).unwrap_or_default().to_string();
        state.calls.push(Call::Create(kind, name.clone()));
        if state.failing.contains(&name) {
            return Err(anyhow!("400 Bad Request: {} rejected", name));
        }

        state.next_id += 1;
        let id = format!("{}-{}", kind.to_string().replace(' ', "-"), state.next_id);
        let mut stored = object.clone();
        stored.insert("id".to_string(), Value::String(id.clone()));
        state.objects.insert((kind, id.clone()), stored);
        Ok(id)
    }

    async fn update(&self, kind: ResourceKind, id: &str, object: &RemoteObject) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Update(kind, id.to_string()));
        let key = (kind, id.to_string());
        let Some(existing) = state.objects.get(&key) else {
            return Err(anyhow!("404 Not Found: {} {}", kind, id));
        };
        let name = object_name(object).or_else(|| object_name(existing)).unwrap_or_default();
        if state.failing.contains(name) || state.failing.contains(id) {
            return Err(anyhow!("400 Bad Request: {} rejected", name));
        }

        // PUT replaces the writable fields; the server keeps the read-only ones
        let mut stored = object.clone();
        for field in super::READ_ONLY_FIELDS {
            if let Some(v) = existing.get(*field) {
                stored.insert(field.to_string(), v.clone());
            }
        }
        state.objects.insert(key, stored);
        Ok(())
    }
}
