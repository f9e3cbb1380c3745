//! Desired-state records
//!
//! A [`Record`] maps field names to typed [`Value`]s. [`ResourceData`] is what
//! a driver operation works on: the record, the stored identity (absent
//! before create) and the set of fields that changed since the last apply.

use crate::identity::Identity;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Typed field value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    /// Ordered list of sub-records
    List(Vec<Record>),
    /// Unordered set of sub-records, kept sorted and deduplicated
    Set(Vec<Record>),
}

impl Value {
    /// Build a set value; order of `items` does not matter
    pub fn set(items: impl IntoIterator<Item = Record>) -> Self {
        let mut items: Vec<Record> = items.into_iter().collect();
        items.sort();
        items.dedup();
        Value::Set(items)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Items of a list or set
    pub fn as_records(&self) -> Option<&[Record]> {
        match self {
            Value::List(items) | Value::Set(items) => Some(items),
            _ => None,
        }
    }

    /// Zero value of its type: empty string, 0, false or no items
    pub fn is_zero(&self) -> bool {
        match self {
            Value::String(s) => s.is_empty(),
            Value::Int(i) => *i == 0,
            Value::Bool(b) => !b,
            Value::List(items) | Value::Set(items) => items.is_empty(),
        }
    }

    /// Scalar rendering used for fingerprints and redaction
    pub fn render(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Int(i) => i.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::List(items) | Value::Set(items) => {
                serde_json::to_string(items).unwrap_or_default()
            }
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Field name to value mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Set when `value` is present, remove otherwise
    pub fn set_opt<V: Into<Value>>(&mut self, name: impl Into<String>, value: Option<V>) {
        let name = name.into();
        match value {
            Some(v) => {
                self.fields.insert(name, v.into());
            }
            None => {
                self.fields.remove(&name);
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// String value, treating the empty string as unset
    pub fn get_str_nonempty(&self, name: &str) -> Option<&str> {
        self.get_str(name).filter(|s| !s.is_empty())
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn get_records(&self, name: &str) -> &[Record] {
        self.get(name).and_then(Value::as_records).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Working set of a single driver invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceData {
    id: Option<Identity>,
    record: Record,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    changed: BTreeSet<String>,
}

impl ResourceData {
    pub fn new(record: Record) -> Self {
        Self {
            id: None,
            record,
            changed: BTreeSet::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<Identity>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_changes<I, S>(mut self, changed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.changed = changed.into_iter().map(Into::into).collect();
        self
    }

    pub fn id(&self) -> Option<&Identity> {
        self.id.as_ref()
    }

    /// Stored identity; operations other than create require one
    pub fn require_id(&self) -> crate::Result<&Identity> {
        self.id
            .as_ref()
            .ok_or_else(|| crate::CloudError::InvalidConfig("resource has no identity".to_string()))
    }

    pub fn set_id(&mut self, id: impl Into<Identity>) {
        self.id = Some(id.into());
    }

    pub fn clear_id(&mut self) {
        self.id = None;
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    pub fn into_record(self) -> Record {
        self.record
    }

    pub fn has_change(&self, name: &str) -> bool {
        self.changed.contains(name)
    }

    pub fn changes(&self) -> &BTreeSet<String> {
        &self.changed
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.record.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.record.get_str(name)
    }

    pub fn get_str_nonempty(&self, name: &str) -> Option<&str> {
        self.record.get_str_nonempty(name)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.record.get_int(name)
    }

    pub fn get_records(&self, name: &str) -> &[Record] {
        self.record.get_records(name)
    }

    /// Required string field; the schema layer guarantees presence
    pub fn require_str(&self, name: &str) -> crate::Result<&str> {
        self.get_str(name).ok_or_else(|| {
            crate::CloudError::Validation(format!("required field \"{}\" is missing", name))
        })
    }

    /// Write back an observed value; the control plane is authoritative
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.record.set(name, value);
    }

    pub fn set_opt<V: Into<Value>>(&mut self, name: impl Into<String>, value: Option<V>) {
        self.record.set_opt(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(content: &str, port: i64) -> Record {
        Record::new().with("content", content).with("port", port)
    }

    #[test]
    fn test_set_is_order_insensitive() {
        let a = Value::set(vec![source("1.1.1.1", 80), source("2.2.2.2", 443)]);
        let b = Value::set(vec![source("2.2.2.2", 443), source("1.1.1.1", 80)]);
        assert_eq!(a, b);

        let dup = Value::set(vec![source("1.1.1.1", 80), source("1.1.1.1", 80)]);
        assert_eq!(dup.as_records().unwrap().len(), 1);
    }

    #[test]
    fn test_typed_getters() {
        let record = Record::new()
            .with("scope", "global")
            .with("port", 80i64)
            .with("enabled", true)
            .with("empty", "");

        assert_eq!(record.get_str("scope"), Some("global"));
        assert_eq!(record.get_int("port"), Some(80));
        assert_eq!(record.get_bool("enabled"), Some(true));
        assert_eq!(record.get_str_nonempty("empty"), None);
        assert!(record.get_records("sources").is_empty());
    }

    #[test]
    fn test_resource_data_identity_lifecycle() {
        let mut data = ResourceData::new(Record::new().with("domain_name", "example.com"));
        assert!(data.require_id().is_err());

        data.set_id("example.com");
        assert_eq!(data.require_id().unwrap().as_str(), "example.com");

        data.clear_id();
        assert!(data.id().is_none());
    }

    #[test]
    fn test_changes() {
        let data = ResourceData::new(Record::new()).with_changes(["sources"]);
        assert!(data.has_change("sources"));
        assert!(!data.has_change("resource_group_id"));
    }

    #[test]
    fn test_set_opt_removes() {
        let mut record = Record::new().with("role", "acs:ram::1:role/fc");
        record.set_opt::<String>("role", None);
        assert!(!record.contains("role"));
    }
}
