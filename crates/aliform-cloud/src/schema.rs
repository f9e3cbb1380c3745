//! Declarative field schema
//!
//! Each driver describes its recognized fields as a table of [`FieldSpec`]s.
//! The schema validates desired-state records, fills defaults, converts
//! manifest JSON into typed records and tells the planner which changes
//! force replacement.

use crate::data::{Record, Value};
use crate::diagnostics::Diagnostics;
use crate::error::{CloudError, Result};
use crate::identity::DELIMITER;
use std::time::Duration;

/// Predicate used to suppress a field's diff given the desired record
pub type DiffSuppressFn = fn(&Record) -> bool;

/// Field value type
#[derive(Debug, Clone)]
pub enum FieldKind {
    String,
    Int,
    Bool,
    List(Schema),
    Set(Schema),
}

/// Value constraint checked during validation
#[derive(Debug, Clone)]
pub enum Validator {
    StringInSlice(&'static [&'static str]),
    IntInSlice(&'static [i64]),
    /// Inclusive character-length bounds
    StringLenBetween(usize, usize),
    StringIsJson,
    /// Value becomes part of a composite identity and must not contain its delimiter
    IdentityPart,
}

impl Validator {
    fn check(&self, value: &Value) -> std::result::Result<(), String> {
        match (self, value) {
            (Validator::StringInSlice(allowed), Value::String(s)) => {
                if allowed.contains(&s.as_str()) {
                    Ok(())
                } else {
                    Err(format!("expected one of {:?}, got \"{}\"", allowed, s))
                }
            }
            (Validator::IntInSlice(allowed), Value::Int(i)) => {
                if allowed.contains(i) {
                    Ok(())
                } else {
                    Err(format!("expected one of {:?}, got {}", allowed, i))
                }
            }
            (Validator::StringLenBetween(min, max), Value::String(s)) => {
                let len = s.chars().count();
                if len >= *min && len <= *max {
                    Ok(())
                } else {
                    Err(format!(
                        "expected length between {} and {}, got {}",
                        min, max, len
                    ))
                }
            }
            (Validator::StringIsJson, Value::String(s)) => serde_json::from_str::<serde_json::Value>(s)
                .map(|_| ())
                .map_err(|e| format!("expected valid JSON: {}", e)),
            (Validator::IdentityPart, Value::String(s)) => {
                if s.contains(DELIMITER) {
                    Err(format!("must not contain \"{}\"", DELIMITER))
                } else {
                    Ok(())
                }
            }
            _ => Err("value has the wrong type for this validator".to_string()),
        }
    }
}

/// Specification of a single field
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub optional: bool,
    pub default: Option<Value>,
    /// Assigned by the control plane when not supplied
    pub computed: bool,
    /// A change destroys and recreates the object
    pub force_new: bool,
    /// Never echoed in diagnostics nor persisted in plain text
    pub sensitive: bool,
    pub conflicts_with: &'static [&'static str],
    pub validators: Vec<Validator>,
    pub diff_suppress: Option<DiffSuppressFn>,
}

impl FieldSpec {
    fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            optional: false,
            default: None,
            computed: false,
            force_new: false,
            sensitive: false,
            conflicts_with: &[],
            validators: Vec::new(),
            diff_suppress: None,
        }
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn int(name: &'static str) -> Self {
        Self::new(name, FieldKind::Int)
    }

    pub fn bool(name: &'static str) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    pub fn list(name: &'static str, elem: Schema) -> Self {
        Self::new(name, FieldKind::List(elem))
    }

    pub fn set(name: &'static str, elem: Schema) -> Self {
        Self::new(name, FieldKind::Set(elem))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn conflicts_with(mut self, fields: &'static [&'static str]) -> Self {
        self.conflicts_with = fields;
        self
    }

    /// Add a constraint; every added validator must pass
    pub fn validate_with(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn suppress_diff_when(mut self, predicate: DiffSuppressFn) -> Self {
        self.diff_suppress = Some(predicate);
        self
    }

    /// Computed-only fields are never supplied by the caller
    pub fn is_output_only(&self) -> bool {
        self.computed && !self.required && !self.optional
    }
}

/// Per-operation deadlines of a resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::uniform(Duration::from_secs(20 * 60))
    }
}

impl Timeouts {
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            create: timeout,
            update: timeout,
            delete: timeout,
        }
    }
}

/// Table of recognized fields
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_force_new(&self, name: &str) -> bool {
        self.field(name).is_some_and(|f| f.force_new)
    }

    /// Fill defaults for absent fields, recursing into sub-records
    pub fn apply_defaults(&self, record: &mut Record) {
        for field in &self.fields {
            match (&field.kind, record.get(field.name).cloned()) {
                (_, None) => {
                    if let Some(default) = &field.default {
                        record.set(field.name, default.clone());
                    }
                }
                (FieldKind::List(elem), Some(Value::List(items))) => {
                    let items = items
                        .into_iter()
                        .map(|mut item| {
                            elem.apply_defaults(&mut item);
                            item
                        })
                        .collect();
                    record.set(field.name, Value::List(items));
                }
                (FieldKind::Set(elem), Some(Value::Set(items))) => {
                    let items = items.into_iter().map(|mut item| {
                        elem.apply_defaults(&mut item);
                        item
                    });
                    record.set(field.name, Value::set(items));
                }
                _ => {}
            }
        }
    }

    /// Check required fields, conflicts, types and validators
    pub fn validate(&self, record: &Record) -> Diagnostics {
        let mut diags = Diagnostics::new();
        self.validate_into(record, "", &mut diags);
        diags
    }

    fn validate_into(&self, record: &Record, prefix: &str, diags: &mut Diagnostics) {
        for (name, _) in record.iter() {
            if self.field(name).is_none() {
                diags.push_field_error(
                    "UnknownField",
                    format!("unsupported field \"{}{}\"", prefix, name),
                    format!("{}{}", prefix, name),
                );
            }
        }

        for field in &self.fields {
            let path = format!("{}{}", prefix, field.name);
            let Some(value) = record.get(field.name) else {
                if field.required {
                    diags.push_field_error(
                        "MissingField",
                        format!("required field \"{}\" is missing", path),
                        path,
                    );
                }
                continue;
            };

            if field.is_output_only() {
                diags.push_field_error(
                    "ComputedField",
                    format!("field \"{}\" is computed and cannot be set", path),
                    path.clone(),
                );
            }

            for other in field.conflicts_with {
                if record.contains(other) {
                    diags.push_field_error(
                        "ConflictingFields",
                        format!("\"{}\" conflicts with \"{}{}\"", path, prefix, other),
                        path.clone(),
                    );
                }
            }

            match (&field.kind, value) {
                (FieldKind::String, Value::String(_))
                | (FieldKind::Int, Value::Int(_))
                | (FieldKind::Bool, Value::Bool(_)) => {}
                (FieldKind::List(elem), Value::List(items))
                | (FieldKind::Set(elem), Value::Set(items)) => {
                    for (i, item) in items.iter().enumerate() {
                        elem.validate_into(item, &format!("{}.{}.", path, i), diags);
                    }
                }
                _ => {
                    diags.push_field_error(
                        "InvalidType",
                        format!("field \"{}\" has the wrong type", path),
                        path.clone(),
                    );
                    continue;
                }
            }

            for validator in &field.validators {
                if let Err(reason) = validator.check(value) {
                    // The offending value is left out so sensitive input never leaks
                    diags.push_field_error(
                        "InvalidValue",
                        format!("invalid value for \"{}\": {}", path, reason),
                        path.clone(),
                    );
                }
            }
        }
    }

    /// Convert manifest JSON into a typed record
    pub fn record_from_json(&self, json: &serde_json::Value) -> Result<Record> {
        let object = json.as_object().ok_or_else(|| {
            CloudError::Validation("resource configuration must be an object".to_string())
        })?;

        let mut record = Record::new();
        for (name, value) in object {
            let field = self
                .field(name)
                .ok_or_else(|| CloudError::Validation(format!("unsupported field \"{}\"", name)))?;
            if value.is_null() {
                continue;
            }
            record.set(name.clone(), convert_json(field, value)?);
        }
        Ok(record)
    }

    /// Rendered values of sensitive fields present in `record`
    pub fn sensitive_values(&self, record: &Record) -> Vec<String> {
        let mut values = Vec::new();
        for field in &self.fields {
            let Some(value) = record.get(field.name) else {
                continue;
            };
            if field.sensitive {
                values.push(value.render());
            }
            if let (FieldKind::List(elem) | FieldKind::Set(elem), Some(items)) =
                (&field.kind, value.as_records())
            {
                for item in items {
                    values.extend(elem.sensitive_values(item));
                }
            }
        }
        values.retain(|v| !v.is_empty());
        values
    }
}

fn convert_json(field: &FieldSpec, value: &serde_json::Value) -> Result<Value> {
    let mismatch = || {
        CloudError::Validation(format!("field \"{}\" has the wrong type", field.name))
    };

    match &field.kind {
        FieldKind::String => match value {
            serde_json::Value::String(s) => Ok(Value::String(s.clone())),
            // Free-form JSON documents are accepted inline and kept as text
            serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                Ok(Value::String(serde_json::to_string(value)?))
            }
            serde_json::Value::Number(n) => Ok(Value::String(n.to_string())),
            _ => Err(mismatch()),
        },
        FieldKind::Int => value.as_i64().map(Value::Int).ok_or_else(mismatch),
        FieldKind::Bool => value.as_bool().map(Value::Bool).ok_or_else(mismatch),
        FieldKind::List(elem) | FieldKind::Set(elem) => {
            let items = value.as_array().ok_or_else(mismatch)?;
            let records = items
                .iter()
                .map(|item| elem.record_from_json(item))
                .collect::<Result<Vec<_>>>()?;
            if matches!(field.kind, FieldKind::Set(_)) {
                Ok(Value::set(records))
            } else {
                Ok(Value::List(records))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_schema() -> Schema {
        Schema::new(vec![
            FieldSpec::string("content").required(),
            FieldSpec::int("port")
                .default_value(80i64)
                .validate_with(Validator::IntInSlice(&[443, 80])),
            FieldSpec::string("type")
                .required()
                .validate_with(Validator::StringInSlice(&["ipaddr", "domain", "oss"])),
        ])
    }

    fn schema() -> Schema {
        Schema::new(vec![
            FieldSpec::string("domain_name").required().force_new(),
            FieldSpec::string("scope")
                .default_value("domestic")
                .validate_with(Validator::StringInSlice(&["domestic", "global", "overseas"])),
            FieldSpec::string("cname").computed(),
            FieldSpec::string("name").conflicts_with(&["name_prefix"]),
            FieldSpec::string("name_prefix"),
            FieldSpec::string("secret").sensitive(),
            FieldSpec::set("sources", source_schema()).required(),
        ])
    }

    #[test]
    fn test_apply_defaults_recurses() {
        let mut record = Record::new().with("domain_name", "example.com").with(
            "sources",
            Value::set(vec![Record::new().with("content", "1.1.1.1").with("type", "ipaddr")]),
        );
        schema().apply_defaults(&mut record);

        assert_eq!(record.get_str("scope"), Some("domestic"));
        assert_eq!(record.get_records("sources")[0].get_int("port"), Some(80));
    }

    #[test]
    fn test_validate_reports_all_problems() {
        let record = Record::new()
            .with("scope", "mars")
            .with("cname", "x.example.com")
            .with("name", "a")
            .with("name_prefix", "b")
            .with(
                "sources",
                Value::set(vec![Record::new().with("content", "1.1.1.1").with("port", 8080i64)]),
            );
        let diags = schema().validate(&record);
        let codes: Vec<&str> = diags.iter().map(|d| d.code.as_str()).collect();

        assert!(codes.contains(&"MissingField")); // domain_name and sources.0.type
        assert!(codes.contains(&"InvalidValue")); // scope and port
        assert!(codes.contains(&"ComputedField"));
        assert!(codes.contains(&"ConflictingFields"));
        assert!(diags.has_errors());
    }

    #[test]
    fn test_validate_clean_record() {
        let mut record = Record::new().with("domain_name", "example.com").with(
            "sources",
            Value::set(vec![Record::new().with("content", "1.1.1.1").with("type", "ipaddr")]),
        );
        let schema = schema();
        schema.apply_defaults(&mut record);
        assert!(schema.validate(&record).is_empty());
    }

    #[test]
    fn test_string_validators() {
        assert!(Validator::StringLenBetween(1, 3).check(&"abc".into()).is_ok());
        assert!(Validator::StringLenBetween(1, 3).check(&"abcd".into()).is_err());
        assert!(Validator::StringIsJson.check(&"{\"a\":1}".into()).is_ok());
        assert!(Validator::StringIsJson.check(&"{a".into()).is_err());
        assert!(Validator::IdentityPart.check(&"nightly".into()).is_ok());
        assert!(Validator::IdentityPart.check(&"a:b".into()).is_err());
    }

    #[test]
    fn test_every_validator_applies() {
        let schema = Schema::new(vec![
            FieldSpec::string("name")
                .validate_with(Validator::StringLenBetween(1, 8))
                .validate_with(Validator::IdentityPart),
        ]);

        assert!(schema.validate(&Record::new().with("name", "ok")).is_empty());

        let diags = schema.validate(&Record::new().with("name", "a:b"));
        assert_eq!(diags.len(), 1);
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.code, "InvalidValue");
        assert_eq!(diag.field.as_deref(), Some("name"));

        assert_eq!(schema.validate(&Record::new().with("name", "a:bcdefghij")).len(), 2);
    }

    #[test]
    fn test_record_from_json() {
        let json = serde_json::json!({
            "domain_name": "example.com",
            "sources": [{"content": "1.1.1.1", "type": "ipaddr", "port": 443}],
        });
        let record = schema().record_from_json(&json).unwrap();
        assert_eq!(record.get_str("domain_name"), Some("example.com"));
        assert_eq!(record.get_records("sources")[0].get_int("port"), Some(443));

        let bad = serde_json::json!({"unknown": 1});
        assert!(schema().record_from_json(&bad).is_err());
    }

    #[test]
    fn test_inline_json_document_kept_as_text() {
        let schema = Schema::new(vec![FieldSpec::string("config")]);
        let json = serde_json::json!({"config": {"cronExpression": "@every 5m"}});
        let record = schema.record_from_json(&json).unwrap();
        assert_eq!(
            record.get_str("config"),
            Some(r#"{"cronExpression":"@every 5m"}"#)
        );
    }

    #[test]
    fn test_sensitive_values() {
        let record = Record::new().with("secret", "hunter2").with("scope", "global");
        assert_eq!(schema().sensitive_values(&record), vec!["hunter2".to_string()]);
    }
}
