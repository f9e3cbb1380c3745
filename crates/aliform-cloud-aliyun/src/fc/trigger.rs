//! Function Compute trigger (`aliyun_fc_trigger`)
//!
//! Identity: `service:function:trigger_name`.

use super::types::{
    CreateTriggerRequest, TRIGGER_TYPE_MNS_TOPIC, TRIGGER_TYPE_TIMER, TRIGGER_TYPES, TriggerKey,
    UpdateTriggerRequest,
};
use crate::client::{AliyunClient, FcApi};
use aliform_cloud::{
    CloudError, FieldSpec, Identity, OperationContext, Record, ResourceData, ResourceDriver,
    Result, ResultExt, Schema, Validator, not_found_or, tolerate,
};
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;

pub const KIND: &str = "aliyun_fc_trigger";

const NOT_FOUND_CODES: &[&str] = &["ServiceNotFound", "FunctionNotFound", "TriggerNotFound"];

const DEFAULT_NAME_PREFIX: &str = "aliform-";
const NAME_SUFFIX_LEN: usize = 6;
const NAME_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

pub struct FcTriggerDriver {
    fc: Arc<dyn FcApi>,
    schema: Schema,
}

impl FcTriggerDriver {
    pub fn new(fc: Arc<dyn FcApi>) -> Self {
        Self {
            fc,
            schema: schema(),
        }
    }

    pub fn constructor(client: &AliyunClient) -> Arc<dyn ResourceDriver> {
        Arc::new(Self::new(Arc::clone(&client.fc)))
    }
}

fn schema() -> Schema {
    Schema::new(vec![
        FieldSpec::string("service")
            .required()
            .force_new()
            .validate_with(Validator::IdentityPart),
        FieldSpec::string("function")
            .required()
            .force_new()
            .validate_with(Validator::IdentityPart),
        FieldSpec::string("name")
            .optional()
            .computed()
            .force_new()
            .conflicts_with(&["name_prefix"])
            .validate_with(Validator::StringLenBetween(1, 128))
            .validate_with(Validator::IdentityPart),
        FieldSpec::string("name_prefix")
            .force_new()
            .validate_with(Validator::StringLenBetween(0, 122))
            .validate_with(Validator::IdentityPart),
        FieldSpec::string("role").suppress_diff_when(is_timer),
        FieldSpec::string("source_arn").force_new(),
        FieldSpec::string("config").validate_with(Validator::StringIsJson),
        FieldSpec::string("config_mns")
            .force_new()
            .conflicts_with(&["config"])
            .validate_with(Validator::StringIsJson),
        FieldSpec::string("type")
            .required()
            .force_new()
            .validate_with(Validator::StringInSlice(TRIGGER_TYPES)),
        FieldSpec::string("qualifier").default_value("LATEST"),
        FieldSpec::string("last_modified").computed(),
        FieldSpec::string("trigger_id").computed(),
    ])
}

/// Timer triggers run without an invocation role
fn is_timer(record: &Record) -> bool {
    record.get_str("type") == Some(TRIGGER_TYPE_TIMER)
}

/// MNS topic triggers keep their configuration in a separate field
fn config_field(trigger_type: Option<&str>) -> &'static str {
    if trigger_type == Some(TRIGGER_TYPE_MNS_TOPIC) {
        "config_mns"
    } else {
        "config"
    }
}

fn parse_config(data: &ResourceData, field: &str) -> Result<serde_json::Value> {
    match data.get_str_nonempty(field) {
        Some(text) => serde_json::from_str(text)
            .map_err(|e| CloudError::Validation(format!("\"{}\" is not valid JSON: {}", field, e))),
        None => Ok(serde_json::Value::Null),
    }
}

/// `prefix` followed by a short random suffix
fn unique_name(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..NAME_SUFFIX_LEN)
        .map(|_| NAME_ALPHABET[rng.gen_range(0..NAME_ALPHABET.len())] as char)
        .collect();
    format!("{}{}", prefix, suffix)
}

fn trigger_key(id: &Identity) -> Result<TriggerKey> {
    let [service_name, function_name, trigger_name] = id.parts::<3>()?;
    Ok(TriggerKey {
        service_name,
        function_name,
        trigger_name,
    })
}

#[async_trait]
impl ResourceDriver for FcTriggerDriver {
    fn kind(&self) -> &str {
        KIND
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn create(&self, data: &mut ResourceData, ctx: &OperationContext) -> Result<Identity> {
        let service = data.require_str("service")?.to_string();
        let function = data.require_str("function")?.to_string();
        let trigger_type = data.require_str("type")?.to_string();

        let name = match (data.get_str_nonempty("name"), data.get_str_nonempty("name_prefix")) {
            (Some(name), _) => name.to_string(),
            (None, Some(prefix)) => unique_name(prefix),
            (None, None) => unique_name(DEFAULT_NAME_PREFIX),
        };
        let id = Identity::encode([&service, &function, &name])?;

        let request = CreateTriggerRequest {
            service_name: service.clone(),
            function_name: function.clone(),
            trigger_name: name,
            invocation_role: data.get_str("role").unwrap_or_default().to_string(),
            source_arn: data.get_str_nonempty("source_arn").map(str::to_string),
            trigger_config: parse_config(data, config_field(Some(trigger_type.as_str())))?,
            qualifier: data.get_str("qualifier").unwrap_or("LATEST").to_string(),
            trigger_type,
        };

        tracing::info!(
            "Creating FC trigger {} on {}/{}",
            request.trigger_name,
            service,
            function
        );
        self.fc
            .create_trigger(&request)
            .await
            .context(format!("creating FC trigger {}", request.trigger_name))?;

        data.set_id(id.clone());
        self.read(data, ctx).await?;
        Ok(id)
    }

    async fn read(&self, data: &mut ResourceData, _ctx: &OperationContext) -> Result<()> {
        let id = data.require_id()?.clone();
        let key = trigger_key(&id)?;

        let trigger = self
            .fc
            .get_trigger(&key)
            .await
            .map_err(|e| not_found_or(e, NOT_FOUND_CODES, id.as_str()))?;

        // A configuration that is semantically equal keeps its original text
        let field = config_field(Some(trigger.trigger_type.as_str()));
        let known = data
            .get_str_nonempty(field)
            .and_then(|text| serde_json::from_str::<serde_json::Value>(text).ok());
        if known.as_ref() != Some(&trigger.trigger_config) && !trigger.trigger_config.is_null() {
            data.set(field, serde_json::to_string(&trigger.trigger_config)?);
        }

        data.set("service", key.service_name);
        data.set("function", key.function_name);
        data.set("name", trigger.trigger_name);
        data.set("trigger_id", trigger.trigger_id);
        data.set("role", trigger.invocation_role);
        data.set("source_arn", trigger.source_arn);
        data.set("qualifier", trigger.qualifier);
        data.set("type", trigger.trigger_type);
        data.set("last_modified", trigger.last_modified_time);
        Ok(())
    }

    async fn update(&self, data: &mut ResourceData, ctx: &OperationContext) -> Result<()> {
        let id = data.require_id()?.clone();
        let key = trigger_key(&id)?;

        let mut request = UpdateTriggerRequest::new(&key);
        if data.has_change("role") {
            request.invocation_role = Some(data.get_str("role").unwrap_or_default().to_string());
        }
        if data.has_change("config") {
            request.trigger_config = Some(parse_config(data, "config")?);
        }
        if data.has_change("qualifier") {
            request.qualifier = Some(data.get_str("qualifier").unwrap_or("LATEST").to_string());
        }

        if request.is_empty() {
            tracing::debug!("No FC trigger fields changed for {}", id);
        } else {
            tracing::info!("Updating FC trigger {}", id);
            self.fc
                .update_trigger(&request)
                .await
                .context(format!("updating FC trigger {}", id))?;
        }

        self.read(data, ctx).await
    }

    async fn delete(&self, data: &mut ResourceData, _ctx: &OperationContext) -> Result<()> {
        let id = data.require_id()?.clone();
        let key = trigger_key(&id)?;

        tracing::info!("Deleting FC trigger {}", id);
        tolerate(self.fc.delete_trigger(&key).await, NOT_FOUND_CODES)
            .context(format!("deleting FC trigger {}", id))?;

        data.clear_id();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubFc;
    use aliform_cloud::{ServiceError, Value};

    fn driver() -> (Arc<StubFc>, FcTriggerDriver) {
        let fc = Arc::new(StubFc::new());
        (fc.clone(), FcTriggerDriver::new(fc))
    }

    fn desired(driver: &FcTriggerDriver, fields: &[(&str, &str)]) -> ResourceData {
        let mut record: Record = fields
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect();
        driver.schema().apply_defaults(&mut record);
        ResourceData::new(record)
    }

    #[tokio::test]
    async fn test_name_with_delimiter_is_rejected_before_create() {
        let (fc, driver) = driver();
        let mut data = desired(
            &driver,
            &[
                ("service", "svc"),
                ("function", "fn"),
                ("name", "a:b"),
                ("type", "http"),
            ],
        );

        let diags = driver.schema().validate(data.record());
        assert!(diags.has_errors());
        assert!(diags.iter().any(|d| d.field.as_deref() == Some("name")));

        let err = driver.create(&mut data, &OperationContext::default()).await.unwrap_err();
        assert_eq!(err.code(), "InvalidIdentity");
        assert_eq!(fc.calls.count("create_trigger"), 0);
        assert_eq!(fc.trigger_count(), 0);
        assert!(data.id().is_none());
    }

    #[test]
    fn test_identity_fields_reject_delimiter() {
        let driver = FcTriggerDriver::new(Arc::new(StubFc::new()));
        for field in ["service", "function", "name_prefix"] {
            let mut fields = vec![("service", "svc"), ("function", "fn"), ("type", "http")];
            fields.retain(|(k, _)| *k != field);
            fields.push((field, "x:y"));
            let record: Record = fields
                .iter()
                .map(|(k, v)| (k.to_string(), Value::from(*v)))
                .collect();
            let diags = driver.schema().validate(&record);
            assert!(
                diags.iter().any(|d| d.field.as_deref() == Some(field)),
                "{field} accepted a delimiter"
            );
        }
    }

    #[tokio::test]
    async fn test_create_with_explicit_name() {
        let (fc, driver) = driver();
        let mut data = desired(
            &driver,
            &[
                ("service", "svc"),
                ("function", "fn"),
                ("name", "nightly"),
                ("type", "timer"),
                ("config", r#"{"cronExpression":"@every 1h","enable":true}"#),
            ],
        );

        let id = driver.create(&mut data, &OperationContext::default()).await.unwrap();

        assert_eq!(id.as_str(), "svc:fn:nightly");
        assert_eq!(data.id(), Some(&id));
        assert_eq!(data.get_str("qualifier"), Some("LATEST"));
        assert!(!data.get_str("trigger_id").unwrap().is_empty());
        assert_eq!(
            data.get_str("config"),
            Some(r#"{"cronExpression":"@every 1h","enable":true}"#)
        );
        assert_eq!(fc.calls.count("create_trigger"), 1);
        assert_eq!(fc.calls.count("get_trigger"), 1);
    }

    #[tokio::test]
    async fn test_generated_names() {
        let (fc, driver) = driver();
        let ctx = OperationContext::default();

        let mut prefixed = desired(
            &driver,
            &[("service", "s"), ("function", "f"), ("name_prefix", "hook-"), ("type", "http")],
        );
        let id = driver.create(&mut prefixed, &ctx).await.unwrap();
        let [_, _, name] = id.parts::<3>().unwrap();
        assert!(name.starts_with("hook-"));
        assert_eq!(name.len(), "hook-".len() + NAME_SUFFIX_LEN);

        let mut generated = desired(&driver, &[("service", "s"), ("function", "f"), ("type", "http")]);
        let id = driver.create(&mut generated, &ctx).await.unwrap();
        assert!(id.as_str().starts_with("s:f:aliform-"));
        assert_eq!(fc.trigger_count(), 2);
    }

    #[tokio::test]
    async fn test_mns_topic_uses_config_mns() {
        let (fc, driver) = driver();
        let mut data = desired(
            &driver,
            &[
                ("service", "s"),
                ("function", "f"),
                ("name", "topic"),
                ("type", "mns_topic"),
                ("config_mns", r#"{"filterTag":"a"}"#),
            ],
        );

        driver.create(&mut data, &OperationContext::default()).await.unwrap();

        let stored = fc.trigger("s", "f", "topic").unwrap();
        assert_eq!(stored.trigger_config["filterTag"], "a");
        assert!(data.get("config").is_none());
        assert_eq!(data.get_str("config_mns"), Some(r#"{"filterTag":"a"}"#));
    }

    #[tokio::test]
    async fn test_update_sends_only_changed_members() {
        let (fc, driver) = driver();
        let ctx = OperationContext::default();
        let mut data = desired(
            &driver,
            &[("service", "s"), ("function", "f"), ("name", "t"), ("type", "http"), ("role", "r1")],
        );
        driver.create(&mut data, &ctx).await.unwrap();

        data.set("qualifier", "prod");
        let mut data = data.with_changes(["qualifier"]);
        driver.update(&mut data, &ctx).await.unwrap();

        let request = fc.last_update().unwrap();
        assert_eq!(request.qualifier.as_deref(), Some("prod"));
        assert!(request.invocation_role.is_none());
        assert!(request.trigger_config.is_none());
        assert_eq!(data.get_str("qualifier"), Some("prod"));
    }

    #[tokio::test]
    async fn test_update_without_relevant_changes_skips_call() {
        let (fc, driver) = driver();
        let ctx = OperationContext::default();
        let mut data = desired(
            &driver,
            &[("service", "s"), ("function", "f"), ("name", "t"), ("type", "http")],
        );
        driver.create(&mut data, &ctx).await.unwrap();

        let mut data = data.with_changes(Vec::<String>::new());
        driver.update(&mut data, &ctx).await.unwrap();

        assert_eq!(fc.calls.count("update_trigger"), 0);
        assert_eq!(fc.calls.count("get_trigger"), 2);
    }

    #[tokio::test]
    async fn test_read_missing_trigger_is_not_found() {
        let (_, driver) = driver();
        let mut data = ResourceData::default().with_id("s:f:gone");

        let err = driver
            .read(&mut data, &OperationContext::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_malformed_identity() {
        let (fc, driver) = driver();
        let mut data = ResourceData::default().with_id("s:f");

        let err = driver
            .read(&mut data, &OperationContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::InvalidIdentity { expected: 3, actual: 2, .. }));
        assert_eq!(fc.calls.total(), 0);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (fc, driver) = driver();
        let mut data = ResourceData::default().with_id("s:f:gone");

        driver
            .delete(&mut data, &OperationContext::default())
            .await
            .unwrap();
        assert!(data.id().is_none());
        assert_eq!(fc.calls.count("delete_trigger"), 1);
    }

    #[tokio::test]
    async fn test_delete_propagates_unexpected_errors() {
        let (fc, driver) = driver();
        fc.fail_next("delete_trigger", ServiceError::new("Throttling", "slow down"));
        let mut data = ResourceData::default().with_id("s:f:t");

        let err = driver
            .delete(&mut data, &OperationContext::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "Throttling");
        assert!(data.id().is_some());
    }

    #[test]
    fn test_role_diff_suppressed_for_timer() {
        let timer = Record::new().with("type", "timer");
        let http = Record::new().with("type", "http");
        let role = schema().field("role").and_then(|f| f.diff_suppress).unwrap();
        assert!(role(&timer));
        assert!(!role(&http));
    }
}
