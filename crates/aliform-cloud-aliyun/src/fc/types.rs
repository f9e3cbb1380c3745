//! Function Compute request and response shapes

use serde::{Deserialize, Serialize};

/// Trigger types accepted by Function Compute
pub const TRIGGER_TYPES: &[&str] = &["http", "log", "oss", "timer", "mns_topic", "cdn_events"];

pub const TRIGGER_TYPE_TIMER: &str = "timer";
pub const TRIGGER_TYPE_MNS_TOPIC: &str = "mns_topic";

/// Coordinates of a trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerKey {
    pub service_name: String,
    pub function_name: String,
    pub trigger_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTriggerRequest {
    pub service_name: String,
    pub function_name: String,
    pub trigger_name: String,
    pub trigger_type: String,
    pub invocation_role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_arn: Option<String>,
    /// Trigger-type specific configuration document
    pub trigger_config: serde_json::Value,
    pub qualifier: String,
}

/// Partial update; only populated members are sent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTriggerRequest {
    pub service_name: String,
    pub function_name: String,
    pub trigger_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invocation_role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_config: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
}

impl UpdateTriggerRequest {
    pub fn new(key: &TriggerKey) -> Self {
        Self {
            service_name: key.service_name.clone(),
            function_name: key.function_name.clone(),
            trigger_name: key.trigger_name.clone(),
            ..Default::default()
        }
    }

    /// True when no member would be sent
    pub fn is_empty(&self) -> bool {
        self.invocation_role.is_none() && self.trigger_config.is_none() && self.qualifier.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerInfo {
    pub trigger_id: String,
    pub trigger_name: String,
    pub trigger_type: String,
    #[serde(default)]
    pub invocation_role: String,
    #[serde(default)]
    pub source_arn: String,
    #[serde(default)]
    pub trigger_config: serde_json::Value,
    #[serde(default)]
    pub qualifier: String,
    #[serde(default)]
    pub created_time: String,
    #[serde(default)]
    pub last_modified_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishServiceVersionRequest {
    pub service_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub version_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_time: String,
    #[serde(default)]
    pub last_modified_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListServiceVersionsRequest {
    pub service_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListServiceVersionsResponse {
    #[serde(default)]
    pub versions: Vec<VersionInfo>,
    #[serde(default)]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceVersionKey {
    pub service_name: String,
    pub version_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_omits_unchanged_members() {
        let key = TriggerKey {
            service_name: "svc".to_string(),
            function_name: "fn".to_string(),
            trigger_name: "t".to_string(),
        };
        let mut request = UpdateTriggerRequest::new(&key);
        assert!(request.is_empty());

        request.qualifier = Some("prod".to_string());
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["qualifier"], "prod");
        assert!(json.get("invocationRole").is_none());
        assert!(json.get("triggerConfig").is_none());
    }

    #[test]
    fn test_trigger_info_tolerates_missing_members() {
        let info: TriggerInfo = serde_json::from_str(
            r#"{"triggerId":"abc","triggerName":"t","triggerType":"timer"}"#,
        )
        .unwrap();
        assert_eq!(info.trigger_id, "abc");
        assert!(info.invocation_role.is_empty());
        assert!(info.trigger_config.is_null());
    }
}
