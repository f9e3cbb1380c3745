//! DCDN request and response shapes

use serde::{Deserialize, Serialize};

/// Domain status reported once activation finished
pub const STATUS_ONLINE: &str = "online";

/// Domain statuses that never progress to online
pub const FAILED_STATUSES: &[&str] = &["configure_failed", "check_failed", "offline"];

pub const SCOPES: &[&str] = &["domestic", "global", "overseas"];
pub const SOURCE_TYPES: &[&str] = &["ipaddr", "domain", "oss"];
pub const SOURCE_PORTS: &[i64] = &[443, 80];
pub const CERT_TYPES: &[&str] = &["cas", "free", "upload"];

/// Function arguments owned by the certificate resource, never by a domain config
pub const CERT_FUNCTION_ARGS: &[&str] = &[
    "cert",
    "cert_id",
    "cert_name",
    "cert_type",
    "dkey",
    "pkey",
    "https",
];

/// Origin server entry, serialized as `{"Content","Port","Priority","Type","Weight"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DcdnSource {
    pub content: String,
    pub port: i64,
    pub priority: String,
    #[serde(rename = "Type")]
    pub source_type: String,
    pub weight: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddDcdnDomainRequest {
    pub domain_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_group_id: Option<String>,
    /// JSON array of [`DcdnSource`]
    pub sources: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DcdnDomainDetail {
    pub domain_name: String,
    pub domain_status: String,
    #[serde(default)]
    pub cname: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub resource_group_id: String,
    #[serde(default)]
    pub sources: Vec<DcdnSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModifyDcdnDomainSchdmRequest {
    pub domain_name: String,
    /// JSON document, e.g. `{"coverage":"global"}`
    pub property: String,
}

/// Partial update; only populated members are sent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateDcdnDomainRequest {
    pub domain_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SetDcdnDomainCertificateRequest {
    pub domain_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_type: Option<String>,
    #[serde(rename = "SSLProtocol")]
    pub ssl_protocol: String,
    #[serde(rename = "SSLPub", skip_serializing_if = "Option::is_none")]
    pub ssl_pub: Option<String>,
    #[serde(rename = "SSLPri", skip_serializing_if = "Option::is_none")]
    pub ssl_pri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_set: Option<String>,
}

impl std::fmt::Debug for SetDcdnDomainCertificateRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetDcdnDomainCertificateRequest")
            .field("domain_name", &self.domain_name)
            .field("cert_name", &self.cert_name)
            .field("cert_type", &self.cert_type)
            .field("ssl_protocol", &self.ssl_protocol)
            .field("ssl_pri", &self.ssl_pri.as_ref().map(|_| "<sensitive>"))
            .field("force_set", &self.force_set)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DcdnCertInfo {
    pub domain_name: String,
    #[serde(default)]
    pub cert_name: String,
    #[serde(default)]
    pub cert_type: String,
    #[serde(rename = "SSLPub", default)]
    pub ssl_pub: String,
    #[serde(rename = "SSLProtocol", default)]
    pub ssl_protocol: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchSetDcdnDomainConfigsRequest {
    /// Comma separated domain names
    pub domain_names: String,
    /// JSON array of [`DcdnFunction`]
    pub functions: String,
}

/// Edge function entry, serialized as `{"functionArgs":[..],"functionName":..}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DcdnFunction {
    pub function_args: Vec<DcdnFunctionArg>,
    pub function_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DcdnFunctionArg {
    pub arg_name: String,
    pub arg_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeDcdnDomainConfigsRequest {
    pub domain_name: String,
    /// Comma separated function names
    pub function_names: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DcdnDomainConfig {
    pub config_id: String,
    pub function_name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub function_args: Vec<DcdnFunctionArg>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteDcdnSpecificConfigRequest {
    pub domain_name: String,
    pub config_id: String,
}
