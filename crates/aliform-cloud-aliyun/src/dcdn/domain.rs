//! DCDN accelerated domain (`aliyun_dcdn_domain`)
//!
//! Identity: the domain name. Adding a domain only enqueues its activation,
//! so Create polls the domain detail until the status reaches `online`.

use super::NOT_FOUND_CODES;
use super::types::{
    AddDcdnDomainRequest, DcdnSource, FAILED_STATUSES, ModifyDcdnDomainSchdmRequest, SCOPES,
    SOURCE_PORTS, SOURCE_TYPES, STATUS_ONLINE, UpdateDcdnDomainRequest,
};
use crate::client::{AliyunClient, DcdnApi};
use aliform_cloud::{
    FieldSpec, Identity, OperationContext, PollOutcome, Record, ResourceData, ResourceDriver,
    Result, ResultExt, Schema, ServiceError, Timeouts, Validator, Value, not_found_or, tolerate,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub const KIND: &str = "aliyun_dcdn_domain";

const DEFAULT_SCOPE: &str = "domestic";
const DEFAULT_PORT: i64 = 80;
const DEFAULT_PRIORITY: &str = "20";
const DEFAULT_WEIGHT: &str = "10";

pub struct DcdnDomainDriver {
    dcdn: Arc<dyn DcdnApi>,
    schema: Schema,
}

impl DcdnDomainDriver {
    pub fn new(dcdn: Arc<dyn DcdnApi>) -> Self {
        Self {
            dcdn,
            schema: schema(),
        }
    }

    pub fn constructor(client: &AliyunClient) -> Arc<dyn ResourceDriver> {
        Arc::new(Self::new(Arc::clone(&client.dcdn)))
    }

    /// One activation status check
    async fn probe_activation(&self, domain: &str) -> PollOutcome {
        let detail = match self.dcdn.describe_dcdn_domain_detail(domain).await {
            Ok(detail) => detail,
            Err(err) => return PollOutcome::fatal(err),
        };

        let status = detail.domain_status.as_str();
        if status == STATUS_ONLINE {
            PollOutcome::Success
        } else if FAILED_STATUSES.contains(&status) {
            PollOutcome::fatal(ServiceError::new(
                "DomainActivationFailed",
                format!("domain {} entered status {}", domain, status),
            ))
        } else {
            PollOutcome::retry(format!("domain {} is {}", domain, status))
        }
    }
}

fn source_schema() -> Schema {
    Schema::new(vec![
        FieldSpec::string("content").required(),
        FieldSpec::int("port")
            .default_value(DEFAULT_PORT)
            .validate_with(Validator::IntInSlice(SOURCE_PORTS)),
        FieldSpec::string("priority").default_value(DEFAULT_PRIORITY),
        FieldSpec::string("type")
            .required()
            .validate_with(Validator::StringInSlice(SOURCE_TYPES)),
        FieldSpec::string("weight").default_value(DEFAULT_WEIGHT),
    ])
}

fn schema() -> Schema {
    Schema::new(vec![
        FieldSpec::string("resource_group_id").optional().computed(),
        FieldSpec::string("domain_name").required().force_new(),
        FieldSpec::string("scope")
            .default_value(DEFAULT_SCOPE)
            .validate_with(Validator::StringInSlice(SCOPES)),
        FieldSpec::string("cname").computed(),
        FieldSpec::set("sources", source_schema()).required(),
    ])
}

/// Origin records as the JSON document the API expects
fn sources_json(records: &[Record]) -> Result<String> {
    let sources: Vec<DcdnSource> = records
        .iter()
        .map(|record| DcdnSource {
            content: record.get_str("content").unwrap_or_default().to_string(),
            port: record.get_int("port").unwrap_or(DEFAULT_PORT),
            priority: record.get_str("priority").unwrap_or(DEFAULT_PRIORITY).to_string(),
            source_type: record.get_str("type").unwrap_or_default().to_string(),
            weight: record.get_str("weight").unwrap_or(DEFAULT_WEIGHT).to_string(),
        })
        .collect();
    Ok(serde_json::to_string(&sources)?)
}

fn sources_value(sources: Vec<DcdnSource>) -> Value {
    Value::set(sources.into_iter().map(|source| {
        Record::new()
            .with("content", source.content)
            .with("port", source.port)
            .with("priority", source.priority)
            .with("type", source.source_type)
            .with("weight", source.weight)
    }))
}

#[async_trait]
impl ResourceDriver for DcdnDomainDriver {
    fn kind(&self) -> &str {
        KIND
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::uniform(Duration::from_secs(30 * 60))
    }

    async fn create(&self, data: &mut ResourceData, ctx: &OperationContext) -> Result<Identity> {
        let domain = data.require_str("domain_name")?.to_string();
        let request = AddDcdnDomainRequest {
            domain_name: domain.clone(),
            scope: data.get_str_nonempty("scope").map(str::to_string),
            resource_group_id: data.get_str_nonempty("resource_group_id").map(str::to_string),
            sources: sources_json(data.get_records("sources"))?,
        };

        tracing::info!("Adding DCDN domain {}", domain);
        self.dcdn
            .add_dcdn_domain(&request)
            .await
            .context(format!("adding DCDN domain {}", domain))?;

        let timeout = ctx.timeouts_for(self).create;
        ctx.converger
            .converge(&ctx.cancel, timeout, || self.probe_activation(&domain))
            .await
            .context(format!("waiting for DCDN domain {} to come online", domain))?;

        let id = Identity::new(domain);
        data.set_id(id.clone());
        self.read(data, ctx).await?;
        Ok(id)
    }

    async fn read(&self, data: &mut ResourceData, _ctx: &OperationContext) -> Result<()> {
        let id = data.require_id()?.clone();
        let detail = self
            .dcdn
            .describe_dcdn_domain_detail(id.as_str())
            .await
            .map_err(|e| not_found_or(e, NOT_FOUND_CODES, id.as_str()))?;

        data.set("domain_name", id.as_str());
        data.set("resource_group_id", detail.resource_group_id);
        data.set("scope", detail.scope);
        data.set("cname", detail.cname);
        data.set("sources", sources_value(detail.sources));
        Ok(())
    }

    /// Scope and origin changes go through separate calls
    ///
    /// A failure in the second call leaves the first one applied.
    async fn update(&self, data: &mut ResourceData, ctx: &OperationContext) -> Result<()> {
        let id = data.require_id()?.clone();

        if data.has_change("scope") {
            let scope = data.get_str("scope").unwrap_or(DEFAULT_SCOPE);
            let request = ModifyDcdnDomainSchdmRequest {
                domain_name: id.to_string(),
                property: serde_json::json!({ "coverage": scope }).to_string(),
            };
            tracing::info!("Changing scope of DCDN domain {} to {}", id, scope);
            self.dcdn
                .modify_dcdn_domain_schdm_by_property(&request)
                .await
                .context(format!("changing scope of DCDN domain {}", id))?;
        }

        let mut request = UpdateDcdnDomainRequest {
            domain_name: id.to_string(),
            ..Default::default()
        };
        if data.has_change("resource_group_id") {
            request.resource_group_id =
                Some(data.get_str("resource_group_id").unwrap_or_default().to_string());
        }
        if data.has_change("sources") {
            request.sources = Some(sources_json(data.get_records("sources"))?);
        }
        if request.resource_group_id.is_some() || request.sources.is_some() {
            tracing::info!("Updating DCDN domain {}", id);
            self.dcdn
                .update_dcdn_domain(&request)
                .await
                .context(format!("updating DCDN domain {}", id))?;
        }

        self.read(data, ctx).await
    }

    async fn delete(&self, data: &mut ResourceData, _ctx: &OperationContext) -> Result<()> {
        let id = data.require_id()?.clone();

        tracing::info!("Deleting DCDN domain {}", id);
        tolerate(self.dcdn.delete_dcdn_domain(id.as_str()).await, NOT_FOUND_CODES)
            .context(format!("deleting DCDN domain {}", id))?;

        data.clear_id();
        Ok(())
    }
}
