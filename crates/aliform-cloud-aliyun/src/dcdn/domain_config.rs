//! Edge function configuration of a DCDN domain (`aliyun_dcdn_domain_config`)
//!
//! Identity: `domain_name:function_name`.

use super::NOT_FOUND_CODES;
use super::types::{
    BatchSetDcdnDomainConfigsRequest, CERT_FUNCTION_ARGS, DcdnDomainConfig, DcdnFunction,
    DcdnFunctionArg, DeleteDcdnSpecificConfigRequest, DescribeDcdnDomainConfigsRequest,
};
use crate::client::{AliyunClient, DcdnApi};
use aliform_cloud::{
    CloudError, FieldSpec, Identity, OperationContext, Record, ResourceData, ResourceDriver,
    Result, ResultExt, Schema, Validator, Value, tolerate,
};
use async_trait::async_trait;
use std::sync::Arc;

pub const KIND: &str = "aliyun_dcdn_domain_config";

pub struct DcdnDomainConfigDriver {
    dcdn: Arc<dyn DcdnApi>,
    schema: Schema,
}

impl DcdnDomainConfigDriver {
    pub fn new(dcdn: Arc<dyn DcdnApi>) -> Self {
        Self {
            dcdn,
            schema: schema(),
        }
    }

    pub fn constructor(client: &AliyunClient) -> Arc<dyn ResourceDriver> {
        Arc::new(Self::new(Arc::clone(&client.dcdn)))
    }

    /// The configuration currently applied for `domain`/`function`, if any
    async fn describe(&self, domain: &str, function: &str) -> Result<Option<DcdnDomainConfig>> {
        let request = DescribeDcdnDomainConfigsRequest {
            domain_name: domain.to_string(),
            function_names: function.to_string(),
        };
        let configs = tolerate(
            self.dcdn.describe_dcdn_domain_configs(&request).await,
            NOT_FOUND_CODES,
        )?;
        Ok(configs.and_then(|configs| configs.into_iter().next()))
    }
}

fn schema() -> Schema {
    Schema::new(vec![
        FieldSpec::string("domain_name")
            .required()
            .force_new()
            .validate_with(Validator::StringLenBetween(5, 67))
            .validate_with(Validator::IdentityPart),
        FieldSpec::string("function_name")
            .required()
            .force_new()
            .validate_with(Validator::IdentityPart),
        FieldSpec::set(
            "function_args",
            Schema::new(vec![
                FieldSpec::string("arg_name").required().force_new(),
                FieldSpec::string("arg_value").required().force_new(),
            ]),
        )
        .required()
        .force_new(),
    ])
}

fn split_identity(id: &Identity) -> Result<(String, String)> {
    let [domain, function] = id.parts::<2>()?;
    Ok((domain, function))
}

#[async_trait]
impl ResourceDriver for DcdnDomainConfigDriver {
    fn kind(&self) -> &str {
        KIND
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn create(&self, data: &mut ResourceData, ctx: &OperationContext) -> Result<Identity> {
        let domain = data.require_str("domain_name")?.to_string();
        let function = data.require_str("function_name")?.to_string();
        let id = Identity::encode([&domain, &function])?;

        let function_args = data
            .get_records("function_args")
            .iter()
            .map(|arg| DcdnFunctionArg {
                arg_name: arg.get_str("arg_name").unwrap_or_default().to_string(),
                arg_value: arg.get_str("arg_value").unwrap_or_default().to_string(),
            })
            .collect();
        let functions = [DcdnFunction {
            function_args,
            function_name: function.clone(),
        }];
        let request = BatchSetDcdnDomainConfigsRequest {
            domain_names: domain.clone(),
            functions: serde_json::to_string(&functions)?,
        };

        tracing::info!("Setting {} on DCDN domain {}", function, domain);
        self.dcdn
            .batch_set_dcdn_domain_configs(&request)
            .await
            .context(format!("configuring {} on DCDN domain {}", function, domain))?;

        data.set_id(id.clone());
        self.read(data, ctx).await?;
        Ok(id)
    }

    /// Certificate arguments belong to the certificate resource and are skipped
    async fn read(&self, data: &mut ResourceData, _ctx: &OperationContext) -> Result<()> {
        let id = data.require_id()?.clone();
        let (domain, function) = split_identity(&id)?;

        let config = self
            .describe(&domain, &function)
            .await?
            .ok_or_else(|| CloudError::ResourceNotFound(id.to_string()))?;

        let args = config
            .function_args
            .into_iter()
            .filter(|arg| !CERT_FUNCTION_ARGS.contains(&arg.arg_name.as_str()))
            .map(|arg| {
                Record::new()
                    .with("arg_name", arg.arg_name)
                    .with("arg_value", arg.arg_value)
            });

        data.set("domain_name", domain);
        data.set("function_name", function);
        data.set("function_args", Value::set(args));
        Ok(())
    }

    async fn delete(&self, data: &mut ResourceData, _ctx: &OperationContext) -> Result<()> {
        let id = data.require_id()?.clone();
        let (domain, function) = split_identity(&id)?;

        let Some(config) = self
            .describe(&domain, &function)
            .await
            .context(format!("looking up {} on DCDN domain {}", function, domain))?
        else {
            tracing::debug!("DCDN config {} already absent", id);
            data.clear_id();
            return Ok(());
        };

        let request = DeleteDcdnSpecificConfigRequest {
            domain_name: domain.clone(),
            config_id: config.config_id,
        };
        tracing::info!("Deleting {} from DCDN domain {}", function, domain);
        tolerate(
            self.dcdn.delete_dcdn_specific_config(&request).await,
            NOT_FOUND_CODES,
        )
        .context(format!("deleting {} from DCDN domain {}", function, domain))?;

        data.clear_id();
        Ok(())
    }
}
