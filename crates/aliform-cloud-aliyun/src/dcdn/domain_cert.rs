//! HTTPS certificate of a DCDN domain (`aliyun_dcdn_domain_cert`)
//!
//! Identity: the domain name. Every field forces replacement; deleting the
//! resource switches HTTPS off for the domain.

use super::NOT_FOUND_CODES;
use super::types::{CERT_TYPES, SetDcdnDomainCertificateRequest};
use crate::client::{AliyunClient, DcdnApi};
use aliform_cloud::{
    CloudError, FieldSpec, Identity, OperationContext, ResourceData, ResourceDriver, Result,
    ResultExt, Schema, Validator, not_found_or, tolerate,
};
use async_trait::async_trait;
use std::sync::Arc;

pub const KIND: &str = "aliyun_dcdn_domain_cert";

const SSL_ON: &str = "on";
const SSL_OFF: &str = "off";

pub struct DcdnDomainCertDriver {
    dcdn: Arc<dyn DcdnApi>,
    schema: Schema,
}

impl DcdnDomainCertDriver {
    pub fn new(dcdn: Arc<dyn DcdnApi>) -> Self {
        Self {
            dcdn,
            schema: Schema::new(vec![
                FieldSpec::string("domain_name").required().force_new(),
                FieldSpec::string("cert_name").required().force_new(),
                FieldSpec::string("cert_type")
                    .required()
                    .force_new()
                    .validate_with(Validator::StringInSlice(CERT_TYPES)),
                FieldSpec::string("ssl_pri").optional().force_new().sensitive(),
                FieldSpec::string("ssl_pub").optional().force_new(),
            ]),
        }
    }

    pub fn constructor(client: &AliyunClient) -> Arc<dyn ResourceDriver> {
        Arc::new(Self::new(Arc::clone(&client.dcdn)))
    }
}

#[async_trait]
impl ResourceDriver for DcdnDomainCertDriver {
    fn kind(&self) -> &str {
        KIND
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn create(&self, data: &mut ResourceData, ctx: &OperationContext) -> Result<Identity> {
        let domain = data.require_str("domain_name")?.to_string();
        let request = SetDcdnDomainCertificateRequest {
            domain_name: domain.clone(),
            cert_name: Some(data.require_str("cert_name")?.to_string()),
            cert_type: Some(data.require_str("cert_type")?.to_string()),
            ssl_protocol: SSL_ON.to_string(),
            ssl_pub: data.get_str_nonempty("ssl_pub").map(str::to_string),
            ssl_pri: data.get_str_nonempty("ssl_pri").map(str::to_string),
            force_set: Some("1".to_string()),
        };

        tracing::info!("Installing certificate on DCDN domain {}", domain);
        self.dcdn
            .set_dcdn_domain_certificate(&request)
            .await
            .context(format!("setting certificate of DCDN domain {}", domain))?;

        let id = Identity::new(domain);
        data.set_id(id.clone());
        self.read(data, ctx).await?;
        Ok(id)
    }

    /// The private key is never returned and stays as configured
    async fn read(&self, data: &mut ResourceData, _ctx: &OperationContext) -> Result<()> {
        let id = data.require_id()?.clone();
        let infos = self
            .dcdn
            .describe_dcdn_domain_certificate_info(id.as_str())
            .await
            .map_err(|e| not_found_or(e, NOT_FOUND_CODES, id.as_str()))?;

        let info = infos
            .into_iter()
            .next()
            .ok_or_else(|| CloudError::ResourceNotFound(id.to_string()))?;

        data.set("domain_name", id.as_str());
        data.set("cert_name", info.cert_name);
        data.set("cert_type", info.cert_type);
        data.set("ssl_pub", info.ssl_pub);
        Ok(())
    }

    async fn delete(&self, data: &mut ResourceData, _ctx: &OperationContext) -> Result<()> {
        let id = data.require_id()?.clone();
        let request = SetDcdnDomainCertificateRequest {
            domain_name: id.to_string(),
            cert_name: None,
            cert_type: None,
            ssl_protocol: SSL_OFF.to_string(),
            ssl_pub: None,
            ssl_pri: None,
            force_set: None,
        };

        tracing::info!("Disabling HTTPS on DCDN domain {}", id);
        tolerate(
            self.dcdn.set_dcdn_domain_certificate(&request).await,
            NOT_FOUND_CODES,
        )
        .context(format!("removing certificate of DCDN domain {}", id))?;

        data.clear_id();
        Ok(())
    }
}
