//! Registry login password of another account (`aliyun_cr_user_info_auth`)
//!
//! The registry client is built per call from the record's own access key,
//! secret key and region.

use super::types::CrCredentials;
use super::{password_request, random_identity};
use crate::client::{AliyunClient, CrApi, CrClientFactory};
use aliform_cloud::{
    FieldSpec, Identity, OperationContext, ResourceData, ResourceDriver, Result, ResultExt, Schema,
};
use async_trait::async_trait;
use std::sync::Arc;

pub const KIND: &str = "aliyun_cr_user_info_auth";

pub struct CrUserInfoAuthDriver {
    factory: Arc<dyn CrClientFactory>,
    schema: Schema,
}

impl CrUserInfoAuthDriver {
    pub fn new(factory: Arc<dyn CrClientFactory>) -> Self {
        Self {
            factory,
            schema: Schema::new(vec![
                FieldSpec::string("password").required().sensitive(),
                FieldSpec::string("access_key").required().force_new().sensitive(),
                FieldSpec::string("secret_key").required().force_new().sensitive(),
                FieldSpec::string("region").required().force_new(),
            ]),
        }
    }

    pub fn constructor(client: &AliyunClient) -> Arc<dyn ResourceDriver> {
        Arc::new(Self::new(Arc::clone(&client.cr_factory)))
    }

    fn client_for(&self, data: &ResourceData) -> Result<Arc<dyn CrApi>> {
        let credentials = CrCredentials {
            region: data.require_str("region")?.to_string(),
            access_key: data.require_str("access_key")?.to_string(),
            secret_key: data.require_str("secret_key")?.to_string(),
        };
        self.factory
            .cr_client(&credentials)
            .context(format!("building registry client for {}", credentials.region))
    }
}

#[async_trait]
impl ResourceDriver for CrUserInfoAuthDriver {
    fn kind(&self) -> &str {
        KIND
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn create(&self, data: &mut ResourceData, _ctx: &OperationContext) -> Result<Identity> {
        let cr = self.client_for(data)?;
        let request = password_request(data)?;

        tracing::info!("Setting registry login password for delegated account");
        cr.create_user_info(&request)
            .await
            .context("creating registry user info")?;

        let id = random_identity();
        data.set_id(id.clone());
        Ok(id)
    }

    async fn read(&self, _data: &mut ResourceData, _ctx: &OperationContext) -> Result<()> {
        Ok(())
    }

    async fn update(&self, data: &mut ResourceData, _ctx: &OperationContext) -> Result<()> {
        if !data.has_change("password") {
            return Ok(());
        }

        let cr = self.client_for(data)?;
        let request = password_request(data)?;
        tracing::info!("Updating registry login password for delegated account");
        cr.update_user_info(&request)
            .await
            .context("updating registry user info")?;
        Ok(())
    }

    async fn delete(&self, data: &mut ResourceData, _ctx: &OperationContext) -> Result<()> {
        data.clear_id();
        Ok(())
    }
}
