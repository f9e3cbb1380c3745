//! Registry login password of the provider account (`aliyun_cr_user_info`)

use super::{password_request, random_identity};
use crate::client::{AliyunClient, CrApi};
use aliform_cloud::{
    FieldSpec, Identity, OperationContext, ResourceData, ResourceDriver, Result, ResultExt, Schema,
};
use async_trait::async_trait;
use std::sync::Arc;

pub const KIND: &str = "aliyun_cr_user_info";

pub struct CrUserInfoDriver {
    cr: Arc<dyn CrApi>,
    schema: Schema,
}

impl CrUserInfoDriver {
    pub fn new(cr: Arc<dyn CrApi>) -> Self {
        Self {
            cr,
            schema: Schema::new(vec![FieldSpec::string("password").required().sensitive()]),
        }
    }

    pub fn constructor(client: &AliyunClient) -> Arc<dyn ResourceDriver> {
        Arc::new(Self::new(Arc::clone(&client.cr)))
    }
}

#[async_trait]
impl ResourceDriver for CrUserInfoDriver {
    fn kind(&self) -> &str {
        KIND
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn create(&self, data: &mut ResourceData, _ctx: &OperationContext) -> Result<Identity> {
        let request = password_request(data)?;

        tracing::info!("Setting registry login password");
        self.cr
            .create_user_info(&request)
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

        let request = password_request(data)?;
        tracing::info!("Updating registry login password");
        self.cr
            .update_user_info(&request)
            .await
            .context("updating registry user info")?;
        Ok(())
    }

    /// The registry has no delete call; forgetting the identity is enough
    async fn delete(&self, data: &mut ResourceData, _ctx: &OperationContext) -> Result<()> {
        data.clear_id();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubCr;
    use aliform_cloud::{Diagnostics, Record, ServiceError};

    fn driver() -> (Arc<StubCr>, CrUserInfoDriver) {
        let cr = Arc::new(StubCr::new());
        (cr.clone(), CrUserInfoDriver::new(cr))
    }

    #[tokio::test]
    async fn test_create_sends_password_and_assigns_numeric_id() {
        let (cr, driver) = driver();
        let mut data = ResourceData::new(Record::new().with("password", "Secr3t!"));

        let id = driver.create(&mut data, &OperationContext::default()).await.unwrap();

        assert!(id.as_str().parse::<i64>().is_ok());
        assert_eq!(cr.passwords(), vec!["Secr3t!".to_string()]);
    }

    #[tokio::test]
    async fn test_update_only_on_password_change() {
        let (cr, driver) = driver();
        let ctx = OperationContext::default();
        let record = Record::new().with("password", "next");

        let mut unchanged = ResourceData::new(record.clone()).with_id("1");
        driver.update(&mut unchanged, &ctx).await.unwrap();
        assert_eq!(cr.calls.count("update_user_info"), 0);

        let mut changed = ResourceData::new(record).with_id("1").with_changes(["password"]);
        driver.update(&mut changed, &ctx).await.unwrap();
        assert_eq!(cr.calls.count("update_user_info"), 1);
    }

    #[tokio::test]
    async fn test_delete_is_local() {
        let (cr, driver) = driver();
        let mut data = ResourceData::default().with_id("42");

        driver
            .delete(&mut data, &OperationContext::default())
            .await
            .unwrap();
        assert!(data.id().is_none());
        assert_eq!(cr.calls.total(), 0);
    }

    #[tokio::test]
    async fn test_failure_diagnostics_hide_password() {
        let (cr, driver) = driver();
        cr.fail_next(
            "create_user_info",
            ServiceError::new("PasswordInvalid", "password Secr3t! is too weak"),
        );
        let record = Record::new().with("password", "Secr3t!");
        let mut data = ResourceData::new(record.clone());

        let result = driver.create(&mut data, &OperationContext::default()).await;
        let mut diags = Diagnostics::from_result(&result);
        diags.redact(&driver.schema().sensitive_values(&record));

        let text = diags.iter().map(|d| d.to_string()).collect::<String>();
        assert!(text.contains("PasswordInvalid"));
        assert!(!text.contains("Secr3t!"));
        assert!(data.id().is_none());
    }
}
