//! Function Compute service version (`aliyun_fc_version`)
//!
//! Identity: the published version id. The owning service is read back from
//! the stored `service_name` field.

use super::types::{ListServiceVersionsRequest, PublishServiceVersionRequest, ServiceVersionKey};
use crate::client::{AliyunClient, FcApi};
use aliform_cloud::{
    CloudError, FieldSpec, Identity, OperationContext, ResourceData, ResourceDriver, Result,
    ResultExt, Schema, not_found_or, tolerate,
};
use async_trait::async_trait;
use std::sync::Arc;

pub const KIND: &str = "aliyun_fc_version";

const NOT_FOUND_CODES: &[&str] = &["ServiceNotFound", "VersionNotFound", "\"HttpStatus\": 404,"];

pub struct FcVersionDriver {
    fc: Arc<dyn FcApi>,
    schema: Schema,
}

impl FcVersionDriver {
    pub fn new(fc: Arc<dyn FcApi>) -> Self {
        Self {
            fc,
            schema: Schema::new(vec![
                FieldSpec::string("service_name").required().force_new(),
                FieldSpec::string("description").force_new(),
            ]),
        }
    }

    pub fn constructor(client: &AliyunClient) -> Arc<dyn ResourceDriver> {
        Arc::new(Self::new(Arc::clone(&client.fc)))
    }
}

#[async_trait]
impl ResourceDriver for FcVersionDriver {
    fn kind(&self) -> &str {
        KIND
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn create(&self, data: &mut ResourceData, ctx: &OperationContext) -> Result<Identity> {
        let request = PublishServiceVersionRequest {
            service_name: data.require_str("service_name")?.to_string(),
            description: data.get_str_nonempty("description").map(str::to_string),
        };

        tracing::info!("Publishing version of FC service {}", request.service_name);
        let version = self
            .fc
            .publish_service_version(&request)
            .await
            .context(format!("publishing version of {}", request.service_name))?;

        let id = Identity::new(version.version_id);
        data.set_id(id.clone());
        self.read(data, ctx).await?;
        Ok(id)
    }

    /// Targeted lookup: the page starting at the id must hold exactly that version
    async fn read(&self, data: &mut ResourceData, _ctx: &OperationContext) -> Result<()> {
        let id = data.require_id()?.clone();
        let request = ListServiceVersionsRequest {
            service_name: data.require_str("service_name")?.to_string(),
            start_key: Some(id.to_string()),
            limit: Some(1),
        };

        let page = self
            .fc
            .list_service_versions(&request)
            .await
            .map_err(|e| not_found_or(e, NOT_FOUND_CODES, id.as_str()))?;

        let version = match page.versions.as_slice() {
            [version] if version.version_id == id.as_str() => version,
            [] | [_] => return Err(CloudError::ResourceNotFound(id.to_string())),
            versions => {
                return Err(CloudError::Transport(format!(
                    "version lookup for {} returned {} results",
                    id,
                    versions.len()
                )));
            }
        };

        data.set("description", version.description.clone());
        Ok(())
    }

    async fn delete(&self, data: &mut ResourceData, _ctx: &OperationContext) -> Result<()> {
        let id = data.require_id()?.clone();
        let key = ServiceVersionKey {
            service_name: data.require_str("service_name")?.to_string(),
            version_id: id.to_string(),
        };

        tracing::info!("Deleting version {} of FC service {}", id, key.service_name);
        tolerate(self.fc.delete_service_version(&key).await, NOT_FOUND_CODES)
            .context(format!("deleting FC version {}", id))?;

        data.clear_id();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fc::types::{ListServiceVersionsResponse, VersionInfo};
    use crate::testing::StubFc;
    use aliform_cloud::{Record, ServiceError};

    fn driver() -> (Arc<StubFc>, FcVersionDriver) {
        let fc = Arc::new(StubFc::new());
        (fc.clone(), FcVersionDriver::new(fc))
    }

    fn desired(description: &str) -> ResourceData {
        ResourceData::new(
            Record::new()
                .with("service_name", "svc")
                .with("description", description),
        )
    }

    #[tokio::test]
    async fn test_publish_passes_description() {
        let (fc, driver) = driver();
        let mut data = desired("first cut");

        let id = driver.create(&mut data, &OperationContext::default()).await.unwrap();

        assert_eq!(id.as_str(), "1");
        assert_eq!(fc.versions("svc")[0].description, "first cut");
        assert_eq!(data.get_str("description"), Some("first cut"));
    }

    #[tokio::test]
    async fn test_lookup_landing_on_another_version_is_not_found() {
        let (_, driver) = driver();
        let ctx = OperationContext::default();
        let mut first = desired("one");
        let mut second = desired("two");
        driver.create(&mut first, &ctx).await.unwrap();
        driver.create(&mut second, &ctx).await.unwrap();

        driver.delete(&mut first.clone(), &ctx).await.unwrap();

        // The page starting at "1" now begins with version "2"
        let err = driver.read(&mut first, &ctx).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(driver.read(&mut second, &ctx).await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_page_is_not_found() {
        let (fc, driver) = driver();
        fc.script_versions_page(ListServiceVersionsResponse::default());
        let mut data = desired("x").with_id("7");

        let err = driver
            .read(&mut data, &OperationContext::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_ambiguous_page_is_fatal() {
        let (fc, driver) = driver();
        let version = |id: &str| VersionInfo {
            version_id: id.to_string(),
            ..Default::default()
        };
        fc.script_versions_page(ListServiceVersionsResponse {
            versions: vec![version("7"), version("8")],
            next_token: None,
        });
        let mut data = desired("x").with_id("7");

        let err = driver
            .read(&mut data, &OperationContext::default())
            .await
            .unwrap_err();
        assert!(!err.is_not_found());
        assert_eq!(err.code(), "TransportOrProtocolError");
    }

    #[tokio::test]
    async fn test_delete_tolerates_http_404_text() {
        let (fc, driver) = driver();
        fc.fail_next(
            "delete_service_version",
            ServiceError::new("Unknown", "{\"HttpStatus\": 404, \"ErrorCode\": \"\"}"),
        );
        let mut data = desired("x").with_id("3");

        driver
            .delete(&mut data, &OperationContext::default())
            .await
            .unwrap();
        assert!(data.id().is_none());
    }
}
