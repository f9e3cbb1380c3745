//! Control-plane client handles
//!
//! One trait per API family. Each method takes a typed request and returns a
//! typed response, or a [`CloudError`](aliform_cloud::CloudError) whose
//! service code the drivers classify. Implementations are pre-authenticated
//! and hold no per-call mutable state, so one handle serves concurrent
//! driver operations.

use crate::cr::types::{CrCredentials, UserInfoRequest};
use crate::dcdn::types::{
    AddDcdnDomainRequest, BatchSetDcdnDomainConfigsRequest, DcdnCertInfo, DcdnDomainConfig,
    DcdnDomainDetail, DeleteDcdnSpecificConfigRequest, DescribeDcdnDomainConfigsRequest,
    ModifyDcdnDomainSchdmRequest, SetDcdnDomainCertificateRequest, UpdateDcdnDomainRequest,
};
use crate::fc::types::{
    CreateTriggerRequest, ListServiceVersionsRequest, ListServiceVersionsResponse,
    PublishServiceVersionRequest, ServiceVersionKey, TriggerInfo, TriggerKey,
    UpdateTriggerRequest, VersionInfo,
};
use aliform_cloud::Result;
use aliform_config::ProviderConfig;
use async_trait::async_trait;
use std::sync::Arc;

/// Function Compute (API version 2016-08-15)
#[async_trait]
pub trait FcApi: Send + Sync {
    async fn create_trigger(&self, request: &CreateTriggerRequest) -> Result<TriggerInfo>;

    async fn get_trigger(&self, key: &TriggerKey) -> Result<TriggerInfo>;

    async fn update_trigger(&self, request: &UpdateTriggerRequest) -> Result<TriggerInfo>;

    async fn delete_trigger(&self, key: &TriggerKey) -> Result<()>;

    async fn publish_service_version(
        &self,
        request: &PublishServiceVersionRequest,
    ) -> Result<VersionInfo>;

    async fn list_service_versions(
        &self,
        request: &ListServiceVersionsRequest,
    ) -> Result<ListServiceVersionsResponse>;

    async fn delete_service_version(&self, key: &ServiceVersionKey) -> Result<()>;
}

/// Container Registry
#[async_trait]
pub trait CrApi: Send + Sync {
    async fn create_user_info(&self, request: &UserInfoRequest) -> Result<()>;

    async fn update_user_info(&self, request: &UserInfoRequest) -> Result<()>;
}

/// Builds registry clients for credentials other than the provider's own
pub trait CrClientFactory: Send + Sync {
    fn cr_client(&self, credentials: &CrCredentials) -> Result<Arc<dyn CrApi>>;
}

/// Dynamic Content Delivery Network
#[async_trait]
pub trait DcdnApi: Send + Sync {
    async fn add_dcdn_domain(&self, request: &AddDcdnDomainRequest) -> Result<()>;

    async fn describe_dcdn_domain_detail(&self, domain_name: &str) -> Result<DcdnDomainDetail>;

    async fn modify_dcdn_domain_schdm_by_property(
        &self,
        request: &ModifyDcdnDomainSchdmRequest,
    ) -> Result<()>;

    async fn update_dcdn_domain(&self, request: &UpdateDcdnDomainRequest) -> Result<()>;

    async fn delete_dcdn_domain(&self, domain_name: &str) -> Result<()>;

    async fn set_dcdn_domain_certificate(
        &self,
        request: &SetDcdnDomainCertificateRequest,
    ) -> Result<()>;

    async fn describe_dcdn_domain_certificate_info(
        &self,
        domain_name: &str,
    ) -> Result<Vec<DcdnCertInfo>>;

    async fn batch_set_dcdn_domain_configs(
        &self,
        request: &BatchSetDcdnDomainConfigsRequest,
    ) -> Result<()>;

    async fn describe_dcdn_domain_configs(
        &self,
        request: &DescribeDcdnDomainConfigsRequest,
    ) -> Result<Vec<DcdnDomainConfig>>;

    async fn delete_dcdn_specific_config(
        &self,
        request: &DeleteDcdnSpecificConfigRequest,
    ) -> Result<()>;
}

/// Shared handle passed to every driver constructor
#[derive(Clone)]
pub struct AliyunClient {
    region: String,
    pub fc: Arc<dyn FcApi>,
    pub cr: Arc<dyn CrApi>,
    pub cr_factory: Arc<dyn CrClientFactory>,
    pub dcdn: Arc<dyn DcdnApi>,
}

impl AliyunClient {
    pub fn new(
        config: &ProviderConfig,
        fc: Arc<dyn FcApi>,
        cr: Arc<dyn CrApi>,
        cr_factory: Arc<dyn CrClientFactory>,
        dcdn: Arc<dyn DcdnApi>,
    ) -> Self {
        tracing::debug!(
            "Aliyun client for region {} (FC endpoint {})",
            config.region,
            config.fc_endpoint()
        );
        Self {
            region: config.region.clone(),
            fc,
            cr,
            cr_factory,
            dcdn,
        }
    }

    /// Region the provider handles were built for
    pub fn region(&self) -> &str {
        &self.region
    }
}

impl std::fmt::Debug for AliyunClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AliyunClient")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}
