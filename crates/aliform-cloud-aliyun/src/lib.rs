//! Alibaba Cloud drivers for aliform
//!
//! This crate implements [`ResourceDriver`](aliform_cloud::ResourceDriver)
//! for seven Alibaba Cloud object kinds:
//!
//! | Kind | API |
//! |------|-----|
//! | `aliyun_fc_trigger` | Function Compute |
//! | `aliyun_fc_version` | Function Compute |
//! | `aliyun_cr_user_info` | Container Registry |
//! | `aliyun_cr_user_info_auth` | Container Registry (per-record credentials) |
//! | `aliyun_dcdn_domain` | DCDN |
//! | `aliyun_dcdn_domain_cert` | DCDN |
//! | `aliyun_dcdn_domain_config` | DCDN |
//!
//! Drivers talk to the control plane through the API traits in [`client`];
//! the embedding process supplies authenticated implementations.
//!
//! # Example
//!
//! ```ignore
//! use aliform_cloud::{OperationContext, Reconciler, StateManager};
//! use aliform_cloud_aliyun::{AliyunClient, drivers, resource_set};
//! use aliform_config::{Manifest, ProviderConfig};
//!
//! let config = ProviderConfig::resolve(None)?;
//! let client = AliyunClient::new(&config, fc, cr, cr_factory, dcdn);
//!
//! let manifest = Manifest::load_from_dir(&project_root)?;
//! let reconciler = Reconciler::new(drivers(&client), StateManager::new(&project_root));
//! let result = reconciler.run(&resource_set(&manifest)).await?;
//! ```

pub mod client;
pub mod cr;
pub mod dcdn;
pub mod fc;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use client::{AliyunClient, CrApi, CrClientFactory, DcdnApi, FcApi};
pub use cr::{CrUserInfoAuthDriver, CrUserInfoDriver};
pub use dcdn::{DcdnDomainCertDriver, DcdnDomainConfigDriver, DcdnDomainDriver};
pub use fc::{FcTriggerDriver, FcVersionDriver};

use aliform_cloud::{DriverRegistry, DriverSet, ResourceConfig, ResourceSet};
use aliform_config::Manifest;

/// Every kind this provider manages
pub fn registry() -> DriverRegistry<AliyunClient> {
    DriverRegistry::new()
        .with(fc::trigger::KIND, FcTriggerDriver::constructor)
        .with(fc::version::KIND, FcVersionDriver::constructor)
        .with(cr::user_info::KIND, CrUserInfoDriver::constructor)
        .with(cr::user_info_auth::KIND, CrUserInfoAuthDriver::constructor)
        .with(dcdn::domain::KIND, DcdnDomainDriver::constructor)
        .with(dcdn::domain_cert::KIND, DcdnDomainCertDriver::constructor)
        .with(dcdn::domain_config::KIND, DcdnDomainConfigDriver::constructor)
}

/// Drivers for every kind, bound to `client`
pub fn drivers(client: &AliyunClient) -> DriverSet {
    registry().instantiate(client)
}

/// Desired resources declared in a manifest
pub fn resource_set(manifest: &Manifest) -> ResourceSet {
    manifest
        .resources
        .iter()
        .map(|entry| ResourceConfig::new(&entry.kind, &entry.name, entry.config.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubCloud;

    #[test]
    fn test_registry_covers_all_kinds() {
        let registry = registry();
        let kinds: Vec<&str> = registry.kinds().collect();
        assert_eq!(
            kinds,
            vec![
                "aliyun_cr_user_info",
                "aliyun_cr_user_info_auth",
                "aliyun_dcdn_domain",
                "aliyun_dcdn_domain_cert",
                "aliyun_dcdn_domain_config",
                "aliyun_fc_trigger",
                "aliyun_fc_version",
            ]
        );
    }

    #[test]
    fn test_instantiated_drivers_report_their_kind() {
        let cloud = StubCloud::new();
        let drivers = drivers(&cloud.client());
        for kind in registry().kinds() {
            assert_eq!(drivers.get(kind).unwrap().kind(), kind);
        }
        assert_eq!(drivers.get("aliyun_oss_bucket").err().unwrap().code(), "DriverNotFound");
    }
}
