//! Dynamic Content Delivery Network drivers

pub mod domain;
pub mod domain_cert;
pub mod domain_config;
pub mod types;

pub use domain::DcdnDomainDriver;
pub use domain_cert::DcdnDomainCertDriver;
pub use domain_config::DcdnDomainConfigDriver;

/// Returned by every DCDN call addressed to an unknown domain
const NOT_FOUND_CODES: &[&str] = &["InvalidDomain.NotFound"];
