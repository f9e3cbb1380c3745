//! Container Registry drivers
//!
//! Registry login credentials are write-only: the control plane never
//! echoes the password back, so Read observes nothing and the identity is a
//! locally generated number.

pub mod types;
pub mod user_info;
pub mod user_info_auth;

pub use user_info::CrUserInfoDriver;
pub use user_info_auth::CrUserInfoAuthDriver;

use aliform_cloud::{Identity, ResourceData, Result};
use rand::Rng;
use types::UserInfoRequest;

fn random_identity() -> Identity {
    Identity::new(rand::thread_rng().gen_range(1..=i64::MAX).to_string())
}

fn password_request(data: &ResourceData) -> Result<UserInfoRequest> {
    Ok(UserInfoRequest::new(data.require_str("password")?))
}
