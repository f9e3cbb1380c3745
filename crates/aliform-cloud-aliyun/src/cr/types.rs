//! Container Registry request shapes

use serde::{Deserialize, Serialize};

/// Body of CreateUserInfo / UpdateUserInfo: `{"User":{"Password":".."}}`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfoRequest {
    #[serde(rename = "User")]
    pub user: UserPassword,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPassword {
    #[serde(rename = "Password")]
    pub password: String,
}

impl UserInfoRequest {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            user: UserPassword {
                password: password.into(),
            },
        }
    }

    /// Serialized request content
    pub fn to_content(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl std::fmt::Debug for UserInfoRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserInfoRequest")
            .field("password", &"<sensitive>")
            .finish()
    }
}

/// Credentials for a registry client built per call
#[derive(Clone, PartialEq, Eq)]
pub struct CrCredentials {
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
}

impl std::fmt::Debug for CrCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrCredentials")
            .field("region", &self.region)
            .field("access_key", &"<sensitive>")
            .field("secret_key", &"<sensitive>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let content = UserInfoRequest::new("p@ss").to_content().unwrap();
        assert_eq!(content, r#"{"User":{"Password":"p@ss"}}"#);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let request = format!("{:?}", UserInfoRequest::new("p@ss"));
        assert!(!request.contains("p@ss"));

        let credentials = format!(
            "{:?}",
            CrCredentials {
                region: "cn-hangzhou".to_string(),
                access_key: "AK-ID".to_string(),
                secret_key: "SK-VALUE".to_string(),
            }
        );
        assert!(credentials.contains("cn-hangzhou"));
        assert!(!credentials.contains("AK-ID"));
        assert!(!credentials.contains("SK-VALUE"));
    }
}
