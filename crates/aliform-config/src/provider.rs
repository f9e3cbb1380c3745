//! Provider credentials and client tuning

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_ACCESS_KEY: &str = "ALIYUN_ACCESS_KEY";
pub const ENV_SECRET_KEY: &str = "ALIYUN_SECRET_KEY";
pub const ENV_ACCOUNT_ID: &str = "ALIYUN_ACCOUNT_ID";
pub const ENV_REGION: &str = "ALIYUN_REGION";

/// Function Compute API version
pub const FC_API_VERSION: &str = "2016-08-15";

const CREDENTIALS_FILE: &str = "credentials.yaml";

/// Resolved provider configuration
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub access_key: String,
    pub secret_key: String,
    pub account_id: String,
    pub region: String,
}

/// Partially specified configuration; also the shape of `credentials.yaml`
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialProviderConfig {
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

impl PartialProviderConfig {
    /// Values from the `ALIYUN_*` environment variables
    pub fn from_env() -> Self {
        let var = |name| std::env::var(name).ok();
        Self {
            access_key: var(ENV_ACCESS_KEY),
            secret_key: var(ENV_SECRET_KEY),
            account_id: var(ENV_ACCOUNT_ID),
            region: var(ENV_REGION),
        }
    }

    /// Load a credentials file; a missing file yields an empty layer
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let layer = serde_yaml::from_str(&content).map_err(|source| {
            ConfigError::CredentialsParse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        tracing::debug!("Loaded credentials from {}", path.display());
        Ok(layer)
    }

    /// Fill unset values from `lower`
    fn or(self, lower: Self) -> Self {
        Self {
            access_key: nonblank(self.access_key).or_else(|| nonblank(lower.access_key)),
            secret_key: nonblank(self.secret_key).or_else(|| nonblank(lower.secret_key)),
            account_id: nonblank(self.account_id).or_else(|| nonblank(lower.account_id)),
            region: nonblank(self.region).or_else(|| nonblank(lower.region)),
        }
    }
}

impl std::fmt::Debug for PartialProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartialProviderConfig")
            .field("access_key", &self.access_key.as_ref().map(|_| "<sensitive>"))
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<sensitive>"))
            .field("account_id", &self.account_id)
            .field("region", &self.region)
            .finish()
    }
}

/// Trimmed value, or None when blank
fn nonblank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, field: &'static str, env: &'static str) -> Result<String> {
    value.ok_or(ConfigError::MissingValue { field, env })
}

impl ProviderConfig {
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        account_id: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            access_key: access_key.into().trim().to_string(),
            secret_key: secret_key.into().trim().to_string(),
            account_id: account_id.into().trim().to_string(),
            region: region.into().trim().to_string(),
        }
    }

    /// Resolve from explicit values, then the environment, then the user's credentials file
    pub fn resolve(explicit: Option<PartialProviderConfig>) -> Result<Self> {
        let file = credentials_path();
        Self::resolve_with(explicit, file.as_deref())
    }

    /// Same as [`ProviderConfig::resolve`] with an explicit credentials file
    pub fn resolve_with(
        explicit: Option<PartialProviderConfig>,
        credentials_file: Option<&Path>,
    ) -> Result<Self> {
        let file_layer = match credentials_file {
            Some(path) => PartialProviderConfig::from_file(path)?,
            None => PartialProviderConfig::default(),
        };
        let merged = explicit
            .unwrap_or_default()
            .or(PartialProviderConfig::from_env())
            .or(file_layer);

        let config = Self {
            access_key: required(merged.access_key, "access_key", ENV_ACCESS_KEY)?,
            secret_key: required(merged.secret_key, "secret_key", ENV_SECRET_KEY)?,
            account_id: required(merged.account_id, "account_id", ENV_ACCOUNT_ID)?,
            region: required(merged.region, "region", ENV_REGION)?,
        };
        tracing::debug!(
            "Provider configured for account {} in {}",
            config.account_id,
            config.region
        );
        Ok(config)
    }

    /// Function Compute endpoint for this account and region
    pub fn fc_endpoint(&self) -> String {
        format!("https://{}.{}.fc.aliyuncs.com", self.account_id, self.region)
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("access_key", &"<sensitive>")
            .field("secret_key", &"<sensitive>")
            .field("account_id", &self.account_id)
            .field("region", &self.region)
            .finish()
    }
}

/// `~/.config/aliform/credentials.yaml`
pub fn credentials_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("aliform").join(CREDENTIALS_FILE))
}

/// Transport tuning shared by every API client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub max_retries: u32,
    pub timeout: Duration,
    pub tls_handshake_timeout: Duration,
    pub scheme: String,
}

impl ClientSettings {
    pub const DEFAULT_MAX_RETRIES: u32 = 5;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_TLS_HANDSHAKE_SECS: u64 = 120;

    /// Defaults, with the TLS handshake timeout read from `TLSHandshakeTimeout`
    pub fn from_env() -> Self {
        let handshake = std::env::var("TLSHandshakeTimeout")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(Self::DEFAULT_TLS_HANDSHAKE_SECS);
        Self {
            tls_handshake_timeout: Duration::from_secs(handshake),
            ..Self::default()
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            max_retries: Self::DEFAULT_MAX_RETRIES,
            timeout: Self::DEFAULT_TIMEOUT,
            tls_handshake_timeout: Duration::from_secs(Self::DEFAULT_TLS_HANDSHAKE_SECS),
            scheme: "HTTPS".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const NO_ENV: [(&str, Option<&str>); 4] = [
        (ENV_ACCESS_KEY, None),
        (ENV_SECRET_KEY, None),
        (ENV_ACCOUNT_ID, None),
        (ENV_REGION, None),
    ];

    fn explicit() -> PartialProviderConfig {
        PartialProviderConfig {
            access_key: Some(" AK ".to_string()),
            secret_key: Some("SK".to_string()),
            account_id: Some("1234".to_string()),
            region: Some("cn-hangzhou".to_string()),
        }
    }

    #[test]
    #[serial]
    fn test_explicit_values_win_and_are_trimmed() {
        temp_env::with_vars(
            [
                (ENV_ACCESS_KEY, Some("env-ak")),
                (ENV_SECRET_KEY, Some("env-sk")),
                (ENV_ACCOUNT_ID, Some("9999")),
                (ENV_REGION, Some("cn-beijing")),
            ],
            || {
                let config = ProviderConfig::resolve_with(Some(explicit()), None).unwrap();
                assert_eq!(config.access_key, "AK");
                assert_eq!(config.region, "cn-hangzhou");
            },
        );
    }

    #[test]
    #[serial]
    fn test_environment_fills_gaps() {
        temp_env::with_vars(
            [
                (ENV_ACCESS_KEY, Some("env-ak")),
                (ENV_SECRET_KEY, Some("env-sk")),
                (ENV_ACCOUNT_ID, Some("9999")),
                (ENV_REGION, Some(" cn-beijing ")),
            ],
            || {
                let partial = PartialProviderConfig {
                    access_key: Some("AK".to_string()),
                    ..Default::default()
                };
                let config = ProviderConfig::resolve_with(Some(partial), None).unwrap();
                assert_eq!(config.access_key, "AK");
                assert_eq!(config.secret_key, "env-sk");
                assert_eq!(config.region, "cn-beijing");
            },
        );
    }

    #[test]
    #[serial]
    fn test_credentials_file_is_last_resort() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.yaml");
        std::fs::write(
            &path,
            "access_key: file-ak\nsecret_key: file-sk\naccount_id: \"42\"\nregion: ap-southeast-1\n",
        )
        .unwrap();

        temp_env::with_vars([(ENV_REGION, Some("cn-shanghai"))], || {
            temp_env::with_vars(
                [
                    (ENV_ACCESS_KEY, None::<&str>),
                    (ENV_SECRET_KEY, None),
                    (ENV_ACCOUNT_ID, None),
                ],
                || {
                    let config = ProviderConfig::resolve_with(None, Some(&path)).unwrap();
                    assert_eq!(config.access_key, "file-ak");
                    assert_eq!(config.account_id, "42");
                    assert_eq!(config.region, "cn-shanghai");
                },
            );
        });
    }

    #[test]
    #[serial]
    fn test_missing_value_names_the_variable() {
        temp_env::with_vars(NO_ENV, || {
            let partial = PartialProviderConfig {
                region: Some("   ".to_string()),
                ..explicit()
            };
            let err = ProviderConfig::resolve_with(Some(partial), None).unwrap_err();
            match err {
                ConfigError::MissingValue { field, env } => {
                    assert_eq!(field, "region");
                    assert_eq!(env, ENV_REGION);
                }
                other => panic!("unexpected error: {other}"),
            }
        });
    }

    #[test]
    fn test_malformed_credentials_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.yaml");
        std::fs::write(&path, "access_key: [unterminated").unwrap();

        let err = PartialProviderConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::CredentialsParse { .. }));
    }

    #[test]
    fn test_fc_endpoint_and_debug() {
        let config = ProviderConfig::new("AKID", "SECRET", "1234", "cn-hangzhou");
        assert_eq!(config.fc_endpoint(), "https://1234.cn-hangzhou.fc.aliyuncs.com");

        let debug = format!("{:?}", config);
        assert!(!debug.contains("AKID"));
        assert!(!debug.contains("SECRET"));
        assert!(debug.contains("cn-hangzhou"));
    }

    #[test]
    #[serial]
    fn test_client_settings() {
        temp_env::with_var("TLSHandshakeTimeout", Some("15"), || {
            let settings = ClientSettings::from_env();
            assert_eq!(settings.tls_handshake_timeout, Duration::from_secs(15));
            assert_eq!(settings.max_retries, 5);
            assert_eq!(settings.timeout, Duration::from_secs(30));
            assert_eq!(settings.scheme, "HTTPS");
        });
        temp_env::with_var("TLSHandshakeTimeout", Some("soon"), || {
            assert_eq!(
                ClientSettings::from_env().tls_handshake_timeout,
                Duration::from_secs(120)
            );
        });
    }
}
