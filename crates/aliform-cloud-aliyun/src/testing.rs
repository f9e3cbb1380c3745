//! In-memory control planes for tests
//!
//! Each stub keeps just enough server-side state to answer the calls the
//! drivers make, reports the service's own not-found codes, and records
//! every call so tests can assert on request counts.

use crate::client::{AliyunClient, CrApi, CrClientFactory, DcdnApi, FcApi};
use crate::cr::types::{CrCredentials, UserInfoRequest};
use crate::dcdn::types::{
    AddDcdnDomainRequest, BatchSetDcdnDomainConfigsRequest, DcdnCertInfo, DcdnDomainConfig,
    DcdnDomainDetail, DcdnFunction, DcdnFunctionArg, DcdnSource, DeleteDcdnSpecificConfigRequest,
    DescribeDcdnDomainConfigsRequest, ModifyDcdnDomainSchdmRequest, STATUS_ONLINE,
    SetDcdnDomainCertificateRequest, UpdateDcdnDomainRequest,
};
use crate::fc::types::{
    CreateTriggerRequest, ListServiceVersionsRequest, ListServiceVersionsResponse,
    PublishServiceVersionRequest, ServiceVersionKey, TriggerInfo, TriggerKey,
    UpdateTriggerRequest, VersionInfo,
};
use aliform_cloud::{CloudError, Result, ServiceError};
use aliform_config::ProviderConfig;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Status reported while a domain activation is still running
pub const STATUS_CONFIGURING: &str = "configuring";

const STUB_TIMESTAMP: &str = "2026-01-01T00:00:00Z";

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn service_error(code: &str, message: impl Into<String>) -> CloudError {
    ServiceError::new(code, message).with_http_status(404).into()
}

/// Per-method call counter with one-shot failure injection
#[derive(Debug, Default)]
pub struct CallLog {
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, ServiceError>>,
}

impl CallLog {
    /// Record a call, returning the injected failure if one is pending
    fn enter(&self, method: &str) -> Result<()> {
        lock(&self.calls).push(method.to_string());
        match lock(&self.failures).remove(method) {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    pub fn count(&self, method: &str) -> usize {
        lock(&self.calls).iter().filter(|m| *m == method).count()
    }

    pub fn total(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn methods(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    fn fail_next(&self, method: &str, err: ServiceError) {
        lock(&self.failures).insert(method.to_string(), err);
    }
}

// ============================================================================
// Function Compute
// ============================================================================

#[derive(Debug, Default)]
pub struct StubFc {
    pub calls: CallLog,
    triggers: Mutex<BTreeMap<(String, String, String), TriggerInfo>>,
    trigger_seq: Mutex<u64>,
    updates: Mutex<Vec<UpdateTriggerRequest>>,
    versions: Mutex<BTreeMap<String, Vec<VersionInfo>>>,
    version_seq: Mutex<HashMap<String, u64>>,
    scripted_pages: Mutex<VecDeque<ListServiceVersionsResponse>>,
}

impl StubFc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next call of `method` with `err`
    pub fn fail_next(&self, method: &str, err: ServiceError) {
        self.calls.fail_next(method, err);
    }

    pub fn trigger_count(&self) -> usize {
        lock(&self.triggers).len()
    }

    pub fn trigger(&self, service: &str, function: &str, name: &str) -> Option<TriggerInfo> {
        lock(&self.triggers)
            .get(&(service.to_string(), function.to_string(), name.to_string()))
            .cloned()
    }

    pub fn last_update(&self) -> Option<UpdateTriggerRequest> {
        lock(&self.updates).last().cloned()
    }

    pub fn versions(&self, service: &str) -> Vec<VersionInfo> {
        lock(&self.versions).get(service).cloned().unwrap_or_default()
    }

    /// Answer the next version listing with `page` instead of the stored versions
    pub fn script_versions_page(&self, page: ListServiceVersionsResponse) {
        lock(&self.scripted_pages).push_back(page);
    }

    fn trigger_key(key: &TriggerKey) -> (String, String, String) {
        (
            key.service_name.clone(),
            key.function_name.clone(),
            key.trigger_name.clone(),
        )
    }
}

#[async_trait]
impl FcApi for StubFc {
    async fn create_trigger(&self, request: &CreateTriggerRequest) -> Result<TriggerInfo> {
        self.calls.enter("create_trigger")?;
        let key = (
            request.service_name.clone(),
            request.function_name.clone(),
            request.trigger_name.clone(),
        );

        let mut triggers = lock(&self.triggers);
        if triggers.contains_key(&key) {
            return Err(ServiceError::new(
                "TriggerAlreadyExists",
                format!("trigger {} already exists", request.trigger_name),
            )
            .with_http_status(409)
            .into());
        }

        let trigger_id = {
            let mut seq = lock(&self.trigger_seq);
            *seq += 1;
            format!("trg-{:08}", *seq)
        };
        let info = TriggerInfo {
            trigger_id,
            trigger_name: request.trigger_name.clone(),
            trigger_type: request.trigger_type.clone(),
            invocation_role: request.invocation_role.clone(),
            source_arn: request.source_arn.clone().unwrap_or_default(),
            trigger_config: request.trigger_config.clone(),
            qualifier: request.qualifier.clone(),
            created_time: STUB_TIMESTAMP.to_string(),
            last_modified_time: STUB_TIMESTAMP.to_string(),
        };
        triggers.insert(key, info.clone());
        Ok(info)
    }

    async fn get_trigger(&self, key: &TriggerKey) -> Result<TriggerInfo> {
        self.calls.enter("get_trigger")?;
        lock(&self.triggers)
            .get(&Self::trigger_key(key))
            .cloned()
            .ok_or_else(|| service_error("TriggerNotFound", "trigger does not exist"))
    }

    async fn update_trigger(&self, request: &UpdateTriggerRequest) -> Result<TriggerInfo> {
        self.calls.enter("update_trigger")?;
        lock(&self.updates).push(request.clone());

        let key = (
            request.service_name.clone(),
            request.function_name.clone(),
            request.trigger_name.clone(),
        );
        let mut triggers = lock(&self.triggers);
        let info = triggers
            .get_mut(&key)
            .ok_or_else(|| service_error("TriggerNotFound", "trigger does not exist"))?;

        if let Some(role) = &request.invocation_role {
            info.invocation_role = role.clone();
        }
        if let Some(config) = &request.trigger_config {
            info.trigger_config = config.clone();
        }
        if let Some(qualifier) = &request.qualifier {
            info.qualifier = qualifier.clone();
        }
        Ok(info.clone())
    }

    async fn delete_trigger(&self, key: &TriggerKey) -> Result<()> {
        self.calls.enter("delete_trigger")?;
        lock(&self.triggers)
            .remove(&Self::trigger_key(key))
            .map(|_| ())
            .ok_or_else(|| service_error("TriggerNotFound", "trigger does not exist"))
    }

    async fn publish_service_version(
        &self,
        request: &PublishServiceVersionRequest,
    ) -> Result<VersionInfo> {
        self.calls.enter("publish_service_version")?;
        let version_id = {
            let mut seq = lock(&self.version_seq);
            let next = seq.entry(request.service_name.clone()).or_insert(0);
            *next += 1;
            next.to_string()
        };
        let info = VersionInfo {
            version_id,
            description: request.description.clone().unwrap_or_default(),
            created_time: STUB_TIMESTAMP.to_string(),
            last_modified_time: STUB_TIMESTAMP.to_string(),
        };
        lock(&self.versions)
            .entry(request.service_name.clone())
            .or_default()
            .push(info.clone());
        Ok(info)
    }

    /// Versions with an id at or after `start_key`, ascending
    async fn list_service_versions(
        &self,
        request: &ListServiceVersionsRequest,
    ) -> Result<ListServiceVersionsResponse> {
        self.calls.enter("list_service_versions")?;
        if let Some(page) = lock(&self.scripted_pages).pop_front() {
            return Ok(page);
        }

        let start = request
            .start_key
            .as_deref()
            .and_then(|key| key.parse::<u64>().ok())
            .unwrap_or(0);
        let mut versions: Vec<VersionInfo> = self
            .versions(&request.service_name)
            .into_iter()
            .filter(|v| v.version_id.parse::<u64>().map(|id| id >= start).unwrap_or(false))
            .collect();
        versions.sort_by_key(|v| v.version_id.parse::<u64>().unwrap_or(0));
        if let Some(limit) = request.limit {
            versions.truncate(limit as usize);
        }

        Ok(ListServiceVersionsResponse {
            versions,
            next_token: None,
        })
    }

    async fn delete_service_version(&self, key: &ServiceVersionKey) -> Result<()> {
        self.calls.enter("delete_service_version")?;
        let mut versions = lock(&self.versions);
        let service = versions.entry(key.service_name.clone()).or_default();
        let before = service.len();
        service.retain(|v| v.version_id != key.version_id);
        if service.len() == before {
            return Err(service_error("VersionNotFound", "version does not exist"));
        }
        Ok(())
    }
}

// ============================================================================
// Container Registry
// ============================================================================

#[derive(Debug, Default)]
pub struct StubCr {
    pub calls: CallLog,
    passwords: Mutex<Vec<String>>,
}

impl StubCr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, method: &str, err: ServiceError) {
        self.calls.fail_next(method, err);
    }

    /// Every password set so far, oldest first
    pub fn passwords(&self) -> Vec<String> {
        lock(&self.passwords).clone()
    }
}

#[async_trait]
impl CrApi for StubCr {
    async fn create_user_info(&self, request: &UserInfoRequest) -> Result<()> {
        self.calls.enter("create_user_info")?;
        lock(&self.passwords).push(request.user.password.clone());
        Ok(())
    }

    async fn update_user_info(&self, request: &UserInfoRequest) -> Result<()> {
        self.calls.enter("update_user_info")?;
        lock(&self.passwords).push(request.user.password.clone());
        Ok(())
    }
}

/// Hands out one shared [`StubCr`] and remembers the credentials it was asked for
#[derive(Debug, Default)]
pub struct StubCrFactory {
    client: Arc<StubCr>,
    built: Mutex<Vec<CrCredentials>>,
}

impl StubCrFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client(&self) -> Arc<StubCr> {
        Arc::clone(&self.client)
    }

    pub fn built(&self) -> Vec<CrCredentials> {
        lock(&self.built).clone()
    }
}

impl CrClientFactory for StubCrFactory {
    fn cr_client(&self, credentials: &CrCredentials) -> Result<Arc<dyn CrApi>> {
        if credentials.access_key.is_empty() || credentials.secret_key.is_empty() {
            return Err(CloudError::InvalidConfig(
                "registry credentials must not be empty".to_string(),
            ));
        }
        lock(&self.built).push(credentials.clone());
        let client: Arc<dyn CrApi> = self.client.clone();
        Ok(client)
    }
}

// ============================================================================
// DCDN
// ============================================================================

#[derive(Debug, Default)]
struct DcdnState {
    domains: BTreeMap<String, DcdnDomainDetail>,
    /// Remaining `configuring` answers per domain
    pending: HashMap<String, usize>,
    certs: BTreeMap<String, DcdnCertInfo>,
    configs: BTreeMap<(String, String), DcdnDomainConfig>,
    config_seq: u64,
}

#[derive(Debug)]
pub struct StubDcdn {
    pub calls: CallLog,
    state: Mutex<DcdnState>,
    activation_polls: usize,
    activation_status: String,
    updates: Mutex<Vec<UpdateDcdnDomainRequest>>,
    properties: Mutex<Vec<String>>,
    certificates: Mutex<Vec<SetDcdnDomainCertificateRequest>>,
    batch_sets: Mutex<Vec<BatchSetDcdnDomainConfigsRequest>>,
}

impl Default for StubDcdn {
    fn default() -> Self {
        Self {
            calls: CallLog::default(),
            state: Mutex::new(DcdnState::default()),
            activation_polls: 0,
            activation_status: STATUS_ONLINE.to_string(),
            updates: Mutex::new(Vec::new()),
            properties: Mutex::new(Vec::new()),
            certificates: Mutex::new(Vec::new()),
            batch_sets: Mutex::new(Vec::new()),
        }
    }
}

fn domain_not_found(domain: &str) -> CloudError {
    service_error(
        "InvalidDomain.NotFound",
        format!("The domain {} does not exist", domain),
    )
}

fn parse_sources(sources: &str) -> Result<Vec<DcdnSource>> {
    serde_json::from_str(sources).map_err(|e| {
        ServiceError::new("InvalidSources.Malformed", e.to_string())
            .with_http_status(400)
            .into()
    })
}

impl StubDcdn {
    pub fn new() -> Self {
        Self::default()
    }

    /// New domains answer `configuring` for `polls` describes, then `status`
    pub fn with_activation(mut self, polls: usize, status: &str) -> Self {
        self.activation_polls = polls;
        self.activation_status = status.to_string();
        self
    }

    pub fn fail_next(&self, method: &str, err: ServiceError) {
        self.calls.fail_next(method, err);
    }

    /// Seed an online domain without going through the API
    pub fn insert_domain(&self, domain: &str) {
        lock(&self.state)
            .domains
            .entry(domain.to_string())
            .or_insert_with(|| DcdnDomainDetail {
                domain_name: domain.to_string(),
                domain_status: STATUS_ONLINE.to_string(),
                cname: format!("{}.w.kunlungr.com", domain),
                scope: "domestic".to_string(),
                resource_group_id: "rg-default".to_string(),
                sources: Vec::new(),
            });
    }

    /// Seed a function configuration, creating the domain if needed
    pub fn insert_config(&self, domain: &str, function: &str, args: &[(&str, &str)]) {
        self.insert_domain(domain);
        let mut state = lock(&self.state);
        state.config_seq += 1;
        let config = DcdnDomainConfig {
            config_id: state.config_seq.to_string(),
            function_name: function.to_string(),
            status: "success".to_string(),
            function_args: args
                .iter()
                .map(|(name, value)| DcdnFunctionArg {
                    arg_name: name.to_string(),
                    arg_value: value.to_string(),
                })
                .collect(),
        };
        state
            .configs
            .insert((domain.to_string(), function.to_string()), config);
    }

    pub fn domain(&self, domain: &str) -> Option<DcdnDomainDetail> {
        lock(&self.state).domains.get(domain).cloned()
    }

    pub fn certificate(&self, domain: &str) -> Option<DcdnCertInfo> {
        lock(&self.state).certs.get(domain).cloned()
    }

    pub fn config(&self, domain: &str, function: &str) -> Option<DcdnDomainConfig> {
        lock(&self.state)
            .configs
            .get(&(domain.to_string(), function.to_string()))
            .cloned()
    }

    pub fn last_update(&self) -> Option<UpdateDcdnDomainRequest> {
        lock(&self.updates).last().cloned()
    }

    pub fn last_property(&self) -> Option<String> {
        lock(&self.properties).last().cloned()
    }

    pub fn last_certificate(&self) -> Option<SetDcdnDomainCertificateRequest> {
        lock(&self.certificates).last().cloned()
    }

    pub fn last_batch_set(&self) -> Option<BatchSetDcdnDomainConfigsRequest> {
        lock(&self.batch_sets).last().cloned()
    }
}

#[async_trait]
impl DcdnApi for StubDcdn {
    async fn add_dcdn_domain(&self, request: &AddDcdnDomainRequest) -> Result<()> {
        self.calls.enter("add_dcdn_domain")?;
        let sources = parse_sources(&request.sources)?;

        let mut state = lock(&self.state);
        if state.domains.contains_key(&request.domain_name) {
            return Err(ServiceError::new(
                "DomainAlreadyExist",
                format!("The domain {} already exists", request.domain_name),
            )
            .with_http_status(400)
            .into());
        }

        let status = if self.activation_polls > 0 {
            STATUS_CONFIGURING
        } else {
            self.activation_status.as_str()
        };
        let detail = DcdnDomainDetail {
            domain_name: request.domain_name.clone(),
            domain_status: status.to_string(),
            cname: format!("{}.w.kunlungr.com", request.domain_name),
            scope: request.scope.clone().unwrap_or_else(|| "domestic".to_string()),
            resource_group_id: request
                .resource_group_id
                .clone()
                .unwrap_or_else(|| "rg-default".to_string()),
            sources,
        };
        state.domains.insert(request.domain_name.clone(), detail);
        state
            .pending
            .insert(request.domain_name.clone(), self.activation_polls);
        Ok(())
    }

    async fn describe_dcdn_domain_detail(&self, domain_name: &str) -> Result<DcdnDomainDetail> {
        self.calls.enter("describe_dcdn_domain_detail")?;
        let mut state = lock(&self.state);

        let still_pending = match state.pending.get_mut(domain_name) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        };

        let detail = state
            .domains
            .get_mut(domain_name)
            .ok_or_else(|| domain_not_found(domain_name))?;
        if still_pending {
            detail.domain_status = STATUS_CONFIGURING.to_string();
        } else if detail.domain_status == STATUS_CONFIGURING {
            detail.domain_status = self.activation_status.clone();
        }
        Ok(detail.clone())
    }

    async fn modify_dcdn_domain_schdm_by_property(
        &self,
        request: &ModifyDcdnDomainSchdmRequest,
    ) -> Result<()> {
        self.calls.enter("modify_dcdn_domain_schdm_by_property")?;
        lock(&self.properties).push(request.property.clone());

        let property: serde_json::Value = serde_json::from_str(&request.property)?;
        let mut state = lock(&self.state);
        let detail = state
            .domains
            .get_mut(&request.domain_name)
            .ok_or_else(|| domain_not_found(&request.domain_name))?;
        if let Some(coverage) = property.get("coverage").and_then(|v| v.as_str()) {
            detail.scope = coverage.to_string();
        }
        Ok(())
    }

    async fn update_dcdn_domain(&self, request: &UpdateDcdnDomainRequest) -> Result<()> {
        self.calls.enter("update_dcdn_domain")?;
        lock(&self.updates).push(request.clone());

        let sources = request.sources.as_deref().map(parse_sources).transpose()?;
        let mut state = lock(&self.state);
        let detail = state
            .domains
            .get_mut(&request.domain_name)
            .ok_or_else(|| domain_not_found(&request.domain_name))?;
        if let Some(group) = &request.resource_group_id {
            detail.resource_group_id = group.clone();
        }
        if let Some(sources) = sources {
            detail.sources = sources;
        }
        Ok(())
    }

    async fn delete_dcdn_domain(&self, domain_name: &str) -> Result<()> {
        self.calls.enter("delete_dcdn_domain")?;
        let mut state = lock(&self.state);
        if state.domains.remove(domain_name).is_none() {
            return Err(domain_not_found(domain_name));
        }
        state.pending.remove(domain_name);
        state.certs.remove(domain_name);
        state.configs.retain(|(domain, _), _| domain != domain_name);
        Ok(())
    }

    async fn set_dcdn_domain_certificate(
        &self,
        request: &SetDcdnDomainCertificateRequest,
    ) -> Result<()> {
        self.calls.enter("set_dcdn_domain_certificate")?;
        lock(&self.certificates).push(request.clone());

        let mut state = lock(&self.state);
        if !state.domains.contains_key(&request.domain_name) {
            return Err(domain_not_found(&request.domain_name));
        }
        if request.ssl_protocol == "on" {
            let info = DcdnCertInfo {
                domain_name: request.domain_name.clone(),
                cert_name: request.cert_name.clone().unwrap_or_default(),
                cert_type: request.cert_type.clone().unwrap_or_default(),
                ssl_pub: request.ssl_pub.clone().unwrap_or_default(),
                ssl_protocol: request.ssl_protocol.clone(),
                status: "success".to_string(),
            };
            state.certs.insert(request.domain_name.clone(), info);
        } else {
            state.certs.remove(&request.domain_name);
        }
        Ok(())
    }

    async fn describe_dcdn_domain_certificate_info(
        &self,
        domain_name: &str,
    ) -> Result<Vec<DcdnCertInfo>> {
        self.calls.enter("describe_dcdn_domain_certificate_info")?;
        let state = lock(&self.state);
        if !state.domains.contains_key(domain_name) {
            return Err(domain_not_found(domain_name));
        }
        Ok(state.certs.get(domain_name).cloned().into_iter().collect())
    }

    async fn batch_set_dcdn_domain_configs(
        &self,
        request: &BatchSetDcdnDomainConfigsRequest,
    ) -> Result<()> {
        self.calls.enter("batch_set_dcdn_domain_configs")?;
        lock(&self.batch_sets).push(request.clone());

        let functions: Vec<DcdnFunction> = serde_json::from_str(&request.functions)?;
        let mut state = lock(&self.state);
        for domain in request.domain_names.split(',') {
            if !state.domains.contains_key(domain) {
                return Err(domain_not_found(domain));
            }
            for function in &functions {
                state.config_seq += 1;
                let config = DcdnDomainConfig {
                    config_id: state.config_seq.to_string(),
                    function_name: function.function_name.clone(),
                    status: "success".to_string(),
                    function_args: function.function_args.clone(),
                };
                state
                    .configs
                    .insert((domain.to_string(), function.function_name.clone()), config);
            }
        }
        Ok(())
    }

    async fn describe_dcdn_domain_configs(
        &self,
        request: &DescribeDcdnDomainConfigsRequest,
    ) -> Result<Vec<DcdnDomainConfig>> {
        self.calls.enter("describe_dcdn_domain_configs")?;
        let state = lock(&self.state);
        if !state.domains.contains_key(&request.domain_name) {
            return Err(domain_not_found(&request.domain_name));
        }
        Ok(request
            .function_names
            .split(',')
            .filter_map(|function| {
                state
                    .configs
                    .get(&(request.domain_name.clone(), function.to_string()))
                    .cloned()
            })
            .collect())
    }

    async fn delete_dcdn_specific_config(
        &self,
        request: &DeleteDcdnSpecificConfigRequest,
    ) -> Result<()> {
        self.calls.enter("delete_dcdn_specific_config")?;
        let mut state = lock(&self.state);
        if !state.domains.contains_key(&request.domain_name) {
            return Err(domain_not_found(&request.domain_name));
        }
        let before = state.configs.len();
        state.configs.retain(|(domain, _), config| {
            domain != &request.domain_name || config.config_id != request.config_id
        });
        if state.configs.len() == before {
            return Err(service_error(
                "InvalidConfigId.NotFound",
                format!("config {} does not exist", request.config_id),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Whole provider
// ============================================================================

/// One stub per API family, wired into an [`AliyunClient`]
#[derive(Debug, Default)]
pub struct StubCloud {
    pub fc: Arc<StubFc>,
    pub cr: Arc<StubCr>,
    pub cr_factory: Arc<StubCrFactory>,
    pub dcdn: Arc<StubDcdn>,
}

impl StubCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dcdn(mut self, dcdn: StubDcdn) -> Self {
        self.dcdn = Arc::new(dcdn);
        self
    }

    pub fn config() -> ProviderConfig {
        ProviderConfig::new("test-access-key", "test-secret-key", "1234567890", "cn-hangzhou")
    }

    pub fn client(&self) -> AliyunClient {
        AliyunClient::new(
            &Self::config(),
            self.fc.clone(),
            self.cr.clone(),
            self.cr_factory.clone(),
            self.dcdn.clone(),
        )
    }
}
