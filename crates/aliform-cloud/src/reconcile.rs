//! Planner and reconciler
//!
//! Planning refreshes every stored identity through its driver and diffs the
//! desired records against what the control plane reports. Applying runs the
//! resulting actions concurrently and writes the surviving identities back
//! to the state store.

use crate::action::{Action, ActionType, ApplyResult, Plan};
use crate::data::{Record, ResourceData};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::driver::{OperationContext, ResourceDriver};
use crate::error::{CloudError, Result, ResultExt};
use crate::registry::DriverSet;
use crate::resource::{ResourceConfig, ResourceSet};
use crate::schema::Schema;
use crate::state::{GlobalState, ResourceState, ResourceStatus, StateManager, fingerprint};
use futures_util::future::join_all;
use std::sync::Arc;

/// Drives desired resources to the control plane
pub struct Reconciler {
    drivers: DriverSet,
    state: StateManager,
    ctx: OperationContext,
}

/// State store update produced by one action
enum StateChange {
    /// Store a new entry
    Put(ResourceState),
    /// Replace the entry's snapshot, keeping its creation time
    Refresh(ResourceState),
    Remove,
    /// Keep the identity but flag the entry
    MarkFailed,
    Keep,
}

struct Outcome {
    status: ResourceStatus,
    change: StateChange,
    message: String,
    diagnostics: Diagnostics,
}

impl Outcome {
    fn success(status: ResourceStatus, change: StateChange, message: String) -> Self {
        Self {
            status,
            change,
            message,
            diagnostics: Diagnostics::new(),
        }
    }

    fn failure(change: StateChange, err: &CloudError, secrets: &[String]) -> Self {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push_error(err);
        diagnostics.redact(secrets);
        Self {
            status: ResourceStatus::Failed,
            change,
            message: String::new(),
            diagnostics,
        }
    }
}

impl Reconciler {
    pub fn new(drivers: DriverSet, state: StateManager) -> Self {
        Self {
            drivers,
            state,
            ctx: OperationContext::default(),
        }
    }

    pub fn with_context(mut self, ctx: OperationContext) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn context(&self) -> &OperationContext {
        &self.ctx
    }

    /// Plan against the persisted state
    pub async fn plan(&self, desired: &ResourceSet) -> Result<Plan> {
        let state = self.state.load().await?;
        self.plan_against(desired, &state).await
    }

    /// Compute the actions that move `state` to `desired`
    pub async fn plan_against(&self, desired: &ResourceSet, state: &GlobalState) -> Result<Plan> {
        let mut actions = Vec::new();
        let mut diagnostics = Diagnostics::new();

        for resource in desired.iter() {
            let address = resource.address();
            let driver = self.drivers.get(&resource.kind)?;
            let record = desired_record(driver.schema(), resource)?;

            let Some(stored) = state.get_resource(&address) else {
                actions.push(action(ActionType::Create, resource, Vec::new(), Some(record), None));
                continue;
            };

            match self.refresh(driver.as_ref(), &address, stored).await? {
                None => {
                    diagnostics.push(Diagnostic::warning(
                        "NotFound",
                        format!("{} ({}) no longer exists and will be created", address, stored.id),
                    ));
                    actions.push(action(ActionType::Create, resource, Vec::new(), Some(record), None));
                }
                Some(observed) => {
                    let changed = changed_fields(driver.schema(), &record, &observed, stored);
                    let action_type = if changed.is_empty() {
                        ActionType::NoOp
                    } else if changed.iter().any(|f| driver.schema().is_force_new(f)) {
                        ActionType::Replace
                    } else {
                        ActionType::Update
                    };
                    actions.push(action(action_type, resource, changed, Some(record), Some(observed)));
                }
            }
        }

        for (address, stored) in &state.resources {
            if desired.contains_address(address) {
                continue;
            }
            actions.push(Action {
                id: format!("{}-{}", ActionType::Delete, address),
                action_type: ActionType::Delete,
                kind: stored.kind.clone(),
                address: address.clone(),
                description: format!("delete {} ({})", address, stored.id),
                changed_fields: Vec::new(),
                desired: None,
                prior: Some(stored.to_data()),
            });
        }

        let mut plan = Plan::new(actions);
        plan.diagnostics = diagnostics;
        tracing::debug!("Planned: {}", plan.summary());
        Ok(plan)
    }

    /// Apply a plan under the state lock
    pub async fn apply(&self, plan: &Plan) -> Result<ApplyResult> {
        let start = std::time::Instant::now();
        let lock = self.state.acquire_lock().await?;
        let mut state = self.state.load().await?;

        let pending: Vec<&Action> = plan
            .actions
            .iter()
            .filter(|a| a.action_type != ActionType::NoOp)
            .collect();
        let outcomes = join_all(pending.iter().map(|action| self.execute(action))).await;

        let mut result = ApplyResult::new();
        for (action, outcome) in pending.into_iter().zip(outcomes) {
            match outcome.change {
                StateChange::Put(resource) => state.set_resource(action.address.clone(), resource),
                StateChange::Refresh(mut resource) => {
                    if let Some(existing) = state.get_resource(&action.address) {
                        resource.created_at = existing.created_at;
                    }
                    state.set_resource(action.address.clone(), resource);
                }
                StateChange::Remove => {
                    state.remove_resource(&action.address);
                }
                StateChange::MarkFailed => {
                    if let Some(existing) = state.resources.get_mut(&action.address) {
                        existing.status = ResourceStatus::Failed;
                    }
                }
                StateChange::Keep => {}
            }

            if outcome.diagnostics.has_errors() {
                tracing::warn!("{} of {} failed", action.action_type, action.address);
                result.add_failure(action, outcome.status, outcome.diagnostics);
            } else {
                result.add_success(action, outcome.status, outcome.message);
            }
        }

        self.state.save(&state).await?;
        lock.release().await?;

        result.duration_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }

    /// Plan and apply in one step
    pub async fn run(&self, desired: &ResourceSet) -> Result<(Plan, ApplyResult)> {
        let plan = self.plan(desired).await?;
        let result = self.apply(&plan).await?;
        Ok((plan, result))
    }

    /// Delete every resource in the state store
    pub async fn destroy_all(&self) -> Result<ApplyResult> {
        let plan = self.plan(&ResourceSet::new()).await?;
        self.apply(&plan).await
    }

    /// Read a stored object; `None` when it is gone
    async fn refresh(
        &self,
        driver: &dyn ResourceDriver,
        address: &str,
        stored: &ResourceState,
    ) -> Result<Option<ResourceData>> {
        let mut data = stored.to_data();
        match driver.read(&mut data, &self.ctx).await {
            Ok(()) if data.id().is_some() => Ok(Some(data)),
            Ok(()) => Ok(None),
            Err(err) if err.is_not_found() => {
                tracing::debug!("{} not found during refresh", address);
                Ok(None)
            }
            Err(err) => Err(err).context(format!("refreshing {}", address)),
        }
    }

    async fn execute(&self, action: &Action) -> Outcome {
        let driver = match self.drivers.get(&action.kind) {
            Ok(driver) => Arc::clone(driver),
            Err(err) => return Outcome::failure(StateChange::MarkFailed, &err, &[]),
        };
        let desired = action.desired.clone().unwrap_or_default();
        let secrets = driver.schema().sensitive_values(&desired);

        match action.action_type {
            ActionType::Create => {
                tracing::info!("Creating {}", action.address);
                match self.create(driver.as_ref(), &desired).await {
                    Ok(resource) => {
                        let message = format!("{} created (id: {})", action.address, resource.id);
                        Outcome::success(ResourceStatus::Active, StateChange::Put(resource), message)
                    }
                    Err(err) => Outcome::failure(StateChange::Remove, &err, &secrets),
                }
            }
            ActionType::Update => {
                tracing::info!(
                    "Updating {} ({})",
                    action.address,
                    action.changed_fields.join(", ")
                );
                match self.update(driver.as_ref(), action, &desired).await {
                    Ok(resource) => {
                        let message = format!("{} updated", action.address);
                        Outcome::success(ResourceStatus::Active, StateChange::Refresh(resource), message)
                    }
                    Err(err) => Outcome::failure(StateChange::MarkFailed, &err, &secrets),
                }
            }
            ActionType::Replace => {
                tracing::info!("Replacing {}", action.address);
                if let Err(err) = self.delete(driver.as_ref(), action).await {
                    return Outcome::failure(StateChange::MarkFailed, &err, &secrets);
                }
                match self.create(driver.as_ref(), &desired).await {
                    Ok(resource) => {
                        let message = format!("{} replaced (id: {})", action.address, resource.id);
                        Outcome::success(ResourceStatus::Active, StateChange::Put(resource), message)
                    }
                    Err(err) => Outcome::failure(StateChange::Remove, &err, &secrets),
                }
            }
            ActionType::Delete => {
                tracing::info!("Deleting {}", action.address);
                match self.delete(driver.as_ref(), action).await {
                    Ok(()) => Outcome::success(
                        ResourceStatus::Absent,
                        StateChange::Remove,
                        format!("{} deleted", action.address),
                    ),
                    Err(err) => Outcome::failure(StateChange::MarkFailed, &err, &secrets),
                }
            }
            ActionType::NoOp => {
                Outcome::success(ResourceStatus::Active, StateChange::Keep, String::new())
            }
        }
    }

    async fn create(&self, driver: &dyn ResourceDriver, desired: &Record) -> Result<ResourceState> {
        let mut data = ResourceData::new(desired.clone());
        let id = driver.create(&mut data, &self.ctx).await?;
        let mut resource = ResourceState::new(driver.kind(), id);
        resource.capture(driver.schema(), &data, desired);
        Ok(resource)
    }

    async fn update(
        &self,
        driver: &dyn ResourceDriver,
        action: &Action,
        desired: &Record,
    ) -> Result<ResourceState> {
        let prior = prior_data(action)?;
        let id = prior.require_id()?.clone();

        // Observed fields the caller left unset stay as the control plane reports them
        let mut record = prior.record().clone();
        for (name, value) in desired.iter() {
            record.set(name.clone(), value.clone());
        }
        // A changed field missing from the desired record is being reset
        for name in &action.changed_fields {
            if !desired.contains(name) {
                record.remove(name);
            }
        }

        let mut data = ResourceData::new(record)
            .with_id(id.clone())
            .with_changes(action.changed_fields.iter().cloned());
        driver.update(&mut data, &self.ctx).await?;

        let mut resource = ResourceState::new(driver.kind(), id);
        resource.capture(driver.schema(), &data, desired);
        Ok(resource)
    }

    async fn delete(&self, driver: &dyn ResourceDriver, action: &Action) -> Result<()> {
        let mut data = prior_data(action)?.clone();
        driver.delete(&mut data, &self.ctx).await?;
        if data.id().is_some() {
            tracing::debug!("{} kept its identity after delete, dropping it", action.address);
        }
        Ok(())
    }
}

fn prior_data(action: &Action) -> Result<&ResourceData> {
    action
        .prior
        .as_ref()
        .ok_or_else(|| CloudError::StateError(format!("no stored identity for {}", action.address)))
}

/// Decode, default and validate a desired resource
fn desired_record(schema: &Schema, resource: &ResourceConfig) -> Result<Record> {
    let address = resource.address();
    let mut record = schema
        .record_from_json(&resource.config)
        .context(format!("decoding {}", address))?;
    schema.apply_defaults(&mut record);
    schema
        .validate(&record)
        .into_result()
        .context(format!("validating {}", address))?;
    Ok(record)
}

/// Fields whose desired value differs from the observed one
///
/// Output-only and diff-suppressed fields never count. A field the caller
/// left unset counts when it is not computed and the object still carries a
/// non-zero value for it, so removing it resets it. Sensitive fields are
/// compared through the stored fingerprints since the control plane does
/// not echo them back.
fn changed_fields(
    schema: &Schema,
    desired: &Record,
    observed: &ResourceData,
    stored: &ResourceState,
) -> Vec<String> {
    schema
        .fields()
        .iter()
        .filter(|field| {
            if field.is_output_only() {
                return false;
            }
            if field.diff_suppress.is_some_and(|suppress| suppress(desired)) {
                return false;
            }
            let Some(want) = desired.get(field.name) else {
                if field.computed {
                    return false;
                }
                if field.sensitive {
                    return stored.fingerprints.contains_key(field.name);
                }
                return observed.get(field.name).is_some_and(|have| !have.is_zero());
            };
            if field.sensitive {
                return stored.fingerprints.get(field.name) != Some(&fingerprint(&want.render()));
            }
            observed.get(field.name) != Some(want)
        })
        .map(|field| field.name.to_string())
        .collect()
}

fn action(
    action_type: ActionType,
    resource: &ResourceConfig,
    changed_fields: Vec<String>,
    desired: Option<Record>,
    prior: Option<ResourceData>,
) -> Action {
    let address = resource.address();
    let description = if changed_fields.is_empty() {
        format!("{} {}", action_type, address)
    } else {
        format!("{} {} ({})", action_type, address, changed_fields.join(", "))
    };
    Action {
        id: format!("{}-{}", action_type, address),
        action_type,
        kind: resource.kind.clone(),
        address,
        description,
        changed_fields,
        desired,
        prior,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::identity::Identity;
    use crate::schema::FieldSpec;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// In-memory driver backed by a map of id to record
    struct WidgetDriver {
        schema: Schema,
        objects: Mutex<BTreeMap<String, Record>>,
        next_id: AtomicUsize,
        updates: AtomicUsize,
        deletes: AtomicUsize,
        fail_create: bool,
        fail_update: AtomicBool,
    }

    impl WidgetDriver {
        fn new() -> Self {
            Self {
                schema: Schema::new(vec![
                    FieldSpec::string("name").required().force_new(),
                    FieldSpec::int("size").default_value(1i64),
                    FieldSpec::string("secret").sensitive(),
                    FieldSpec::string("label"),
                    FieldSpec::string("status").computed(),
                ]),
                objects: Mutex::new(BTreeMap::new()),
                next_id: AtomicUsize::new(1),
                updates: AtomicUsize::new(0),
                deletes: AtomicUsize::new(0),
                fail_create: false,
                fail_update: AtomicBool::new(false),
            }
        }

        fn failing() -> Self {
            Self {
                fail_create: true,
                ..Self::new()
            }
        }

        fn stored(&self, record: &Record) -> Record {
            let mut stored = record.clone();
            stored.remove("secret");
            stored.set("status", "ready");
            stored
        }
    }

    #[async_trait]
    impl ResourceDriver for WidgetDriver {
        fn kind(&self) -> &str {
            "widget"
        }

        fn schema(&self) -> &Schema {
            &self.schema
        }

        async fn create(&self, data: &mut ResourceData, ctx: &OperationContext) -> Result<Identity> {
            if self.fail_create {
                let secret = data.get_str("secret").unwrap_or_default().to_string();
                return Err(ServiceError::new("Forbidden", format!("secret {} rejected", secret)).into());
            }
            let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
            let stored = self.stored(data.record());
            self.objects.lock().unwrap().insert(id.clone(), stored);
            data.set_id(id.as_str());
            self.read(data, ctx).await?;
            Ok(Identity::new(id))
        }

        async fn read(&self, data: &mut ResourceData, _ctx: &OperationContext) -> Result<()> {
            let id = data.require_id()?.to_string();
            let objects = self.objects.lock().unwrap();
            let object = objects
                .get(&id)
                .ok_or_else(|| CloudError::ResourceNotFound(id.clone()))?;
            for (name, value) in object.iter() {
                data.set(name.clone(), value.clone());
            }
            Ok(())
        }

        async fn update(&self, data: &mut ResourceData, ctx: &OperationContext) -> Result<()> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            if self.fail_update.load(Ordering::SeqCst) {
                return Err(ServiceError::new("Throttling", "try again later").into());
            }
            let id = data.require_id()?.to_string();
            let stored = self.stored(data.record());
            self.objects.lock().unwrap().insert(id, stored);
            self.read(data, ctx).await
        }

        async fn delete(&self, data: &mut ResourceData, _ctx: &OperationContext) -> Result<()> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            let id = data.require_id()?.to_string();
            self.objects.lock().unwrap().remove(&id);
            data.clear_id();
            Ok(())
        }
    }

    fn reconciler(driver: Arc<WidgetDriver>, root: &std::path::Path) -> Reconciler {
        let mut drivers = DriverSet::new();
        drivers.insert(driver);
        Reconciler::new(drivers, StateManager::new(root))
    }

    fn desired(config: serde_json::Value) -> ResourceSet {
        let mut set = ResourceSet::new();
        set.add(ResourceConfig::new("widget", "main", config));
        set
    }

    #[tokio::test]
    async fn test_create_then_noop() {
        let dir = tempdir().unwrap();
        let driver = Arc::new(WidgetDriver::new());
        let reconciler = reconciler(driver.clone(), dir.path());
        let set = desired(json!({"name": "alpha"}));

        let (plan, result) = reconciler.run(&set).await.unwrap();
        assert_eq!(plan.actions[0].action_type, ActionType::Create);
        assert!(result.is_success());
        assert_eq!(result.succeeded[0].status, ResourceStatus::Active);

        let state = StateManager::new(dir.path()).load().await.unwrap();
        let stored = state.get_resource("widget.main").unwrap();
        assert_eq!(stored.id.as_str(), "1");
        assert_eq!(stored.attributes.get_str("status"), Some("ready"));
        assert_eq!(stored.attributes.get_int("size"), Some(1));

        let plan = reconciler.plan(&set).await.unwrap();
        assert!(!plan.has_changes);
    }

    #[tokio::test]
    async fn test_in_place_update_carries_changed_fields() {
        let dir = tempdir().unwrap();
        let driver = Arc::new(WidgetDriver::new());
        let reconciler = reconciler(driver.clone(), dir.path());
        reconciler.run(&desired(json!({"name": "alpha"}))).await.unwrap();

        let set = desired(json!({"name": "alpha", "size": 3}));
        let plan = reconciler.plan(&set).await.unwrap();
        let action = &plan.actions[0];
        assert_eq!(action.action_type, ActionType::Update);
        assert_eq!(action.changed_fields, vec!["size".to_string()]);

        let result = reconciler.apply(&plan).await.unwrap();
        assert!(result.is_success());
        assert_eq!(driver.updates.load(Ordering::SeqCst), 1);
        assert!(!reconciler.plan(&set).await.unwrap().has_changes);
    }

    #[tokio::test]
    async fn test_dropping_optional_field_resets_it() {
        let dir = tempdir().unwrap();
        let driver = Arc::new(WidgetDriver::new());
        let reconciler = reconciler(driver.clone(), dir.path());
        reconciler
            .run(&desired(json!({"name": "alpha", "label": "blue"})))
            .await
            .unwrap();

        let set = desired(json!({"name": "alpha"}));
        let plan = reconciler.plan(&set).await.unwrap();
        let action = &plan.actions[0];
        assert_eq!(action.action_type, ActionType::Update);
        assert_eq!(action.changed_fields, vec!["label".to_string()]);

        let result = reconciler.apply(&plan).await.unwrap();
        assert!(result.is_success());
        let objects = driver.objects.lock().unwrap();
        assert!(!objects["1"].contains("label"));
        drop(objects);
        assert!(!reconciler.plan(&set).await.unwrap().has_changes);
    }

    #[tokio::test]
    async fn test_failed_update_keeps_identity() {
        let dir = tempdir().unwrap();
        let driver = Arc::new(WidgetDriver::new());
        let reconciler = reconciler(driver.clone(), dir.path());
        reconciler.run(&desired(json!({"name": "alpha"}))).await.unwrap();

        driver.fail_update.store(true, Ordering::SeqCst);
        let (_, result) = reconciler
            .run(&desired(json!({"name": "alpha", "size": 5})))
            .await
            .unwrap();
        assert!(!result.is_success());
        assert_eq!(result.failed[0].status, ResourceStatus::Failed);

        let state = StateManager::new(dir.path()).load().await.unwrap();
        let stored = state.get_resource("widget.main").unwrap();
        assert_eq!(stored.id.as_str(), "1");
        assert_eq!(stored.status, ResourceStatus::Failed);

        driver.fail_update.store(false, Ordering::SeqCst);
        let (plan, result) = reconciler
            .run(&desired(json!({"name": "alpha", "size": 5})))
            .await
            .unwrap();
        assert_eq!(plan.actions[0].action_type, ActionType::Update);
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_force_new_field_replaces() {
        let dir = tempdir().unwrap();
        let driver = Arc::new(WidgetDriver::new());
        let reconciler = reconciler(driver.clone(), dir.path());
        reconciler.run(&desired(json!({"name": "alpha"}))).await.unwrap();

        let (plan, result) = reconciler
            .run(&desired(json!({"name": "beta"})))
            .await
            .unwrap();
        assert_eq!(plan.actions[0].action_type, ActionType::Replace);
        assert!(result.is_success());
        assert_eq!(driver.deletes.load(Ordering::SeqCst), 1);

        let state = StateManager::new(dir.path()).load().await.unwrap();
        assert_eq!(state.get_resource("widget.main").unwrap().id.as_str(), "2");
    }

    #[tokio::test]
    async fn test_sensitive_change_detected_by_fingerprint() {
        let dir = tempdir().unwrap();
        let driver = Arc::new(WidgetDriver::new());
        let reconciler = reconciler(driver.clone(), dir.path());
        reconciler
            .run(&desired(json!({"name": "alpha", "secret": "one"})))
            .await
            .unwrap();

        let same = reconciler
            .plan(&desired(json!({"name": "alpha", "secret": "one"})))
            .await
            .unwrap();
        assert!(!same.has_changes);

        let changed = reconciler
            .plan(&desired(json!({"name": "alpha", "secret": "two"})))
            .await
            .unwrap();
        assert_eq!(changed.actions[0].action_type, ActionType::Update);
        assert_eq!(changed.actions[0].changed_fields, vec!["secret".to_string()]);

        let raw = std::fs::read_to_string(dir.path().join(".aliform/state.json")).unwrap();
        assert!(!raw.contains("\"one\""));
    }

    #[tokio::test]
    async fn test_removed_resource_is_deleted() {
        let dir = tempdir().unwrap();
        let driver = Arc::new(WidgetDriver::new());
        let reconciler = reconciler(driver.clone(), dir.path());
        reconciler.run(&desired(json!({"name": "alpha"}))).await.unwrap();

        let result = reconciler.destroy_all().await.unwrap();
        assert!(result.is_success());
        assert_eq!(result.succeeded[0].status, ResourceStatus::Absent);
        assert!(driver.objects.lock().unwrap().is_empty());

        let state = StateManager::new(dir.path()).load().await.unwrap();
        assert!(state.resources.is_empty());
    }

    #[tokio::test]
    async fn test_vanished_object_is_recreated() {
        let dir = tempdir().unwrap();
        let driver = Arc::new(WidgetDriver::new());
        let reconciler = reconciler(driver.clone(), dir.path());
        let set = desired(json!({"name": "alpha"}));
        reconciler.run(&set).await.unwrap();

        driver.objects.lock().unwrap().clear();

        let plan = reconciler.plan(&set).await.unwrap();
        assert_eq!(plan.actions[0].action_type, ActionType::Create);
        assert_eq!(plan.diagnostics.len(), 1);
        assert!(!plan.diagnostics.has_errors());
    }

    #[tokio::test]
    async fn test_failed_create_persists_nothing_and_redacts() {
        let dir = tempdir().unwrap();
        let reconciler = reconciler(Arc::new(WidgetDriver::failing()), dir.path());

        let (_, result) = reconciler
            .run(&desired(json!({"name": "alpha", "secret": "hunter2"})))
            .await
            .unwrap();
        assert!(!result.is_success());
        assert_eq!(result.failed[0].status, ResourceStatus::Failed);

        let diagnostic = result.diagnostics().into_iter().next().unwrap();
        assert_eq!(diagnostic.code, "Forbidden");
        assert!(!diagnostic.summary.contains("hunter2"));
        assert!(diagnostic.summary.contains("<sensitive>"));

        let state = StateManager::new(dir.path()).load().await.unwrap();
        assert!(state.resources.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_desired_record_fails_planning() {
        let dir = tempdir().unwrap();
        let reconciler = reconciler(Arc::new(WidgetDriver::new()), dir.path());

        let err = reconciler
            .plan(&desired(json!({"size": 2})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ValidationFailed");
    }

    #[tokio::test]
    async fn test_unknown_kind() {
        let dir = tempdir().unwrap();
        let reconciler = reconciler(Arc::new(WidgetDriver::new()), dir.path());
        let mut set = ResourceSet::new();
        set.add(ResourceConfig::new("gadget", "g", json!({})));

        let err = reconciler.plan(&set).await.unwrap_err();
        assert!(matches!(err, CloudError::DriverNotFound(_)));
    }
}
