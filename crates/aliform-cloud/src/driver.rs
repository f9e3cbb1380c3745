//! Resource driver contract
//!
//! One driver per managed-object kind. Drivers are stateless: everything a
//! Read, Update or Delete needs must be recoverable from the stored identity
//! and the record handed in.

use crate::converge::{CancelToken, Converger};
use crate::data::ResourceData;
use crate::error::{CloudError, Result};
use crate::identity::Identity;
use crate::schema::{Schema, Timeouts};
use async_trait::async_trait;

/// Per-invocation context handed to every driver operation
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    /// Cancellation shared with the caller
    pub cancel: CancelToken,

    /// Poller used for asynchronous activations
    pub converger: Converger,

    /// Overrides the driver's own timeouts when set
    pub timeouts: Option<Timeouts>,
}

impl OperationContext {
    pub fn new(cancel: CancelToken) -> Self {
        Self {
            cancel,
            ..Default::default()
        }
    }

    pub fn with_converger(mut self, converger: Converger) -> Self {
        self.converger = converger;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    /// Effective timeouts for a driver
    pub fn timeouts_for(&self, driver: &dyn ResourceDriver) -> Timeouts {
        self.timeouts.unwrap_or_else(|| driver.timeouts())
    }
}

/// Lifecycle contract every resource kind implements
///
/// State machine per object:
/// `Absent -> Create -> Active -> Update -> Active -> Delete -> Absent`.
/// Create stays pending inside the driver until convergence succeeds; a fatal
/// or timed-out convergence ends in `Failed` with no identity persisted.
#[async_trait]
pub trait ResourceDriver: Send + Sync {
    /// Resource kind name (e.g. "aliyun_dcdn_domain")
    fn kind(&self) -> &str;

    /// Recognized fields
    fn schema(&self) -> &Schema;

    /// Operation deadlines
    fn timeouts(&self) -> Timeouts {
        Timeouts::default()
    }

    /// Create the object, wait for it to become usable and return its identity
    ///
    /// On success `data` carries the identity and the observed fields. On
    /// failure no identity may be persisted, even if the control plane
    /// accepted the mutating call.
    async fn create(&self, data: &mut ResourceData, ctx: &OperationContext) -> Result<Identity>;

    /// Refresh every observable field from the control plane
    ///
    /// Returns [`CloudError::ResourceNotFound`] when the object is gone.
    async fn read(&self, data: &mut ResourceData, ctx: &OperationContext) -> Result<()>;

    /// Apply in-place changes for the fields in `data.changes()`, then re-read
    ///
    /// Fields that force replacement never reach this method.
    async fn update(&self, _data: &mut ResourceData, _ctx: &OperationContext) -> Result<()> {
        Err(CloudError::UpdateUnsupported(self.kind().to_string()))
    }

    /// Delete the object and clear the identity; "already absent" is success
    async fn delete(&self, data: &mut ResourceData, ctx: &OperationContext) -> Result<()>;
}
