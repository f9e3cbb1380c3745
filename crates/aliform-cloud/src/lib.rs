//! Aliform Cloud Engine
//!
//! This crate provides the provider-neutral core of Aliform: the error model,
//! identity codec, convergence poller, driver contract, schema layer and the
//! planner that reconciles desired resources with a cloud control plane.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │            Embedding process / manifest          │
//! └─────────────────┬───────────────────────────────┘
//!                   │ ResourceSet
//! ┌─────────────────▼───────────────────────────────┐
//! │                 aliform-cloud                    │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │        Reconciler (plan / apply)          │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌────────────┐ ┌────────────┐ ┌────────────┐   │
//! │  │   Schema   │ │ Converger  │ │ State Mgmt │   │
//! │  └────────────┘ └────────────┘ └────────────┘   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │   trait ResourceDriver + DriverRegistry   │   │
//! │  └──────────────────────────────────────────┘   │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │              aliform-cloud-aliyun                │
//! │        FC / Container Registry / DCDN            │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod action;
pub mod classify;
pub mod converge;
pub mod data;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod identity;
pub mod reconcile;
pub mod registry;
pub mod resource;
pub mod schema;
pub mod state;

// Re-exports
pub use action::{Action, ActionResult, ActionType, ApplyResult, Plan, PlanSummary};
pub use classify::{is_expected_error, is_expected_result, not_found_or, tolerate};
pub use converge::{Backoff, CancelToken, Converger, PollOutcome};
pub use data::{Record, ResourceData, Value};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use driver::{OperationContext, ResourceDriver};
pub use error::{CloudError, Result, ResultExt, ServiceError};
pub use identity::Identity;
pub use reconcile::Reconciler;
pub use registry::{DriverConstructor, DriverRegistry, DriverSet};
pub use resource::{ResourceConfig, ResourceSet};
pub use schema::{FieldKind, FieldSpec, Schema, Timeouts, Validator};
pub use state::{GlobalState, ResourceState, ResourceStatus, StateLock, StateManager};
