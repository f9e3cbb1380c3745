//! Cloud engine error types

use std::panic::Location;
use std::time::Duration;
use thiserror::Error;

/// Structured error returned by a control-plane API
///
/// Carries the discrete error `code` alongside the free-text `message`. Some
/// API families bury the meaningful code inside the message, which is why the
/// classifier tests both.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ServiceError {
    /// Symbolic error code (e.g. "FunctionNotFound")
    pub code: String,

    /// Human readable message
    pub message: String,

    /// Request id reported by the control plane, if any
    pub request_id: Option<String>,

    /// HTTP status of the failed call, if known
    pub http_status: Option<u16>,
}

impl ServiceError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            request_id: None,
            http_status: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// True if any of `codes` equals the code or occurs inside the message
    pub fn matches_any(&self, codes: &[&str]) -> bool {
        codes
            .iter()
            .any(|code| self.code == *code || self.message.contains(code))
    }
}

/// Cloud engine errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Invalid resource id {id}: expected {expected} parts, got {actual}")]
    InvalidIdentity {
        id: String,
        expected: usize,
        actual: usize,
    },

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timed out after {timeout:?} waiting for resource to converge: {reason}")]
    ConvergenceTimeout { timeout: Duration, reason: String },

    #[error("Resource failed to converge: {0}")]
    ConvergenceFatal(#[source] Box<CloudError>),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    #[error("Resource kind {0} does not support in-place update")]
    UpdateUnsupported(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("State file error: {0}")]
    StateError(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("{}", render_context(.location, .context, .source))]
    Context {
        context: Option<String>,
        location: &'static Location<'static>,
        source: Box<CloudError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn render_context(
    location: &Location<'_>,
    context: &Option<String>,
    source: &CloudError,
) -> String {
    match context {
        Some(context) => format!(
            "[{}:{}] {}: {}",
            location.file(),
            location.line(),
            context,
            source
        ),
        None => format!("[{}:{}] {}", location.file(), location.line(), source),
    }
}

impl CloudError {
    /// Wrap an error with the caller's location and an optional context message
    #[track_caller]
    pub fn wrap(cause: impl Into<CloudError>, context: Option<String>) -> Self {
        CloudError::Context {
            context,
            location: Location::caller(),
            source: Box::new(cause.into()),
        }
    }

    /// The innermost error below any context wrappers and convergence failures
    pub fn root_cause(&self) -> &CloudError {
        match self {
            CloudError::Context { source, .. } => source.root_cause(),
            CloudError::ConvergenceFatal(source) => source.root_cause(),
            other => other,
        }
    }

    /// True if this error is the Read "object not found" sentinel
    pub fn is_not_found(&self) -> bool {
        matches!(self.root_cause(), CloudError::ResourceNotFound(_))
    }

    /// Classify against a list of symbolic expected-error codes
    pub fn is_expected(&self, codes: &[&str]) -> bool {
        crate::classify::is_expected_error(self, codes)
    }

    /// Short symbolic code for diagnostics
    ///
    /// Control-plane errors report their own code, everything else the
    /// taxonomy name of the variant.
    pub fn code(&self) -> String {
        match self {
            CloudError::Context { source, .. } => source.code(),
            CloudError::Service(e) => e.code.clone(),
            CloudError::InvalidIdentity { .. } => "InvalidIdentity".to_string(),
            CloudError::Transport(_) => "TransportOrProtocolError".to_string(),
            CloudError::ConvergenceTimeout { .. } => "ConvergenceTimeout".to_string(),
            CloudError::ConvergenceFatal(_) => "ConvergenceFatal".to_string(),
            CloudError::Cancelled => "Cancelled".to_string(),
            CloudError::ResourceNotFound(_) => "NotFound".to_string(),
            CloudError::DriverNotFound(_) => "DriverNotFound".to_string(),
            CloudError::UpdateUnsupported(_) => "UpdateUnsupported".to_string(),
            CloudError::InvalidConfig(_) => "InvalidConfig".to_string(),
            CloudError::Validation(_) => "ValidationFailed".to_string(),
            CloudError::StateError(_) => "StateError".to_string(),
            CloudError::LockError(_) => "LockError".to_string(),
            CloudError::Io(_) => "IoError".to_string(),
            CloudError::Json(_) => "JsonError".to_string(),
        }
    }
}

/// Attach call-site context to fallible results
pub trait ResultExt<T> {
    /// Wrap the error with a descriptive message and the caller's location
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Wrap the error with the caller's location only
    fn wrap_err(self) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<CloudError>,
{
    #[track_caller]
    fn context(self, context: impl Into<String>) -> Result<T> {
        let location = Location::caller();
        self.map_err(|e| CloudError::Context {
            context: Some(context.into()),
            location,
            source: Box::new(e.into()),
        })
    }

    #[track_caller]
    fn wrap_err(self) -> Result<T> {
        let location = Location::caller();
        self.map_err(|e| CloudError::Context {
            context: None,
            location,
            source: Box::new(e.into()),
        })
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn failing() -> Result<()> {
        Err(CloudError::Transport("connection reset".to_string()))
    }

    #[test]
    fn test_context_captures_call_site() {
        let err = failing().context("describing domain").unwrap_err();
        let text = err.to_string();
        assert!(text.contains("error.rs"));
        assert!(text.contains("describing domain"));
        assert!(text.contains("connection reset"));
    }

    #[test]
    fn test_root_cause_unwraps_nested_context() {
        let err = failing()
            .wrap_err()
            .context("outer")
            .unwrap_err();
        assert!(matches!(err.root_cause(), CloudError::Transport(_)));
        assert_eq!(err.code(), "TransportOrProtocolError");
    }

    #[test]
    fn test_not_found_through_wrappers() {
        let err = CloudError::wrap(CloudError::ResourceNotFound("a:b".to_string()), None);
        assert!(err.is_not_found());
        assert!(!CloudError::Cancelled.is_not_found());
    }

    #[test]
    fn test_service_error_code() {
        let err: CloudError = ServiceError::new("Throttling", "slow down")
            .with_http_status(429)
            .into();
        assert_eq!(err.code(), "Throttling");
        assert_eq!(err.to_string(), "Service error: Throttling: slow down");
    }
}
