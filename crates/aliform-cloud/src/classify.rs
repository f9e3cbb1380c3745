//! Expected-error classification
//!
//! Drivers use this to tell "already gone" conditions apart from real
//! failures without special-casing each API family. Structured control-plane
//! errors are matched on their code or message, anything else on its
//! rendered text.

use crate::error::{CloudError, Result, ServiceError};
use std::error::Error;

/// Returns true if the innermost cause of `err` matches any expected code
///
/// Context wrappers and other causal errors are unwrapped first. A
/// [`ServiceError`] matches when a code equals its `code` exactly or occurs
/// inside its `message`; any other error matches when a code occurs inside
/// its textual representation.
pub fn is_expected_error(err: &(dyn Error + 'static), expected_codes: &[&str]) -> bool {
    if expected_codes.is_empty() {
        return false;
    }

    let root = innermost(err);

    if let Some(service) = as_service_error(root) {
        return service.matches_any(expected_codes);
    }

    let text = root.to_string();
    expected_codes.iter().any(|code| text.contains(code))
}

/// Result variant of [`is_expected_error`]; a success is never "expected"
pub fn is_expected_result<T>(result: &Result<T>, expected_codes: &[&str]) -> bool {
    match result {
        Ok(_) => false,
        Err(err) => is_expected_error(err, expected_codes),
    }
}

/// Swallow an expected failure, turning it into `Ok(None)`
///
/// Used on delete paths where "already absent" means the goal is reached.
pub fn tolerate<T>(result: Result<T>, expected_codes: &[&str]) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if is_expected_error(&err, expected_codes) => {
            tracing::warn!("Ignoring expected error: {}", err.code());
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Map an expected "object is gone" failure to the Read sentinel
pub fn not_found_or(err: CloudError, expected_codes: &[&str], id: &str) -> CloudError {
    if is_expected_error(&err, expected_codes) {
        CloudError::ResourceNotFound(id.to_string())
    } else {
        err
    }
}

fn innermost<'a>(err: &'a (dyn Error + 'static)) -> &'a (dyn Error + 'static) {
    let mut current = err;
    while let Some(source) = current.source() {
        current = source;
    }
    current
}

fn as_service_error<'a>(err: &'a (dyn Error + 'static)) -> Option<&'a ServiceError> {
    if let Some(service) = err.downcast_ref::<ServiceError>() {
        return Some(service);
    }
    match err.downcast_ref::<CloudError>() {
        Some(CloudError::Service(service)) => Some(service),
        _ => None,
    }
}
