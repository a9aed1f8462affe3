//! Panic containment around store calls
//!
//! A store implementation that panics must not take the flush thread down
//! with it. The panic becomes a `StoreError` for the call that raised it.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::error::StoreError;
use crate::store::StoreResult;

/// Run one store call, turning a panic into `StoreError::Unavailable`
pub(crate) fn guarded<T>(
    what: &str,
    collection: &str,
    call: impl FnOnce() -> StoreResult<T>,
) -> StoreResult<T> {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(payload) => {
            let reason = panic_reason(payload.as_ref());
            tracing::error!("store panicked during {} on {}: {}", what, collection, reason);
            Err(StoreError::Unavailable(format!("store panicked: {}", reason)))
        }
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
