//! Result extension trait for logging errors with context.
//!
//! Used where an error is recorded and then deliberately swallowed, such
//! as the background lease sweep.

use std::fmt::Display;
use tracing::error;

/// Extension trait for logging errors with context.
pub trait ResultExt<T, E> {
    /// Log the error with context and the caller's location if this is an
    /// `Err` variant. The result is returned unchanged.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use proxmox_secrets::result_ext::ResultExt;
    ///
    /// let result: Result<(), &str> = Err("remote unavailable");
    /// let _ = result.log("revoking expired lease");
    /// ```
    fn log<S: ToString>(self, context: S) -> Result<T, E>;
}

impl<T, E: Display> ResultExt<T, E> for Result<T, E> {
    #[track_caller]
    fn log<S: ToString>(self, context: S) -> Result<T, E> {
        if let Err(ref e) = self {
            let caller_location = std::panic::Location::caller();
            error!(
                target: "proxmox_secrets",
                error = %e,
                file = %format!("{}:{}", caller_location.file(), caller_location.line()),
                context = %context.to_string(),
                "Operation failed"
            );
        }
        self
    }
}
