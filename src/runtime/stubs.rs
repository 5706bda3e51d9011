//! Bridge stubs callable from native code
//!
//! These extern "C" functions expose the process-wide lifecycle to hosts that
//! link the crate as a static library. They handle:
//! - Bringing the runtime up and tearing it down
//! - Releasing array buffers handed out earlier
//! - Disposing iterators
//!
//! The calling convention is:
//! - Handles are passed as their raw u64 value
//! - Buffer addresses are passed as usize
//! - Results are `c_int` status codes, 0 meaning success

use libc::c_int;

use crate::error::BridgeError;
use crate::handle::{Handle, ReleaseStatus};
use crate::lifecycle;

/// Handle was never issued or is no longer live.
pub const STATUS_INVALID_HANDLE: c_int = 1;

/// The runtime has been released or never came up.
pub const STATUS_RELEASED: c_int = ReleaseStatus::RuntimeReleased as c_int;

/// Bring the process-wide runtime up.
///
/// Returns 0 when the runtime is ready and -1 when initialization failed or
/// the runtime was already released. Repeated calls are cheap.
#[unsafe(no_mangle)]
pub extern "C" fn numbridge_acquire() -> c_int {
    match lifecycle::acquire() {
        Ok(_) => 0,
        Err(e) => {
            tracing::warn!("numbridge_acquire: {e}");
            -1
        }
    }
}

/// Tear the process-wide runtime down.
///
/// Returns 1 if a running runtime was finalized, 0 otherwise.
#[unsafe(no_mangle)]
pub extern "C" fn numbridge_release() -> c_int {
    c_int::from(lifecycle::release())
}

/// Release the array buffer at `data` owned through `handle`.
///
/// # Returns
/// - 0: released
/// - 1: stale or unknown handle (including a second free)
/// - 2: `data` does not match the handle's buffer
/// - 3: the runtime is not running
#[unsafe(no_mangle)]
pub extern "C" fn numbridge_free(handle: u64, data: usize) -> c_int {
    let Ok(interpreter) = lifecycle::acquire() else {
        return STATUS_RELEASED;
    };
    interpreter.free(Handle::from_raw(handle), data).code()
}

/// Dispose an iterator handle.
///
/// Returns 0 on success, 1 if `handle` is not a live iterator and 3 if the
/// runtime is not running.
#[unsafe(no_mangle)]
pub extern "C" fn numbridge_iter_dispose(handle: u64) -> c_int {
    let Ok(interpreter) = lifecycle::acquire() else {
        return STATUS_RELEASED;
    };
    match interpreter.dispose_handle(Handle::from_raw(handle)) {
        Ok(()) => 0,
        Err(BridgeError::Released) => STATUS_RELEASED,
        Err(_) => STATUS_INVALID_HANDLE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_match_release_status() {
        assert_eq!(STATUS_INVALID_HANDLE, ReleaseStatus::StaleHandle.code());
        assert_eq!(STATUS_RELEASED, 3);
    }
}
