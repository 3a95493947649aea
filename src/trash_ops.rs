//! Thin wrapper around the `trash` crate.
//!
//! The Windows backend talks to shell COM APIs and can panic when the
//! calling thread already initialized COM with a different concurrency
//! model. A deletion that panics must surface as a failed operation in the
//! transaction log, not take the process down, so calls go through
//! `catch_unwind`.

use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

/// Move `path` to the platform trash / recycle bin.
pub fn delete(path: &Path) -> io::Result<()> {
    let outcome = catch_unwind(AssertUnwindSafe(|| trash::delete(path)));

    match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(io::Error::other(err)),
        Err(payload) => Err(io::Error::other(format!(
            "trash backend panicked: {}",
            panic_message(&payload)
        ))),
    }
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
