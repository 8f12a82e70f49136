//! "Configuration reloaded" notification on `SIGHUP`.
//!
//! No configuration is actually re-read; the handler only announces the
//! signal. Platforms without `SIGHUP` get a no-op subscription.

use std::sync::atomic::{AtomicUsize, Ordering};

static RELOADS: AtomicUsize = AtomicUsize::new(0);

/// Number of reload notifications received so far.
pub fn reload_count() -> usize {
    RELOADS.load(Ordering::SeqCst)
}

#[cfg(unix)]
extern "C" fn on_hangup(_signal: libc::c_int) {
    const MESSAGE: &[u8] = b"\nConfiguration reloaded\n";
    RELOADS.fetch_add(1, Ordering::SeqCst);
    // Only async-signal-safe calls are allowed here.
    unsafe {
        libc::write(
            libc::STDOUT_FILENO,
            MESSAGE.as_ptr() as *const libc::c_void,
            MESSAGE.len(),
        );
    }
}

/// Install the reload handler. Returns whether a handler is active.
#[cfg(unix)]
pub fn subscribe_reload() -> bool {
    let handler = on_hangup as extern "C" fn(libc::c_int) as libc::sighandler_t;
    let previous = unsafe { libc::signal(libc::SIGHUP, handler) };
    if previous == libc::SIG_ERR {
        log::warn!("can't install SIGHUP handler");
        return false;
    }
    log::debug!("SIGHUP handler installed");
    true
}

/// Install the reload handler. Returns whether a handler is active.
#[cfg(not(unix))]
pub fn subscribe_reload() -> bool {
    false
}
