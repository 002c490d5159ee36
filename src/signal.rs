//! Ctrl-C handling while a run is in progress
//!
//! While installed, SIGINT only raises a flag. The engine adapter and the
//! orchestrator poll it, so the progress bar is always stopped and joined
//! before the process exits.

use anyhow::{Result, bail};
use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Whether SIGINT was received since `install`
pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

#[cfg(unix)]
extern "C" fn on_sigint(_signum: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Route SIGINT to the interrupt flag
#[cfg(unix)]
pub fn install() -> Result<()> {
    INTERRUPTED.store(false, Ordering::SeqCst);
    let handler = on_sigint as extern "C" fn(libc::c_int);
    // SAFETY: the handler only stores to an atomic, which is async-signal-safe
    let previous = unsafe { libc::signal(libc::SIGINT, handler as libc::sighandler_t) };
    if previous == libc::SIG_ERR {
        bail!("Failed to install interrupt handler");
    }
    Ok(())
}

/// Give SIGINT its default behavior back
#[cfg(unix)]
pub fn restore() {
    // SAFETY: resetting to SIG_DFL has no preconditions
    unsafe {
        libc::signal(libc::SIGINT, libc::SIG_DFL);
    }
}

#[cfg(not(unix))]
pub fn install() -> Result<()> {
    Ok(())
}

#[cfg(not(unix))]
pub fn restore() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_interrupted_after_install() {
        install().unwrap();
        assert!(!interrupted());
        restore();
    }
}
