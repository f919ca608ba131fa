//! Cooperative cancellation for builds.
//!
//! A signal handler only flips an atomic flag; the build loop polls the
//! flag between sandbox execs and unwinds normally, so every guard acquired
//! by the build (sandbox session, workspace) runs its release path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Set from the signal handler.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// A cancellation token checked at stage boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    local: Arc<AtomicBool>,
    follow_signals: bool,
}

impl CancelToken {
    /// A token that is only cancelled through [`CancelToken::cancel`].
    pub fn new() -> Self {
        CancelToken {
            local: Arc::new(AtomicBool::new(false)),
            follow_signals: false,
        }
    }

    /// A token that is also cancelled by SIGINT/SIGTERM once
    /// [`install_signal_handlers`] has run.
    pub fn from_signals() -> Self {
        CancelToken {
            local: Arc::new(AtomicBool::new(false)),
            follow_signals: true,
        }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.local.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.local.load(Ordering::SeqCst)
            || (self.follow_signals && INTERRUPTED.load(Ordering::SeqCst))
    }
}

#[cfg(unix)]
extern "C" fn on_signal(_sig: std::os::raw::c_int) {
    // Async-signal-safe: atomics only.
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Install SIGINT/SIGTERM handlers that request cancellation instead of
/// terminating the process.
///
/// Must be called from `main` before any worker threads are spawned.
#[cfg(unix)]
pub fn install_signal_handlers() -> nix::Result<()> {
    use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

    let action = SigAction::new(
        SigHandler::Handler(on_signal),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );

    // SAFETY: the handler only stores to a static atomic.
    unsafe {
        sigaction(Signal::SIGINT, &action)?;
        sigaction(Signal::SIGTERM, &action)?;
    }

    tracing::debug!("interrupt handlers installed (SIGINT, SIGTERM)");
    Ok(())
}

#[cfg(not(unix))]
pub fn install_signal_handlers() -> std::io::Result<()> {
    Ok(())
}
