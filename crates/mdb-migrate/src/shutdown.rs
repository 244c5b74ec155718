//! Interrupt handling.
//!
//! A [`ShutdownSignal`] turns SIGINT/SIGTERM into a one-shot
//! [`CancellationToken`]. Every blocking database call is raced against the
//! token with [`cancellable`], so an interrupt unwinds the run promptly with
//! [`MigrateError::Cancelled`].

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{MigrateError, Result};

/// One-shot cancellation shared by the signal listeners and the copy engine.
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    token: CancellationToken,
    fired: AtomicBool,
}

impl ShutdownSignal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Token observed by blocking calls.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Record an interrupt request.
    ///
    /// Returns `true` if this call cancelled the token; later calls have no effect.
    pub fn trigger(&self, reason: &str) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            debug!("{} received while already shutting down", reason);
            return false;
        }
        warn!("{} received, cancelling copy", reason);
        self.token.cancel();
        true
    }

    /// Whether an interrupt has been recorded.
    pub fn is_triggered(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Spawn listeners for SIGINT and SIGTERM.
    ///
    /// Listeners keep running after the first signal so repeated interrupts
    /// are absorbed instead of killing the process mid-rollback.
    #[cfg(unix)]
    pub fn install(self: &Arc<Self>) -> Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        let this = Arc::clone(self);
        tokio::spawn(async move {
            while sigint.recv().await.is_some() {
                this.trigger("SIGINT");
            }
        });

        let this = Arc::clone(self);
        tokio::spawn(async move {
            while sigterm.recv().await.is_some() {
                this.trigger("SIGTERM");
            }
        });

        Ok(())
    }

    /// Spawn a listener for Ctrl-C.
    #[cfg(not(unix))]
    pub fn install(self: &Arc<Self>) -> Result<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                this.trigger("Ctrl-C");
            }
        });
        Ok(())
    }
}

/// Run `fut` unless `cancel` fires first.
///
/// Cancellation wins ties, so work never starts once the token is cancelled.
/// The losing future is dropped, which aborts the in-flight driver call.
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(MigrateError::Cancelled),
        result = fut => result,
    }
}
