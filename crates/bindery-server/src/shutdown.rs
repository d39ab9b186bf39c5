//! Graceful shutdown.
//!
//! The server's shutdown trigger is a [`Cancellation`]; the same handle is
//! shared with every request context, so handlers can observe shutdown.
//!
//! ```rust,ignore
//! use bindery_core::Cancellation;
//! use bindery_server::shutdown;
//!
//! let shutdown = Cancellation::new();
//! shutdown::trigger_on_os_signal(shutdown.clone());
//! server.run_with_shutdown(shutdown).await?;
//! ```

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bindery_core::Cancellation;
use tokio::sync::Notify;

/// Waits for SIGTERM or SIGINT (Ctrl+C elsewhere than Unix).
///
/// # Errors
///
/// Returns an error if the signal handlers cannot be installed.
pub async fn os_signal() -> io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => tracing::info!("Received SIGTERM, initiating graceful shutdown"),
            _ = sigint.recv() => tracing::info!("Received SIGINT, initiating graceful shutdown"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        tracing::info!("Received Ctrl+C, initiating graceful shutdown");
    }

    Ok(())
}

/// Spawns a task that triggers `shutdown` on the first OS signal.
///
/// If the handlers cannot be installed the failure is logged and the
/// signal never fires.
pub fn trigger_on_os_signal(shutdown: Cancellation) {
    tokio::spawn(async move {
        match os_signal().await {
            Ok(()) => shutdown.trigger(),
            Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signals"),
        }
    });
}

/// Counts open connections so shutdown can wait for them.
///
/// ```rust
/// use bindery_server::shutdown::ConnectionTracker;
///
/// let tracker = ConnectionTracker::new();
/// let token = tracker.acquire();
/// assert_eq!(tracker.active_connections(), 1);
///
/// drop(token);
/// assert_eq!(tracker.active_connections(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl ConnectionTracker {
    /// Creates a new connection tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires a token held for the lifetime of a connection.
    #[must_use]
    pub fn acquire(&self) -> ConnectionToken {
        self.active.fetch_add(1, Ordering::SeqCst);
        ConnectionToken {
            active: Arc::clone(&self.active),
            notify: Arc::clone(&self.notify),
        }
    }

    /// Returns the number of active connections.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Waits until all tokens are dropped.
    pub async fn wait_for_idle(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a drop in between is not missed.
            notified.as_mut().enable();

            if self.active.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// A token representing an open connection.
#[derive(Debug)]
pub struct ConnectionToken {
    active: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl Drop for ConnectionToken {
    fn drop(&mut self) {
        if self.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
        }
    }
}
