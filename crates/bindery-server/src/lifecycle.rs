//! Running a service's long-lived tasks together.
//!
//! ```rust,ignore
//! use bindery_core::Cancellation;
//! use bindery_server::{shutdown, Daemons};
//!
//! let shutdown = Cancellation::new();
//! shutdown::trigger_on_os_signal(shutdown.clone());
//!
//! Daemons::new()
//!     .add("http", server.run_with_shutdown(shutdown.clone()))
//!     .add("metrics", exporter)
//!     .run_until(shutdown.cancelled())
//!     .await?;
//! ```

use std::fmt;
use std::future::Future;

use bindery_codec::BoxError;
use bindery_telemetry::Report;
use futures_util::future::BoxFuture;
use futures_util::stream::{FuturesUnordered, StreamExt};
use futures_util::FutureExt;

use crate::error::ServerError;

type DaemonFuture = BoxFuture<'static, Result<(), BoxError>>;

/// A set of named daemons run concurrently.
#[derive(Default)]
#[must_use]
pub struct Daemons {
    daemons: Vec<(String, DaemonFuture)>,
}

impl fmt::Debug for Daemons {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Daemons")
            .field("names", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

impl Daemons {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a daemon.
    pub fn add<F, E>(mut self, name: impl Into<String>, daemon: F) -> Self
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError>,
    {
        let daemon = daemon.map(|result| result.map_err(Into::into)).boxed();
        self.daemons.push((name.into(), daemon));
        self
    }

    /// Returns the daemon names in the order they were added.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.daemons.iter().map(|(name, _)| name.as_str())
    }

    /// Returns the number of daemons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.daemons.len()
    }

    /// Returns `true` if no daemon was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.daemons.is_empty()
    }

    /// Runs every daemon until one fails, all finish, or `shutdown` completes.
    ///
    /// Daemons still running when this returns are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Daemon`] for the first daemon that fails.
    pub async fn run_until<S>(self, shutdown: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()>,
    {
        let mut running: FuturesUnordered<_> = self
            .daemons
            .into_iter()
            .map(|(name, daemon)| daemon.map(move |result| (name, result)))
            .collect();

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!(remaining = running.len(), "Shutdown requested, stopping daemons");
                    return Ok(());
                }
                next = running.next() => match next {
                    None => {
                        tracing::info!("All daemons finished");
                        return Ok(());
                    }
                    Some((name, Ok(()))) => {
                        tracing::info!(daemon = %name, "Daemon finished");
                    }
                    Some((name, Err(source))) => {
                        tracing::error!(daemon = %name, error = %Report::new(&*source), "Daemon failed");
                        return Err(ServerError::Daemon { name, source });
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    async fn forever() -> Result<(), BoxError> {
        std::future::pending::<()>().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_daemons_finish() {
        let daemons = Daemons::new();
        assert!(daemons.is_empty());
        assert!(daemons.run_until(std::future::pending()).await.is_ok());
    }

    #[tokio::test]
    async fn test_all_daemons_finish() {
        let daemons = Daemons::new()
            .add("a", async { Ok::<(), BoxError>(()) })
            .add("b", async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok::<(), BoxError>(())
            });

        assert_eq!(daemons.len(), 2);
        assert_eq!(daemons.names().collect::<Vec<_>>(), ["a", "b"]);
        assert!(daemons.run_until(std::future::pending()).await.is_ok());
    }

    #[tokio::test]
    async fn test_first_failure_is_returned() {
        let daemons = Daemons::new()
            .add("http", forever())
            .add("metrics", async { Err::<(), _>(std::io::Error::other("port in use")) });

        let err = daemons.run_until(std::future::pending()).await.unwrap_err();
        match err {
            ServerError::Daemon { name, source } => {
                assert_eq!(name, "metrics");
                assert_eq!(source.to_string(), "port in use");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_shutdown_stops_waiting() {
        let dropped = Arc::new(AtomicBool::new(false));

        struct Flag(Arc<AtomicBool>);
        impl Drop for Flag {
            fn drop(&mut self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let flag = Flag(Arc::clone(&dropped));
        let daemons = Daemons::new().add("http", async move {
            let _flag = flag;
            forever().await
        });

        let result = tokio::time::timeout(
            Duration::from_secs(1),
            daemons.run_until(tokio::time::sleep(Duration::from_millis(5))),
        )
        .await
        .expect("run_until should return on shutdown");

        assert!(result.is_ok());
        assert!(dropped.load(Ordering::SeqCst));
    }
}
