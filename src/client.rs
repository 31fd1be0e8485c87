pub(crate) mod executor;
pub mod options;
#[cfg(test)]
mod test;

use std::{sync::Arc, time::Duration};

use derive_where::derive_where;

use crate::{
    cmap::ConnectionPool,
    db::Database,
    options::{ClientOptions, DatabaseOptions},
    sdam::Topology,
};

/// Checkout never waits less than this for a connection.
const MIN_CHECKOUT_TIMEOUT: Duration = Duration::from_secs(1);

/// This is the main entry point for the API. A `Client` executes CRUD operations against a single
/// deployment, using connections from the pool and the wire version reported by the topology it
/// was built with.
///
/// `Client` uses [`std::sync::Arc`](https://doc.rust-lang.org/std/sync/struct.Arc.html) internally,
/// so it can safely be shared across threads or async tasks.
#[derive(Clone, Debug)]
pub struct Client {
    inner: Arc<ClientInner>,
}

#[derive_where(Debug)]
struct ClientInner {
    #[derive_where(skip)]
    pool: Arc<dyn ConnectionPool>,
    #[derive_where(skip)]
    topology: Arc<dyn Topology>,
    options: ClientOptions,
}

impl Client {
    /// Creates a new `Client` that checks connections out of `pool` and chooses between the
    /// command and legacy protocols using the wire version reported by `topology`.
    pub fn with_components(
        pool: impl ConnectionPool + 'static,
        topology: impl Topology + 'static,
        options: impl Into<Option<ClientOptions>>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                pool: Arc::new(pool),
                topology: Arc::new(topology),
                options: options.into().unwrap_or_default(),
            }),
        }
    }

    /// Gets a handle to a database specified by `name` in the cluster the `Client` is connected to.
    ///
    /// This method does not send or receive anything across the wire to the database, so it can be
    /// used repeatedly without incurring any costs from I/O.
    pub fn database(&self, name: &str) -> Database {
        Database::new(self.clone(), name, None)
    }

    /// Gets a handle to a database specified by `name` in the cluster the `Client` is connected to.
    /// Operations done with this `Database` will use the options specified by `options` by default
    /// and will otherwise default to those of the `Client`.
    pub fn database_with_options(&self, name: &str, options: DatabaseOptions) -> Database {
        Database::new(self.clone(), name, Some(options))
    }

    /// The client-wide defaults for every operation.
    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    pub(crate) fn topology(&self) -> &dyn Topology {
        self.inner.topology.as_ref()
    }

    pub(crate) fn pool(&self) -> &Arc<dyn ConnectionPool> {
        &self.inner.pool
    }

    /// How long to wait for a connection for an operation on `items` documents:
    /// `wait_queue_timeout` if configured, otherwise four round trips (at least one second) plus
    /// a millisecond per document.
    pub(crate) fn checkout_timeout(&self, items: usize) -> Duration {
        if let Some(timeout) = self.inner.options.wait_queue_timeout {
            return timeout;
        }
        let latency = self
            .topology()
            .round_trip_time()
            .map(|rtt| rtt.saturating_mul(4))
            .unwrap_or_default()
            .max(MIN_CHECKOUT_TIMEOUT);
        latency.saturating_add(Duration::from_millis(items as u64))
    }
}
