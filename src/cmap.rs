//! The connection pool interface consumed by the CRUD engine, and the ownership marker that decides
//! whether a connection goes back to the pool when an operation is done with it.

pub(crate) mod conn;

use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
    time::Duration,
};

use derive_where::derive_where;

pub use self::conn::{
    Command,
    Connection,
    DeleteFlags,
    InsertFlags,
    LegacyMessage,
    QueryFlags,
    RawCommandResponse,
    Reply,
    ResponseFlags,
    StreamTransport,
    Transport,
    UpdateFlags,
};
use crate::{error::Result, trace::CONNECTION_TRACING_EVENT_TARGET, BoxFuture};

/// Hands out and reclaims authenticated connections. Implemented by the embedding driver.
pub trait ConnectionPool: Send + Sync {
    /// Checks out a connection that is authenticated for `request.database`.
    ///
    /// Fails with [`ErrorKind::PoolExhausted`](crate::error::ErrorKind::PoolExhausted) or
    /// [`ErrorKind::Authentication`](crate::error::ErrorKind::Authentication). The CRUD engine
    /// also bounds the wait by `request.timeout` itself.
    fn check_out(&self, request: CheckoutRequest) -> BoxFuture<'_, Result<Connection>>;

    /// Returns a connection to the pool. Connections for which
    /// [`Connection::is_healthy`] is false should be closed rather than reused.
    fn check_in(&self, connection: Connection);
}

/// The parameters of a single connection checkout.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct CheckoutRequest {
    /// Whether the connection will be used for a write.
    pub for_writing: bool,

    /// The database the connection must be authenticated for.
    pub database: String,

    /// How long the caller is willing to wait for a connection.
    pub timeout: Duration,
}

/// A connection checked out of the pool. It is checked back in exactly once: by
/// [`release`](LeasedConnection::release), or when it is dropped.
#[derive_where(Debug)]
pub(crate) struct LeasedConnection {
    connection: Connection,

    /// Unset once the connection has been checked back in.
    #[derive_where(skip)]
    pool: Option<Arc<dyn ConnectionPool>>,
}

impl LeasedConnection {
    pub(crate) fn new(connection: Connection, pool: Arc<dyn ConnectionPool>) -> Self {
        Self {
            connection,
            pool: Some(pool),
        }
    }

    pub(crate) fn release(mut self) {
        self.check_in();
    }

    fn check_in(&mut self) {
        if let Some(pool) = self.pool.take() {
            let connection = self.connection.take();
            tracing::debug!(
                target: CONNECTION_TRACING_EVENT_TARGET,
                driverConnectionId = connection.id(),
                healthy = connection.is_healthy(),
                "Connection checked in"
            );
            pool.check_in(connection);
        }
    }
}

impl Drop for LeasedConnection {
    fn drop(&mut self) {
        self.check_in();
    }
}

impl Deref for LeasedConnection {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        &self.connection
    }
}

impl DerefMut for LeasedConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.connection
    }
}

/// A connection tagged with who owns it. Borrowed connections belong to the caller and are never
/// checked in by this crate.
#[derive(Debug)]
pub(crate) enum ConnectionHandle<'c> {
    Borrowed(&'c mut Connection),
    Leased(LeasedConnection),
}

impl ConnectionHandle<'_> {
    #[cfg(test)]
    pub(crate) fn is_leased(&self) -> bool {
        matches!(self, Self::Leased(_))
    }

    /// Checks a leased connection back in. A no-op for borrowed connections.
    pub(crate) fn release(self) {
        match self {
            Self::Borrowed(_) => {}
            Self::Leased(leased) => leased.release(),
        }
    }
}

impl Deref for ConnectionHandle<'_> {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::Borrowed(conn) => conn,
            Self::Leased(leased) => leased,
        }
    }
}

impl DerefMut for ConnectionHandle<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            Self::Borrowed(conn) => conn,
            Self::Leased(leased) => leased,
        }
    }
}
