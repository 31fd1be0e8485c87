//! Client-wide defaults.

use std::time::Duration;

use typed_builder::TypedBuilder;

use crate::{
    batch::DEFAULT_MAX_CHUNK_SIZE,
    collation::Collation,
    concern::{ReadConcern, WriteConcern},
};

/// The number of insert chunks that may be awaiting a reply at once by default.
pub(crate) const DEFAULT_MAX_IN_FLIGHT_CHUNKS: usize = 4;

/// Contains the options that can be used to create a new [`Client`](../struct.Client.html).
#[derive(Clone, Debug, PartialEq, TypedBuilder)]
#[builder(field_defaults(default, setter(into)))]
#[non_exhaustive]
pub struct ClientOptions {
    /// The default read concern for operations performed on the client.
    pub read_concern: Option<ReadConcern>,

    /// The default write concern for operations performed on the client.
    pub write_concern: Option<WriteConcern>,

    /// The default collation for operations performed on the client.
    pub collation: Option<Collation>,

    /// The default upper bound on how long an operation waits for its result. Requests that were
    /// already sent when it elapses may still be applied by the server.
    pub timeout: Option<Duration>,

    /// How long to wait for a connection from the pool. Defaults to four times the round trip
    /// time (at least one second), plus a millisecond per inserted document.
    pub wait_queue_timeout: Option<Duration>,

    /// The largest number of documents sent in one insert request.
    #[builder(default = DEFAULT_MAX_CHUNK_SIZE)]
    pub max_chunk_size: usize,

    /// The largest number of insert chunks awaiting a reply at once. Each in-flight chunk uses its
    /// own connection.
    #[builder(default = DEFAULT_MAX_IN_FLIGHT_CHUNKS)]
    pub max_in_flight_chunks: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// These are the valid options for creating a [`Database`](../struct.Database.html) with
/// [`Client::database_with_options`](../struct.Client.html#method.database_with_options).
#[derive(Clone, Debug, Default, PartialEq, TypedBuilder)]
#[builder(field_defaults(default, setter(into)))]
#[non_exhaustive]
pub struct DatabaseOptions {
    /// The default read concern for operations.
    pub read_concern: Option<ReadConcern>,

    /// The default write concern for operations.
    pub write_concern: Option<WriteConcern>,

    /// The default collation for operations.
    pub collation: Option<Collation>,

    /// The default timeout for operations.
    pub timeout: Option<Duration>,
}
