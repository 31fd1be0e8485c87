//! The parts of topology state that the CRUD engine consumes: the negotiated wire version, the
//! server version and the observed round trip time.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Write commands (`insert`, `update`, `delete`) replace the legacy write opcodes.
pub(crate) const WRITE_COMMANDS_MIN_WIRE_VERSION: i32 = 2;

/// The `find` and `getMore` commands replace `OP_QUERY` and `OP_GET_MORE`.
pub(crate) const FIND_COMMAND_MIN_WIRE_VERSION: i32 = 4;

/// Collation is accepted on CRUD commands.
pub(crate) const COLLATION_MIN_WIRE_VERSION: i32 = 5;

/// Commands are framed as `OP_MSG` rather than an `OP_QUERY` against `<db>.$cmd`.
pub(crate) const OP_MSG_MIN_WIRE_VERSION: i32 = 6;

/// Read access to the state negotiated with the deployment. Implemented by the embedding driver's
/// topology monitor.
pub trait Topology: Send + Sync {
    /// The highest wire version both the driver and the selected server support.
    fn max_wire_version(&self) -> i32;

    /// The version of the selected server.
    fn server_version(&self) -> ServerVersion;

    /// The average round trip time to the selected server, if it has been measured.
    fn round_trip_time(&self) -> Option<Duration> {
        None
    }
}

/// A server's `major.minor.patch` version.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServerVersion {
    /// The major version.
    pub major: u32,

    /// The minor version.
    pub minor: u32,

    /// The patch version.
    pub patch: u32,
}

impl ServerVersion {
    /// Creates a `ServerVersion`.
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A fixed snapshot of topology state.
#[derive(Clone, Debug, PartialEq, TypedBuilder)]
#[builder(field_defaults(default, setter(into)))]
#[non_exhaustive]
pub struct TopologyDescription {
    /// The negotiated wire version.
    #[builder(!default)]
    pub max_wire_version: i32,

    /// The server version.
    pub server_version: ServerVersion,

    /// The average round trip time, if known.
    pub round_trip_time: Option<Duration>,
}

impl TopologyDescription {
    /// A description with only the wire version known.
    pub fn with_wire_version(max_wire_version: i32) -> Self {
        Self {
            max_wire_version,
            server_version: ServerVersion::default(),
            round_trip_time: None,
        }
    }
}

impl Topology for TopologyDescription {
    fn max_wire_version(&self) -> i32 {
        self.max_wire_version
    }

    fn server_version(&self) -> ServerVersion {
        self.server_version
    }

    fn round_trip_time(&self) -> Option<Duration> {
        self.round_trip_time
    }
}

impl fmt::Display for TopologyDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ server version: {}, wire version: {} }}",
            self.server_version, self.max_wire_version
        )
    }
}

/// Which generation of the wire protocol an operation speaks. Chosen once per call from the
/// negotiated wire version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Protocol {
    /// Generic commands (`insert`, `find`, `getMore`, ...).
    Command,

    /// Fixed-layout opcodes (`OP_INSERT`, `OP_QUERY`, ...).
    Legacy,
}

impl Protocol {
    fn at_least(wire_version: i32, min: i32) -> Self {
        if wire_version >= min {
            Protocol::Command
        } else {
            Protocol::Legacy
        }
    }

    /// The protocol for `insert`, `update` and `delete`.
    pub(crate) fn for_write(wire_version: i32) -> Self {
        Self::at_least(wire_version, WRITE_COMMANDS_MIN_WIRE_VERSION)
    }

    /// The protocol for `find` and the `getMore`s of its cursor.
    pub(crate) fn for_find(wire_version: i32) -> Self {
        Self::at_least(wire_version, FIND_COMMAND_MIN_WIRE_VERSION)
    }
}
