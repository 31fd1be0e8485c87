mod command;
mod stream;
pub(crate) mod wire;

use derive_where::derive_where;

pub use self::{
    command::{Command, RawCommandResponse},
    stream::StreamTransport,
    wire::{
        DeleteFlags,
        InsertFlags,
        LegacyMessage,
        QueryFlags,
        Reply,
        ResponseFlags,
        UpdateFlags,
    },
};
use crate::{
    error::{Error, Result},
    BoxFuture,
};

/// Sends requests over an established, authenticated byte stream and reads the replies.
///
/// A transport is only ever asked to carry one request at a time.
pub trait Transport: Send {
    /// Sends `command` and returns the server's reply document.
    fn send_command(&mut self, command: Command) -> BoxFuture<'_, Result<RawCommandResponse>>;

    /// Sends a legacy opcode message. Returns the `OP_REPLY` for queries and getMores, and `None`
    /// for messages the server never answers.
    fn send_legacy(&mut self, message: LegacyMessage) -> BoxFuture<'_, Result<Option<Reply>>>;
}

/// A connection to a server, as handed out by a
/// [`ConnectionPool`](crate::cmap::ConnectionPool).
///
/// The connection records whether it is safe to reuse: a transport fault, or a request that was
/// abandoned before its reply arrived, makes [`is_healthy`](Connection::is_healthy) return false.
#[derive_where(Debug)]
pub struct Connection {
    id: u32,

    /// Set while a request has been written and its reply not yet read.
    in_flight: bool,

    /// Set once the transport reported a fault.
    errored: bool,

    #[derive_where(skip)]
    transport: Box<dyn Transport>,
}

impl Connection {
    /// Wraps `transport` in a connection identified by `id`.
    pub fn new(id: u32, transport: impl Transport + 'static) -> Self {
        Self {
            id,
            in_flight: false,
            errored: false,
            transport: Box::new(transport),
        }
    }

    /// The pool-assigned identifier of this connection.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Whether the connection can be reused for another request.
    pub fn is_healthy(&self) -> bool {
        !self.errored && !self.in_flight
    }

    /// Sends exactly one command and waits for exactly one reply. An `Ok` result says nothing about
    /// whether the command itself succeeded.
    pub(crate) async fn send_command(&mut self, command: Command) -> Result<RawCommandResponse> {
        self.begin_request()?;
        let result = self.transport.send_command(command).await;
        self.end_request(&result);
        result
    }

    pub(crate) async fn send_legacy(&mut self, message: LegacyMessage) -> Result<Option<Reply>> {
        self.begin_request()?;
        let result = self.transport.send_legacy(message).await;
        self.end_request(&result);
        result
    }

    fn begin_request(&mut self) -> Result<()> {
        if self.in_flight {
            return Err(Error::internal(format!(
                "connection {} already has a request in flight",
                self.id
            )));
        }
        self.in_flight = true;
        Ok(())
    }

    fn end_request<T>(&mut self, result: &Result<T>) {
        self.in_flight = false;
        if let Err(ref e) = result {
            if e.is_network_error() {
                self.errored = true;
            }
        }
    }

    /// Moves the state out of this connection, leaving behind one that refuses every request.
    pub(super) fn take(&mut self) -> Connection {
        Connection {
            id: self.id,
            in_flight: self.in_flight,
            errored: self.errored,
            transport: std::mem::replace(&mut self.transport, Box::new(Detached)),
        }
    }
}

/// What remains in a [`Connection`] after [`Connection::take`].
struct Detached;

impl Transport for Detached {
    fn send_command(&mut self, _: Command) -> BoxFuture<'_, Result<RawCommandResponse>> {
        Box::pin(async { Err(Error::internal("connection was already checked in")) })
    }

    fn send_legacy(&mut self, _: LegacyMessage) -> BoxFuture<'_, Result<Option<Reply>>> {
        Box::pin(async { Err(Error::internal("connection was already checked in")) })
    }
}
