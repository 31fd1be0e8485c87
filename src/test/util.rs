use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use crate::{
    bson::{doc, Document},
    cmap::{
        CheckoutRequest,
        Command,
        Connection,
        ConnectionPool,
        LegacyMessage,
        RawCommandResponse,
        Reply,
        Transport,
    },
    error::{Error, ErrorKind, Result},
    options::ClientOptions,
    sdam::TopologyDescription,
    BoxFuture,
    Client,
};

/// A scripted answer to one request.
#[derive(Clone, Debug)]
pub(crate) enum MockReply {
    Document(Document),
    /// Bytes that are not a BSON document.
    Garbage,
    Legacy(Reply),
    NetworkError,
    /// Never answers.
    Hang,
    /// Answers after a delay.
    Delayed(Duration, Box<MockReply>),
}

impl MockReply {
    pub(crate) fn document(doc: Document) -> Self {
        Self::Document(doc)
    }

    pub(crate) fn ok() -> Self {
        Self::Document(doc! { "ok": 1 })
    }

    pub(crate) fn cursor(id: i64, first_batch: Vec<Document>) -> Self {
        Self::Document(doc! {
            "ok": 1,
            "cursor": { "id": id, "ns": "db.coll", "firstBatch": first_batch },
        })
    }

    pub(crate) fn next_batch(id: i64, next_batch: Vec<Document>) -> Self {
        Self::Document(doc! {
            "ok": 1,
            "cursor": { "id": id, "ns": "db.coll", "nextBatch": next_batch },
        })
    }
}

type Responder = dyn Fn(&Command) -> MockReply + Send + Sync;

#[derive(Default)]
struct TransportState {
    replies: VecDeque<MockReply>,
    responder: Option<Arc<Responder>>,
    commands: Vec<Command>,
    legacy: Vec<LegacyMessage>,
}

/// A transport that answers from a script and records every request. Clones share the script and
/// the record, so one transport can back every connection of a [`MockPool`].
#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    state: Arc<Mutex<TransportState>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queues the answer to the next request that expects one. A queued `NetworkError` also fails
    /// the next legacy write, which otherwise never consumes a reply.
    pub(crate) fn push(&self, reply: MockReply) {
        self.state.lock().unwrap().replies.push_back(reply);
    }

    /// Answers commands with `responder` once the queue is empty.
    pub(crate) fn respond_with(
        &self,
        responder: impl Fn(&Command) -> MockReply + Send + Sync + 'static,
    ) {
        self.state.lock().unwrap().responder = Some(Arc::new(responder));
    }

    pub(crate) fn commands(&self) -> Vec<Command> {
        self.state.lock().unwrap().commands.clone()
    }

    pub(crate) fn command_names(&self) -> Vec<String> {
        self.commands().iter().map(|c| c.name.clone()).collect()
    }

    pub(crate) fn legacy_messages(&self) -> Vec<LegacyMessage> {
        self.state.lock().unwrap().legacy.clone()
    }

    fn next_reply(&self, command: Option<&Command>) -> MockReply {
        let mut state = self.state.lock().unwrap();
        if let Some(reply) = state.replies.pop_front() {
            return reply;
        }
        let responder = state.responder.clone();
        drop(state);
        match (command, responder) {
            (Some(command), Some(responder)) => responder(command),
            _ => MockReply::ok(),
        }
    }

    fn next_write_fault(&self) -> Option<MockReply> {
        let mut state = self.state.lock().unwrap();
        if matches!(state.replies.front(), Some(MockReply::NetworkError)) {
            state.replies.pop_front()
        } else {
            None
        }
    }
}

fn network_error() -> Error {
    ErrorKind::from(std::io::Error::new(
        std::io::ErrorKind::ConnectionReset,
        "connection reset by mock",
    ))
    .into()
}

async fn resolve(reply: MockReply) -> MockReply {
    let mut reply = reply;
    loop {
        match reply {
            MockReply::Delayed(delay, inner) => {
                tokio::time::sleep(delay).await;
                reply = *inner;
            }
            MockReply::Hang => std::future::pending::<()>().await,
            other => return other,
        }
    }
}

impl Transport for MockTransport {
    fn send_command(&mut self, command: Command) -> BoxFuture<'_, Result<RawCommandResponse>> {
        self.state.lock().unwrap().commands.push(command.clone());
        let reply = self.next_reply(Some(&command));
        Box::pin(async move {
            match resolve(reply).await {
                MockReply::Document(doc) => RawCommandResponse::with_document(&doc),
                MockReply::Garbage => Ok(RawCommandResponse::new(vec![1, 2, 3])),
                MockReply::NetworkError => Err(network_error()),
                other => Err(Error::internal(format!("{other:?} is not a command reply"))),
            }
        })
    }

    fn send_legacy(&mut self, message: LegacyMessage) -> BoxFuture<'_, Result<Option<Reply>>> {
        let expects_reply = message.expects_reply();
        self.state.lock().unwrap().legacy.push(message);
        let reply = if expects_reply {
            Some(self.next_reply(None))
        } else {
            self.next_write_fault()
        };
        Box::pin(async move {
            let Some(reply) = reply else {
                return Ok(None);
            };
            match resolve(reply).await {
                MockReply::Legacy(reply) => Ok(Some(reply)),
                MockReply::NetworkError => Err(network_error()),
                other => Err(Error::internal(format!("{other:?} is not an OP_REPLY"))),
            }
        })
    }
}

#[derive(Default)]
struct PoolState {
    next_id: AtomicU32,
    checked_out: Mutex<Vec<u32>>,
    checked_in: Mutex<Vec<(u32, bool)>>,
    checkout_error: Mutex<Option<Error>>,
}

/// A pool that hands out connections over a shared [`MockTransport`] and records every check-out
/// and check-in.
#[derive(Clone)]
pub(crate) struct MockPool {
    transport: MockTransport,
    state: Arc<PoolState>,
}

impl MockPool {
    pub(crate) fn new(transport: MockTransport) -> Self {
        Self {
            transport,
            state: Default::default(),
        }
    }

    /// A fresh connection that was not checked out through the pool.
    pub(crate) fn connection(&self) -> Connection {
        let id = self.state.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Connection::new(id, self.transport.clone())
    }

    pub(crate) fn into_dyn(self) -> Arc<dyn ConnectionPool> {
        Arc::new(self)
    }

    /// Makes every later checkout fail with `error`.
    pub(crate) fn fail_checkouts(&self, error: Error) {
        *self.state.checkout_error.lock().unwrap() = Some(error);
    }

    pub(crate) fn checked_out(&self) -> Vec<u32> {
        self.state.checked_out.lock().unwrap().clone()
    }

    pub(crate) fn checked_in(&self) -> Vec<u32> {
        self.checked_in_with_health()
            .into_iter()
            .map(|(id, _)| id)
            .collect()
    }

    pub(crate) fn checked_in_with_health(&self) -> Vec<(u32, bool)> {
        self.state.checked_in.lock().unwrap().clone()
    }

    /// Every connection that was checked out has been checked in exactly once.
    pub(crate) fn assert_balanced(&self) {
        let mut out = self.checked_out();
        let mut returned = self.checked_in();
        out.sort_unstable();
        returned.sort_unstable();
        assert_eq!(out, returned, "check-outs and check-ins do not match");
    }
}

impl ConnectionPool for MockPool {
    fn check_out(&self, _request: CheckoutRequest) -> BoxFuture<'_, Result<Connection>> {
        Box::pin(async move {
            if let Some(error) = self.state.checkout_error.lock().unwrap().clone() {
                return Err(error);
            }
            let conn = self.connection();
            self.state.checked_out.lock().unwrap().push(conn.id());
            Ok(conn)
        })
    }

    fn check_in(&self, connection: Connection) {
        self.state
            .checked_in
            .lock()
            .unwrap()
            .push((connection.id(), connection.is_healthy()));
    }
}

/// A client over a [`MockPool`] whose topology reports `wire_version`.
pub(crate) fn mock_client(
    wire_version: i32,
    options: impl Into<Option<ClientOptions>>,
) -> (Client, MockPool, MockTransport) {
    let transport = MockTransport::new();
    let pool = MockPool::new(transport.clone());
    let client = Client::with_components(
        pool.clone(),
        TopologyDescription::with_wire_version(wire_version),
        options,
    );
    (client, pool, transport)
}
