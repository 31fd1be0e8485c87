use std::{
    collections::VecDeque,
    pin::Pin,
    task::{Context, Poll},
};

use futures_core::Stream;

use crate::{
    bson::Document,
    client::executor::{execute_legacy, execute_legacy_query, execute_operation},
    cmap::{Connection, ConnectionHandle},
    error::{Error, Result},
    operation::{CursorSpecification, GetMore, GetMoreResult, KillCursors},
    runtime,
    sdam::Protocol,
    trace::{TracingRepresentation, CURSOR_TRACING_EVENT_TARGET},
    BoxFuture,
    Namespace,
};

/// A `Cursor` streams the result of a query. When a query is made, a `Cursor` will be returned with
/// the first batch of results from the server; the documents will be returned as the `Cursor` is
/// iterated. When the batch is exhausted and if there are more results, the `Cursor` will fetch the
/// next batch of documents, and so forth until the results are exhausted. Note that because of this
/// batching, additional network I/O may occur on any given call to `Cursor::next`. Because of this,
/// a `Cursor` iterates over `Result<Document>` items rather than simply `Document` items.
///
/// The cursor keeps the connection its query ran on until it is exhausted or closed; a
/// connection leased from the pool is then returned to it exactly once. A cursor never yields
/// more documents than the `limit` it was opened with, even when the server returned more.
///
/// A cursor can be used like any other [`Stream`](https://docs.rs/futures/latest/futures/stream/trait.Stream.html):
///
/// ```no_run
/// # use futures_util::stream::StreamExt;
/// # use mongodb_crud::{bson::{doc, Document}, error::Result, Collection};
/// #
/// # async fn do_stuff(coll: Collection) -> Result<()> {
/// let mut cursor = coll.find(doc! { "x": 1 }).await?;
/// while let Some(doc) = cursor.next().await {
///   println!("{}", doc?)
/// }
/// #
/// # Ok(())
/// # }
/// ```
///
/// The produced sequence is single pass: once the cursor is exhausted it yields nothing more.
/// Dropping a cursor that still has a server-side cursor open kills it in the background when it
/// owns a pooled connection.
pub struct Cursor<'conn> {
    state: State<'conn>,
}

enum State<'conn> {
    Idle(Box<CursorInner<'conn>>),
    Fetching(BoxFuture<'conn, (Box<CursorInner<'conn>>, Result<()>)>),
    Closing(BoxFuture<'conn, ()>),
    Exhausted,
}

struct CursorInner<'conn> {
    /// Unset once the connection has been released.
    connection: Option<ConnectionHandle<'conn>>,
    protocol: Protocol,
    ns: Namespace,

    /// The server cursor id; 0 once the server has nothing more or the cursor was killed.
    id: i64,
    buffer: VecDeque<Document>,
    batch_size: Option<u32>,
    limit: Option<u64>,
    consumed: u64,
}

impl<'conn> Cursor<'conn> {
    pub(crate) fn new(spec: CursorSpecification, connection: ConnectionHandle<'conn>) -> Self {
        let mut inner = CursorInner {
            connection: Some(connection),
            protocol: spec.protocol,
            ns: spec.ns,
            id: spec.id,
            buffer: spec.first_batch,
            batch_size: spec.batch_size,
            limit: spec.limit,
            consumed: 0,
        };
        if inner.id == 0 {
            inner.release();
        }
        Self {
            state: State::Idle(Box::new(inner)),
        }
    }

    /// Whether the cursor has yielded everything it ever will.
    pub fn is_exhausted(&self) -> bool {
        match self.state {
            State::Exhausted => true,
            State::Idle(ref inner) => {
                inner.limit_reached() || (inner.id == 0 && inner.buffer.is_empty())
            }
            State::Fetching(_) | State::Closing(_) => false,
        }
    }

    /// Stops the cursor: kills the server cursor if one is still open, discards anything
    /// buffered and releases the connection. Calling it again is a no-op.
    pub async fn close(&mut self) {
        match std::mem::replace(&mut self.state, State::Exhausted) {
            State::Idle(inner) => inner.close().await,
            State::Fetching(fetch) => {
                let (inner, _) = fetch.await;
                inner.close().await;
            }
            State::Closing(closing) => closing.await,
            State::Exhausted => {}
        }
    }
}

impl std::fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            State::Idle(_) => "Idle",
            State::Fetching(_) => "Fetching",
            State::Closing(_) => "Closing",
            State::Exhausted => "Exhausted",
        };
        f.debug_struct("Cursor").field("state", &state).finish()
    }
}

impl Stream for Cursor<'_> {
    type Item = Result<Document>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match std::mem::replace(&mut self.state, State::Exhausted) {
                State::Idle(mut inner) => {
                    if inner.limit_reached() {
                        inner.buffer.clear();
                        self.state = State::Closing(Box::pin(inner.close()));
                        continue;
                    }
                    if let Some(doc) = inner.buffer.pop_front() {
                        inner.consumed += 1;
                        self.state = State::Idle(inner);
                        return Poll::Ready(Some(Ok(doc)));
                    }
                    if inner.id == 0 {
                        inner.release();
                        tracing::debug!(
                            target: CURSOR_TRACING_EVENT_TARGET,
                            namespace = %inner.ns,
                            consumed = inner.consumed,
                            "Cursor exhausted"
                        );
                        return Poll::Ready(None);
                    }
                    self.state = State::Fetching(Box::pin(inner.fetch()));
                }
                State::Fetching(mut fetch) => match fetch.as_mut().poll(cx) {
                    Poll::Pending => {
                        self.state = State::Fetching(fetch);
                        return Poll::Pending;
                    }
                    Poll::Ready((inner, Ok(()))) => self.state = State::Idle(inner),
                    Poll::Ready((_, Err(error))) => return Poll::Ready(Some(Err(error))),
                },
                State::Closing(mut closing) => match closing.as_mut().poll(cx) {
                    Poll::Pending => {
                        self.state = State::Closing(closing);
                        return Poll::Pending;
                    }
                    Poll::Ready(()) => return Poll::Ready(None),
                },
                State::Exhausted => return Poll::Ready(None),
            }
        }
    }
}

impl Drop for Cursor<'_> {
    fn drop(&mut self) {
        if let State::Idle(inner) = std::mem::replace(&mut self.state, State::Exhausted) {
            inner.close_in_background();
        }
    }
}

impl<'conn> CursorInner<'conn> {
    fn limit_reached(&self) -> bool {
        self.limit.is_some_and(|limit| self.consumed >= limit)
    }

    /// The size of the next batch: the configured batch size, capped by what the limit still
    /// allows.
    fn next_batch_size(&self) -> Option<u32> {
        let remaining = self
            .limit
            .map(|limit| u32::try_from(limit.saturating_sub(self.consumed)).unwrap_or(u32::MAX));
        match (self.batch_size, remaining) {
            (Some(batch_size), Some(remaining)) => Some(batch_size.min(remaining)),
            (batch_size, remaining) => batch_size.or(remaining),
        }
    }

    fn release(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.release();
        }
    }

    async fn fetch(mut self: Box<Self>) -> (Box<Self>, Result<()>) {
        let get_more = GetMore::new(self.ns.clone(), self.id, self.next_batch_size());
        tracing::debug!(
            target: CURSOR_TRACING_EVENT_TARGET,
            namespace = %self.ns,
            cursorId = self.id,
            batchSize = ?self.next_batch_size(),
            "Fetching next batch"
        );

        let result = match self.connection.as_deref_mut() {
            Some(conn) => get_more_on(conn, self.protocol, get_more).await,
            None => Err(Error::internal("cursor has no connection to fetch with")),
        };
        match result {
            Ok(GetMoreResult { batch, id }) => {
                self.buffer = batch;
                self.id = id;
                if id == 0 {
                    self.release();
                }
                (self, Ok(()))
            }
            Err(error) => {
                tracing::debug!(
                    target: CURSOR_TRACING_EVENT_TARGET,
                    namespace = %self.ns,
                    cursorId = self.id,
                    failure = error.tracing_representation(),
                    "Fetching next batch failed"
                );
                self.id = 0;
                self.buffer.clear();
                self.release();
                (self, Err(error))
            }
        }
    }

    async fn close(mut self: Box<Self>) {
        self.buffer.clear();
        if self.id != 0 {
            if let Some(conn) = self.connection.as_deref_mut() {
                kill_cursor(conn, self.protocol, &self.ns, self.id).await;
            }
            self.id = 0;
        }
        self.release();
    }

    /// Kills the server cursor from a background task when the connection can outlive the cursor.
    /// A borrowed connection is left alone.
    fn close_in_background(mut self: Box<Self>) {
        if self.id == 0 {
            self.release();
            return;
        }
        match self.connection.take() {
            Some(ConnectionHandle::Leased(mut leased)) => {
                let (protocol, ns, id) = (self.protocol, self.ns.clone(), self.id);
                runtime::execute(async move {
                    kill_cursor(&mut leased, protocol, &ns, id).await;
                    leased.release();
                });
            }
            Some(borrowed) => borrowed.release(),
            None => {}
        }
    }
}

async fn get_more_on(
    conn: &mut Connection,
    protocol: Protocol,
    mut get_more: GetMore,
) -> Result<GetMoreResult> {
    match protocol {
        Protocol::Command => execute_operation(conn, &mut get_more).await,
        Protocol::Legacy => {
            let reply = execute_legacy_query(conn, get_more.legacy()).await?;
            Ok(GetMoreResult {
                batch: reply.documents.into(),
                id: reply.cursor_id,
            })
        }
    }
}

/// Failures are logged and otherwise ignored.
async fn kill_cursor(conn: &mut Connection, protocol: Protocol, ns: &Namespace, id: i64) {
    if !conn.is_healthy() {
        return;
    }
    let mut kill = KillCursors::new(ns.clone(), id);
    let result = match protocol {
        Protocol::Command => execute_operation(conn, &mut kill).await,
        Protocol::Legacy => execute_legacy(conn, kill.legacy()).await.map(|_| ()),
    };
    match result {
        Ok(()) => tracing::debug!(
            target: CURSOR_TRACING_EVENT_TARGET,
            namespace = %ns,
            cursorId = id,
            "Cursor killed"
        ),
        Err(error) => tracing::debug!(
            target: CURSOR_TRACING_EVENT_TARGET,
            namespace = %ns,
            cursorId = id,
            failure = error.tracing_representation(),
            "Killing cursor failed"
        ),
    }
}
