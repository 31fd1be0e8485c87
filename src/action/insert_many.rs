use std::sync::Arc;

use futures_util::stream::{FuturesUnordered, StreamExt};

use super::{action_impl, option_setters, with_timeout};
use crate::{
    batch::InsertPlan,
    bson::Document,
    client::executor::{execute_legacy, execute_operation},
    cmap::Connection,
    coll::options::InsertManyOptions,
    error::{
        correlate::{correlate, has_write_errors, WriteErrorSet},
        Error,
        ErrorKind,
        Result,
    },
    operation::Insert as Op,
    options::WriteConcern,
    results::InsertManyResult,
    runtime::{self, AsyncJoinHandle},
    sdam::Protocol,
    Client,
    Collection,
    Namespace,
};

impl Collection {
    /// Inserts the documents in `docs` into the collection.
    ///
    /// Documents without an `_id` are given a freshly generated `ObjectId`; an existing `_id` is
    /// never replaced. The documents are sent in chunks of at most
    /// [`max_chunk_size`](crate::options::ClientOptions::max_chunk_size). On servers that
    /// support write commands, per-document failures are attributed to the document that caused
    /// them and reported as [`ErrorKind::InsertMany`](crate::error::ErrorKind::InsertMany). Older
    /// servers do not acknowledge inserts; the result then lists every `_id` that was sent and
    /// reports `acknowledged: false`.
    ///
    /// `await` will return `Result<InsertManyResult>`.
    pub fn insert_many(&self, docs: impl IntoIterator<Item = Document>) -> InsertMany {
        InsertMany {
            coll: self,
            docs: docs.into_iter().collect(),
            options: None,
            connection: None,
        }
    }
}

/// Inserts documents into a collection.  Construct with [`Collection::insert_many`].
#[must_use]
pub struct InsertMany<'a> {
    coll: &'a Collection,
    docs: Vec<Document>,
    options: Option<InsertManyOptions>,
    connection: Option<&'a mut Connection>,
}

impl<'a> InsertMany<'a> {
    option_setters! { options: InsertManyOptions;
        bypass_document_validation: bool,
        ordered: bool,
        write_concern: WriteConcern,
        timeout: std::time::Duration,
    }

    /// Runs the insert on `connection` instead of leasing connections from the pool. Chunks are
    /// then sent one after another, and the connection is left with the caller.
    pub fn connection(mut self, connection: &'a mut Connection) -> Self {
        self.connection = Some(connection);
        self
    }
}

action_impl! {
    impl<'a> Action for InsertMany<'a> {
        type Future = InsertManyFuture;

        async fn execute(mut self) -> Result<InsertManyResult> {
            resolve_options!(self.coll, self.options, [write_concern, timeout]);
            let timeout = self.options.as_ref().and_then(|o| o.timeout);

            with_timeout(timeout, insert(self.coll, self.docs, self.options, self.connection)).await
        }
    }
}

async fn insert(
    coll: &Collection,
    docs: Vec<Document>,
    options: Option<InsertManyOptions>,
    connection: Option<&mut Connection>,
) -> Result<InsertManyResult> {
    let client = coll.client();
    let plan = InsertPlan::new(docs, client.options().max_chunk_size);
    if plan.is_empty() {
        return Ok(InsertManyResult {
            inserted_ids: Vec::new(),
            acknowledged: true,
        });
    }

    let write_concern = options.as_ref().and_then(|o| o.write_concern.as_ref());
    if let Some(write_concern) = write_concern {
        write_concern.validate()?;
    }
    let acknowledged = write_concern.is_none_or(WriteConcern::is_acknowledged);

    let ns = coll.namespace();
    let checkout_timeout = client.checkout_timeout(plan.documents.len());
    let plan = Arc::new(plan);
    match Protocol::for_write(client.topology().max_wire_version()) {
        Protocol::Legacy => {
            let mut conn = client
                .acquire(connection, true, &ns.db, checkout_timeout)
                .await?;
            for chunk in 0..plan.chunks.len() {
                let (_, documents) = plan.chunk(chunk);
                execute_legacy(&mut conn, Op::legacy(ns.clone(), documents, options.as_ref()))
                    .await?;
            }
            conn.release();

            Ok(InsertManyResult {
                inserted_ids: plan.ids.clone(),
                acknowledged: false,
            })
        }
        Protocol::Command => {
            let stops_at_first_error = options.as_ref().and_then(|o| o.ordered) != Some(false);
            let dispatch = ChunkDispatch {
                client: client.clone(),
                ns,
                plan: plan.clone(),
                options,
                checkout_timeout,
            };
            let (replies, sent) = match connection {
                Some(conn) => dispatch.run_on(conn).await?,
                None => dispatch.run_pooled().await?,
            };
            let sent_ids = &plan.ids[..sent];
            if !acknowledged {
                return Ok(InsertManyResult {
                    inserted_ids: sent_ids.to_vec(),
                    acknowledged: false,
                });
            }
            correlate_chunks(&plan, replies, sent, stops_at_first_error)
        }
    }
}

/// Sends the chunks of one insert as `insert` commands.
struct ChunkDispatch {
    client: Client,
    ns: Namespace,
    plan: Arc<InsertPlan>,
    options: Option<InsertManyOptions>,
    checkout_timeout: std::time::Duration,
}

/// The raw reply to each dispatched chunk, and the number of documents that were sent.
type ChunkReplies = (Vec<(usize, Document)>, usize);

impl ChunkDispatch {
    fn ordered(&self) -> bool {
        self.options.as_ref().and_then(|o| o.ordered) == Some(true)
    }

    fn op(&self, chunk: usize) -> Op {
        Op::new(self.ns.clone(), self.plan.clone(), chunk, self.options.clone())
    }

    fn sent(&self, dispatched: usize) -> usize {
        dispatched
            .checked_sub(1)
            .map_or(0, |last| self.plan.chunks[last].end)
    }

    /// Sends the chunks one after another on a caller-supplied connection.
    async fn run_on(&self, conn: &mut Connection) -> Result<ChunkReplies> {
        let mut replies = Vec::with_capacity(self.plan.chunks.len());
        for chunk in 0..self.plan.chunks.len() {
            let reply = execute_operation(conn, &mut self.op(chunk)).await?;
            let failed = has_write_errors(&reply);
            replies.push((chunk, reply));
            if failed && self.ordered() {
                break;
            }
        }
        let sent = self.sent(replies.len());
        Ok((replies, sent))
    }

    /// Sends up to `max_in_flight_chunks` chunks at once, each on its own pooled connection, and
    /// waits for every dispatched chunk before returning. Once an ordered insert sees a failure,
    /// or any chunk fails outright, no further chunk is dispatched.
    async fn run_pooled(&self) -> Result<ChunkReplies> {
        let window = self.client.options().max_in_flight_chunks.max(1);
        let total = self.plan.chunks.len();
        let mut in_flight = FuturesUnordered::new();
        let mut replies = Vec::with_capacity(total);
        let mut dispatched = 0;
        let mut stopped = false;
        let mut first_error: Option<Error> = None;

        loop {
            while !stopped && dispatched < total && in_flight.len() < window {
                in_flight.push(self.spawn_chunk(dispatched));
                dispatched += 1;
            }
            let Some(joined) = in_flight.next().await else {
                break;
            };
            match joined.and_then(|reply| reply) {
                Ok((chunk, reply)) => {
                    if self.ordered() && has_write_errors(&reply) {
                        stopped = true;
                    }
                    replies.push((chunk, reply));
                }
                Err(error) => {
                    stopped = true;
                    first_error.get_or_insert(error);
                }
            }
        }

        if let Some(error) = first_error {
            return Err(error);
        }
        Ok((replies, self.sent(dispatched)))
    }

    fn spawn_chunk(&self, chunk: usize) -> AsyncJoinHandle<Result<(usize, Document)>> {
        let client = self.client.clone();
        let db = self.ns.db.clone();
        let timeout = self.checkout_timeout;
        let mut op = self.op(chunk);
        runtime::spawn(async move {
            let mut conn = client.check_out(true, &db, timeout).await?;
            let reply = execute_operation(&mut conn, &mut op).await;
            conn.release();
            reply.map(|reply| (chunk, reply))
        })
    }
}

/// Attributes the write errors of every chunk to the documents that caused them. Runs only once
/// every dispatched chunk has answered. Unless the insert is explicitly unordered, the server
/// abandons a chunk at its first failure.
fn correlate_chunks(
    plan: &InsertPlan,
    mut replies: Vec<(usize, Document)>,
    sent: usize,
    stops_at_first_error: bool,
) -> Result<InsertManyResult> {
    replies.sort_by_key(|(chunk, _)| *chunk);

    let mut errors = WriteErrorSet::default();
    for (chunk, reply) in &replies {
        let (offset, documents) = plan.chunk(*chunk);
        let correlated = correlate(reply, offset, documents)?;
        if stops_at_first_error {
            errors.absorb_ordered(correlated, plan.chunks[*chunk].clone());
        } else {
            errors.absorb(correlated);
        }
    }
    match errors.into_insert_outcome(&plan.ids, sent) {
        Ok(inserted_ids) => Ok(InsertManyResult {
            inserted_ids,
            acknowledged: true,
        }),
        Err(failure) => Err(ErrorKind::InsertMany(failure).into()),
    }
}
