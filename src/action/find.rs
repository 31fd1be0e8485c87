use std::time::Duration;

use super::{action_impl, option_setters, with_timeout};
use crate::{
    bson::Document,
    client::executor::{execute_legacy_query, execute_operation},
    cmap::Connection,
    coll::options::FindOptions,
    collation::Collation,
    concern::ReadConcern,
    error::Result,
    operation::{check_collation, Find as Op},
    sdam::Protocol,
    Collection,
    Cursor,
};

impl Collection {
    /// Finds the documents in the collection matching `filter`.
    ///
    /// Servers that support the `find` command receive one; older servers receive an `OP_QUERY`.
    /// Either way the returned [`Cursor`] yields at most `limit` documents.
    ///
    /// `await` will return `Result<Cursor>`.
    pub fn find(&self, filter: Document) -> Find {
        Find {
            coll: self,
            filter,
            options: None,
            connection: None,
        }
    }
}

/// Finds the documents in a collection matching a filter.  Construct with [`Collection::find`].
#[must_use]
pub struct Find<'a> {
    coll: &'a Collection,
    filter: Document,
    options: Option<FindOptions>,
    connection: Option<&'a mut Connection>,
}

impl<'a> Find<'a> {
    option_setters! { options: FindOptions;
        sort: Document,
        projection: Document,
        skip: u64,
        limit: i64,
        batch_size: u32,
        read_concern: ReadConcern,
        collation: Collation,
        timeout: Duration,
    }

    /// Runs the query on `connection` instead of leasing one from the pool. The cursor borrows
    /// the connection for as long as it lives and never returns it to the pool.
    pub fn connection(mut self, connection: &'a mut Connection) -> Self {
        self.connection = Some(connection);
        self
    }
}

action_impl! {
    impl<'a> Action for Find<'a> {
        type Future = FindFuture;

        async fn execute(mut self) -> Result<Cursor<'a>> {
            resolve_options!(self.coll, self.options, [read_concern, collation, timeout]);
            let timeout = self.options.as_ref().and_then(|o| o.timeout);

            with_timeout(timeout, find(self.coll, self.filter, self.options, self.connection)).await
        }
    }
}

async fn find<'a>(
    coll: &Collection,
    filter: Document,
    options: Option<FindOptions>,
    connection: Option<&'a mut Connection>,
) -> Result<Cursor<'a>> {
    let client = coll.client();
    let wire_version = client.topology().max_wire_version();
    let protocol = Protocol::for_find(wire_version);
    check_collation(
        options.as_ref().and_then(|o| o.collation.as_ref()),
        protocol,
        wire_version,
    )?;

    let ns = coll.namespace();
    let mut op = Op::new(ns.clone(), filter, options);
    let legacy_query = match protocol {
        Protocol::Legacy => Some(op.legacy()?),
        Protocol::Command => None,
    };

    let mut conn = client
        .acquire(connection, false, &ns.db, client.checkout_timeout(0))
        .await?;
    let spec = match legacy_query {
        Some(query) => execute_legacy_query(&mut conn, query)
            .await
            .map(|reply| op.handle_legacy_reply(reply)),
        None => execute_operation(&mut conn, &mut op).await,
    };
    match spec {
        Ok(spec) => Ok(Cursor::new(spec, conn)),
        Err(error) => {
            conn.release();
            Err(error)
        }
    }
}
