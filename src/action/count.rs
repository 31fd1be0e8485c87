use std::time::Duration;

use super::{action_impl, option_setters, with_timeout};
use crate::{
    bson::Document,
    client::executor::execute_operation,
    cmap::Connection,
    coll::options::CountOptions,
    collation::Collation,
    concern::ReadConcern,
    error::Result,
    operation::{check_collation, Count as Op},
    sdam::Protocol,
    Collection,
};

impl Collection {
    /// Counts the documents in the collection matching `filter` with a single `count` command.
    ///
    /// `await` will return `Result<u64>`.
    pub fn count(&self, filter: Document) -> Count {
        Count {
            coll: self,
            filter,
            options: None,
            connection: None,
        }
    }
}

/// Counts the documents matching a filter.  Construct with [`Collection::count`].
#[must_use]
pub struct Count<'a> {
    coll: &'a Collection,
    filter: Document,
    options: Option<CountOptions>,
    connection: Option<&'a mut Connection>,
}

impl<'a> Count<'a> {
    option_setters! { options: CountOptions;
        skip: u64,
        limit: u64,
        read_concern: ReadConcern,
        collation: Collation,
        timeout: Duration,
    }

    /// Runs the count on `connection` instead of leasing one from the pool. The connection is
    /// left with the caller.
    pub fn connection(mut self, connection: &'a mut Connection) -> Self {
        self.connection = Some(connection);
        self
    }
}

action_impl! {
    impl<'a> Action for Count<'a> {
        type Future = CountFuture;

        async fn execute(mut self) -> Result<u64> {
            resolve_options!(self.coll, self.options, [read_concern, collation, timeout]);
            let timeout = self.options.as_ref().and_then(|o| o.timeout);

            with_timeout(timeout, count(self.coll, self.filter, self.options, self.connection)).await
        }
    }
}

async fn count(
    coll: &Collection,
    filter: Document,
    options: Option<CountOptions>,
    connection: Option<&mut Connection>,
) -> Result<u64> {
    let client = coll.client();
    check_collation(
        options.as_ref().and_then(|o| o.collation.as_ref()),
        Protocol::Command,
        client.topology().max_wire_version(),
    )?;

    let ns = coll.namespace();
    let mut op = Op::new(ns.clone(), filter, options);
    let mut conn = client
        .acquire(connection, false, &ns.db, client.checkout_timeout(0))
        .await?;
    let count = execute_operation(&mut conn, &mut op).await;
    conn.release();
    count
}
