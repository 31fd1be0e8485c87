use std::time::Duration;

use super::{action_impl, option_setters, with_timeout};
use crate::{
    bson::Document,
    client::executor::execute_operation,
    cmap::Connection,
    coll::options::AggregateOptions,
    collation::Collation,
    concern::ReadConcern,
    error::Result,
    operation::{check_collation, Aggregate as Op},
    sdam::Protocol,
    Collection,
    Cursor,
};

impl Collection {
    /// Runs an aggregation operation.
    ///
    /// See the documentation [here](https://www.mongodb.com/docs/manual/aggregation/) for more
    /// information on aggregations. The aggregation always runs in cursor mode, with batches of
    /// 100 documents.
    ///
    /// `await` will return `Result<Cursor>`.
    pub fn aggregate(&self, pipeline: impl IntoIterator<Item = Document>) -> Aggregate {
        Aggregate {
            coll: self,
            pipeline: pipeline.into_iter().collect(),
            options: None,
            connection: None,
        }
    }
}

/// Runs an aggregation pipeline.  Construct with [`Collection::aggregate`].
#[must_use]
pub struct Aggregate<'a> {
    coll: &'a Collection,
    pipeline: Vec<Document>,
    options: Option<AggregateOptions>,
    connection: Option<&'a mut Connection>,
}

impl<'a> Aggregate<'a> {
    option_setters! { options: AggregateOptions;
        allow_disk_use: bool,
        read_concern: ReadConcern,
        collation: Collation,
        timeout: Duration,
    }

    /// Runs the aggregation on `connection` instead of leasing one from the pool. The cursor
    /// borrows the connection for as long as it lives and never returns it to the pool.
    pub fn connection(mut self, connection: &'a mut Connection) -> Self {
        self.connection = Some(connection);
        self
    }
}

action_impl! {
    impl<'a> Action for Aggregate<'a> {
        type Future = AggregateFuture;

        async fn execute(mut self) -> Result<Cursor<'a>> {
            resolve_options!(self.coll, self.options, [read_concern, collation, timeout]);
            let timeout = self.options.as_ref().and_then(|o| o.timeout);

            with_timeout(timeout, aggregate(self.coll, self.pipeline, self.options, self.connection))
                .await
        }
    }
}

async fn aggregate<'a>(
    coll: &Collection,
    pipeline: Vec<Document>,
    options: Option<AggregateOptions>,
    connection: Option<&'a mut Connection>,
) -> Result<Cursor<'a>> {
    let client = coll.client();
    check_collation(
        options.as_ref().and_then(|o| o.collation.as_ref()),
        Protocol::Command,
        client.topology().max_wire_version(),
    )?;

    let ns = coll.namespace();
    let mut op = Op::new(ns.clone(), pipeline, options);
    let mut conn = client
        .acquire(connection, false, &ns.db, client.checkout_timeout(0))
        .await?;
    match execute_operation(&mut conn, &mut op).await {
        Ok(spec) => Ok(Cursor::new(spec, conn)),
        Err(error) => {
            conn.release();
            Err(error)
        }
    }
}
