use std::collections::HashMap;

use super::{action_impl, option_setters, with_timeout};
use crate::{
    client::executor::{execute_command, execute_legacy},
    cmap::Connection,
    coll::options::{UpdateModel, UpdateOptions},
    collation::Collation,
    error::{
        correlate::{correlate, WriteErrorSet},
        ErrorKind,
        Result,
    },
    operation::{check_collation, validate_reply, Operation, Update as Op},
    options::WriteConcern,
    results::UpdateResult,
    sdam::Protocol,
    Collection,
};

impl Collection {
    /// Applies each statement in `updates` to the collection.
    ///
    /// On servers that support write commands every statement is sent in a single `update`
    /// command and failures are reported as
    /// [`ErrorKind::Update`](crate::error::ErrorKind::Update), attributed to the statement that
    /// caused them. If the update is ordered only the first failure is reported. Older servers
    /// receive one unacknowledged message per statement; the result then only reports how many
    /// statements were sent.
    ///
    /// `await` will return `Result<UpdateResult>`.
    pub fn update(&self, updates: impl IntoIterator<Item = UpdateModel>) -> Update {
        Update {
            coll: self,
            updates: updates.into_iter().collect(),
            options: None,
            connection: None,
        }
    }
}

/// Updates documents matching a query.  Construct with [`Collection::update`].
#[must_use]
pub struct Update<'a> {
    coll: &'a Collection,
    updates: Vec<UpdateModel>,
    options: Option<UpdateOptions>,
    connection: Option<&'a mut Connection>,
}

impl<'a> Update<'a> {
    option_setters! { options: UpdateOptions;
        bypass_document_validation: bool,
        ordered: bool,
        write_concern: WriteConcern,
        collation: Collation,
        timeout: std::time::Duration,
    }

    /// Runs the update on `connection` instead of leasing one from the pool. The connection is
    /// left with the caller.
    pub fn connection(mut self, connection: &'a mut Connection) -> Self {
        self.connection = Some(connection);
        self
    }
}

action_impl! {
    impl<'a> Action for Update<'a> {
        type Future = UpdateFuture;

        async fn execute(mut self) -> Result<UpdateResult> {
            resolve_options!(self.coll, self.options, [write_concern, collation, timeout]);
            let timeout = self.options.as_ref().and_then(|o| o.timeout);

            with_timeout(timeout, update(self.coll, self.updates, self.options, self.connection))
                .await
        }
    }
}

async fn update(
    coll: &Collection,
    updates: Vec<UpdateModel>,
    options: Option<UpdateOptions>,
    connection: Option<&mut Connection>,
) -> Result<UpdateResult> {
    for model in &updates {
        model.update.validate()?;
    }
    let sent_count = updates.len() as u64;
    if updates.is_empty() {
        return Ok(UpdateResult {
            sent_count,
            matched_count: Some(0),
            modified_count: Some(0),
            upserted_ids: HashMap::new(),
        });
    }

    let client = coll.client();
    let wire_version = client.topology().max_wire_version();
    let protocol = Protocol::for_write(wire_version);
    check_collation(
        options.as_ref().and_then(|o| o.collation.as_ref()),
        protocol,
        wire_version,
    )?;
    let write_concern = options.as_ref().and_then(|o| o.write_concern.as_ref());
    if let Some(write_concern) = write_concern {
        write_concern.validate()?;
    }
    let acknowledged = write_concern.is_none_or(WriteConcern::is_acknowledged);
    let ordered = options.as_ref().and_then(|o| o.ordered) == Some(true);

    let ns = coll.namespace();
    match protocol {
        Protocol::Legacy => {
            let mut conn = client
                .acquire(connection, true, &ns.db, client.checkout_timeout(0))
                .await?;
            for model in &updates {
                execute_legacy(&mut conn, Op::legacy(ns.clone(), model)).await?;
            }
            conn.release();

            Ok(UpdateResult {
                sent_count,
                matched_count: None,
                modified_count: None,
                upserted_ids: HashMap::new(),
            })
        }
        Protocol::Command => {
            let mut op = Op::new(ns.clone(), &updates, options)?;
            let mut conn = client
                .acquire(connection, true, &ns.db, client.checkout_timeout(0))
                .await?;
            let reply = match op.build() {
                Ok(command) => execute_command(&mut conn, command).await,
                Err(error) => Err(error),
            };
            conn.release();
            let reply = reply?;
            validate_reply(&reply)?;

            if !acknowledged {
                return Ok(UpdateResult {
                    sent_count,
                    matched_count: None,
                    modified_count: None,
                    upserted_ids: HashMap::new(),
                });
            }
            let reply = op.handle_response(reply)?;

            let mut errors = WriteErrorSet::default();
            errors.absorb(correlate(&reply.reply, 0, op.statements())?);
            if let Some(failure) = errors.into_write_failure(ordered) {
                return Err(ErrorKind::Update(failure).into());
            }

            Ok(UpdateResult {
                sent_count,
                matched_count: Some(reply.matched),
                modified_count: Some(reply.modified),
                upserted_ids: reply.upserted.into_iter().collect(),
            })
        }
    }
}
