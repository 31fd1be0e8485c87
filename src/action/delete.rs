use super::{action_impl, option_setters, with_timeout};
use crate::{
    client::executor::{execute_command, execute_legacy},
    cmap::Connection,
    coll::options::{DeleteModel, DeleteOptions},
    collation::Collation,
    error::{
        correlate::{correlate, WriteErrorSet},
        ErrorKind,
        Result,
    },
    operation::{check_collation, validate_reply, Operation, Delete as Op},
    options::WriteConcern,
    results::DeleteResult,
    sdam::Protocol,
    Collection,
};

impl Collection {
    /// Removes the documents selected by each statement in `deletes`.
    ///
    /// On servers that support write commands every statement is sent in a single `delete`
    /// command and failures are reported as
    /// [`ErrorKind::Remove`](crate::error::ErrorKind::Remove), attributed to the statement that
    /// caused them. Older servers receive one unacknowledged message per statement; the result
    /// then only reports how many statements were sent.
    ///
    /// `await` will return `Result<DeleteResult>`.
    pub fn remove(&self, deletes: impl IntoIterator<Item = DeleteModel>) -> Remove {
        Remove {
            coll: self,
            deletes: deletes.into_iter().collect(),
            options: None,
            connection: None,
        }
    }
}

/// Deletes documents matching a query.  Construct with [`Collection::remove`].
#[must_use]
pub struct Remove<'a> {
    coll: &'a Collection,
    deletes: Vec<DeleteModel>,
    options: Option<DeleteOptions>,
    connection: Option<&'a mut Connection>,
}

impl<'a> Remove<'a> {
    option_setters! { options: DeleteOptions;
        ordered: bool,
        write_concern: WriteConcern,
        collation: Collation,
        timeout: std::time::Duration,
    }

    /// Runs the delete on `connection` instead of leasing one from the pool. The connection is
    /// left with the caller.
    pub fn connection(mut self, connection: &'a mut Connection) -> Self {
        self.connection = Some(connection);
        self
    }
}

action_impl! {
    impl<'a> Action for Remove<'a> {
        type Future = RemoveFuture;

        async fn execute(mut self) -> Result<DeleteResult> {
            resolve_options!(self.coll, self.options, [write_concern, collation, timeout]);
            let timeout = self.options.as_ref().and_then(|o| o.timeout);

            with_timeout(timeout, remove(self.coll, self.deletes, self.options, self.connection))
                .await
        }
    }
}

async fn remove(
    coll: &Collection,
    deletes: Vec<DeleteModel>,
    options: Option<DeleteOptions>,
    connection: Option<&mut Connection>,
) -> Result<DeleteResult> {
    let sent_count = deletes.len() as u64;
    if deletes.is_empty() {
        return Ok(DeleteResult {
            sent_count,
            deleted_count: Some(0),
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
            for model in &deletes {
                execute_legacy(&mut conn, Op::legacy(ns.clone(), model)).await?;
            }
            conn.release();

            Ok(DeleteResult {
                sent_count,
                deleted_count: None,
            })
        }
        Protocol::Command => {
            let mut op = Op::new(ns.clone(), &deletes, options)?;
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
                return Ok(DeleteResult {
                    sent_count,
                    deleted_count: None,
                });
            }
            let reply = op.handle_response(reply)?;

            let mut errors = WriteErrorSet::default();
            errors.absorb(correlate(&reply.reply, 0, op.statements())?);
            if let Some(failure) = errors.into_write_failure(ordered) {
                return Err(ErrorKind::Remove(failure).into());
            }

            Ok(DeleteResult {
                sent_count,
                deleted_count: Some(reply.deleted),
            })
        }
    }
}
