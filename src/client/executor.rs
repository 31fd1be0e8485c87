use std::time::{Duration, Instant};

use super::Client;
use crate::{
    bson::Document,
    cmap::{
        conn::wire::next_request_id,
        CheckoutRequest,
        Command,
        Connection,
        ConnectionHandle,
        LeasedConnection,
        LegacyMessage,
        Reply,
    },
    error::{Error, ErrorKind, Result},
    operation::{self, Operation},
    runtime,
    trace::{
        TracingRepresentation,
        COMMAND_TRACING_EVENT_TARGET,
        CONNECTION_TRACING_EVENT_TARGET,
    },
};

impl Client {
    /// Wraps a caller-supplied connection, or checks one out of the pool for `database` within
    /// `timeout`.
    pub(crate) async fn acquire<'c>(
        &self,
        supplied: Option<&'c mut Connection>,
        for_writing: bool,
        database: &str,
        timeout: Duration,
    ) -> Result<ConnectionHandle<'c>> {
        if let Some(conn) = supplied {
            return Ok(ConnectionHandle::Borrowed(conn));
        }
        self.check_out(for_writing, database, timeout)
            .await
            .map(ConnectionHandle::Leased)
    }

    /// Checks a connection out of the pool. Unlike [`Client::acquire`], the result does not borrow
    /// anything, so it can be moved into a background task.
    pub(crate) async fn check_out(
        &self,
        for_writing: bool,
        database: &str,
        timeout: Duration,
    ) -> Result<LeasedConnection> {
        tracing::debug!(
            target: CONNECTION_TRACING_EVENT_TARGET,
            databaseName = database,
            forWriting = for_writing,
            "Connection checkout started"
        );
        let request = CheckoutRequest {
            for_writing,
            database: database.to_string(),
            timeout,
        };
        let checkout = runtime::timeout(timeout, self.pool().check_out(request), || {
            ErrorKind::PoolExhausted {
                message: format!("no connection became available within {timeout:?}"),
            }
        })
        .await
        .and_then(|result| result);

        match checkout {
            Ok(conn) => {
                tracing::debug!(
                    target: CONNECTION_TRACING_EVENT_TARGET,
                    driverConnectionId = conn.id(),
                    "Connection checked out"
                );
                Ok(LeasedConnection::new(conn, self.pool().clone()))
            }
            Err(error) => {
                tracing::debug!(
                    target: CONNECTION_TRACING_EVENT_TARGET,
                    error = error.tracing_representation(),
                    "Connection checkout failed"
                );
                Err(error)
            }
        }
    }
}

/// Sends one command and waits for its reply. Every command this crate sends goes through here.
/// Does not retry and does not look at what the command means; `ok: 0` replies are returned like
/// any other.
pub(crate) async fn execute_command(conn: &mut Connection, command: Command) -> Result<Document> {
    let request_id = next_request_id();
    let command_name = command.name.clone();
    let start = Instant::now();
    tracing::debug!(
        target: COMMAND_TRACING_EVENT_TARGET,
        command = command.body.tracing_representation(),
        databaseName = command.target_db.as_str(),
        commandName = command_name.as_str(),
        requestId = request_id,
        driverConnectionId = conn.id(),
        "Command started"
    );

    let result = match conn.send_command(command).await {
        Ok(response) => response.body(),
        Err(error) => Err(error),
    };

    match result {
        Ok(ref reply) => tracing::debug!(
            target: COMMAND_TRACING_EVENT_TARGET,
            reply = reply.tracing_representation(),
            commandName = command_name.as_str(),
            requestId = request_id,
            driverConnectionId = conn.id(),
            durationMS = start.elapsed().as_millis(),
            "Command succeeded"
        ),
        Err(ref error) => tracing::debug!(
            target: COMMAND_TRACING_EVENT_TARGET,
            failure = error.tracing_representation(),
            commandName = command_name.as_str(),
            requestId = request_id,
            driverConnectionId = conn.id(),
            durationMS = start.elapsed().as_millis(),
            "Command failed"
        ),
    }
    result
}

/// Builds `op`, sends it and interprets the reply.
pub(crate) async fn execute_operation<T: Operation>(
    conn: &mut Connection,
    op: &mut T,
) -> Result<T::O> {
    let command = op.build()?;
    let reply = execute_command(conn, command).await?;
    if !op.handles_command_errors() {
        operation::validate_reply(&reply)?;
    }
    op.handle_response(reply)
}

/// Sends a legacy opcode message. Returns the `OP_REPLY` for queries and getMores.
pub(crate) async fn execute_legacy(
    conn: &mut Connection,
    message: LegacyMessage,
) -> Result<Option<Reply>> {
    let op_name = message.name();
    let expects_reply = message.expects_reply();
    tracing::debug!(
        target: COMMAND_TRACING_EVENT_TARGET,
        opCode = op_name,
        driverConnectionId = conn.id(),
        "Legacy message sent"
    );

    let reply = conn.send_legacy(message).await;
    match reply {
        Ok(Some(_)) | Ok(None) if !expects_reply => Ok(None),
        Ok(Some(reply)) => Ok(Some(reply)),
        Ok(None) => Err(Error::malformed_reply(format!(
            "the server did not answer {op_name}"
        ))),
        Err(error) => {
            tracing::debug!(
                target: COMMAND_TRACING_EVENT_TARGET,
                opCode = op_name,
                failure = error.tracing_representation(),
                driverConnectionId = conn.id(),
                "Legacy message failed"
            );
            Err(error)
        }
    }
}

/// Like [`execute_legacy`] for messages that are answered, returning the validated reply.
pub(crate) async fn execute_legacy_query(
    conn: &mut Connection,
    message: LegacyMessage,
) -> Result<Reply> {
    match execute_legacy(conn, message).await? {
        Some(reply) => reply.validate(),
        None => Err(Error::internal("legacy message does not expect a reply")),
    }
}
