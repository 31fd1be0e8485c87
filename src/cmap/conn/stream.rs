use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use super::{
    wire::{
        decode_op_msg,
        encode_op_msg,
        encode_op_query_command,
        next_request_id,
        read_message,
        Header,
        OpCode,
    },
    Command,
    LegacyMessage,
    RawCommandResponse,
    Reply,
    Transport,
};
use crate::{
    bson::Document,
    error::{Error, Result},
    sdam::OP_MSG_MIN_WIRE_VERSION,
    BoxFuture,
};

/// A [`Transport`] over any established byte stream, e.g. a `TcpStream` that has completed the
/// handshake. Commands are framed as OP_MSG for servers that support it and as an OP_QUERY against
/// `<db>.$cmd` otherwise.
#[derive(Debug)]
pub struct StreamTransport<S> {
    stream: S,
    max_wire_version: i32,
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wraps `stream`, which is connected to a server with the given negotiated wire version.
    pub fn new(stream: S, max_wire_version: i32) -> Self {
        Self {
            stream,
            max_wire_version,
        }
    }

    async fn write(&mut self, message: &[u8]) -> Result<()> {
        self.stream.write_all(message).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn read_reply_to(&mut self, request_id: i32) -> Result<(Header, Vec<u8>)> {
        let (header, body) = read_message(&mut self.stream).await?;
        if header.response_to != request_id {
            return Err(Error::protocol(format!(
                "expected a response to request {request_id}, got a response to {}",
                header.response_to
            )));
        }
        Ok((header, body))
    }

    async fn command_reply(&mut self, command: Command) -> Result<Document> {
        let request_id = next_request_id();
        let use_op_msg = self.max_wire_version >= OP_MSG_MIN_WIRE_VERSION;
        let message = if use_op_msg {
            encode_op_msg(&command, request_id)?
        } else {
            encode_op_query_command(&command, request_id)?
        };
        self.write(&message).await?;

        let (header, body) = self.read_reply_to(request_id).await?;
        match header.op_code {
            OpCode::Message => decode_op_msg(&body),
            OpCode::Reply => Reply::decode(&body)?
                .validate()?
                .documents
                .into_iter()
                .next()
                .ok_or_else(|| Error::malformed_reply("command reply contained no document")),
            other => Err(Error::protocol(format!(
                "unexpected opcode {other:?} in a command reply"
            ))),
        }
    }
}

impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn send_command(&mut self, command: Command) -> BoxFuture<'_, Result<RawCommandResponse>> {
        Box::pin(async move {
            let reply = self.command_reply(command).await?;
            RawCommandResponse::with_document(&reply)
        })
    }

    fn send_legacy(&mut self, message: LegacyMessage) -> BoxFuture<'_, Result<Option<Reply>>> {
        Box::pin(async move {
            let request_id = next_request_id();
            self.write(&message.encode(request_id)?).await?;
            if !message.expects_reply() {
                return Ok(None);
            }

            let (header, body) = self.read_reply_to(request_id).await?;
            if header.op_code != OpCode::Reply {
                return Err(Error::protocol(format!(
                    "expected OP_REPLY, got {:?}",
                    header.op_code
                )));
            }
            Reply::decode(&body).map(Some)
        })
    }
}
