mod header;
mod legacy;
mod message;
mod reply;
#[cfg(test)]
mod test;

use std::sync::atomic::{AtomicI32, Ordering};

use tokio::io::{AsyncRead, AsyncReadExt};

pub(crate) use self::{
    header::{Header, OpCode},
    message::{decode_op_msg, encode_op_msg, encode_op_query_command},
};
pub use self::{
    legacy::{DeleteFlags, InsertFlags, LegacyMessage, QueryFlags, UpdateFlags},
    reply::{Reply, ResponseFlags},
};
use crate::error::{Error, Result};

/// The largest message the server will send.
pub(crate) const DEFAULT_MAX_MESSAGE_SIZE_BYTES: i32 = 48 * 1024 * 1024;

/// Obtains a new, unique request ID.
pub(crate) fn next_request_id() -> i32 {
    static REQUEST_ID: AtomicI32 = AtomicI32::new(0);
    REQUEST_ID.fetch_add(1, Ordering::SeqCst)
}

/// Prepends a header to a message body.
pub(crate) fn frame(
    op_code: OpCode,
    request_id: i32,
    response_to: i32,
    body: &[u8],
) -> Result<Vec<u8>> {
    let length = i32::try_from(Header::LENGTH + body.len())
        .map_err(|_| Error::invalid_argument("message exceeds the maximum wire message size"))?;
    let header = Header {
        length,
        request_id,
        response_to,
        op_code,
    };
    let mut message = Vec::with_capacity(length as usize);
    header.write_to(&mut message);
    message.extend_from_slice(body);
    Ok(message)
}

/// Reads one message, returning its header and the bytes that follow it.
pub(crate) async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<(Header, Vec<u8>)> {
    let header = Header::read_from(reader).await?;
    if header.length < Header::LENGTH as i32 || header.length > DEFAULT_MAX_MESSAGE_SIZE_BYTES {
        return Err(Error::protocol(format!(
            "invalid message length {} (maximum {})",
            header.length, DEFAULT_MAX_MESSAGE_SIZE_BYTES
        )));
    }
    let mut body = vec![0u8; header.length as usize - Header::LENGTH];
    reader.read_exact(&mut body).await?;
    Ok((header, body))
}

/// An empty BSON document: its length prefix and the trailing null.
pub(super) const MIN_DOCUMENT_LENGTH: usize = 5;

/// Little-endian reads over a message body.
pub(super) struct BodyReader<'a> {
    bytes: &'a [u8],
}

impl<'a> BodyReader<'a> {
    pub(super) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub(super) fn remaining(&self) -> usize {
        self.bytes.len()
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        if self.bytes.len() < N {
            return Err(Error::protocol("message ended unexpectedly"));
        }
        let (head, rest) = self.bytes.split_at(N);
        self.bytes = rest;
        let mut out = [0u8; N];
        out.copy_from_slice(head);
        Ok(out)
    }

    pub(super) fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    pub(super) fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    pub(super) fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    pub(super) fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.take()?))
    }

    pub(super) fn read_cstring(&mut self) -> Result<String> {
        let end = self
            .bytes
            .iter()
            .position(|b| *b == 0)
            .ok_or_else(|| Error::protocol("unterminated string in message"))?;
        let s = std::str::from_utf8(&self.bytes[..end])
            .map_err(|e| Error::protocol(format!("invalid string in message: {e}")))?
            .to_string();
        self.bytes = &self.bytes[end + 1..];
        Ok(s)
    }

    /// A document whose length prefix overruns the message is a framing fault. A document that
    /// fits but cannot be parsed is a malformed reply.
    pub(super) fn read_document(&mut self) -> Result<crate::bson::Document> {
        let length = self
            .bytes
            .get(..4)
            .and_then(|prefix| <[u8; 4]>::try_from(prefix).ok())
            .map(i32::from_le_bytes)
            .and_then(|length| usize::try_from(length).ok())
            .filter(|length| *length >= MIN_DOCUMENT_LENGTH && *length <= self.bytes.len())
            .ok_or_else(|| Error::protocol("document overruns the message"))?;
        let mut document = self.split_off(length)?;
        crate::bson::Document::from_reader(&mut document.bytes)
            .map_err(|e| Error::malformed_reply(format!("invalid document in message: {e}")))
    }

    pub(super) fn split_off(&mut self, len: usize) -> Result<BodyReader<'a>> {
        if self.bytes.len() < len {
            return Err(Error::protocol("message section overruns the message"));
        }
        let (head, rest) = self.bytes.split_at(len);
        self.bytes = rest;
        Ok(BodyReader { bytes: head })
    }
}

/// Serializes `string` with a null terminator appended.
pub(super) fn write_cstring(buf: &mut Vec<u8>, string: &str) -> Result<()> {
    if string.as_bytes().contains(&0) {
        return Err(Error::invalid_argument(format!(
            "{string:?} contains a null byte"
        )));
    }
    buf.extend_from_slice(string.as_bytes());
    buf.push(0);
    Ok(())
}
