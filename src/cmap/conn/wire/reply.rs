use bitflags::bitflags;

use super::{BodyReader, OpCode, MIN_DOCUMENT_LENGTH};
use crate::{
    bson::{doc, Document},
    error::{CommandError, Error, ErrorKind, Result, CURSOR_NOT_FOUND_CODE},
};

bitflags! {
    /// Represents the bitwise flags for an OP_REPLY.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ResponseFlags: u32 {
        /// The getMore named a cursor the server does not know about.
        const CURSOR_NOT_FOUND = 0b_0000_0000_0000_0000_0000_0000_0000_0001;
        /// The query failed; the single returned document describes the error.
        const QUERY_FAILURE    = 0b_0000_0000_0000_0000_0000_0000_0000_0010;
        /// The server supports `AWAIT_DATA`.
        const AWAIT_CAPABLE    = 0b_0000_0000_0000_0000_0000_0000_0000_1000;
    }
}

/// Represents a wire protocol OP_REPLY operation.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct Reply {
    /// The response flags.
    pub flags: ResponseFlags,

    /// The cursor the documents were read from, or 0 if it is exhausted.
    pub cursor_id: i64,

    /// The position of the first returned document in the cursor.
    pub starting_from: i32,

    /// The returned documents.
    pub documents: Vec<Document>,
}

impl Reply {
    /// A successful reply.
    pub fn new(cursor_id: i64, documents: Vec<Document>) -> Self {
        Self {
            flags: ResponseFlags::empty(),
            cursor_id,
            starting_from: 0,
            documents,
        }
    }

    /// Replaces the response flags.
    pub fn with_flags(mut self, flags: ResponseFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Deserializes the bytes following an OP_REPLY header.
    pub(crate) fn decode(body: &[u8]) -> Result<Self> {
        let mut reader = BodyReader::new(body);
        let flags = ResponseFlags::from_bits_truncate(reader.read_u32()?);
        let cursor_id = reader.read_i64()?;
        let starting_from = reader.read_i32()?;
        let number_returned = reader.read_i32()?;

        // Bounded by the bytes actually present.
        let capacity = usize::try_from(number_returned)
            .unwrap_or(0)
            .min(reader.remaining() / MIN_DOCUMENT_LENGTH);
        let mut documents = Vec::with_capacity(capacity);
        while reader.remaining() > 0 {
            documents.push(reader.read_document()?);
        }
        if usize::try_from(number_returned).ok() != Some(documents.len()) {
            return Err(Error::malformed_reply(format!(
                "reply announced {} documents but contained {}",
                number_returned,
                documents.len()
            )));
        }

        Ok(Self {
            flags,
            cursor_id,
            starting_from,
            documents,
        })
    }

    /// Serializes the reply, header included.
    pub fn encode(&self, request_id: i32, response_to: i32) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        body.extend_from_slice(&self.flags.bits().to_le_bytes());
        body.extend_from_slice(&self.cursor_id.to_le_bytes());
        body.extend_from_slice(&self.starting_from.to_le_bytes());
        let number_returned = i32::try_from(self.documents.len())
            .map_err(|_| Error::invalid_argument("too many documents in reply"))?;
        body.extend_from_slice(&number_returned.to_le_bytes());
        for document in &self.documents {
            document.to_writer(&mut body)?;
        }
        super::frame(OpCode::Reply, request_id, response_to, &body)
    }

    /// Converts the failure flags into errors.
    pub(crate) fn validate(self) -> Result<Self> {
        if self.flags.contains(ResponseFlags::CURSOR_NOT_FOUND) {
            return Err(ErrorKind::Command(CommandError {
                code: CURSOR_NOT_FOUND_CODE,
                code_name: "CursorNotFound".to_string(),
                message: format!("cursor {} not found", self.cursor_id),
            })
            .into());
        }
        if self.flags.contains(ResponseFlags::QUERY_FAILURE) {
            let error = self
                .documents
                .into_iter()
                .next()
                .unwrap_or_else(|| doc! { "$err": "query failure" });
            let command_error: CommandError = crate::bson::from_document(error)
                .map_err(|e| Error::malformed_reply(format!("invalid query failure: {e}")))?;
            return Err(ErrorKind::Command(command_error).into());
        }
        Ok(self)
    }
}
