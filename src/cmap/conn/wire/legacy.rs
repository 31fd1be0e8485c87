use bitflags::bitflags;

use super::{frame, write_cstring, OpCode};
use crate::{bson::Document, error::Result, Namespace};

bitflags! {
    /// The flags of an `OP_INSERT`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct InsertFlags: u32 {
        /// Keep inserting the remaining documents after one fails.
        const CONTINUE_ON_ERROR = 0b0000_0001;
    }
}

bitflags! {
    /// The flags of an `OP_UPDATE`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct UpdateFlags: u32 {
        /// Insert the update document if nothing matches the selector.
        const UPSERT       = 0b0000_0001;
        /// Update every matching document rather than the first.
        const MULTI_UPDATE = 0b0000_0010;
    }
}

bitflags! {
    /// The flags of an `OP_DELETE`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct DeleteFlags: u32 {
        /// Remove only the first matching document.
        const SINGLE_REMOVE = 0b0000_0001;
    }
}

bitflags! {
    /// The flags of an `OP_QUERY`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct QueryFlags: u32 {
        /// Leave the cursor open after the last document is returned.
        const TAILABLE_CURSOR    = 0b0000_0010;
        /// Allow the query to run against a secondary.
        const SECONDARY_OK       = 0b0000_0100;
        /// Do not time out the cursor after a period of inactivity.
        const NO_CURSOR_TIMEOUT  = 0b0001_0000;
        /// Block for a while rather than returning no data on a tailable cursor.
        const AWAIT_DATA         = 0b0010_0000;
        /// Return partial results if some shards are down.
        const PARTIAL            = 0b1000_0000;
    }
}

/// A message in the fixed-layout opcode protocol that predates commands.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum LegacyMessage {
    /// `OP_INSERT`. Never answered.
    Insert {
        /// The collection to insert into.
        namespace: Namespace,
        /// Insert flags.
        flags: InsertFlags,
        /// The documents to insert.
        documents: Vec<Document>,
    },

    /// `OP_UPDATE`. Never answered.
    Update {
        /// The collection to update.
        namespace: Namespace,
        /// Update flags.
        flags: UpdateFlags,
        /// Selects the documents to update.
        selector: Document,
        /// The modifier or replacement document.
        update: Document,
    },

    /// `OP_DELETE`. Never answered.
    Delete {
        /// The collection to delete from.
        namespace: Namespace,
        /// Delete flags.
        flags: DeleteFlags,
        /// Selects the documents to delete.
        selector: Document,
    },

    /// `OP_QUERY`. Answered with an `OP_REPLY`.
    Query {
        /// The collection to query, or `<db>.$cmd` for a command.
        namespace: Namespace,
        /// Query flags.
        flags: QueryFlags,
        /// The number of documents to skip.
        number_to_skip: i32,
        /// The size of the first batch. Negative values ask the server to close the cursor after
        /// one batch.
        number_to_return: i32,
        /// The query document.
        query: Document,
        /// The projection, if any.
        return_fields_selector: Option<Document>,
    },

    /// `OP_GET_MORE`. Answered with an `OP_REPLY`.
    GetMore {
        /// The collection the cursor belongs to.
        namespace: Namespace,
        /// The size of the next batch.
        number_to_return: i32,
        /// The cursor to read from.
        cursor_id: i64,
    },

    /// `OP_KILL_CURSORS`. Never answered.
    KillCursors {
        /// The cursors to close.
        cursor_ids: Vec<i64>,
    },
}

impl LegacyMessage {
    pub(crate) fn op_code(&self) -> OpCode {
        match self {
            Self::Insert { .. } => OpCode::Insert,
            Self::Update { .. } => OpCode::Update,
            Self::Delete { .. } => OpCode::Delete,
            Self::Query { .. } => OpCode::Query,
            Self::GetMore { .. } => OpCode::GetMore,
            Self::KillCursors { .. } => OpCode::KillCursors,
        }
    }

    /// The name of the opcode, e.g. `"OP_INSERT"`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Insert { .. } => "OP_INSERT",
            Self::Update { .. } => "OP_UPDATE",
            Self::Delete { .. } => "OP_DELETE",
            Self::Query { .. } => "OP_QUERY",
            Self::GetMore { .. } => "OP_GET_MORE",
            Self::KillCursors { .. } => "OP_KILL_CURSORS",
        }
    }

    /// Whether the server answers this message with an `OP_REPLY`.
    pub fn expects_reply(&self) -> bool {
        matches!(self, Self::Query { .. } | Self::GetMore { .. })
    }

    /// Serializes the message, header included.
    pub fn encode(&self, request_id: i32) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        match self {
            Self::Insert {
                namespace,
                flags,
                documents,
            } => {
                body.extend_from_slice(&flags.bits().to_le_bytes());
                write_cstring(&mut body, &namespace.to_string())?;
                for document in documents {
                    document.to_writer(&mut body)?;
                }
            }
            Self::Update {
                namespace,
                flags,
                selector,
                update,
            } => {
                body.extend_from_slice(&0i32.to_le_bytes());
                write_cstring(&mut body, &namespace.to_string())?;
                body.extend_from_slice(&flags.bits().to_le_bytes());
                selector.to_writer(&mut body)?;
                update.to_writer(&mut body)?;
            }
            Self::Delete {
                namespace,
                flags,
                selector,
            } => {
                body.extend_from_slice(&0i32.to_le_bytes());
                write_cstring(&mut body, &namespace.to_string())?;
                body.extend_from_slice(&flags.bits().to_le_bytes());
                selector.to_writer(&mut body)?;
            }
            Self::Query {
                namespace,
                flags,
                number_to_skip,
                number_to_return,
                query,
                return_fields_selector,
            } => {
                body.extend_from_slice(&flags.bits().to_le_bytes());
                write_cstring(&mut body, &namespace.to_string())?;
                body.extend_from_slice(&number_to_skip.to_le_bytes());
                body.extend_from_slice(&number_to_return.to_le_bytes());
                query.to_writer(&mut body)?;
                if let Some(fields) = return_fields_selector {
                    fields.to_writer(&mut body)?;
                }
            }
            Self::GetMore {
                namespace,
                number_to_return,
                cursor_id,
            } => {
                body.extend_from_slice(&0i32.to_le_bytes());
                write_cstring(&mut body, &namespace.to_string())?;
                body.extend_from_slice(&number_to_return.to_le_bytes());
                body.extend_from_slice(&cursor_id.to_le_bytes());
            }
            Self::KillCursors { cursor_ids } => {
                body.extend_from_slice(&0i32.to_le_bytes());
                let count = i32::try_from(cursor_ids.len()).map_err(|_| {
                    crate::error::Error::invalid_argument("too many cursors to kill at once")
                })?;
                body.extend_from_slice(&count.to_le_bytes());
                for id in cursor_ids {
                    body.extend_from_slice(&id.to_le_bytes());
                }
            }
        }
        frame(self.op_code(), request_id, 0, &body)
    }
}
