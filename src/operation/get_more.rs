use std::collections::VecDeque;

use serde::Deserialize;

use crate::{
    bson::{self, doc, Document},
    cmap::{Command, LegacyMessage},
    error::{Error, Result},
    operation::Operation,
    Namespace,
};

/// Fetches the next batch of an open cursor.
#[derive(Debug)]
pub(crate) struct GetMore {
    ns: Namespace,
    cursor_id: i64,
    batch_size: Option<u32>,
}

/// The next batch of a cursor and the id to continue with (0 once the server is done).
#[derive(Debug)]
pub(crate) struct GetMoreResult {
    pub(crate) batch: VecDeque<Document>,
    pub(crate) id: i64,
}

impl GetMore {
    pub(crate) fn new(ns: Namespace, cursor_id: i64, batch_size: Option<u32>) -> Self {
        Self {
            ns,
            cursor_id,
            batch_size,
        }
    }

    /// The `OP_GET_MORE` equivalent. A batch size of zero lets the server choose.
    pub(crate) fn legacy(&self) -> LegacyMessage {
        LegacyMessage::GetMore {
            namespace: self.ns.clone(),
            number_to_return: self
                .batch_size
                .and_then(|n| i32::try_from(n).ok())
                .unwrap_or(0),
            cursor_id: self.cursor_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GetMoreResponseBody {
    cursor: NextBatchBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NextBatchBody {
    id: i64,
    next_batch: VecDeque<Document>,
}

impl Operation for GetMore {
    type O = GetMoreResult;

    const NAME: &'static str = "getMore";

    fn build(&mut self) -> Result<Command> {
        let mut body = doc! {
            Self::NAME: self.cursor_id,
            "collection": self.ns.coll.clone(),
        };

        if let Some(batch_size) = self.batch_size {
            let batch_size = i32::try_from(batch_size).map_err(|_| {
                Error::invalid_argument(format!(
                    "the batch size must fit into an i32, got {batch_size}"
                ))
            })?;
            if batch_size != 0 {
                body.insert("batchSize", batch_size);
            }
        }

        Ok(Command::new(Self::NAME, self.ns.db.clone(), body))
    }

    fn handle_response(&self, reply: Document) -> Result<Self::O> {
        let response: GetMoreResponseBody = bson::from_document(reply)
            .map_err(|e| Error::malformed_reply(format!("invalid getMore reply: {e}")))?;

        Ok(GetMoreResult {
            batch: response.cursor.next_batch,
            id: response.cursor.id,
        })
    }
}
