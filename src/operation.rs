mod aggregate;
mod count;
mod delete;
mod find;
mod get_more;
mod insert;
mod kill_cursors;
mod update;


use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::{
    bson::{self, Bson, Document},
    bson_util,
    cmap::Command,
    collation::Collation,
    error::{CommandError, Error, ErrorKind, Result},
    sdam::{Protocol, COLLATION_MIN_WIRE_VERSION},
    Namespace,
};

pub(crate) use aggregate::Aggregate;
pub(crate) use count::Count;
pub(crate) use delete::{Delete, DeleteReply};
pub(crate) use find::Find;
pub(crate) use get_more::{GetMore, GetMoreResult};
pub(crate) use insert::Insert;
pub(crate) use kill_cursors::KillCursors;
pub(crate) use update::{Update, UpdateReply};

/// A command-protocol operation: how to build its command and how to read the reply.
pub(crate) trait Operation {
    /// The output type of this operation.
    type O;

    /// The name of the server side command associated with this operation.
    const NAME: &'static str;

    /// Returns the command that should be sent to the server as part of this operation.
    fn build(&mut self) -> Result<Command>;

    /// Interprets the server response to the command.
    fn handle_response(&self, reply: Document) -> Result<Self::O>;

    /// Whether `handle_response` should also see `ok: 0` replies.
    fn handles_command_errors(&self) -> bool {
        false
    }
}

/// Whether a reply reports `ok: 1`.
pub(crate) fn is_success(reply: &Document) -> bool {
    reply.get("ok").and_then(bson_util::get_int) == Some(1)
}

/// Turns an `ok: 0` reply into a [`CommandError`].
pub(crate) fn validate_reply(reply: &Document) -> Result<()> {
    if is_success(reply) {
        return Ok(());
    }
    let command_error: CommandError = bson::from_bson(Bson::Document(reply.clone()))
        .map_err(|e| Error::malformed_reply(format!("invalid command error: {e}")))?;
    Err(ErrorKind::Command(command_error).into())
}

/// Appends a serializable struct to the input document. The serializable struct MUST serialize to a
/// Document; otherwise, an error will be thrown.
pub(crate) fn append_options<T: Serialize>(doc: &mut Document, options: Option<&T>) -> Result<()> {
    if let Some(options) = options {
        let options_doc = bson::to_document(options)?;
        doc.extend(options_doc);
    }
    Ok(())
}

/// Fails before anything is sent if `collation` cannot be honored by the chosen protocol.
pub(crate) fn check_collation(
    collation: Option<&Collation>,
    protocol: Protocol,
    wire_version: i32,
) -> Result<()> {
    if collation.is_none() {
        return Ok(());
    }
    if protocol == Protocol::Legacy || wire_version < COLLATION_MIN_WIRE_VERSION {
        return Err(Error::incompatible_server(format!(
            "collation requires wire version {COLLATION_MIN_WIRE_VERSION}, the server supports \
             {wire_version}"
        )));
    }
    Ok(())
}

macro_rules! remove_empty_write_concern {
    ($opts:expr) => {
        if let Some(ref mut options) = $opts {
            if let Some(ref write_concern) = options.write_concern {
                if write_concern.is_empty() {
                    options.write_concern = None;
                }
            }
        }
    };
}

pub(crate) use remove_empty_write_concern;

/// The `cursor` sub-document of a `find` or `aggregate` reply.
#[derive(Debug, Deserialize)]
pub(crate) struct CursorBody {
    cursor: CursorInfo,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CursorInfo {
    pub(crate) id: i64,

    #[serde(default)]
    pub(crate) ns: Option<String>,

    pub(crate) first_batch: VecDeque<Document>,
}

/// Everything a cursor needs to know about the first batch of its results.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CursorSpecification {
    pub(crate) ns: Namespace,
    pub(crate) id: i64,
    pub(crate) first_batch: VecDeque<Document>,
    pub(crate) batch_size: Option<u32>,

    /// The most documents the cursor may yield, if limited.
    pub(crate) limit: Option<u64>,
    pub(crate) protocol: Protocol,
}

impl CursorSpecification {
    /// Reads the `cursor` sub-document of a command reply. A reply without one is malformed.
    pub(crate) fn from_reply(
        reply: Document,
        default_ns: &Namespace,
        batch_size: Option<u32>,
        limit: Option<u64>,
    ) -> Result<Self> {
        if !reply.contains_key("cursor") {
            return Err(Error::malformed_reply("reply did not contain a cursor"));
        }
        let body: CursorBody = bson::from_document(reply)
            .map_err(|e| Error::malformed_reply(format!("invalid cursor in reply: {e}")))?;

        let ns = match body.cursor.ns {
            Some(ref ns) => ns.parse()?,
            None => default_ns.clone(),
        };
        Ok(Self {
            ns,
            id: body.cursor.id,
            first_batch: body.cursor.first_batch,
            batch_size,
            limit,
            protocol: Protocol::Command,
        })
    }
}

/// Reads a non-negative count field from a write reply.
fn get_count(reply: &Document, key: &str) -> Result<u64> {
    match reply.get(key) {
        None => Ok(0),
        Some(value) => bson_util::get_u64(value).ok_or_else(|| {
            Error::malformed_reply(format!("expected {key} to be a count, got {value}"))
        }),
    }
}
