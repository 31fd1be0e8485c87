//! Contains the `Error` and `Result` types that `mongodb-crud` uses.

pub(crate) mod correlate;

use std::{fmt, sync::Arc};

use serde::Deserialize;
use thiserror::Error;

use crate::bson::{Bson, Document};

/// The error code the server uses when a getMore names a cursor it no longer knows about.
pub(crate) const CURSOR_NOT_FOUND_CODE: i32 = 43;

/// The result type for all methods that can return an error in the `mongodb-crud` crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur in the `mongodb-crud` crate. The inner
/// [`ErrorKind`](enum.ErrorKind.html) is boxed to keep `Result`s small.
#[derive(Clone, Debug, Error)]
#[error("{kind}")]
#[non_exhaustive]
pub struct Error {
    /// The type of error that occurred.
    pub kind: Box<ErrorKind>,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        ErrorKind::Internal {
            message: message.into(),
        }
        .into()
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        ErrorKind::InvalidArgument {
            message: message.into(),
        }
        .into()
    }

    pub(crate) fn malformed_reply(message: impl Into<String>) -> Self {
        ErrorKind::MalformedReply {
            message: message.into(),
        }
        .into()
    }

    pub(crate) fn invalid_reply(message: impl Into<String>) -> Self {
        ErrorKind::InvalidReply {
            message: message.into(),
        }
        .into()
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        ErrorKind::Protocol {
            message: message.into(),
        }
        .into()
    }

    pub(crate) fn incompatible_server(message: impl Into<String>) -> Self {
        ErrorKind::IncompatibleServer {
            message: message.into(),
        }
        .into()
    }

    /// Whether this error was caused by a fault in the transport. Connections that observe such an
    /// error are not returned to the pool as healthy.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self.kind.as_ref(),
            ErrorKind::Io(..) | ErrorKind::Protocol { .. }
        )
    }

    /// Whether this error reports documents that the server refused to write.
    pub fn is_partial_write_failure(&self) -> bool {
        matches!(
            self.kind.as_ref(),
            ErrorKind::InsertMany(..) | ErrorKind::Update(..) | ErrorKind::Remove(..)
        )
    }

    /// The per-document write errors carried by this error, if any.
    pub fn write_errors(&self) -> Option<&[IndexedWriteError]> {
        match self.kind.as_ref() {
            ErrorKind::InsertMany(failure) => Some(&failure.write_errors),
            ErrorKind::Update(failure) | ErrorKind::Remove(failure) => {
                Some(&failure.write_errors)
            }
            _ => None,
        }
    }

    /// The server error code, if this error came from the server.
    pub fn code(&self) -> Option<i32> {
        match self.kind.as_ref() {
            ErrorKind::Command(err) => Some(err.code),
            _ => None,
        }
    }
}

impl<E> From<E> for Error
where
    ErrorKind: From<E>,
{
    fn from(err: E) -> Self {
        Self::new(err.into())
    }
}

impl From<std::io::Error> for ErrorKind {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl std::ops::Deref for Error {
    type Target = ErrorKind;

    fn deref(&self) -> &Self::Target {
        &self.kind
    }
}

/// The types of errors that can occur.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// An invalid argument was provided.
    #[error("An invalid argument was provided: {message}")]
    #[non_exhaustive]
    InvalidArgument { message: String },

    /// No connection became available before the checkout timeout elapsed.
    #[error("Timed out while checking out a connection from the pool: {message}")]
    #[non_exhaustive]
    PoolExhausted { message: String },

    /// The pool could not authenticate a connection for the requested database.
    #[error("{message}")]
    #[non_exhaustive]
    Authentication { message: String },

    /// Wrapper around `bson::de::Error`.
    #[error("{0}")]
    BsonDeserialization(crate::bson::de::Error),

    /// Wrapper around `bson::ser::Error`.
    #[error("{0}")]
    BsonSerialization(crate::bson::ser::Error),

    /// The server returned an error to an attempted command.
    #[error("Command failed: {0}")]
    Command(CommandError),

    /// Some of the documents passed to an insert could not be written.
    #[error("An error occurred when trying to execute an insert operation: {0:?}")]
    InsertMany(InsertManyError),

    /// Some of the update statements could not be applied.
    #[error("An error occurred when trying to execute an update operation: {0:?}")]
    Update(WriteFailure),

    /// Some of the delete statements could not be applied.
    #[error("An error occurred when trying to execute a delete operation: {0:?}")]
    Remove(WriteFailure),

    /// Wrapper around [`std::io::Error`](https://doc.rust-lang.org/std/io/struct.Error.html).
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    /// The transport reported a fault in the middle of a request/reply cycle.
    #[error("A wire protocol error occurred: {message}")]
    #[non_exhaustive]
    Protocol { message: String },

    /// The server's reply could not be decoded into the expected shape.
    #[error("The server returned a malformed reply to a database operation: {message}")]
    #[non_exhaustive]
    MalformedReply { message: String },

    /// A recognized write error sub-document was missing required fields.
    #[error("The server returned an invalid write error: {message}")]
    #[non_exhaustive]
    InvalidReply { message: String },

    /// The server does not support the operation.
    #[error("The server does not support a database operation: {message}")]
    #[non_exhaustive]
    IncompatibleServer { message: String },

    /// The operation did not complete before its timeout elapsed. Requests that were already
    /// dispatched may still be applied by the server.
    #[error("The operation timed out: {message}")]
    #[non_exhaustive]
    Timeout { message: String },

    #[error("Internal error: {message}")]
    #[non_exhaustive]
    #[allow(missing_docs)]
    Internal { message: String },
}

impl From<crate::bson::de::Error> for ErrorKind {
    fn from(err: crate::bson::de::Error) -> Self {
        Self::BsonDeserialization(err)
    }
}

impl From<crate::bson::ser::Error> for ErrorKind {
    fn from(err: crate::bson::ser::Error) -> Self {
        Self::BsonSerialization(err)
    }
}

/// An error that occurred due to a database command failing.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[non_exhaustive]
pub struct CommandError {
    /// Identifies the type of error.
    #[serde(default)]
    pub code: i32,

    /// The name associated with the error code.
    #[serde(rename = "codeName", default)]
    pub code_name: String,

    /// A description of the error that occurred.
    #[serde(rename = "errmsg", alias = "$err", default)]
    pub message: String,
}

impl fmt::Display for CommandError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "Error code {} ({}): {}", self.code, self.code_name, self.message)
    }
}

/// An error that occurred due to not being able to satisfy a write concern.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[non_exhaustive]
pub struct WriteConcernError {
    /// Identifies the type of write concern error.
    pub code: i32,

    /// The name associated with the error code.
    #[serde(rename = "codeName", default)]
    pub code_name: String,

    /// A description of the error that occurred.
    #[serde(rename = "errmsg", default)]
    pub message: String,

    /// A document identifying the write concern setting related to the error.
    #[serde(rename = "errInfo")]
    pub details: Option<Document>,
}

/// A single write that the server refused, attributed to the item that caused it.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct IndexedWriteError {
    /// Position of the failed item in the caller's original input.
    pub index: usize,

    /// Identifies the type of write error.
    pub code: i32,

    /// The name associated with the error code.
    ///
    /// Note that the server will not return this in some cases, hence `code_name` being an
    /// `Option`.
    pub code_name: Option<String>,

    /// A description of the error that occurred.
    pub message: String,

    /// Additional information the server attached to the error.
    pub details: Option<Document>,

    /// The item as it was submitted: the inserted document (including its `_id`), or the update or
    /// delete statement.
    pub item: Document,
}

/// The items that failed during an update or delete.
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct WriteFailure {
    /// The errors for individual statements, ordered by index.
    pub write_errors: Vec<IndexedWriteError>,

    /// The error that occurred on account of write concern failure.
    pub write_concern_error: Option<WriteConcernError>,
}

/// The outcome of an insert in which some documents could not be written.
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct InsertManyError {
    /// The errors for individual documents, ordered by index.
    pub write_errors: Vec<IndexedWriteError>,

    /// The error that occurred on account of write concern failure.
    pub write_concern_error: Option<WriteConcernError>,

    /// The `_id`s of the documents that were written, in input order. Never contains the `_id` of
    /// a document listed in `write_errors`.
    pub inserted_ids: Vec<Bson>,

    /// The `_id`s of documents in chunks that were never dispatched because an ordered insert
    /// failed first.
    pub unsent_ids: Vec<Bson>,
}
