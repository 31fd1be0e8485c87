use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use typed_builder::TypedBuilder;

use crate::{
    bson::Document,
    concern::{ReadConcern, WriteConcern},
    options::Collation,
    serde_util,
};

/// These are the valid options for creating a [`Collection`](../struct.Collection.html) with
/// [`Database::collection_with_options`](../struct.Database.html#method.collection_with_options).
/// Unset fields fall back to the options of the database and then of the client.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, TypedBuilder)]
#[builder(field_defaults(default, setter(into)))]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct CollectionOptions {
    /// The default read concern for operations.
    pub read_concern: Option<ReadConcern>,

    /// The default write concern for operations.
    pub write_concern: Option<WriteConcern>,

    /// The default collation for operations.
    pub collation: Option<Collation>,

    /// The default timeout for operations.
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

/// Specifies the options to a
/// [`Collection::insert_many`](../struct.Collection.html#method.insert_many) operation.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(field_defaults(default, setter(into)))]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct InsertManyOptions {
    /// Opt out of document-level validation.
    pub bypass_document_validation: Option<bool>,

    /// If true, when an insert fails, return without performing the remaining writes. If false,
    /// when a write fails, continue with the remaining writes, if any.
    ///
    /// Left unset, the server's default (ordered) applies, but chunks are dispatched without
    /// waiting on each other.
    pub ordered: Option<bool>,

    /// The write concern for the operation.
    pub write_concern: Option<WriteConcern>,

    /// How long to wait for the whole insert to complete.
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

/// The modification to apply to the documents selected by an update statement.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum UpdateModifications {
    /// An update document, made of update operators such as `$set`.
    Document(Document),

    /// A replacement document, which must not contain update operators at the top level.
    Replacement(Document),
}

impl UpdateModifications {
    pub(crate) fn validate(&self) -> crate::error::Result<()> {
        match self {
            Self::Document(update) => crate::bson_util::update_document_check(update),
            Self::Replacement(replacement) => {
                crate::bson_util::replacement_document_check(replacement)
            }
        }
    }

    pub(crate) fn document(&self) -> &Document {
        match self {
            Self::Document(doc) | Self::Replacement(doc) => doc,
        }
    }
}

impl From<Document> for UpdateModifications {
    fn from(item: Document) -> Self {
        UpdateModifications::Document(item)
    }
}

/// One statement of an [`update`](../struct.Collection.html#method.update).
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct UpdateModel {
    /// Selects the documents to update.
    pub filter: Document,

    /// The modification to apply.
    pub update: UpdateModifications,

    /// Insert a document built from the filter and update if nothing matches.
    pub upsert: bool,

    /// Update every matching document rather than only the first.
    pub multi: bool,
}

impl UpdateModel {
    /// Updates the first document matching `filter`.
    pub fn new(filter: Document, update: impl Into<UpdateModifications>) -> Self {
        Self {
            filter,
            update: update.into(),
            upsert: false,
            multi: false,
        }
    }

    /// Sets whether to insert a new document if nothing matches.
    pub fn upsert(mut self, upsert: bool) -> Self {
        self.upsert = upsert;
        self
    }

    /// Sets whether to update every matching document.
    pub fn multi(mut self, multi: bool) -> Self {
        self.multi = multi;
        self
    }
}

/// Specifies the options to a [`Collection::update`](../struct.Collection.html#method.update)
/// operation.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(field_defaults(default, setter(into)))]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct UpdateOptions {
    /// Opt out of document-level validation.
    pub bypass_document_validation: Option<bool>,

    /// If true, the server stops at the first failing statement and only that failure is
    /// reported.
    pub ordered: Option<bool>,

    /// The write concern for the operation.
    pub write_concern: Option<WriteConcern>,

    /// The collation to use for every statement. Requires a server with wire version 5 or later.
    #[serde(skip)]
    pub collation: Option<Collation>,

    /// How long to wait for the update to complete.
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

/// How many documents a delete statement may remove.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeleteLimit {
    /// Remove at most one matching document.
    One,

    /// Remove every matching document.
    All,
}

/// One statement of a [`remove`](../struct.Collection.html#method.remove).
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct DeleteModel {
    /// Selects the documents to delete.
    pub filter: Document,

    /// How many matching documents to delete.
    pub limit: DeleteLimit,
}

impl DeleteModel {
    /// Deletes the first document matching `filter`.
    pub fn one(filter: Document) -> Self {
        Self {
            filter,
            limit: DeleteLimit::One,
        }
    }

    /// Deletes every document matching `filter`.
    pub fn all(filter: Document) -> Self {
        Self {
            filter,
            limit: DeleteLimit::All,
        }
    }
}

/// Specifies the options to a [`Collection::remove`](../struct.Collection.html#method.remove)
/// operation.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(field_defaults(default, setter(into)))]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct DeleteOptions {
    /// If true, the server stops at the first failing statement and only that failure is
    /// reported.
    pub ordered: Option<bool>,

    /// The write concern for the operation.
    pub write_concern: Option<WriteConcern>,

    /// The collation to use for every statement. Requires a server with wire version 5 or later.
    #[serde(skip)]
    pub collation: Option<Collation>,

    /// How long to wait for the delete to complete.
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

/// Specifies the options to a [`Collection::find`](../struct.Collection.html#method.find)
/// operation.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(field_defaults(default, setter(into)))]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct FindOptions {
    /// The order of the documents for the purposes of the operation.
    pub sort: Option<Document>,

    /// Limits the fields of the document being returned.
    pub projection: Option<Document>,

    /// The number of documents to skip before counting.
    #[serde(serialize_with = "serde_util::serialize_u64_option_as_i64")]
    pub skip: Option<u64>,

    /// The maximum number of documents to query.
    /// If a negative number is specified, the documents will be returned in a single batch
    /// limited in number by the positive value of the specified limit.
    #[serde(skip)]
    pub limit: Option<i64>,

    /// The number of documents the server should return per cursor batch.
    ///
    /// Note that this does not have any affect on the documents that are returned by a cursor,
    /// only the number of documents kept in memory at a given time (and by extension, the
    /// number of round trips needed to return the entire set of documents returned by the
    /// query).
    #[serde(skip)]
    pub batch_size: Option<u32>,

    /// The read concern for the operation.
    pub read_concern: Option<ReadConcern>,

    /// The collation to use. Requires a server with wire version 5 or later.
    pub collation: Option<Collation>,

    /// How long to wait for the first batch.
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

/// Specifies the options to a
/// [`Collection::aggregate`](../struct.Collection.html#method.aggregate) operation.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(field_defaults(default, setter(into)))]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct AggregateOptions {
    /// Enables writing to temporary files by the server. When set to true, the aggregation
    /// stages can write data to the `_tmp` subdirectory in the `dbPath` directory.
    pub allow_disk_use: Option<bool>,

    /// The read concern for the operation.
    pub read_concern: Option<ReadConcern>,

    /// The collation to use. Requires a server with wire version 5 or later.
    pub collation: Option<Collation>,

    /// How long to wait for the first batch.
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

/// Specifies the options to a [`Collection::count`](../struct.Collection.html#method.count)
/// operation.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(field_defaults(default, setter(into)))]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct CountOptions {
    /// The number of documents to skip before counting.
    #[serde(serialize_with = "serde_util::serialize_u64_option_as_i64")]
    pub skip: Option<u64>,

    /// The maximum number of documents to count.
    #[serde(serialize_with = "serde_util::serialize_u64_option_as_i64")]
    pub limit: Option<u64>,

    /// The read concern for the operation.
    pub read_concern: Option<ReadConcern>,

    /// The collation to use. Requires a server with wire version 5 or later.
    pub collation: Option<Collation>,

    /// How long to wait for the count.
    #[serde(skip)]
    pub timeout: Option<Duration>,
}
