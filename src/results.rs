//! Contains the types of results returned by CRUD operations.

use std::collections::HashMap;

use serde::Serialize;

use crate::bson::Bson;

/// The result of a [`Collection::insert_many`](../struct.Collection.html#method.insert_many)
/// operation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct InsertManyResult {
    /// The `_id` field of the documents inserted, in input order.
    ///
    /// When `acknowledged` is false these are the `_id`s of every document that was sent; the
    /// server did not report which of them were written.
    pub inserted_ids: Vec<Bson>,

    /// Whether the server reported the outcome of the writes.
    pub acknowledged: bool,
}

/// The result of a [`Collection::update`](../struct.Collection.html#method.update) operation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct UpdateResult {
    /// The number of update statements sent to the server.
    pub sent_count: u64,

    /// The number of documents that matched a filter. `None` when the write was not
    /// acknowledged, which is always the case on servers that predate write commands.
    pub matched_count: Option<u64>,

    /// The number of documents that were modified. `None` when the write was not acknowledged.
    pub modified_count: Option<u64>,

    /// The `_id`s of upserted documents, keyed by the index of the statement that upserted them.
    pub upserted_ids: HashMap<usize, Bson>,
}

/// The result of a [`Collection::remove`](../struct.Collection.html#method.remove) operation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct DeleteResult {
    /// The number of delete statements sent to the server.
    pub sent_count: u64,

    /// The number of documents deleted. `None` when the write was not acknowledged, which is
    /// always the case on servers that predate write commands.
    pub deleted_count: Option<u64>,
}
