//! This crate contains the CRUD execution engine of a MongoDB driver: the part that turns
//! `insert`, `update`, `remove`, `find`, `aggregate` and `count` requests into wire protocol
//! traffic and turns the server's replies back into typed results.
//!
//! The engine speaks both generations of the protocol. Servers that understand write commands
//! (wire version 2 and later) receive `insert`/`update`/`delete` commands and report per-document
//! failures, which are attributed back to the exact input document that caused them. Older
//! servers receive the legacy fixed-layout opcodes, which carry no acknowledgement.
//!
//! Connection pooling, the transport and topology discovery are supplied by the embedding driver
//! through the [`ConnectionPool`](cmap::ConnectionPool), [`Transport`](cmap::Transport) and
//! [`Topology`](sdam::Topology) traits.
//!
//! # Example
//! ```no_run
//! # use mongodb_crud::{bson::doc, cmap::ConnectionPool, sdam::Topology, Client};
//! # async fn run(pool: impl ConnectionPool + 'static, topology: impl Topology + 'static)
//! # -> mongodb_crud::error::Result<()> {
//! use futures_util::TryStreamExt;
//!
//! let client = Client::with_components(pool, topology, None);
//! let books = client.database("library").collection("books");
//!
//! let result = books
//!     .insert_many(vec![doc! { "title": "1984" }, doc! { "title": "Animal Farm" }])
//!     .ordered(true)
//!     .await?;
//! println!("inserted {:?}", result.inserted_ids);
//!
//! let mut cursor = books.find(doc! { "title": "1984" }).limit(10).await?;
//! while let Some(book) = cursor.try_next().await? {
//!     println!("{}", book);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Warning about timeouts / cancellation
//!
//! Dropping a future returned by this crate before it completes returns any connection it leased
//! to the pool marked as unhealthy, since a request may still be in flight on it. Prefer the
//! per-call `timeout` option, which lets already dispatched insert chunks finish in the
//! background.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[macro_use]
pub mod options;

pub use ::bson;

pub mod action;
mod batch;
mod bson_util;
mod client;
pub mod cmap;
mod coll;
mod collation;
mod concern;
mod cursor;
mod db;
pub mod error;
mod operation;
pub mod results;
pub(crate) mod runtime;
pub mod sdam;
mod serde_util;
#[cfg(feature = "sync")]
#[cfg_attr(docsrs, doc(cfg(feature = "sync")))]
pub mod sync;
#[cfg(test)]
mod test;
mod trace;

pub use crate::{
    client::Client,
    coll::{Collection, Namespace},
    cursor::Cursor,
    db::Database,
};

pub(crate) use futures_util::future::BoxFuture;
