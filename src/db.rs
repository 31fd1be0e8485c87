#[cfg(test)]
mod test;

use std::sync::Arc;

use crate::{
    options::{resolve, CollectionOptions, DatabaseOptions},
    Client,
    Collection,
};

/// `Database` is the client-side abstraction of a MongoDB database. It can be used to obtain
/// handles to the collections it contains. A `Database` can only be obtained through a
/// [`Client`](struct.Client.html) by calling either
/// [`Client::database`](struct.Client.html#method.database) or
/// [`Client::database_with_options`](struct.Client.html#method.database_with_options).
///
/// `Database` uses [`std::sync::Arc`](https://doc.rust-lang.org/std/sync/struct.Arc.html) internally,
/// so it can safely be shared across threads or async tasks.
#[derive(Clone, Debug)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

#[derive(Debug)]
struct DatabaseInner {
    client: Client,
    name: String,
    options: DatabaseOptions,
}

impl Database {
    pub(crate) fn new(client: Client, name: &str, options: Option<DatabaseOptions>) -> Self {
        Self {
            inner: Arc::new(DatabaseInner {
                client,
                name: name.to_string(),
                options: options.unwrap_or_default(),
            }),
        }
    }

    /// Get the `Client` that this database descended from.
    pub fn client(&self) -> &Client {
        &self.inner.client
    }

    /// Gets the name of the `Database`.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The defaults this database applies to its collections.
    pub fn options(&self) -> &DatabaseOptions {
        &self.inner.options
    }

    /// Gets a handle to a collection in this database with the provided name. The
    /// [`Collection`] options (such as write concern) will default to those of the
    /// [`Database`].
    ///
    /// This method does not send or receive anything across the wire to the database, so it can be
    /// used repeatedly without incurring any costs from I/O.
    pub fn collection(&self, name: &str) -> Collection {
        self.collection_with_options(name, CollectionOptions::default())
    }

    /// Gets a handle to a collection in this database with the provided name.
    /// Operations done with this `Collection` will use the options specified by
    /// `options` and will otherwise default to those of the [`Database`].
    ///
    /// This method does not send or receive anything across the wire to the database, so it can be
    /// used repeatedly without incurring any costs from I/O.
    pub fn collection_with_options(&self, name: &str, options: CollectionOptions) -> Collection {
        let db = &self.inner.options;
        let merged = CollectionOptions {
            read_concern: resolve(options.read_concern, db.read_concern.clone(), None),
            write_concern: resolve(options.write_concern, db.write_concern.clone(), None),
            collation: resolve(options.collation, db.collation.clone(), None),
            timeout: resolve(options.timeout, db.timeout, None),
        };
        Collection::new(self, name, merged)
    }
}
