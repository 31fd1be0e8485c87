//! Blocking execution for callers that cannot `await`. This is only available when the `sync`
//! feature is enabled.
//!
//! Every action gains a `run` method that drives it to completion on a runtime owned by this
//! module:
//!
//! ```no_run
//! # use mongodb_crud::{bson::doc, error::Result, Collection};
//! # fn insert(coll: Collection) -> Result<()> {
//! let result = coll.insert_many(vec![doc! { "x": 1 }]).run()?;
//! println!("{:?}", result.inserted_ids);
//! # Ok(())
//! # }
//! ```

use std::future::Future;

use once_cell::sync::Lazy;

static TOKIO_RUNTIME: Lazy<tokio::runtime::Runtime> =
    Lazy::new(|| match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => panic!(
            "Error occurred when starting the underlying async runtime: {}",
            err
        ),
    });

/// Runs `future` to completion on the runtime owned by this module, blocking the current thread.
///
/// Must not be called from within an asynchronous context.
pub fn block_on<F, T>(future: F) -> T
where
    F: Future<Output = T>,
{
    TOKIO_RUNTIME.block_on(future)
}
