//! Contains all of the types needed to specify options to CRUD operations.
//!
//! Most of the options structs in this module use the
//! [`typed-builder`](https://crates.io/crates/typed-builder) crate to derive a type-safe builder
//! API on them. For example, to create an instance of
//! [`FindOptions`](struct.FindOptions.html) with only `limit` and `batch_size` set, the builder
//! API can be used as follows:
//!
//! ```rust
//! # use mongodb_crud::options::FindOptions;
//! #
//! # let options = FindOptions::builder()
//! #                   .limit(20)
//! #                   .batch_size(5)
//! #                   .build();
//! ```
//!
//! Read concern, write concern, collation and timeout can be set per call, per collection or on
//! the client. The most specific setting wins; see [`resolve`].

pub use crate::{
    client::options::*,
    coll::options::*,
    collation::*,
    concern::*,
};

/// Returns the effective value of an option that can be set per call, per collection and as a
/// client-wide default. The first value that is set wins.
pub fn resolve<T>(per_call: Option<T>, per_collection: Option<T>, default: Option<T>) -> Option<T> {
    per_call.or(per_collection).or(default)
}

/// Fills in each listed field of `$opts` with [`resolve`], falling back to the options of the
/// collection `$coll` and then to those of its client.
macro_rules! resolve_options {
    ($coll:expr, $opts:expr, [$( $field:ident ),+] ) => {
        $(
            let resolved = $crate::options::resolve(
                $opts.as_mut().and_then(|opts| opts.$field.take()),
                $coll.options().$field.clone(),
                $coll.client().options().$field.clone(),
            );
            if let Some(value) = resolved {
                $opts.get_or_insert_with(Default::default).$field = Some(value);
            }
        )+
    };
}
