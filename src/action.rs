//! Action builder types.
//!
//! Every CRUD method on [`Collection`](crate::Collection) returns one of these. Options are set
//! with chained methods and the action runs when it is `await`ed (or `run` with the `sync`
//! feature).

mod aggregate;
mod count;
mod delete;
mod find;
mod insert_many;
mod update;

use std::{future::Future, time::Duration};

pub use aggregate::Aggregate;
pub use count::Count;
pub use delete::Remove;
pub use find::Find;
pub use insert_many::InsertMany;
pub use update::Update;

use crate::{
    error::{ErrorKind, Result},
    runtime,
};

pub(crate) mod private {
    pub trait Sealed {}
}

/// A pending action to execute on the server.  The action can be configured via chained methods and
/// executed via `await` (or `run` if using the `sync` feature).
pub trait Action: private::Sealed + std::future::IntoFuture {
    /// If the value is `Some`, call the provided function on `self`.  Convenient for chained
    /// updates with values that need to be set conditionally.  For example:
    /// ```rust
    /// # use mongodb_crud::{bson::doc, Collection, error::Result, results::InsertManyResult};
    /// use mongodb_crud::action::Action;
    /// async fn insert(coll: &Collection, ordered: Option<bool>) -> Result<InsertManyResult> {
    ///     coll.insert_many(vec![doc! { "x": 1 }])
    ///         .optional(ordered, |a, o| a.ordered(o))
    ///         .await
    /// }
    /// ```
    fn optional<Value>(self, value: Option<Value>, f: impl FnOnce(Self, Value) -> Self) -> Self
    where
        Self: Sized,
    {
        match value {
            Some(value) => f(self, value),
            None => self,
        }
    }
}

/// Implements [`Action`] and [`IntoFuture`](std::future::IntoFuture) for an action type given an
/// inherent `execute` method body, plus a blocking `run` when the `sync` feature is enabled.
macro_rules! action_impl {
    (
        impl<$lt:lifetime> Action for $action:ident<$lt2:lifetime> {
            type Future = $future:ident;

            async fn execute($($args:tt)*) -> $out:ty $body:block
        }
    ) => {
        impl<$lt> $action<$lt> {
            async fn execute($($args)*) -> $out $body

            /// Synchronously execute this action.
            #[cfg(feature = "sync")]
            pub fn run(self) -> $out {
                crate::sync::block_on(std::future::IntoFuture::into_future(self))
            }
        }

        impl<$lt> crate::action::private::Sealed for $action<$lt> {}

        impl<$lt> crate::action::Action for $action<$lt> {}

        impl<$lt> std::future::IntoFuture for $action<$lt> {
            type Output = $out;
            type IntoFuture = $future<$lt>;

            fn into_future(self) -> Self::IntoFuture {
                $future(Box::pin(self.execute()))
            }
        }

        /// Opaque future type for action execution.
        pub struct $future<$lt>(crate::BoxFuture<$lt, $out>);

        impl<$lt> std::future::Future for $future<$lt> {
            type Output = $out;

            fn poll(
                mut self: std::pin::Pin<&mut Self>,
                cx: &mut std::task::Context<'_>,
            ) -> std::task::Poll<Self::Output> {
                self.0.as_mut().poll(cx)
            }
        }
    };
}

/// Generates a setter for each listed field of the action's options struct, plus
/// `with_options` to replace them all at once.
macro_rules! option_setters {
    (
        $opt_field:ident: $opt_field_type:ty;
        $(
            $(#[$($attrss:tt)*])*
            $opt_name:ident: $opt_ty:ty,
        )*
    ) => {
        #[allow(unused)]
        fn options(&mut self) -> &mut $opt_field_type {
            self.$opt_field.get_or_insert_with(<$opt_field_type>::default)
        }

        /// Set all options.  Note that this will replace all previous values set.
        pub fn with_options(mut self, value: impl Into<Option<$opt_field_type>>) -> Self {
            self.$opt_field = value.into();
            self
        }

        $(
            #[doc = concat!("Set the [`", stringify!($opt_field_type), "::", stringify!($opt_name), "`] option.")]
            $(#[$($attrss)*])*
            pub fn $opt_name(mut self, value: $opt_ty) -> Self {
                self.options().$opt_name = Some(value);
                self
            }
        )*
    };
}

pub(crate) use action_impl;
pub(crate) use option_setters;

/// Bounds how long the caller waits for `future`. Work already handed to background tasks keeps
/// running after the timeout elapses.
async fn with_timeout<T>(
    timeout: Option<Duration>,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    match timeout {
        Some(timeout) => runtime::timeout(timeout, future, || ErrorKind::Timeout {
            message: format!("the operation did not complete within {timeout:?}"),
        })
        .await?,
        None => future.await,
    }
}
