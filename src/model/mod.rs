//! Model Module
//!
//! The capability a cache wraps: a named object exposing asynchronous
//! operations that return a record, nothing, or fail.

mod arg;
mod reply;

pub use arg::{has_transaction, Arg, Opaque, TRANSACTION_KEY};
pub use reply::Reply;

// == Model ==
/// A data-access object grouped under one namespace.
///
/// Reads are expected to answer with [`Reply::Pending`]. Writes may answer
/// either way. Operations the model does not offer should fail with
/// [`CacheError::UnknownOperation`](crate::error::CacheError::UnknownOperation).
pub trait Model: Send + Sync {
    /// Record type returned by the model's operations
    type Record: Clone + Send + Sync + 'static;

    /// Namespace the model's results are cached under
    fn name(&self) -> &str;

    /// Invokes a named operation.
    fn call<'a>(&'a self, operation: &'a str, args: &'a [Arg]) -> Reply<'a, Self::Record>;
}

impl<M: Model + ?Sized> Model for std::sync::Arc<M> {
    type Record = M::Record;

    fn name(&self) -> &str {
        (**self).name()
    }

    fn call<'a>(&'a self, operation: &'a str, args: &'a [Arg]) -> Reply<'a, Self::Record> {
        (**self).call(operation, args)
    }
}
