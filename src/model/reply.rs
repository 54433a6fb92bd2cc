//! Operation replies
//!
//! A model answers an operation either with a pending result or synchronously.

use std::future::IntoFuture;

use futures_util::future::{self, BoxFuture, FutureExt};

use crate::error::Result;

// == Reply ==
/// What a model operation hands back to its caller.
///
/// `Ok(None)` is the absent result.
pub enum Reply<'a, R> {
    /// Result delivered asynchronously
    Pending(BoxFuture<'a, Result<Option<R>>>),
    /// Result produced synchronously
    Ready(Result<Option<R>>),
}

impl<'a, R> Reply<'a, R> {
    /// Wraps a future as a pending reply.
    pub fn pending<F>(fut: F) -> Self
    where
        F: std::future::Future<Output = Result<Option<R>>> + Send + 'a,
    {
        Reply::Pending(fut.boxed())
    }

    /// A pending reply that resolves immediately.
    pub fn resolved(result: Result<Option<R>>) -> Self
    where
        R: Send + 'a,
    {
        Reply::Pending(future::ready(result).boxed())
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Reply::Pending(_))
    }
}

impl<'a, R: Send + 'a> IntoFuture for Reply<'a, R> {
    type Output = Result<Option<R>>;
    type IntoFuture = BoxFuture<'a, Result<Option<R>>>;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            Reply::Pending(fut) => fut,
            Reply::Ready(result) => future::ready(result).boxed(),
        }
    }
}
