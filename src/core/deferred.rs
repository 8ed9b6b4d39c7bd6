//! Values that are either available now or resolve later.
//!
//! Accessors, mutators and guards may answer immediately or hand back a
//! future. `MaybeDeferred` records which of the two happened so the engine
//! can keep a fully synchronous call chain synchronous, and switch to
//! deferred composition only once something actually defers.

use futures::future::{self, BoxFuture, Either};
use std::fmt;
use std::future::{Future, IntoFuture};

/// A value that is either ready now or will be produced by a future.
///
/// Both shapes can be `.await`ed, so callers that do not care about the
/// distinction can treat every result uniformly:
///
/// ```rust
/// use turnstile::core::MaybeDeferred;
///
/// # futures::executor::block_on(async {
/// let now: MaybeDeferred<'_, u32> = MaybeDeferred::ready(1);
/// let later: MaybeDeferred<'_, u32> = MaybeDeferred::defer(async { 2 });
///
/// assert!(now.is_ready());
/// assert!(later.is_deferred());
/// assert_eq!(now.await + later.await, 3);
/// # });
/// ```
pub enum MaybeDeferred<'a, T> {
    /// The value is available immediately.
    Ready(T),
    /// The value is produced by a future that must be awaited.
    Deferred(BoxFuture<'a, T>),
}

impl<'a, T> MaybeDeferred<'a, T> {
    /// Wrap an immediately available value.
    pub fn ready(value: T) -> Self {
        Self::Ready(value)
    }

    /// Wrap a future, boxing it.
    pub fn defer<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'a,
    {
        Self::Deferred(Box::pin(future))
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }

    /// Take the value out if it is ready; deferred values yield `None`.
    pub fn into_ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Deferred(_) => None,
        }
    }

    /// Force the deferred shape, leaving already deferred values untouched.
    pub fn into_deferred(self) -> Self
    where
        T: Send + 'a,
    {
        match self {
            Self::Ready(value) => Self::Deferred(Box::pin(future::ready(value))),
            deferred @ Self::Deferred(_) => deferred,
        }
    }

    /// Transform the value without changing the shape.
    pub fn map<U, F>(self, f: F) -> MaybeDeferred<'a, U>
    where
        F: FnOnce(T) -> U + Send + 'a,
        T: 'a,
        U: 'a,
    {
        match self {
            Self::Ready(value) => MaybeDeferred::Ready(f(value)),
            Self::Deferred(pending) => MaybeDeferred::Deferred(Box::pin(async move {
                f(pending.await)
            })),
        }
    }

    /// Resolve the value and continue with a step that may itself defer.
    ///
    /// The result is ready only when both `self` and the continuation are
    /// ready. Once `self` is deferred, the continuation always runs inside
    /// the deferred chain.
    pub fn and_then<U, F>(self, f: F) -> MaybeDeferred<'a, U>
    where
        F: FnOnce(T) -> MaybeDeferred<'a, U> + Send + 'a,
        T: 'a,
        U: Send + 'a,
    {
        match self {
            Self::Ready(value) => f(value),
            Self::Deferred(pending) => MaybeDeferred::Deferred(Box::pin(async move {
                f(pending.await).await
            })),
        }
    }
}

impl<'a, T> IntoFuture for MaybeDeferred<'a, T> {
    type Output = T;
    type IntoFuture = Either<future::Ready<T>, BoxFuture<'a, T>>;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            Self::Ready(value) => Either::Left(future::ready(value)),
            Self::Deferred(pending) => Either::Right(pending),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for MaybeDeferred<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl<T> From<T> for MaybeDeferred<'_, T> {
    fn from(value: T) -> Self {
        Self::Ready(value)
    }
}
