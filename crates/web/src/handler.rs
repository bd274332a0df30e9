//! The uniform calling convention shared by middleware and route handlers.
//!
//! Every request-processing function, global or route-bound, has the same
//! shape: it reads the [`RequestContext`], may write the response through
//! the [`ResponseHandle`], and signals whether the chain should continue by
//! calling [`Next::proceed`]. Not proceeding halts that chain; the engine
//! owns the cursor and advances it between invocations, so there is no
//! mutable continuation closure to misuse.

use crate::{RequestContext, ResponseHandle};
use async_trait::async_trait;
use std::error::Error;
use std::future::Future;
use std::pin::Pin;
use tracing::warn;

/// The error type handlers propagate; any error ends the handler's chain.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// The boxed future returned by [`handler_fn`] functions.
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send + 'a>>;

#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(
        &self,
        ctx: &RequestContext,
        res: &mut ResponseHandle,
        next: &mut Next,
    ) -> Result<(), BoxError>;
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Box<H> {
    async fn handle(
        &self,
        ctx: &RequestContext,
        res: &mut ResponseHandle,
        next: &mut Next,
    ) -> Result<(), BoxError> {
        (**self).handle(ctx, res, next).await
    }
}

/// The continuation token handed to each chain entry.
///
/// Calling [`proceed`](Next::proceed) marks the entry as wanting the chain
/// to continue; the dispatch loop checks the mark after the entry returns
/// and advances its own cursor. Calling it more than once is tolerated but
/// logged, which makes accidental re-entrancy observable instead of silent.
#[derive(Debug)]
pub struct Next {
    proceed_calls: u32,
}

impl Next {
    pub(crate) fn new() -> Self {
        Self { proceed_calls: 0 }
    }

    /// Hands control to the next entry in the chain once the current entry
    /// returns.
    pub fn proceed(&mut self) {
        self.proceed_calls += 1;
        if self.proceed_calls > 1 {
            warn!(calls = self.proceed_calls, "next invoked more than once by the same chain entry");
        }
    }

    /// True if [`proceed`](Next::proceed) was called at least once.
    pub fn is_proceeded(&self) -> bool {
        self.proceed_calls > 0
    }

    #[cfg(test)]
    pub(crate) fn call_count(&self) -> u32 {
        self.proceed_calls
    }
}

/// A [`Handler`] built from a function returning a [`HandlerFuture`].
pub struct FnHandler<F> {
    f: F,
}

pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: for<'a> Fn(&'a RequestContext, &'a mut ResponseHandle, &'a mut Next) -> HandlerFuture<'a> + Send + Sync,
{
    FnHandler { f }
}

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: for<'a> Fn(&'a RequestContext, &'a mut ResponseHandle, &'a mut Next) -> HandlerFuture<'a> + Send + Sync,
{
    async fn handle(
        &self,
        ctx: &RequestContext,
        res: &mut ResponseHandle,
        next: &mut Next,
    ) -> Result<(), BoxError> {
        (self.f)(ctx, res, next).await
    }
}

/// An ordered, non-empty-by-intent sequence of handlers for one route.
#[derive(Default)]
pub struct HandlerChain {
    handlers: Vec<Box<dyn Handler>>,
}

impl HandlerChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, handler: impl Handler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub(crate) fn into_vec(self) -> Vec<Box<dyn Handler>> {
        self.handlers
    }
}

/// Conversion into a [`HandlerChain`], so route registration accepts a
/// single handler, a tuple of handlers, or a prebuilt chain alike.
pub trait IntoHandlerChain {
    fn into_chain(self) -> HandlerChain;
}

impl IntoHandlerChain for HandlerChain {
    fn into_chain(self) -> HandlerChain {
        self
    }
}

impl<F> IntoHandlerChain for FnHandler<F>
where
    F: for<'a> Fn(&'a RequestContext, &'a mut ResponseHandle, &'a mut Next) -> HandlerFuture<'a>
        + Send
        + Sync
        + 'static,
{
    fn into_chain(self) -> HandlerChain {
        HandlerChain::new().push(self)
    }
}

impl IntoHandlerChain for Box<dyn Handler> {
    fn into_chain(self) -> HandlerChain {
        HandlerChain { handlers: vec![self] }
    }
}

impl IntoHandlerChain for Vec<Box<dyn Handler>> {
    fn into_chain(self) -> HandlerChain {
        HandlerChain { handlers: self }
    }
}

/// impl `IntoHandlerChain` for handler tuples, from 1 to 8 elements
macro_rules! impl_into_handler_chain_for_tuple ({ $($handler:ident)+ } => {
    impl<$($handler,)+> IntoHandlerChain for ($($handler,)+)
    where
        $($handler: Handler + 'static,)+
    {
        #[allow(non_snake_case)]
        fn into_chain(self) -> HandlerChain {
            let ($($handler,)+) = self;
            let handlers: Vec<Box<dyn Handler>> = vec![$(Box::new($handler),)+];
            HandlerChain { handlers }
        }
    }
});

impl_into_handler_chain_for_tuple! { A }
impl_into_handler_chain_for_tuple! { A B }
impl_into_handler_chain_for_tuple! { A B C }
impl_into_handler_chain_for_tuple! { A B C D }
impl_into_handler_chain_for_tuple! { A B C D E }
impl_into_handler_chain_for_tuple! { A B C D E F }
impl_into_handler_chain_for_tuple! { A B C D E F G }
impl_into_handler_chain_for_tuple! { A B C D E F G H }

#[cfg(test)]
mod tests {
    use super::*;

    fn noop<'a>(
        _ctx: &'a RequestContext,
        _res: &'a mut ResponseHandle,
        next: &'a mut Next,
    ) -> HandlerFuture<'a> {
        Box::pin(async move {
            next.proceed();
            Ok(())
        })
    }

    fn assert_is_handler<T: Handler>(_handler: &T) {
        // no op
    }

    #[test]
    fn fn_is_handler() {
        let handler = handler_fn(noop);
        assert_is_handler(&handler);
    }

    #[test]
    fn single_handler_becomes_one_element_chain() {
        let chain = handler_fn(noop).into_chain();
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn tuples_preserve_order_and_length() {
        let chain = (handler_fn(noop), handler_fn(noop), handler_fn(noop)).into_chain();
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn next_records_proceed_calls() {
        let mut next = Next::new();
        assert!(!next.is_proceeded());

        next.proceed();
        assert!(next.is_proceeded());
        assert_eq!(next.call_count(), 1);

        // double invocation is detectable
        next.proceed();
        assert_eq!(next.call_count(), 2);
    }
}
