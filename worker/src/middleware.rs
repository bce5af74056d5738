//! Handler signature, middleware composition.
//!
//! The source SDK inspects whether a registered handler takes one or two
//! positional parameters and adapts at call time. This rewrite exposes a
//! single signature, `(ctx, event) -> Result<()>`, and a thin adapter
//! ([`handler_fn`]) for callers who only care about the event.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::WorkerContext;
use crate::error::WorkerError;
use crate::message::Event;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A registered handler: receives the dispatch context and decoded event,
/// returns success or an error to be classified by the [`crate::RetryPolicy`].
pub type HandlerFn =
    Arc<dyn Fn(WorkerContext, Event) -> BoxFuture<'static, Result<(), WorkerError>> + Send + Sync>;

/// A middleware wraps an inner handler and returns a new handler.
pub type Middleware = Arc<dyn Fn(HandlerFn) -> HandlerFn + Send + Sync>;

/// Compose middlewares registered in order `[M1, M2, M3]` around `inner` so
/// that the first-registered middleware is outermost: `M1(M2(M3(inner)))`.
pub fn compose(middlewares: &[Middleware], inner: HandlerFn) -> HandlerFn {
    middlewares.iter().rev().fold(inner, |acc, mw| mw(acc))
}

/// Adapt an event-only async closure into a [`HandlerFn`] that ignores
/// context.
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
{
    Arc::new(move |_ctx, event| Box::pin(f(event)))
}
