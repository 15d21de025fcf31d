// this_file: crates/core/src/handler.rs

//! The one-event-at-a-time pull interface every runtime node satisfies
//! (spec.md §4.1) — the shared language the rest of the engine is built on.

use crate::error::{SpacError, SpacResult};

/// A stateful node that consumes events one at a time and eventually
/// produces a result.
///
/// Implementations must uphold:
/// - **Idempotent termination** — once [`Handler::is_finished`] is true,
///   the handler must never be re-entered.
/// - **No hidden buffering** beyond what the combinator's contract
///   promises (a `first`-style handler finishes on the first input; a
///   `to_list` handler buffers only what it has seen).
/// - **No shared mutable state** — all state lives behind `&mut self`.
pub trait Handler<In> {
    /// What this handler produces when it finishes.
    type Out;

    /// Feeds one input to the handler.
    ///
    /// Returns `Ok(Some(result))` if the handler is now finished,
    /// `Ok(None)` if it wants more input, or `Err` if it failed.
    fn handle_input(&mut self, input: In) -> SpacResult<Option<Self::Out>, In>;

    /// Notifies the handler that an error occurred upstream.
    ///
    /// The default implementation re-raises the error unchanged; handlers
    /// that can recover from (or suppress) an upstream error — e.g.
    /// `attempt`, `interruptedBy`'s suppressed interrupter — override this.
    fn handle_error(&mut self, err: SpacError<In>) -> SpacResult<Option<Self::Out>, In> {
        Err(err)
    }

    /// Called at most once, only if the handler is not already finished,
    /// when the input source is exhausted. Produces the handler's final
    /// result.
    fn handle_end(&mut self) -> SpacResult<Self::Out, In>;

    /// Whether this handler has already produced its result and must not
    /// be fed further input.
    fn is_finished(&self) -> bool;
}

impl<In, H> Handler<In> for Box<H>
where
    H: Handler<In> + ?Sized,
{
    type Out = H::Out;

    fn handle_input(&mut self, input: In) -> SpacResult<Option<Self::Out>, In> {
        (**self).handle_input(input)
    }

    fn handle_error(&mut self, err: SpacError<In>) -> SpacResult<Option<Self::Out>, In> {
        (**self).handle_error(err)
    }

    fn handle_end(&mut self) -> SpacResult<Self::Out, In> {
        (**self).handle_end()
    }

    fn is_finished(&self) -> bool {
        (**self).is_finished()
    }
}

/// A stateless factory for fresh [`Handler`] instances.
///
/// Implementations are cheap to construct handlers from and safe to share
/// and reuse across many independent parses — no state lives in the
/// factory itself, only in the handlers it produces.
pub trait HandlerFactory<In> {
    /// The handler type this factory produces.
    type Handler: Handler<In>;

    /// Produces a fresh, independent handler.
    fn new_handler(&self) -> Self::Handler;
}
