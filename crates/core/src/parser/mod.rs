// this_file: crates/core/src/parser/mod.rs

//! `Parser<In>`: a stateless factory for fresh [`Handler`] instances that
//! each produce exactly one result (spec.md §3, §4.2).
//!
//! This module holds the trait itself and the primitive constructors
//! (`first`, `first_opt`, `to_list`, `fold`, `fold_eval`, `pure`, `eval`).
//! The combinator surface (`map`, `or_else`, `attempt`, ...) lives in
//! [`combinators`].

pub mod combinators;
pub mod lazy;

use crate::error::{SpacError, SpacResult};
use crate::handler::{Handler, HandlerFactory};

/// A stateless factory producing fresh [`Handler`] instances, each of which
/// consumes events and eventually produces exactly one `Out`.
///
/// Parsers are plain values: constructing one does no work, and the same
/// parser may be reused — concurrently, even — across many independent
/// parses, because each call to [`Parser::new_handler`] returns an
/// independent handler with its own state.
pub trait Parser<In> {
    /// The value this parser ultimately produces.
    type Out;
    /// The concrete handler type driving this parser.
    type Handler: Handler<In, Out = Self::Out>;

    /// Produces a fresh handler.
    fn new_handler(&self) -> Self::Handler;
}

/// Every [`Parser`] is already exactly the shape of a [`HandlerFactory`] —
/// this is what lets `first()`, `to_list()`, or any hand-built parser be
/// handed straight to [`crate::splitter::Splitter::of`] as a joiner's
/// return value without a separate adapter.
impl<In, P> HandlerFactory<In> for P
where
    P: Parser<In>,
{
    type Handler = P::Handler;

    fn new_handler(&self) -> Self::Handler {
        Parser::new_handler(self)
    }
}

/// Handler for [`first`]: finishes on the first input it sees.
pub struct FirstHandler<In> {
    finished: bool,
    _marker: std::marker::PhantomData<In>,
}

impl<In> Handler<In> for FirstHandler<In> {
    type Out = In;

    fn handle_input(&mut self, input: In) -> SpacResult<Option<In>, In> {
        debug_assert!(!self.finished, "handle_input called after first finished");
        self.finished = true;
        Ok(Some(input))
    }

    fn handle_end(&mut self) -> SpacResult<In, In> {
        Err(SpacError::MissingFirst { trace: Vec::new() })
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

/// `first`: finishes with the first input; raises
/// [`SpacError::MissingFirst`] if the stream ends before any input arrives.
#[derive(Debug, Clone, Copy, Default)]
pub struct First;

impl<In> Parser<In> for First {
    type Out = In;
    type Handler = FirstHandler<In>;

    fn new_handler(&self) -> Self::Handler {
        FirstHandler {
            finished: false,
            _marker: std::marker::PhantomData,
        }
    }
}

/// Handler for [`first_opt`].
pub struct FirstOptHandler<In> {
    finished: bool,
    _marker: std::marker::PhantomData<In>,
}

impl<In> Handler<In> for FirstOptHandler<In> {
    type Out = Option<In>;

    fn handle_input(&mut self, input: In) -> SpacResult<Option<Option<In>>, In> {
        debug_assert!(!self.finished, "handle_input called after first_opt finished");
        self.finished = true;
        Ok(Some(Some(input)))
    }

    fn handle_end(&mut self) -> SpacResult<Option<In>, In> {
        Ok(None)
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

/// `first_opt`: finishes with `Some(first input)`, or `None` if the stream
/// ends before any input arrives.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstOpt;

impl<In> Parser<In> for FirstOpt {
    type Out = Option<In>;
    type Handler = FirstOptHandler<In>;

    fn new_handler(&self) -> Self::Handler {
        FirstOptHandler {
            finished: false,
            _marker: std::marker::PhantomData,
        }
    }
}

/// Handler for [`to_list`].
pub struct ToListHandler<In> {
    buffer: Vec<In>,
}

impl<In> Handler<In> for ToListHandler<In> {
    type Out = Vec<In>;

    fn handle_input(&mut self, input: In) -> SpacResult<Option<Vec<In>>, In> {
        self.buffer.push(input);
        Ok(None)
    }

    fn handle_end(&mut self) -> SpacResult<Vec<In>, In> {
        Ok(std::mem::take(&mut self.buffer))
    }

    fn is_finished(&self) -> bool {
        false
    }
}

/// `to_list`: never finishes early; buffers every input it sees and
/// returns them, in order, at end-of-stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToList;

impl<In> Parser<In> for ToList {
    type Out = Vec<In>;
    type Handler = ToListHandler<In>;

    fn new_handler(&self) -> Self::Handler {
        ToListHandler { buffer: Vec::new() }
    }
}

/// Handler for [`fold`].
pub struct FoldHandler<In, Acc, F> {
    acc: Option<Acc>,
    f: F,
    _marker: std::marker::PhantomData<In>,
}

impl<In, Acc, F> Handler<In> for FoldHandler<In, Acc, F>
where
    F: FnMut(Acc, In) -> Acc,
{
    type Out = Acc;

    fn handle_input(&mut self, input: In) -> SpacResult<Option<Acc>, In> {
        let acc = self.acc.take().expect("fold accumulator missing mid-stream");
        self.acc = Some((self.f)(acc, input));
        Ok(None)
    }

    fn handle_end(&mut self) -> SpacResult<Acc, In> {
        Ok(self.acc.take().expect("handle_end called twice on a fold handler"))
    }

    fn is_finished(&self) -> bool {
        false
    }
}

/// `fold(init, f)`: never finishes early; folds every input into an
/// accumulator with an infallible reducer, returning the final
/// accumulator at end-of-stream. For a reducer that can itself fail, use
/// [`fold_eval`].
pub fn fold<In, Acc, F>(init: Acc, f: F) -> Fold<In, Acc, F>
where
    F: FnMut(Acc, In) -> Acc,
{
    Fold {
        init,
        f,
        _marker: std::marker::PhantomData,
    }
}

/// See [`fold`].
pub struct Fold<In, Acc, F> {
    init: Acc,
    f: F,
    _marker: std::marker::PhantomData<In>,
}

impl<In, Acc, F> Parser<In> for Fold<In, Acc, F>
where
    Acc: Clone,
    F: FnMut(Acc, In) -> Acc + Clone,
{
    type Out = Acc;
    type Handler = FoldHandler<In, Acc, F>;

    fn new_handler(&self) -> Self::Handler {
        FoldHandler {
            acc: Some(self.init.clone()),
            f: self.f.clone(),
            _marker: std::marker::PhantomData,
        }
    }
}

/// Handler for [`fold_eval`].
pub struct FoldEvalHandler<In, Acc, F> {
    acc: Option<Acc>,
    f: F,
    _marker: std::marker::PhantomData<In>,
}

impl<In, Acc, F> Handler<In> for FoldEvalHandler<In, Acc, F>
where
    F: FnMut(Acc, In) -> SpacResult<Acc, In>,
{
    type Out = Acc;

    fn handle_input(&mut self, input: In) -> SpacResult<Option<Acc>, In> {
        let acc = self
            .acc
            .take()
            .expect("fold_eval accumulator missing mid-stream");
        self.acc = Some((self.f)(acc, input)?);
        Ok(None)
    }

    fn handle_end(&mut self) -> SpacResult<Acc, In> {
        Ok(self
            .acc
            .take()
            .expect("handle_end called twice on a fold_eval handler"))
    }

    fn is_finished(&self) -> bool {
        false
    }
}

/// `fold_eval(init, f)`: like [`fold`], but the reducer itself may raise a
/// [`SpacError`].
pub fn fold_eval<In, Acc, F>(init: Acc, f: F) -> FoldEval<In, Acc, F>
where
    F: FnMut(Acc, In) -> SpacResult<Acc, In>,
{
    FoldEval {
        init,
        f,
        _marker: std::marker::PhantomData,
    }
}

/// See [`fold_eval`].
pub struct FoldEval<In, Acc, F> {
    init: Acc,
    f: F,
    _marker: std::marker::PhantomData<In>,
}

impl<In, Acc, F> Parser<In> for FoldEval<In, Acc, F>
where
    Acc: Clone,
    F: FnMut(Acc, In) -> SpacResult<Acc, In> + Clone,
{
    type Out = Acc;
    type Handler = FoldEvalHandler<In, Acc, F>;

    fn new_handler(&self) -> Self::Handler {
        FoldEvalHandler {
            acc: Some(self.init.clone()),
            f: self.f.clone(),
            _marker: std::marker::PhantomData,
        }
    }
}

/// Handler for [`pure`] / [`eval`]: finishes immediately, before consuming
/// any input at all.
pub struct ImmediateHandler<Out, In> {
    result: Option<SpacResult<Out, In>>,
}

impl<Out, In> Handler<In> for ImmediateHandler<Out, In> {
    type Out = Out;

    /// A `pure`/`eval` handler finishes the instant the driver gives it a
    /// chance to, which in a pull loop is the very first `handle_input`
    /// call if the stream is non-empty — the input itself is discarded,
    /// not inspected, matching spec.md's "finishes immediately, before
    /// consuming any input" (the driver does not special-case an
    /// already-finished handler; it must observe `Some` to stop feeding
    /// it).
    fn handle_input(&mut self, _input: In) -> SpacResult<Option<Out>, In> {
        match self.result.take() {
            Some(result) => result.map(Some),
            None => Ok(None),
        }
    }

    fn handle_end(&mut self) -> SpacResult<Out, In> {
        match self.result.take() {
            Some(result) => result,
            None => unreachable!("handle_end called after an immediate handler already finished"),
        }
    }

    fn is_finished(&self) -> bool {
        self.result.is_none()
    }
}

/// `pure(v)`: finishes immediately with `v`, consuming no input.
pub fn pure<Out, In>(value: Out) -> Pure<Out>
where
    Out: Clone,
{
    Pure { value }
}

/// See [`pure`].
#[derive(Debug, Clone)]
pub struct Pure<Out> {
    value: Out,
}

impl<Out, In> Parser<In> for Pure<Out>
where
    Out: Clone,
{
    type Out = Out;
    type Handler = ImmediateHandler<Out, In>;

    fn new_handler(&self) -> Self::Handler {
        ImmediateHandler {
            result: Some(Ok(self.value.clone())),
        }
    }
}

/// `eval(effect)`: runs `effect` immediately, finishing (successfully or
/// not) without consuming any input.
pub fn eval<Out, In, F>(effect: F) -> Eval<F>
where
    F: Fn() -> SpacResult<Out, In>,
{
    Eval { effect }
}

/// See [`eval`].
#[derive(Debug, Clone)]
pub struct Eval<F> {
    effect: F,
}

impl<Out, In, F> Parser<In> for Eval<F>
where
    F: Fn() -> SpacResult<Out, In>,
{
    type Out = Out;
    type Handler = ImmediateHandler<Out, In>;

    fn new_handler(&self) -> Self::Handler {
        ImmediateHandler {
            result: Some((self.effect)()),
        }
    }
}

/// `first`: finishes with the first input; raises
/// [`SpacError::MissingFirst`] if the stream ends before any input arrives.
pub fn first() -> First {
    First
}

/// `first_opt`: finishes with `Some(first input)`, or `None` at end.
pub fn first_opt() -> FirstOpt {
    FirstOpt
}

/// `to_list`: buffers every input, returning them at end-of-stream.
pub fn to_list() -> ToList {
    ToList
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::ParserDriver;

    #[test]
    fn pure_finishes_without_consuming_the_rest_of_the_stream() {
        // A non-empty source still reaches the handler; `pure` must yield
        // its value on the very first `handle_input` rather than on
        // `handle_end`, and must not inspect the input it's given.
        let result = pure::<_, i32>(42).parse_seq(vec![1, 2, 3]);
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn pure_finishes_on_an_empty_stream_too() {
        let result = pure::<_, i32>(7).parse_seq(Vec::<i32>::new());
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn eval_surfaces_the_effect_failure_immediately() {
        let result = eval::<i32, i32, _>(|| Err(SpacError::caught_message("boom"))).parse_seq(vec![1, 2]);
        assert!(matches!(result, Err(SpacError::Caught { .. })));
    }

    #[test]
    fn eval_succeeds_without_consuming_input() {
        let result = eval::<_, i32, _>(|| Ok(9)).parse_seq(vec![1, 2, 3]);
        assert_eq!(result.unwrap(), 9);
    }

    #[test]
    fn fold_reduces_every_input() {
        let mut handler = fold(0, |acc, n| acc + n).new_handler();
        handler.handle_input(1).unwrap();
        handler.handle_input(2).unwrap();
        handler.handle_input(3).unwrap();
        assert_eq!(handler.handle_end().unwrap(), 6);
    }

    #[test]
    fn fold_eval_propagates_reducer_failure() {
        let mut handler = fold_eval(0, |acc: i32, n: i32| {
            if n < 0 {
                Err(SpacError::caught_message("negative"))
            } else {
                Ok(acc + n)
            }
        })
        .new_handler();
        handler.handle_input(1).unwrap();
        assert!(handler.handle_input(-1).is_err());
    }

    #[test]
    fn first_opt_returns_none_on_empty_stream() {
        let result = first_opt().parse_seq(Vec::<i32>::new());
        assert_eq!(result.unwrap(), None);
    }

    #[test]
    fn first_opt_returns_the_first_input() {
        let result = first_opt().parse_seq(vec![5, 6, 7]);
        assert_eq!(result.unwrap(), Some(5));
    }
}
