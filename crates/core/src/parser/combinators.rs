// this_file: crates/core/src/parser/combinators.rs

//! The parser combinator surface (spec.md §4.3): ways to build new parsers
//! out of existing ones. [`ParserExt`] is implemented for every [`Parser`];
//! its default methods are the generic entry points, but a few (notably
//! [`ParserExt::or_else`]) are shadowed by inherent methods on their own
//! result type so that chaining self-flattens instead of nesting.

use crate::context::{ContextStack, InputTiming, StackInterpretation, StackableStrategy};
use crate::error::{CallSite, SpacError, SpacResult, SpacTraceElement};
use crate::handler::Handler;
use crate::matcher::ContextMatcher;
use crate::parser::Parser;
use std::marker::PhantomData;
use std::rc::Rc;

/// Combinator methods available on every [`Parser`].
///
/// A blanket `impl` over every `P: Parser<In>` — there is nothing to
/// implement at a call site, just `use` the trait.
pub trait ParserExt<In>: Parser<In> + Sized {
    /// Applies `f` to the produced value. If `f` needs to fail, use
    /// [`ParserExt::try_map`] instead — keeping `f` infallible here means a
    /// `map` can never itself be the origin of a [`SpacError`].
    fn map<Out2, F>(self, f: F) -> Map<Self, F>
    where
        F: Fn(Self::Out) -> Out2 + Clone,
    {
        Map { inner: self, f }
    }

    /// Like [`ParserExt::map`], but `f` may itself fail; a failure
    /// surfaces as the effect-channel error `f` returned, not a panic.
    fn try_map<Out2, F>(self, f: F) -> TryMap<Self, F>
    where
        F: Fn(Self::Out) -> SpacResult<Out2, In> + Clone,
    {
        TryMap { inner: self, f }
    }

    /// Runs `other` alongside `self`; whichever finishes successfully
    /// first wins (ties broken in favor of `self`). If both eventually
    /// fail, raises [`SpacError::FallbackChainFailure`] listing the
    /// underlying errors in the order each branch actually failed.
    ///
    /// Chaining `.or_else` directly on an existing [`OrElse`] appends a
    /// branch instead of nesting — see the inherent `OrElse::or_else`.
    fn or_else<P2>(self, other: P2) -> OrElse<In, Self::Out>
    where
        Self: 'static,
        Self::Handler: 'static,
        In: Clone + 'static,
        P2: Parser<In, Out = Self::Out> + 'static,
        P2::Handler: 'static,
    {
        OrElse {
            branches: vec![
                branch_factory::<In, Self>(self),
                branch_factory::<In, P2>(other),
            ],
        }
    }

    /// Lifts failure into the success channel: produces `Ok(value)` on
    /// success, `Err(error)` (as a plain value) on failure, never itself
    /// failing.
    fn attempt(self) -> Attempt<Self> {
        Attempt { inner: self }
    }

    /// The inverse of [`ParserExt::attempt`]: unwraps a
    /// `Result<T, SpacError<In>>`-producing parser back into a plain `T`,
    /// re-raising `Err` values as effect-channel failures.
    fn rethrow<T>(self) -> Rethrow<Self>
    where
        Self: Parser<In, Out = Result<T, SpacError<In>>>,
    {
        Rethrow { inner: self }
    }

    /// Like [`ParserExt::rethrow`], but for a success value carrying any
    /// error type convertible into [`SpacError`] (e.g. the result of an
    /// external fallible call wrapped in [`crate::parser::eval`]).
    fn unwrap_safe<T, E>(self) -> UnwrapSafe<Self>
    where
        Self: Parser<In, Out = Result<T, E>>,
        E: Into<SpacError<In>>,
    {
        UnwrapSafe { inner: self }
    }

    /// Requires the next inputs to satisfy `expectations` in order before
    /// forwarding them (unmodified) to `self`. Raises
    /// [`SpacError::UnexpectedInput`] the moment an input fails its
    /// expectation, or [`SpacError::UnfulfilledInputs`] if the stream ends
    /// first.
    fn expect_inputs(
        self,
        expectations: Vec<(String, Rc<dyn Fn(&In) -> bool>)>,
    ) -> ExpectInputs<In, Self> {
        ExpectInputs {
            expectations,
            inner: self,
        }
    }

    /// Runs `self` and `interrupter` in parallel on the same input stream.
    /// The moment `interrupter` produces a value, `self` is finalized via
    /// [`Handler::handle_end`] and the triggering input is *not* forwarded
    /// to `self`. If `interrupter` fails first, its error propagates and
    /// `self` is discarded; if `self` fails or finishes first,
    /// `interrupter` is discarded.
    fn interrupted_by<P2>(self, interrupter: P2) -> InterruptedBy<Self, P2>
    where
        In: Clone,
        P2: Parser<In>,
    {
        InterruptedBy {
            base: self,
            interrupter,
        }
    }

    /// Specialization of [`ParserExt::interrupted_by`]: interrupts `self`
    /// on the first context-push for which `matcher` yields a value, per
    /// `stackable`'s interpretation of the stream.
    fn before_context<S, C, ST>(
        self,
        stackable: ST,
        matcher: ContextMatcher<S, C>,
    ) -> InterruptedBy<Self, BeforeContext<In, S, C, ST>>
    where
        In: Clone,
        S: 'static,
        C: 'static,
        ST: StackableStrategy<In, S> + Clone,
    {
        InterruptedBy {
            base: self,
            interrupter: BeforeContext {
                stackable,
                matcher,
                _marker: PhantomData,
            },
        }
    }

    /// Runs `self` to completion, then hands its result to `make_second` to
    /// build a follow-up parser. Every stack-opening event still live on
    /// the context stack (per `stackable`) when `self` finishes is
    /// replayed into the follow-up parser, in order, before the live
    /// stream continues feeding it.
    fn followed_by<S, P2, ST, F>(
        self,
        stackable: ST,
        make_second: F,
    ) -> FollowedBy<In, S, Self, ST, F, P2>
    where
        In: Clone,
        ST: StackableStrategy<In, S> + Clone,
        F: Fn(Self::Out) -> P2 + Clone,
        P2: Parser<In>,
    {
        FollowedBy {
            first: self,
            stackable,
            make_second,
            options: crate::options::EngineOptions::default(),
            _marker: PhantomData,
        }
    }

    /// Runs `self` and `other` to completion in parallel on the same
    /// input stream, producing both results as a tuple once both finish.
    #[track_caller]
    fn and<P2>(self, other: P2) -> Product2<Self, P2>
    where
        In: Clone,
        P2: Parser<In>,
    {
        Product2 {
            first: self,
            second: other,
            call_site: CallSite::here(),
        }
    }
}

impl<In, P: Parser<In>> ParserExt<In> for P {}

fn branch_factory<In, P>(parser: P) -> Rc<dyn Fn() -> Box<dyn Handler<In, Out = P::Out>>>
where
    In: 'static,
    P: Parser<In> + 'static,
    P::Handler: 'static,
{
    Rc::new(move || Box::new(parser.new_handler()) as Box<dyn Handler<In, Out = P::Out>>)
}

// ---------------------------------------------------------------- map ----

/// See [`ParserExt::map`].
pub struct Map<P, F> {
    inner: P,
    f: F,
}

/// Handler for [`Map`].
pub struct MapHandler<H, F> {
    inner: H,
    f: F,
}

impl<In, H, F, Out2> Handler<In> for MapHandler<H, F>
where
    H: Handler<In>,
    F: Fn(H::Out) -> Out2,
{
    type Out = Out2;

    fn handle_input(&mut self, input: In) -> SpacResult<Option<Out2>, In> {
        Ok(self.inner.handle_input(input)?.map(&self.f))
    }

    fn handle_end(&mut self) -> SpacResult<Out2, In> {
        self.inner.handle_end().map(&self.f)
    }

    fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

impl<In, P, F, Out2> Parser<In> for Map<P, F>
where
    P: Parser<In>,
    F: Fn(P::Out) -> Out2 + Clone,
{
    type Out = Out2;
    type Handler = MapHandler<P::Handler, F>;

    fn new_handler(&self) -> Self::Handler {
        MapHandler {
            inner: self.inner.new_handler(),
            f: self.f.clone(),
        }
    }
}

// ------------------------------------------------------------ try_map ----

/// See [`ParserExt::try_map`].
pub struct TryMap<P, F> {
    inner: P,
    f: F,
}

/// Handler for [`TryMap`].
pub struct TryMapHandler<H, F> {
    inner: H,
    f: F,
}

impl<In, H, F, Out2> Handler<In> for TryMapHandler<H, F>
where
    H: Handler<In>,
    F: Fn(H::Out) -> SpacResult<Out2, In>,
{
    type Out = Out2;

    fn handle_input(&mut self, input: In) -> SpacResult<Option<Out2>, In> {
        match self.inner.handle_input(input)? {
            Some(v) => Ok(Some((self.f)(v)?)),
            None => Ok(None),
        }
    }

    fn handle_end(&mut self) -> SpacResult<Out2, In> {
        let v = self.inner.handle_end()?;
        (self.f)(v)
    }

    fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

impl<In, P, F, Out2> Parser<In> for TryMap<P, F>
where
    P: Parser<In>,
    F: Fn(P::Out) -> SpacResult<Out2, In> + Clone,
{
    type Out = Out2;
    type Handler = TryMapHandler<P::Handler, F>;

    fn new_handler(&self) -> Self::Handler {
        TryMapHandler {
            inner: self.inner.new_handler(),
            f: self.f.clone(),
        }
    }
}

// -------------------------------------------------------------- or_else ----

/// See [`ParserExt::or_else`].
pub struct OrElse<In, Out> {
    branches: Vec<Rc<dyn Fn() -> Box<dyn Handler<In, Out = Out>>>>,
}

impl<In, Out> OrElse<In, Out> {
    /// Appends one more branch to this chain, rather than nesting a new
    /// `OrElse` around it — this is what makes `a.or_else(b).or_else(c)`
    /// self-flatten into a single three-way chain.
    pub fn or_else<P2>(mut self, other: P2) -> Self
    where
        In: 'static,
        Out: 'static,
        P2: Parser<In, Out = Out> + 'static,
        P2::Handler: 'static,
    {
        self.branches.push(branch_factory::<In, P2>(other));
        self
    }
}

/// Handler for [`OrElse`].
pub struct OrElseHandler<In, Out> {
    branches: Vec<Option<Box<dyn Handler<In, Out = Out>>>>,
    failures: Vec<SpacError<In>>,
}

impl<In, Out> Handler<In> for OrElseHandler<In, Out>
where
    In: Clone,
{
    type Out = Out;

    fn handle_input(&mut self, input: In) -> SpacResult<Option<Out>, In> {
        let mut winner = None;
        for branch in self.branches.iter_mut() {
            let Some(handler) = branch else { continue };
            match handler.handle_input(input.clone()) {
                Ok(Some(v)) => {
                    if winner.is_none() {
                        winner = Some(v);
                    }
                    *branch = None;
                }
                Ok(None) => {}
                Err(e) => {
                    self.failures.push(e);
                    *branch = None;
                }
            }
        }
        if let Some(v) = winner {
            return Ok(Some(v));
        }
        if self.branches.iter().all(Option::is_none) {
            return Err(SpacError::FallbackChainFailure {
                underlying_errors: std::mem::take(&mut self.failures),
                trace: Vec::new(),
            });
        }
        Ok(None)
    }

    fn handle_end(&mut self) -> SpacResult<Out, In> {
        for branch in self.branches.iter_mut() {
            let Some(handler) = branch else { continue };
            match handler.handle_end() {
                Ok(v) => return Ok(v),
                Err(e) => self.failures.push(e),
            }
        }
        Err(SpacError::FallbackChainFailure {
            underlying_errors: std::mem::take(&mut self.failures),
            trace: Vec::new(),
        })
    }

    fn is_finished(&self) -> bool {
        self.branches.iter().all(Option::is_none)
    }
}

impl<In, Out> Parser<In> for OrElse<In, Out>
where
    In: Clone,
{
    type Out = Out;
    type Handler = OrElseHandler<In, Out>;

    fn new_handler(&self) -> Self::Handler {
        OrElseHandler {
            branches: self.branches.iter().map(|f| Some(f())).collect(),
            failures: Vec::new(),
        }
    }
}

// -------------------------------------------------------------- attempt ----

/// See [`ParserExt::attempt`].
pub struct Attempt<P> {
    inner: P,
}

/// Handler for [`Attempt`].
pub struct AttemptHandler<H> {
    inner: H,
}

impl<In, H: Handler<In>> Handler<In> for AttemptHandler<H> {
    type Out = Result<H::Out, SpacError<In>>;

    fn handle_input(&mut self, input: In) -> SpacResult<Option<Self::Out>, In> {
        match self.inner.handle_input(input) {
            Ok(Some(v)) => Ok(Some(Ok(v))),
            Ok(None) => Ok(None),
            Err(e) => Ok(Some(Err(e))),
        }
    }

    fn handle_end(&mut self) -> SpacResult<Self::Out, In> {
        match self.inner.handle_end() {
            Ok(v) => Ok(Ok(v)),
            Err(e) => Ok(Err(e)),
        }
    }

    fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

impl<In, P: Parser<In>> Parser<In> for Attempt<P> {
    type Out = Result<P::Out, SpacError<In>>;
    type Handler = AttemptHandler<P::Handler>;

    fn new_handler(&self) -> Self::Handler {
        AttemptHandler {
            inner: self.inner.new_handler(),
        }
    }
}

// -------------------------------------------------------------- rethrow ----

/// See [`ParserExt::rethrow`].
pub struct Rethrow<P> {
    inner: P,
}

/// Handler for [`Rethrow`].
pub struct RethrowHandler<H> {
    inner: H,
}

impl<In, T, H> Handler<In> for RethrowHandler<H>
where
    H: Handler<In, Out = Result<T, SpacError<In>>>,
{
    type Out = T;

    fn handle_input(&mut self, input: In) -> SpacResult<Option<T>, In> {
        match self.inner.handle_input(input)? {
            Some(Ok(v)) => Ok(Some(v)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    fn handle_end(&mut self) -> SpacResult<T, In> {
        self.inner.handle_end()?
    }

    fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

impl<In, T, P> Parser<In> for Rethrow<P>
where
    P: Parser<In, Out = Result<T, SpacError<In>>>,
{
    type Out = T;
    type Handler = RethrowHandler<P::Handler>;

    fn new_handler(&self) -> Self::Handler {
        RethrowHandler {
            inner: self.inner.new_handler(),
        }
    }
}

// ---------------------------------------------------------- unwrap_safe ----

/// See [`ParserExt::unwrap_safe`].
pub struct UnwrapSafe<P> {
    inner: P,
}

/// Handler for [`UnwrapSafe`].
pub struct UnwrapSafeHandler<H> {
    inner: H,
}

impl<In, T, E, H> Handler<In> for UnwrapSafeHandler<H>
where
    E: Into<SpacError<In>>,
    H: Handler<In, Out = Result<T, E>>,
{
    type Out = T;

    fn handle_input(&mut self, input: In) -> SpacResult<Option<T>, In> {
        match self.inner.handle_input(input)? {
            Some(Ok(v)) => Ok(Some(v)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    fn handle_end(&mut self) -> SpacResult<T, In> {
        match self.inner.handle_end()? {
            Ok(v) => Ok(v),
            Err(e) => Err(e.into()),
        }
    }

    fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

impl<In, T, E, P> Parser<In> for UnwrapSafe<P>
where
    E: Into<SpacError<In>>,
    P: Parser<In, Out = Result<T, E>>,
{
    type Out = T;
    type Handler = UnwrapSafeHandler<P::Handler>;

    fn new_handler(&self) -> Self::Handler {
        UnwrapSafeHandler {
            inner: self.inner.new_handler(),
        }
    }
}

// ---------------------------------------------------------- expect_inputs ----

/// See [`ParserExt::expect_inputs`].
pub struct ExpectInputs<In, P> {
    expectations: Vec<(String, Rc<dyn Fn(&In) -> bool>)>,
    inner: P,
}

/// Handler for [`ExpectInputs`].
pub struct ExpectInputsHandler<In, H> {
    remaining: Vec<(String, Rc<dyn Fn(&In) -> bool>)>,
    inner: H,
}

impl<In, H: Handler<In>> Handler<In> for ExpectInputsHandler<In, H> {
    type Out = H::Out;

    fn handle_input(&mut self, input: In) -> SpacResult<Option<H::Out>, In> {
        if let Some((_, predicate)) = self.remaining.first() {
            if !predicate(&input) {
                let expectations = self.remaining.iter().map(|(l, _)| l.clone()).collect();
                return Err(SpacError::UnexpectedInput {
                    input,
                    expectations,
                    trace: Vec::new(),
                });
            }
            self.remaining.remove(0);
        }
        self.inner.handle_input(input)
    }

    fn handle_end(&mut self) -> SpacResult<H::Out, In> {
        if !self.remaining.is_empty() {
            let expectations = self.remaining.iter().map(|(l, _)| l.clone()).collect();
            return Err(SpacError::UnfulfilledInputs {
                expectations,
                trace: Vec::new(),
            });
        }
        self.inner.handle_end()
    }

    fn is_finished(&self) -> bool {
        self.remaining.is_empty() && self.inner.is_finished()
    }
}

impl<In, P: Parser<In>> Parser<In> for ExpectInputs<In, P> {
    type Out = P::Out;
    type Handler = ExpectInputsHandler<In, P::Handler>;

    fn new_handler(&self) -> Self::Handler {
        ExpectInputsHandler {
            remaining: self.expectations.clone(),
            inner: self.inner.new_handler(),
        }
    }
}

// ------------------------------------------------------------- interrupted_by

/// See [`ParserExt::interrupted_by`].
pub struct InterruptedBy<P, I> {
    base: P,
    interrupter: I,
}

/// Handler for [`InterruptedBy`].
pub struct InterruptedByHandler<In, HB, HI> {
    base: Option<HB>,
    interrupter: Option<HI>,
    _marker: PhantomData<In>,
}

impl<In, HB, HI> Handler<In> for InterruptedByHandler<In, HB, HI>
where
    In: Clone,
    HB: Handler<In>,
    HI: Handler<In>,
{
    type Out = HB::Out;

    fn handle_input(&mut self, input: In) -> SpacResult<Option<HB::Out>, In> {
        if let Some(mut interrupter) = self.interrupter.take() {
            match interrupter.handle_input(input.clone()) {
                Ok(Some(_)) => {
                    let mut base = self
                        .base
                        .take()
                        .expect("interruptedBy base missing on interrupt");
                    return base.handle_end().map(Some);
                }
                Ok(None) => {
                    self.interrupter = Some(interrupter);
                }
                Err(e) => return Err(e),
            }
        }

        let mut base = self
            .base
            .take()
            .expect("interruptedBy base missing mid-stream");
        match base.handle_input(input) {
            Ok(Some(v)) => Ok(Some(v)),
            Ok(None) => {
                self.base = Some(base);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn handle_end(&mut self) -> SpacResult<HB::Out, In> {
        self.base
            .take()
            .expect("interruptedBy base missing at end")
            .handle_end()
    }

    fn is_finished(&self) -> bool {
        self.base.is_none()
    }
}

impl<In, P, I> Parser<In> for InterruptedBy<P, I>
where
    In: Clone,
    P: Parser<In>,
    I: Parser<In>,
{
    type Out = P::Out;
    type Handler = InterruptedByHandler<In, P::Handler, I::Handler>;

    fn new_handler(&self) -> Self::Handler {
        InterruptedByHandler {
            base: Some(self.base.new_handler()),
            interrupter: Some(self.interrupter.new_handler()),
            _marker: PhantomData,
        }
    }
}

// -------------------------------------------------------------- before_context

/// The interrupter parser behind [`ParserExt::before_context`]: watches the
/// stack `stackable` builds up and finishes with `matcher`'s value the
/// first time a push makes it match.
pub struct BeforeContext<In, S, C, ST> {
    stackable: ST,
    matcher: ContextMatcher<S, C>,
    _marker: PhantomData<(In, S)>,
}

/// Handler for [`BeforeContext`].
pub struct BeforeContextHandler<In, S, C, ST> {
    stackable: ST,
    matcher: ContextMatcher<S, C>,
    stack: ContextStack<S>,
    _marker: PhantomData<In>,
}

impl<In, S, C, ST> Handler<In> for BeforeContextHandler<In, S, C, ST>
where
    ST: StackableStrategy<In, S>,
{
    type Out = C;

    fn handle_input(&mut self, input: In) -> SpacResult<Option<C>, In> {
        match self.stackable.interpret(&input) {
            StackInterpretation::Push { frame, trace, .. } => {
                self.stack.push(frame, trace);
                Ok(self.matcher.try_match(self.stack.frames()).map(|(c, _)| c))
            }
            StackInterpretation::Pop { .. } => {
                self.stack.pop_checked().ok_or_else(|| SpacError::stack_underflow())?;
                Ok(None)
            }
            StackInterpretation::NoChange => Ok(None),
        }
    }

    fn handle_end(&mut self) -> SpacResult<C, In> {
        Err(SpacError::caught_message(
            "beforeContext interrupter never matched before the stream ended",
        ))
    }

    fn is_finished(&self) -> bool {
        false
    }
}

impl<In, S, C, ST> Parser<In> for BeforeContext<In, S, C, ST>
where
    S: 'static,
    C: 'static,
    ST: StackableStrategy<In, S> + Clone,
{
    type Out = C;
    type Handler = BeforeContextHandler<In, S, C, ST>;

    fn new_handler(&self) -> Self::Handler {
        BeforeContextHandler {
            stackable: self.stackable.clone(),
            matcher: self.matcher.clone(),
            stack: ContextStack::new(),
            _marker: PhantomData,
        }
    }
}

// --------------------------------------------------------------- followed_by

/// See [`ParserExt::followed_by`].
pub struct FollowedBy<In, S, P1, ST, F, P2> {
    first: P1,
    stackable: ST,
    make_second: F,
    options: crate::options::EngineOptions,
    _marker: PhantomData<(In, S, P2)>,
}

impl<In, S, P1, ST, F, P2> FollowedBy<In, S, P1, ST, F, P2> {
    /// Overrides the [`crate::options::EngineOptions`] this `followed_by`
    /// enforces — in particular `max_replay_buffer`, the cap on how many
    /// still-open stack-opening events it will buffer for replay into the
    /// follow-up parser.
    pub fn with_options(mut self, options: crate::options::EngineOptions) -> Self {
        self.options = options;
        self
    }
}

enum Stage<In, S, H1, H2> {
    First {
        handler: H1,
        stack: ContextStack<S>,
        open_events: Vec<In>,
    },
    Second {
        handler: H2,
    },
    /// Momentary placeholder occupying `stage` only while
    /// [`FollowedByHandler::handle_input`] is mid-transition from `First`
    /// to `Second`; never observed outside that one method.
    Transitioning,
}

/// Handler for [`FollowedBy`].
pub struct FollowedByHandler<In, S, H1, ST, F, P2>
where
    P2: Parser<In>,
{
    stage: Stage<In, S, H1, P2::Handler>,
    stackable: ST,
    make_second: F,
    options: crate::options::EngineOptions,
}

impl<In, S, H1, ST, F, P2> Handler<In> for FollowedByHandler<In, S, H1, ST, F, P2>
where
    In: Clone,
    H1: Handler<In>,
    ST: StackableStrategy<In, S>,
    F: Fn(H1::Out) -> P2,
    P2: Parser<In>,
{
    type Out = P2::Out;

    fn handle_input(&mut self, input: In) -> SpacResult<Option<P2::Out>, In> {
        let finished_first = match &mut self.stage {
            Stage::First {
                handler,
                stack,
                open_events,
            } => {
                match self.stackable.interpret(&input) {
                    StackInterpretation::Push { frame, trace, .. } => {
                        stack.push(frame, trace);
                        if let Some(max) = self.options.max_replay_buffer {
                            if open_events.len() >= max {
                                return Err(SpacError::caught_message(format!(
                                    "followedBy replay buffer exceeded max_replay_buffer of {max}"
                                )));
                            }
                        }
                        open_events.push(input.clone());
                    }
                    StackInterpretation::Pop { .. } => {
                        stack.pop_checked().ok_or_else(|| SpacError::stack_underflow())?;
                        open_events.pop();
                    }
                    StackInterpretation::NoChange => {}
                }
                handler.handle_input(input)?
            }
            Stage::Second { handler } => return handler.handle_input(input),
            Stage::Transitioning => {
                unreachable!("handle_input observed mid-transition, which it never yields to")
            }
        };

        match finished_first {
            Some(t1) => {
                let open_events =
                    match std::mem::replace(&mut self.stage, Stage::Transitioning) {
                        Stage::First { open_events, .. } => open_events,
                        _ => unreachable!("handle_input only transitions out of Stage::First"),
                    };
                let second = (self.make_second)(t1);
                let mut handler2 = second.new_handler();
                let mut replay_result = None;
                for event in open_events {
                    if replay_result.is_some() {
                        break;
                    }
                    replay_result = handler2.handle_input(event)?;
                }
                self.stage = Stage::Second { handler: handler2 };
                Ok(replay_result)
            }
            None => Ok(None),
        }
    }

    fn handle_end(&mut self) -> SpacResult<P2::Out, In> {
        match &mut self.stage {
            Stage::First { handler, .. } => {
                // The first parser never finished; ending it now surfaces
                // whatever end-of-stream behavior it has (e.g. `first`
                // raises `MissingFirst`) rather than silently discarding
                // the rest of the pipeline.
                let t1 = handler.handle_end()?;
                let second = (self.make_second)(t1);
                let mut handler2 = second.new_handler();
                handler2.handle_end()
            }
            Stage::Second { handler } => handler.handle_end(),
            Stage::Transitioning => {
                unreachable!("handle_end observed mid-transition, which handle_input never yields to")
            }
        }
    }

    fn is_finished(&self) -> bool {
        matches!(&self.stage, Stage::Second { handler } if handler.is_finished())
    }
}

impl<In, S, P1, ST, F, P2> Parser<In> for FollowedBy<In, S, P1, ST, F, P2>
where
    In: Clone,
    ST: StackableStrategy<In, S> + Clone,
    P1: Parser<In>,
    F: Fn(P1::Out) -> P2 + Clone,
    P2: Parser<In>,
{
    type Out = P2::Out;
    type Handler = FollowedByHandler<In, S, P1::Handler, ST, F, P2>;

    fn new_handler(&self) -> Self::Handler {
        FollowedByHandler {
            stage: Stage::First {
                handler: self.first.new_handler(),
                stack: ContextStack::new(),
                open_events: Vec::new(),
            },
            stackable: self.stackable.clone(),
            make_second: self.make_second.clone(),
            options: self.options,
        }
    }
}

// ------------------------------------------------------------------ product

/// See [`ParserExt::and`].
pub struct Product2<P1, P2> {
    first: P1,
    second: P2,
    call_site: CallSite,
}

/// Handler for [`Product2`].
pub struct Product2Handler<In, H1: Handler<In>, H2: Handler<In>> {
    first: Option<H1>,
    second: Option<H2>,
    first_result: Option<H1::Out>,
    second_result: Option<H2::Out>,
    call_site: CallSite,
}

impl<In, H1, H2> Handler<In> for Product2Handler<In, H1, H2>
where
    In: Clone,
    H1: Handler<In>,
    H2: Handler<In>,
{
    type Out = (H1::Out, H2::Out);

    fn handle_input(&mut self, input: In) -> SpacResult<Option<Self::Out>, In> {
        if let Some(handler) = &mut self.first {
            match handler.handle_input(input.clone()) {
                Ok(Some(v)) => {
                    self.first_result = Some(v);
                    self.first = None;
                }
                Ok(None) => {}
                Err(e) => {
                    return Err(e.push_trace(SpacTraceElement::InCompound {
                        branch_index: 0,
                        branch_count: 2,
                        call_site: self.call_site,
                    }))
                }
            }
        }
        if let Some(handler) = &mut self.second {
            match handler.handle_input(input) {
                Ok(Some(v)) => {
                    self.second_result = Some(v);
                    self.second = None;
                }
                Ok(None) => {}
                Err(e) => {
                    return Err(e.push_trace(SpacTraceElement::InCompound {
                        branch_index: 1,
                        branch_count: 2,
                        call_site: self.call_site,
                    }))
                }
            }
        }
        if self.first.is_none() && self.second.is_none() {
            Ok(Some((
                self.first_result.take().expect("product first missing"),
                self.second_result.take().expect("product second missing"),
            )))
        } else {
            Ok(None)
        }
    }

    fn handle_end(&mut self) -> SpacResult<Self::Out, In> {
        if let Some(handler) = &mut self.first {
            self.first_result = Some(handler.handle_end()?);
        }
        if let Some(handler) = &mut self.second {
            self.second_result = Some(handler.handle_end()?);
        }
        Ok((
            self.first_result.take().expect("product first missing"),
            self.second_result.take().expect("product second missing"),
        ))
    }

    fn is_finished(&self) -> bool {
        self.first.is_none() && self.second.is_none()
    }
}

impl<In, P1, P2> Parser<In> for Product2<P1, P2>
where
    In: Clone,
    P1: Parser<In>,
    P2: Parser<In>,
{
    type Out = (P1::Out, P2::Out);
    type Handler = Product2Handler<In, P1::Handler, P2::Handler>;

    fn new_handler(&self) -> Self::Handler {
        Product2Handler {
            first: Some(self.first.new_handler()),
            second: Some(self.second.new_handler()),
            first_result: None,
            second_result: None,
            call_site: self.call_site,
        }
    }
}
