// this_file: crates/core/src/splitter.rs

//! The splitter engine (spec.md §4.5) — the heart of the system: matches
//! context-stack states to open and close sub-streams, dispatches each
//! sub-stream to a freshly instantiated sub-handler, and forwards each
//! sub-result downstream.
//!
//! `Splitter("library" \ "book")` works like this: the matcher consumes
//! stack frames as the document's elements open and close, and the
//! splitter guarantees exactly one sub-parser instance is ever live per
//! match (invariant 6, spec.md §8).

use crate::context::{ContextStack, InputTiming, StackInterpretation, StackableStrategy};
use crate::error::{CallSite, SpacError, SpacResult, SpacTraceElement};
use crate::handler::{Handler, HandlerFactory};
use crate::matcher::ContextMatcher;
use crate::options::EngineOptions;
use crate::transformer::Transformer;
use std::marker::PhantomData;

fn stack_depth_exceeded<In>(max_depth: usize) -> SpacError<In> {
    SpacError::caught_message(format!("context stack exceeded max_stack_depth of {max_depth}"))
}

/// A parameterized transformer factory matching sub-streams by context
/// (spec.md §3, §4.5).
///
/// `S` is the context-stack frame type, `C` the value a full match
/// produces. Build one with [`Splitter::new`], then call [`Splitter::of`]
/// with a *joiner* — a function from the matched context value to a
/// [`HandlerFactory`] — to get a [`Transformer`].
pub struct Splitter<In, S, C, ST> {
    matcher: ContextMatcher<S, C>,
    stackable: ST,
    call_site: CallSite,
    options: EngineOptions,
    _marker: PhantomData<fn(In)>,
}

impl<In, S, C, ST> Splitter<In, S, C, ST>
where
    S: 'static,
    C: 'static,
    ST: StackableStrategy<In, S>,
{
    /// Builds a splitter from a [`ContextMatcher`] and the
    /// [`StackableStrategy`] that interprets `In` events against the stack
    /// frame type `S` the matcher operates on.
    #[track_caller]
    pub fn new(matcher: ContextMatcher<S, C>, stackable: ST) -> Self {
        Splitter {
            matcher,
            stackable,
            call_site: CallSite::here(),
            options: EngineOptions::default(),
            _marker: PhantomData,
        }
    }

    /// Overrides the [`EngineOptions`] this splitter enforces (by default,
    /// unbounded — see [`Splitter::new`]).
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Pairs this splitter with a joiner, producing a [`Transformer`] that
    /// emits one `Out` per matched sub-stream.
    pub fn of<Out, F, J>(self, joiner: J) -> SplitterT<In, S, C, ST, F, J>
    where
        F: HandlerFactory<In>,
        F::Handler: Handler<In, Out = Out>,
        J: Fn(C) -> F,
    {
        SplitterT {
            matcher: self.matcher,
            stackable: self.stackable,
            call_site: self.call_site,
            options: self.options,
            joiner,
            _marker: PhantomData,
        }
    }
}

/// The [`Transformer`] produced by [`Splitter::of`].
pub struct SplitterT<In, S, C, ST, F, J> {
    matcher: ContextMatcher<S, C>,
    stackable: ST,
    call_site: CallSite,
    options: EngineOptions,
    joiner: J,
    _marker: PhantomData<fn(In, S, C, F)>,
}

/// The live sub-handler state while a match is open.
struct ActiveSub<In, H> {
    depth_at_start: usize,
    inner: H,
    _marker: PhantomData<fn(In)>,
}

/// The [`Handler`] produced by [`SplitterT::wrap`].
pub struct SplitterHandler<In, S, C, ST, F, J, D>
where
    F: HandlerFactory<In>,
{
    matcher: ContextMatcher<S, C>,
    stackable: ST,
    call_site: CallSite,
    options: EngineOptions,
    joiner: J,
    stack: ContextStack<S>,
    active: Option<ActiveSub<In, F::Handler>>,
    downstream: D,
    finished: bool,
}

impl<In, S, C, ST, F, J, D, Out, R> Handler<In> for SplitterHandler<In, S, C, ST, F, J, D>
where
    S: 'static,
    C: 'static,
    ST: StackableStrategy<In, S>,
    F: HandlerFactory<In>,
    F::Handler: Handler<In, Out = Out>,
    J: Fn(C) -> F,
    D: Handler<Out, Out = R>,
    Out: std::fmt::Debug,
{
    type Out = R;

    fn handle_input(&mut self, input: In) -> SpacResult<Option<R>, In> {
        debug_assert!(!self.finished, "handle_input called after splitter finished");
        let interp = self.stackable.interpret(&input);

        if self.active.is_some() {
            return self.feed_active(input, interp);
        }

        match interp {
            StackInterpretation::Push { frame, trace, timing } => {
                if !self.stack.push(frame, trace) {
                    return Err(stack_depth_exceeded(self.options.max_stack_depth.unwrap_or_default()));
                }
                if let Some((value, _consumed)) = self.matcher.try_match(self.stack.frames()) {
                    let handler_factory = (self.joiner)(value);
                    let mut inner = handler_factory.new_handler();
                    let depth_at_start = self.stack.depth();
                    let mut result = None;
                    if timing == InputTiming::After {
                        result = inner.handle_input(input)?;
                    }
                    if let Some(out) = result {
                        self.push_downstream(out)
                    } else {
                        self.active = Some(ActiveSub {
                            depth_at_start,
                            inner,
                            _marker: PhantomData,
                        });
                        Ok(None)
                    }
                } else {
                    Ok(None)
                }
            }
            StackInterpretation::Pop { .. } => {
                self.stack.pop_checked().ok_or_else(|| SpacError::stack_underflow())?;
                Ok(None)
            }
            StackInterpretation::NoChange => Ok(None),
        }
    }

    fn handle_error(&mut self, err: SpacError<In>) -> SpacResult<Option<R>, In> {
        let err = err.push_trace(SpacTraceElement::InSplitter {
            matcher_description: self.matcher.description().to_string(),
            call_site: self.call_site,
        });
        if let Some(mut active) = self.active.take() {
            match active.inner.handle_error(err) {
                Ok(Some(out)) => Ok(self.push_downstream(out)?),
                Ok(None) => {
                    self.active = Some(active);
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        } else {
            Err(err)
        }
    }

    fn handle_end(&mut self) -> SpacResult<R, In> {
        self.finished = true;
        if let Some(mut active) = self.active.take() {
            let out = active.inner.handle_end()?;
            match self.downstream.handle_input(out) {
                Ok(Some(result)) => return Ok(result),
                Ok(None) => {}
                Err(err) => return Err(crate::transformer::erase_error(err)),
            }
        }
        self.downstream
            .handle_end()
            .map_err(crate::transformer::erase_error)
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

impl<In, S, C, ST, F, J, D, Out, R> SplitterHandler<In, S, C, ST, F, J, D>
where
    S: 'static,
    C: 'static,
    ST: StackableStrategy<In, S>,
    F: HandlerFactory<In>,
    F::Handler: Handler<In, Out = Out>,
    J: Fn(C) -> F,
    D: Handler<Out, Out = R>,
    Out: std::fmt::Debug,
{
    fn push_downstream(&mut self, out: Out) -> SpacResult<Option<R>, In> {
        match self.downstream.handle_input(out) {
            Ok(Some(result)) => {
                self.finished = true;
                Ok(Some(result))
            }
            Ok(None) => Ok(None),
            Err(err) => Err(crate::transformer::erase_error(err)),
        }
    }

    /// Step 2 of the per-input algorithm (spec.md §4.5): a sub-stream is
    /// currently open.
    fn feed_active(
        &mut self,
        input: In,
        interp: StackInterpretation<S>,
    ) -> SpacResult<Option<R>, In> {
        let depth_at_start = self.active.as_ref().unwrap().depth_at_start;

        match interp {
            StackInterpretation::Pop { timing } if timing == InputTiming::Before => {
                // The closing tag still belongs to the child: forward it
                // first, then pop and check whether the match just ended.
                let mut active = self.active.take().unwrap();
                let result = active.inner.handle_input(input)?;
                self.stack.pop_checked().ok_or_else(|| SpacError::stack_underflow())?;
                if let Some(out) = result {
                    return self.push_downstream(out);
                }
                if self.stack.depth() < depth_at_start {
                    let out = active.inner.handle_end()?;
                    self.push_downstream(out)
                } else {
                    self.active = Some(active);
                    Ok(None)
                }
            }
            StackInterpretation::Pop { .. } => {
                // The closing tag belongs to the parent: pop first.
                self.stack.pop_checked().ok_or_else(|| SpacError::stack_underflow())?;
                if self.stack.depth() < depth_at_start {
                    let mut active = self.active.take().unwrap();
                    let out = active.inner.handle_end()?;
                    self.push_downstream(out)
                } else {
                    let active = self.active.as_mut().unwrap();
                    let result = active.inner.handle_input(input)?;
                    if let Some(out) = result {
                        self.active.take();
                        self.push_downstream(out)
                    } else {
                        Ok(None)
                    }
                }
            }
            StackInterpretation::Push { frame, trace, .. } => {
                if !self.stack.push(frame, trace) {
                    return Err(stack_depth_exceeded(self.options.max_stack_depth.unwrap_or_default()));
                }
                let active = self.active.as_mut().unwrap();
                let result = active.inner.handle_input(input)?;
                if let Some(out) = result {
                    self.active.take();
                    self.push_downstream(out)
                } else {
                    Ok(None)
                }
            }
            StackInterpretation::NoChange => {
                let active = self.active.as_mut().unwrap();
                let result = active.inner.handle_input(input)?;
                if let Some(out) = result {
                    self.active.take();
                    self.push_downstream(out)
                } else {
                    Ok(None)
                }
            }
        }
    }
}

impl<In, S, C, ST, F, J, Out> Transformer<In, Out> for SplitterT<In, S, C, ST, F, J>
where
    S: 'static,
    C: 'static,
    ST: StackableStrategy<In, S> + Clone,
    F: HandlerFactory<In>,
    F::Handler: Handler<In, Out = Out>,
    J: Fn(C) -> F + Clone,
    Out: std::fmt::Debug,
{
    type Wrap<H: Handler<Out>> = SplitterHandler<In, S, C, ST, F, J, H>;

    fn wrap<H: Handler<Out>>(&self, downstream: H) -> Self::Wrap<H> {
        SplitterHandler {
            matcher: self.matcher.clone(),
            stackable: self.stackable.clone(),
            call_site: self.call_site,
            options: self.options,
            joiner: self.joiner.clone(),
            stack: ContextStack::with_max_depth(self.options.max_stack_depth),
            active: None,
            downstream,
            finished: false,
        }
    }
}

/// `splitOnMatch(predicate)` (spec.md §4.5): a degenerate stack-less
/// splitter. Consecutive inputs satisfying `predicate` form one
/// sub-stream; the first non-matching input closes it (and is itself
/// dropped, exactly like an out-of-match input in the stack-based
/// splitter above).
pub fn split_on_match<In, Pred, F, J, Out>(predicate: Pred, joiner: J) -> SplitOnMatch<In, Pred, F, J>
where
    Pred: Fn(&In) -> bool,
    F: HandlerFactory<In>,
    F::Handler: Handler<In, Out = Out>,
    J: Fn() -> F,
{
    SplitOnMatch {
        predicate,
        joiner,
        _marker: PhantomData,
    }
}

/// See [`split_on_match`].
pub struct SplitOnMatch<In, Pred, F, J> {
    predicate: Pred,
    joiner: J,
    _marker: PhantomData<fn(In) -> F>,
}

/// The [`Handler`] produced by [`SplitOnMatch`]'s [`Transformer`] impl.
pub struct SplitOnMatchHandler<In, Pred, F, J, D>
where
    F: HandlerFactory<In>,
{
    predicate: Pred,
    joiner: J,
    active: Option<F::Handler>,
    downstream: D,
    finished: bool,
    _marker: PhantomData<fn(In)>,
}

impl<In, Pred, F, J, D, Out, R> Handler<In> for SplitOnMatchHandler<In, Pred, F, J, D>
where
    Pred: Fn(&In) -> bool,
    F: HandlerFactory<In>,
    F::Handler: Handler<In, Out = Out>,
    J: Fn() -> F,
    D: Handler<Out, Out = R>,
    Out: std::fmt::Debug,
{
    type Out = R;

    fn handle_input(&mut self, input: In) -> SpacResult<Option<R>, In> {
        let matches = (self.predicate)(&input);
        if matches {
            if self.active.is_none() {
                self.active = Some((self.joiner)().new_handler());
            }
            let inner = self.active.as_mut().unwrap();
            let result = inner.handle_input(input)?;
            if let Some(out) = result {
                self.active.take();
                return match self.downstream.handle_input(out) {
                    Ok(Some(r)) => {
                        self.finished = true;
                        Ok(Some(r))
                    }
                    Ok(None) => Ok(None),
                    Err(e) => Err(crate::transformer::erase_error(e)),
                };
            }
            Ok(None)
        } else if let Some(mut inner) = self.active.take() {
            let out = inner.handle_end()?;
            match self.downstream.handle_input(out) {
                Ok(Some(r)) => {
                    self.finished = true;
                    Ok(Some(r))
                }
                Ok(None) => Ok(None),
                Err(e) => Err(crate::transformer::erase_error(e)),
            }
        } else {
            Ok(None)
        }
    }

    fn handle_end(&mut self) -> SpacResult<R, In> {
        self.finished = true;
        if let Some(mut inner) = self.active.take() {
            let out = inner.handle_end()?;
            match self.downstream.handle_input(out) {
                Ok(Some(result)) => return Ok(result),
                Ok(None) => {}
                Err(err) => return Err(crate::transformer::erase_error(err)),
            }
        }
        self.downstream
            .handle_end()
            .map_err(crate::transformer::erase_error)
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

impl<In, Pred, F, J, Out> Transformer<In, Out> for SplitOnMatch<In, Pred, F, J>
where
    Pred: Fn(&In) -> bool + Clone,
    F: HandlerFactory<In>,
    F::Handler: Handler<In, Out = Out>,
    J: Fn() -> F + Clone,
    Out: std::fmt::Debug,
{
    type Wrap<H: Handler<Out>> = SplitOnMatchHandler<In, Pred, F, J, H>;

    fn wrap<H: Handler<Out>>(&self, downstream: H) -> Self::Wrap<H> {
        SplitOnMatchHandler {
            predicate: self.predicate.clone(),
            joiner: self.joiner.clone(),
            active: None,
            downstream,
            finished: false,
            _marker: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{XmlEvent, XmlFrame, XmlStackable};
    use crate::handler::HandlerFactory;
    use crate::location::Location;
    use crate::matcher::predicate;
    use crate::parser::{Parser, ToList};

    fn elem_start(name: &str) -> XmlEvent {
        XmlEvent::ElemStart {
            name: name.to_string(),
            attrs: vec![],
            loc: Location::UNKNOWN,
        }
    }

    fn elem_end(name: &str) -> XmlEvent {
        XmlEvent::ElemEnd {
            name: name.to_string(),
            loc: Location::UNKNOWN,
        }
    }

    fn text(value: &str) -> XmlEvent {
        XmlEvent::Text {
            value: value.to_string(),
            is_whitespace: false,
            loc: Location::UNKNOWN,
        }
    }

    struct TextOnly;

    impl HandlerFactory<XmlEvent> for TextOnly {
        type Handler = TextOnlyHandler;
        fn new_handler(&self) -> Self::Handler {
            TextOnlyHandler { buffer: String::new() }
        }
    }

    struct TextOnlyHandler {
        buffer: String,
    }

    impl Handler<XmlEvent> for TextOnlyHandler {
        type Out = String;

        fn handle_input(&mut self, input: XmlEvent) -> SpacResult<Option<String>, XmlEvent> {
            if let XmlEvent::Text { value, .. } = input {
                self.buffer.push_str(&value);
            }
            Ok(None)
        }

        fn handle_end(&mut self) -> SpacResult<String, XmlEvent> {
            Ok(std::mem::take(&mut self.buffer))
        }

        fn is_finished(&self) -> bool {
            false
        }
    }

    #[test]
    fn booklist_scenario_extracts_text_per_book() {
        let tag = |name: &'static str| {
            predicate(name, move |f: &XmlFrame| (f.name == name).then_some(()))
        };
        let matcher = tag("library").then(tag("book"));
        let splitter: Splitter<XmlEvent, XmlFrame, (), XmlStackable> =
            Splitter::new(matcher, XmlStackable);
        let transformer = splitter.of(|_| TextOnly);

        let downstream = ToList.new_handler();
        let mut handler = transformer.wrap(downstream);

        let events = vec![
            elem_start("library"),
            elem_start("book"),
            text("A"),
            elem_end("book"),
            elem_start("book"),
            text("B"),
            elem_end("book"),
            elem_end("library"),
        ];

        for event in events {
            assert!(handler.handle_input(event).unwrap().is_none());
        }
        let result = handler.handle_end().unwrap();
        assert_eq!(result, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn only_one_sub_handler_is_ever_live() {
        // A nested push inside an already-open book (here `chapter`) must
        // be forwarded to the same live sub-handler, never open a second
        // one (invariant 6, spec.md §8).
        let tag = |name: &'static str| {
            predicate(name, move |f: &XmlFrame| (f.name == name).then_some(()))
        };
        let matcher = tag("library").then(tag("book"));
        let splitter: Splitter<XmlEvent, XmlFrame, (), XmlStackable> =
            Splitter::new(matcher, XmlStackable);
        let transformer = splitter.of(|_| TextOnly);
        let downstream = ToList.new_handler();
        let mut handler = transformer.wrap(downstream);

        handler.handle_input(elem_start("library")).unwrap();
        handler.handle_input(elem_start("book")).unwrap();
        assert!(handler.active.is_some());
        handler.handle_input(elem_start("chapter")).unwrap();
        // still exactly one active sub-handler, nested frame forwarded into it
        assert!(handler.active.is_some());
        handler.handle_input(elem_end("chapter")).unwrap();
        handler.handle_input(elem_end("book")).unwrap();
        assert!(handler.active.is_none());
    }

    #[test]
    fn unmatched_close_on_an_empty_stack_raises_stack_underflow() {
        // A lone `</book>` with no preceding `<book>` must fail the parse
        // rather than silently no-op (spec.md §3: pops never under-run an
        // empty stack).
        let tag = |name: &'static str| {
            predicate(name, move |f: &XmlFrame| (f.name == name).then_some(()))
        };
        let matcher = tag("library").then(tag("book"));
        let splitter: Splitter<XmlEvent, XmlFrame, (), XmlStackable> =
            Splitter::new(matcher, XmlStackable);
        let transformer = splitter.of(|_| TextOnly);
        let downstream = ToList.new_handler();
        let mut handler = transformer.wrap(downstream);

        let err = handler.handle_input(elem_end("book")).unwrap_err();
        assert!(matches!(err, SpacError::Caught { .. }));
    }
}
