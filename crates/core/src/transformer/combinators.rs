// this_file: crates/core/src/transformer/combinators.rs

//! Concrete transformers (spec.md §4.4): `map`, `map_flatten`, `filter`,
//! `collect`, `take`, `drop`, `take_while`, `drop_while`, `tap`, `scan`.

use crate::error::SpacResult;
use crate::handler::Handler;
use crate::transformer::{erase_error, Transformer};
use std::collections::VecDeque;
use std::fmt;

// ----------------------------------------------------------------- map ----

/// `map(f)`: applies `f` to every event, one-for-one.
pub fn map<In, Out, F>(f: F) -> MapT<F>
where
    F: Fn(In) -> Out + Clone,
{
    MapT { f }
}

/// See [`map`].
pub struct MapT<F> {
    f: F,
}

/// Handler for [`MapT`].
pub struct MapTHandler<H, F> {
    downstream: H,
    f: F,
}

impl<In, Out, H, F> Handler<In> for MapTHandler<H, F>
where
    Out: fmt::Debug,
    H: Handler<Out>,
    F: Fn(In) -> Out,
{
    type Out = H::Out;

    fn handle_input(&mut self, input: In) -> SpacResult<Option<H::Out>, In> {
        let mapped = (self.f)(input);
        self.downstream.handle_input(mapped).map_err(erase_error)
    }

    fn handle_end(&mut self) -> SpacResult<H::Out, In> {
        self.downstream.handle_end().map_err(erase_error)
    }

    fn is_finished(&self) -> bool {
        self.downstream.is_finished()
    }
}

impl<In, Out, F> Transformer<In, Out> for MapT<F>
where
    Out: fmt::Debug,
    F: Fn(In) -> Out + Clone,
{
    type Wrap<H: Handler<Out>> = MapTHandler<H, F>;

    fn wrap<H: Handler<Out>>(&self, downstream: H) -> Self::Wrap<H> {
        MapTHandler {
            downstream,
            f: self.f.clone(),
        }
    }
}

// ---------------------------------------------------------- map_flatten ----

/// `map_flatten(f)`: applies `f` to every event, forwarding each element of
/// the resulting `Vec` downstream in order (zero, one, or many outputs per
/// input).
pub fn map_flatten<In, Out, F>(f: F) -> MapFlattenT<F>
where
    F: Fn(In) -> Vec<Out> + Clone,
{
    MapFlattenT { f }
}

/// See [`map_flatten`].
pub struct MapFlattenT<F> {
    f: F,
}

/// Handler for [`MapFlattenT`].
pub struct MapFlattenTHandler<H, F, Out> {
    downstream: H,
    f: F,
    pending: VecDeque<Out>,
    finished: bool,
}

impl<In, Out, H, F> Handler<In> for MapFlattenTHandler<H, F, Out>
where
    Out: fmt::Debug,
    H: Handler<Out>,
    F: Fn(In) -> Vec<Out>,
{
    type Out = H::Out;

    fn handle_input(&mut self, input: In) -> SpacResult<Option<H::Out>, In> {
        self.pending.extend((self.f)(input));
        while let Some(out) = self.pending.pop_front() {
            match self.downstream.handle_input(out).map_err(erase_error)? {
                Some(v) => {
                    self.finished = true;
                    return Ok(Some(v));
                }
                None => continue,
            }
        }
        Ok(None)
    }

    fn handle_end(&mut self) -> SpacResult<H::Out, In> {
        self.downstream.handle_end().map_err(erase_error)
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

impl<In, Out, F> Transformer<In, Out> for MapFlattenT<F>
where
    Out: fmt::Debug,
    F: Fn(In) -> Vec<Out> + Clone,
{
    type Wrap<H: Handler<Out>> = MapFlattenTHandler<H, F, Out>;

    fn wrap<H: Handler<Out>>(&self, downstream: H) -> Self::Wrap<H> {
        MapFlattenTHandler {
            downstream,
            f: self.f.clone(),
            pending: VecDeque::new(),
            finished: false,
        }
    }
}

// -------------------------------------------------------------- filter ----

/// `filter(predicate)`: forwards only events `predicate` accepts.
pub fn filter<In, F>(predicate: F) -> FilterT<F>
where
    F: Fn(&In) -> bool + Clone,
{
    FilterT { predicate }
}

/// See [`filter`].
pub struct FilterT<F> {
    predicate: F,
}

/// Handler for [`FilterT`].
pub struct FilterTHandler<H, F> {
    downstream: H,
    predicate: F,
}

impl<In, H, F> Handler<In> for FilterTHandler<H, F>
where
    H: Handler<In>,
    F: Fn(&In) -> bool,
{
    type Out = H::Out;

    fn handle_input(&mut self, input: In) -> SpacResult<Option<H::Out>, In> {
        if (self.predicate)(&input) {
            self.downstream.handle_input(input)
        } else {
            Ok(None)
        }
    }

    fn handle_end(&mut self) -> SpacResult<H::Out, In> {
        self.downstream.handle_end()
    }

    fn is_finished(&self) -> bool {
        self.downstream.is_finished()
    }
}

impl<In, F> Transformer<In, In> for FilterT<F>
where
    F: Fn(&In) -> bool + Clone,
{
    type Wrap<H: Handler<In>> = FilterTHandler<H, F>;

    fn wrap<H: Handler<In>>(&self, downstream: H) -> Self::Wrap<H> {
        FilterTHandler {
            downstream,
            predicate: self.predicate.clone(),
        }
    }
}

// -------------------------------------------------------------- collect ----

/// `collect()`: buffers the entire stream and forwards it downstream, as a
/// single `Vec<In>` event, once the stream ends.
pub fn collect<In>() -> CollectT {
    CollectT
}

/// See [`collect`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectT;

/// Handler for [`CollectT`].
pub struct CollectTHandler<H, In> {
    downstream: H,
    buffer: Vec<In>,
}

impl<In, H> Handler<In> for CollectTHandler<H, In>
where
    In: fmt::Debug,
    H: Handler<Vec<In>>,
{
    type Out = H::Out;

    fn handle_input(&mut self, input: In) -> SpacResult<Option<H::Out>, In> {
        self.buffer.push(input);
        Ok(None)
    }

    fn handle_end(&mut self) -> SpacResult<H::Out, In> {
        let buffer = std::mem::take(&mut self.buffer);
        match self.downstream.handle_input(buffer).map_err(erase_error)? {
            Some(v) => Ok(v),
            None => self.downstream.handle_end().map_err(erase_error),
        }
    }

    fn is_finished(&self) -> bool {
        false
    }
}

impl<In> Transformer<In, Vec<In>> for CollectT
where
    In: fmt::Debug,
{
    type Wrap<H: Handler<Vec<In>>> = CollectTHandler<H, In>;

    fn wrap<H: Handler<Vec<In>>>(&self, downstream: H) -> Self::Wrap<H> {
        CollectTHandler {
            downstream,
            buffer: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------- take ----

/// `take(n)`: forwards only the first `n` events, finalizing the
/// downstream handler as soon as they have been seen.
pub fn take<In>(n: usize) -> TakeT {
    TakeT { n }
}

/// See [`take`].
#[derive(Debug, Clone, Copy)]
pub struct TakeT {
    n: usize,
}

/// Handler for [`TakeT`].
pub struct TakeTHandler<H> {
    downstream: H,
    remaining: usize,
}

impl<In, H: Handler<In>> Handler<In> for TakeTHandler<H> {
    type Out = H::Out;

    fn handle_input(&mut self, input: In) -> SpacResult<Option<H::Out>, In> {
        if self.remaining == 0 {
            return self.downstream.handle_end().map(Some);
        }
        self.remaining -= 1;
        match self.downstream.handle_input(input)? {
            Some(v) => Ok(Some(v)),
            None if self.remaining == 0 => self.downstream.handle_end().map(Some),
            None => Ok(None),
        }
    }

    fn handle_end(&mut self) -> SpacResult<H::Out, In> {
        self.downstream.handle_end()
    }

    fn is_finished(&self) -> bool {
        self.remaining == 0
    }
}

impl<In> Transformer<In, In> for TakeT {
    type Wrap<H: Handler<In>> = TakeTHandler<H>;

    fn wrap<H: Handler<In>>(&self, downstream: H) -> Self::Wrap<H> {
        TakeTHandler {
            downstream,
            remaining: self.n,
        }
    }
}

// ---------------------------------------------------------------- drop ----

/// `drop(n)`: discards the first `n` events, then forwards the rest.
pub fn drop<In>(n: usize) -> DropT {
    DropT { n }
}

/// See [`drop`].
#[derive(Debug, Clone, Copy)]
pub struct DropT {
    n: usize,
}

/// Handler for [`DropT`].
pub struct DropTHandler<H> {
    downstream: H,
    remaining: usize,
}

impl<In, H: Handler<In>> Handler<In> for DropTHandler<H> {
    type Out = H::Out;

    fn handle_input(&mut self, input: In) -> SpacResult<Option<H::Out>, In> {
        if self.remaining > 0 {
            self.remaining -= 1;
            return Ok(None);
        }
        self.downstream.handle_input(input)
    }

    fn handle_end(&mut self) -> SpacResult<H::Out, In> {
        self.downstream.handle_end()
    }

    fn is_finished(&self) -> bool {
        self.downstream.is_finished()
    }
}

impl<In> Transformer<In, In> for DropT {
    type Wrap<H: Handler<In>> = DropTHandler<H>;

    fn wrap<H: Handler<In>>(&self, downstream: H) -> Self::Wrap<H> {
        DropTHandler {
            downstream,
            remaining: self.n,
        }
    }
}

// ----------------------------------------------------------- take_while ----

/// `take_while(predicate)`: forwards events while `predicate` holds; the
/// first rejected event is not forwarded, and finalizes the downstream
/// handler immediately.
pub fn take_while<In, F>(predicate: F) -> TakeWhileT<F>
where
    F: Fn(&In) -> bool + Clone,
{
    TakeWhileT { predicate }
}

/// See [`take_while`].
pub struct TakeWhileT<F> {
    predicate: F,
}

/// Handler for [`TakeWhileT`].
pub struct TakeWhileTHandler<H, F> {
    downstream: H,
    predicate: F,
}

impl<In, H, F> Handler<In> for TakeWhileTHandler<H, F>
where
    H: Handler<In>,
    F: Fn(&In) -> bool,
{
    type Out = H::Out;

    fn handle_input(&mut self, input: In) -> SpacResult<Option<H::Out>, In> {
        if !(self.predicate)(&input) {
            return self.downstream.handle_end().map(Some);
        }
        self.downstream.handle_input(input)
    }

    fn handle_end(&mut self) -> SpacResult<H::Out, In> {
        self.downstream.handle_end()
    }

    fn is_finished(&self) -> bool {
        self.downstream.is_finished()
    }
}

impl<In, F> Transformer<In, In> for TakeWhileT<F>
where
    F: Fn(&In) -> bool + Clone,
{
    type Wrap<H: Handler<In>> = TakeWhileTHandler<H, F>;

    fn wrap<H: Handler<In>>(&self, downstream: H) -> Self::Wrap<H> {
        TakeWhileTHandler {
            downstream,
            predicate: self.predicate.clone(),
        }
    }
}

// ----------------------------------------------------------- drop_while ----

/// `drop_while(predicate)`: discards events while `predicate` holds, then
/// forwards everything from the first rejected event on (inclusive).
pub fn drop_while<In, F>(predicate: F) -> DropWhileT<F>
where
    F: Fn(&In) -> bool + Clone,
{
    DropWhileT { predicate }
}

/// See [`drop_while`].
pub struct DropWhileT<F> {
    predicate: F,
}

/// Handler for [`DropWhileT`].
pub struct DropWhileTHandler<H, F> {
    downstream: H,
    predicate: F,
    dropping: bool,
}

impl<In, H, F> Handler<In> for DropWhileTHandler<H, F>
where
    H: Handler<In>,
    F: Fn(&In) -> bool,
{
    type Out = H::Out;

    fn handle_input(&mut self, input: In) -> SpacResult<Option<H::Out>, In> {
        if self.dropping {
            if (self.predicate)(&input) {
                return Ok(None);
            }
            self.dropping = false;
        }
        self.downstream.handle_input(input)
    }

    fn handle_end(&mut self) -> SpacResult<H::Out, In> {
        self.downstream.handle_end()
    }

    fn is_finished(&self) -> bool {
        self.downstream.is_finished()
    }
}

impl<In, F> Transformer<In, In> for DropWhileT<F>
where
    F: Fn(&In) -> bool + Clone,
{
    type Wrap<H: Handler<In>> = DropWhileTHandler<H, F>;

    fn wrap<H: Handler<In>>(&self, downstream: H) -> Self::Wrap<H> {
        DropWhileTHandler {
            downstream,
            predicate: self.predicate.clone(),
            dropping: true,
        }
    }
}

// ------------------------------------------------------------------ tap ----

/// `tap(f)`: runs `f` on every event for its side effect, forwarding the
/// event unchanged.
pub fn tap<In, F>(f: F) -> TapT<F>
where
    F: Fn(&In) + Clone,
{
    TapT { f }
}

/// See [`tap`].
pub struct TapT<F> {
    f: F,
}

/// Handler for [`TapT`].
pub struct TapTHandler<H, F> {
    downstream: H,
    f: F,
}

impl<In, H, F> Handler<In> for TapTHandler<H, F>
where
    H: Handler<In>,
    F: Fn(&In),
{
    type Out = H::Out;

    fn handle_input(&mut self, input: In) -> SpacResult<Option<H::Out>, In> {
        (self.f)(&input);
        self.downstream.handle_input(input)
    }

    fn handle_end(&mut self) -> SpacResult<H::Out, In> {
        self.downstream.handle_end()
    }

    fn is_finished(&self) -> bool {
        self.downstream.is_finished()
    }
}

impl<In, F> Transformer<In, In> for TapT<F>
where
    F: Fn(&In) + Clone,
{
    type Wrap<H: Handler<In>> = TapTHandler<H, F>;

    fn wrap<H: Handler<In>>(&self, downstream: H) -> Self::Wrap<H> {
        TapTHandler {
            downstream,
            f: self.f.clone(),
        }
    }
}

// ----------------------------------------------------------------- scan ----

/// `scan(init, f)`: threads a running accumulator through the stream,
/// forwarding downstream whatever `f` produces alongside the updated
/// accumulator for each event.
pub fn scan<In, Out, Acc, F>(init: Acc, f: F) -> ScanT<Acc, F>
where
    F: Fn(Acc, In) -> (Acc, Out) + Clone,
{
    ScanT { init, f }
}

/// See [`scan`].
pub struct ScanT<Acc, F> {
    init: Acc,
    f: F,
}

/// Handler for [`ScanT`].
pub struct ScanTHandler<H, Acc, F> {
    downstream: H,
    acc: Option<Acc>,
    f: F,
}

impl<In, Out, Acc, H, F> Handler<In> for ScanTHandler<H, Acc, F>
where
    Out: fmt::Debug,
    H: Handler<Out>,
    F: Fn(Acc, In) -> (Acc, Out),
{
    type Out = H::Out;

    fn handle_input(&mut self, input: In) -> SpacResult<Option<H::Out>, In> {
        let acc = self.acc.take().expect("scan accumulator missing mid-stream");
        let (next_acc, out) = (self.f)(acc, input);
        self.acc = Some(next_acc);
        self.downstream.handle_input(out).map_err(erase_error)
    }

    fn handle_end(&mut self) -> SpacResult<H::Out, In> {
        self.downstream.handle_end().map_err(erase_error)
    }

    fn is_finished(&self) -> bool {
        self.downstream.is_finished()
    }
}

impl<In, Out, Acc, F> Transformer<In, Out> for ScanT<Acc, F>
where
    Out: fmt::Debug,
    Acc: Clone,
    F: Fn(Acc, In) -> (Acc, Out) + Clone,
{
    type Wrap<H: Handler<Out>> = ScanTHandler<H, Acc, F>;

    fn wrap<H: Handler<Out>>(&self, downstream: H) -> Self::Wrap<H> {
        ScanTHandler {
            downstream,
            acc: Some(self.init.clone()),
            f: self.f.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{first, to_list, Parser};

    #[test]
    fn map_applies_function_per_event() {
        let mut handler = map(|n: i32| n.to_string()).wrap(to_list().new_handler());
        handler.handle_input(1).unwrap();
        handler.handle_input(2).unwrap();
        assert_eq!(handler.handle_end().unwrap(), vec!["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn map_flatten_expands_each_event() {
        let mut handler =
            map_flatten(|n: i32| vec![n, n]).wrap(to_list().new_handler());
        handler.handle_input(1).unwrap();
        handler.handle_input(2).unwrap();
        assert_eq!(handler.handle_end().unwrap(), vec![1, 1, 2, 2]);
    }

    #[test]
    fn filter_drops_rejected_events() {
        let mut handler = filter(|n: &i32| n % 2 == 0).wrap(to_list().new_handler());
        for n in 1..=5 {
            handler.handle_input(n).unwrap();
        }
        assert_eq!(handler.handle_end().unwrap(), vec![2, 4]);
    }

    #[test]
    fn collect_forwards_a_single_vec_at_end() {
        let mut handler = collect().wrap(first().new_handler());
        handler.handle_input(1).unwrap();
        handler.handle_input(2).unwrap();
        assert_eq!(handler.handle_end().unwrap(), vec![1, 2]);
    }

    #[test]
    fn take_finalizes_after_n_events() {
        let mut handler = take(2).wrap(to_list().new_handler());
        assert_eq!(handler.handle_input(1).unwrap(), None);
        assert_eq!(handler.handle_input(2).unwrap(), Some(vec![1, 2]));
    }

    #[test]
    fn drop_discards_first_n_events() {
        let mut handler = drop(2).wrap(to_list().new_handler());
        handler.handle_input(1).unwrap();
        handler.handle_input(2).unwrap();
        handler.handle_input(3).unwrap();
        assert_eq!(handler.handle_end().unwrap(), vec![3]);
    }

    #[test]
    fn take_while_stops_at_first_rejection() {
        let mut handler = take_while(|n: &i32| *n < 3).wrap(to_list().new_handler());
        assert_eq!(handler.handle_input(1).unwrap(), None);
        assert_eq!(handler.handle_input(2).unwrap(), None);
        assert_eq!(handler.handle_input(5).unwrap(), Some(vec![1, 2]));
    }

    #[test]
    fn drop_while_forwards_from_first_rejection_inclusive() {
        let mut handler = drop_while(|n: &i32| *n < 3).wrap(to_list().new_handler());
        handler.handle_input(1).unwrap();
        handler.handle_input(2).unwrap();
        handler.handle_input(3).unwrap();
        handler.handle_input(1).unwrap();
        assert_eq!(handler.handle_end().unwrap(), vec![3, 1]);
    }

    #[test]
    fn tap_observes_without_altering_the_stream() {
        let mut seen = Vec::new();
        {
            let mut handler = tap(|n: &i32| seen.push(*n)).wrap(to_list().new_handler());
            handler.handle_input(1).unwrap();
            handler.handle_input(2).unwrap();
            assert_eq!(handler.handle_end().unwrap(), vec![1, 2]);
        }
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn scan_threads_a_running_total() {
        let mut handler =
            scan(0, |acc: i32, n: i32| (acc + n, acc + n)).wrap(to_list().new_handler());
        handler.handle_input(1).unwrap();
        handler.handle_input(2).unwrap();
        handler.handle_input(3).unwrap();
        assert_eq!(handler.handle_end().unwrap(), vec![1, 3, 6]);
    }

    #[test]
    fn then_composes_two_transformers() {
        let composed = map(|n: i32| n * 2).then(filter(|n: &i32| *n > 2));
        let mut handler = composed.wrap(to_list().new_handler());
        handler.handle_input(1).unwrap();
        handler.handle_input(2).unwrap();
        assert_eq!(handler.handle_end().unwrap(), vec![4]);
    }
}
