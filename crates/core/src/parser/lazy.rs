// this_file: crates/core/src/parser/lazy.rs

//! Deferred parser construction, for cyclic/recursive grammars (spec.md §9).
//!
//! Parser factories are plain values, so a recursive grammar (e.g. a JSON
//! value that may itself contain JSON values) is expressed by a closure
//! that captures a handle to the parser being defined, instantiating the
//! handler only when one is actually requested — never while the grammar
//! is still being assembled.

use crate::handler::Handler;
use crate::parser::Parser;
use std::cell::RefCell;
use std::rc::Rc;

/// A parser whose handler is produced by a boxed, type-erased closure.
///
/// Cloning a `Lazy` is cheap (it clones an `Rc`), which is what makes it
/// usable as "a handle to the parser being defined" inside the closure
/// that [`recursive`] passes to its builder.
pub struct Lazy<In, Out> {
    make_handler: Rc<dyn Fn() -> Box<dyn Handler<In, Out = Out>>>,
}

impl<In, Out> Clone for Lazy<In, Out> {
    fn clone(&self) -> Self {
        Lazy {
            make_handler: Rc::clone(&self.make_handler),
        }
    }
}

impl<In, Out> Lazy<In, Out> {
    /// Builds a lazy parser from a closure that constructs a fresh boxed
    /// handler on demand.
    pub fn new(make_handler: impl Fn() -> Box<dyn Handler<In, Out = Out>> + 'static) -> Self {
        Lazy {
            make_handler: Rc::new(make_handler),
        }
    }

    /// Defers to another parser, boxing its handler type away.
    pub fn of<P>(parser: P) -> Self
    where
        P: Parser<In, Out = Out> + 'static,
        P::Handler: 'static,
    {
        Lazy::new(move || Box::new(parser.new_handler()) as Box<dyn Handler<In, Out = Out>>)
    }
}

impl<In, Out> Parser<In> for Lazy<In, Out> {
    type Out = Out;
    type Handler = Box<dyn Handler<In, Out = Out>>;

    fn new_handler(&self) -> Self::Handler {
        (self.make_handler)()
    }
}

/// Builds a recursive parser.
///
/// `build` receives a [`Lazy`] handle referring to the very parser it is
/// assembling, for use in self-referential positions, and returns the
/// fully-assembled parser. `build` runs exactly once, eagerly, to assemble
/// the (cheap, stateless) parser *value* — the handle it was given only
/// does real work later, when some handler tree actually calls
/// [`Parser::new_handler`] on it.
///
/// ```ignore
/// let value_parser: Lazy<Event, Value> = recursive(|value| {
///     // `value` refers to this parser itself; use it wherever the
///     // grammar recurses, e.g. inside an array-of-values combinator.
///     array_of(value).map(Value::Array).or_else(scalar())
/// });
/// ```
pub fn recursive<In, Out, P>(build: impl FnOnce(Lazy<In, Out>) -> P) -> Lazy<In, Out>
where
    In: 'static,
    Out: 'static,
    P: Parser<In, Out = Out> + 'static,
{
    let slot: Rc<RefCell<Option<P>>> = Rc::new(RefCell::new(None));

    let handle = Lazy::new({
        let slot = Rc::clone(&slot);
        move || {
            let guard = slot.borrow();
            let parser = guard
                .as_ref()
                .expect("recursive parser used before its definition was installed");
            Box::new(parser.new_handler()) as Box<dyn Handler<In, Out = Out>>
        }
    });

    let built = build(handle.clone());
    *slot.borrow_mut() = Some(built);
    handle
}
