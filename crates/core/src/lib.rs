// this_file: crates/core/src/lib.rs
#![warn(missing_docs, rust_2018_idioms, unused_lifetimes, unused_qualifications)]

//! Core engine for `spac`, a streaming, pull-based parser combinator
//! engine for hierarchical event streams.
//!
//! This crate is the eight components spec.md §2 enumerates, leaves
//! first: the event model and context stack ([`event`], [`context`]), the
//! context matcher ([`matcher`]), the one-event-at-a-time handler
//! protocol ([`handler`]), the parser and transformer combinator
//! surfaces ([`parser`], [`transformer`]), the splitter engine
//! ([`splitter`]), and the structured spac trace ([`error`]). [`xml`] and
//! [`json`] are the declarative matcher-DSL conveniences spec.md §6
//! names; [`driver`] is the thin loop that actually pulls events through
//! a handler tree.
//!
//! Concrete tokenizers, source adapters, and the effect abstraction's
//! concrete instantiation remain external collaborators: this crate
//! consumes any `In` event type and any `StackableStrategy` over it, but
//! does not itself turn bytes into events.

/// The running stack of open scopes, and the rule that updates it.
pub mod context;

/// The thin loop driving a handler tree from a token source.
pub mod driver;

/// The structured diagnostic trail attached to engine failures.
pub mod error;

/// The XML and JSON event models and their stackable strategies.
pub mod event;

/// The one-event-at-a-time pull interface every runtime node satisfies.
pub mod handler;

/// JSON matcher-DSL conveniences (`field`, `any_index`, `index_start`).
pub mod json;

/// Source location metadata attached to events for diagnostics only.
pub mod location;

/// Composable predicates over a context stack.
pub mod matcher;

/// Ambient configuration consumed by the driver entry points.
pub mod options;

/// `Parser<In>`: factories producing handlers that finish with one result.
pub mod parser;

/// The splitter engine: matches sub-streams by context and dispatches
/// each to a freshly instantiated sub-handler.
pub mod splitter;

/// `Transformer<In, Out>`: factories reshaping a stream for whatever sits
/// downstream.
pub mod transformer;

/// XML matcher-DSL conveniences (`tag`, `any_tag`).
pub mod xml;

pub use context::{ContextFrame, ContextStack, ContextTrace, InputTiming, StackInterpretation, StackableStrategy};
pub use driver::{ParserDriver, TokenSource, TransformerDriver};
pub use error::{CallSite, SpacError, SpacResult, SpacTrace, SpacTraceElement};
pub use event::{JsonEvent, JsonFrame, JsonStackable, XmlEvent, XmlFrame, XmlStackable};
pub use handler::{Handler, HandlerFactory};
pub use location::Location;
pub use matcher::ContextMatcher;
pub use options::EngineOptions;
pub use parser::combinators::ParserExt;
pub use parser::lazy::{recursive, Lazy};
pub use parser::{eval, first, first_opt, fold, fold_eval, pure, to_list, Parser};
pub use splitter::{split_on_match, Splitter};
pub use transformer::Transformer;

#[cfg(feature = "async")]
pub use driver::{parse_async, to_pipe};
