// this_file: src/lib.rs

//! # spac
//!
//! A streaming, pull-based parser combinator engine for hierarchical event
//! streams, instantiated here over XML and JSON events.
//!
//! Unlike a traditional parser combinator library that consumes a
//! `&str`/`&[u8]` slice, `spac` combinators consume one already-tokenized
//! event at a time — an [`XmlEvent`] or [`JsonEvent`] — and track the
//! nesting of the stream themselves via a [`ContextStack`]. That split lets
//! a `Splitter` carve a large document into independent sub-streams (one
//! book out of a library, one record out of a feed) and run a fresh,
//! ordinary combinator tree over each, without ever buffering the whole
//! document in memory.
//!
//! ## Quick start
//!
//! ```rust
//! use spac::{first, xml, ParserDriver, XmlEvent};
//!
//! let events = vec![
//!     XmlEvent::ElemStart { name: "title".into(), attrs: vec![], loc: Default::default() },
//!     XmlEvent::Text { value: "Dune".into(), is_whitespace: false, loc: Default::default() },
//!     XmlEvent::ElemEnd { name: "title".into(), loc: Default::default() },
//! ];
//! let _ = xml::tag("title");
//! let first_event = first().parse_seq(events).unwrap();
//! assert!(matches!(first_event, XmlEvent::ElemStart { .. }));
//! ```

pub use spac_core::{eval, first, first_opt, fold, fold_eval, pure, recursive, split_on_match, to_list};
pub use spac_core::{
    CallSite, ContextFrame, ContextMatcher, ContextStack, ContextTrace, EngineOptions, Handler,
    HandlerFactory, InputTiming, JsonEvent, JsonFrame, JsonStackable, Lazy, Location, Parser,
    ParserDriver, ParserExt, SpacError, SpacResult, SpacTrace, SpacTraceElement,
    StackInterpretation, StackableStrategy, Splitter, Transformer, TransformerDriver, XmlEvent,
    XmlFrame, XmlStackable,
};

#[cfg(feature = "async")]
pub use spac_core::{parse_async, to_pipe};

/// The XML matcher DSL (`tag`, `tag_with_attr`, `any_tag`) and the XML
/// event/frame types, grouped under one path for callers who `use spac::xml`
/// wholesale rather than naming each item.
pub mod xml {
    pub use spac_core::xml::{any_tag, tag, tag_with_attr};
    pub use spac_core::{XmlEvent, XmlFrame, XmlStackable};
}

/// The JSON matcher DSL (`field`, `any_index`, `index_start`, `any_frame`)
/// and the JSON event/frame types, grouped the same way as [`xml`].
pub mod json {
    pub use spac_core::json::{any_frame, any_index, field, index_start};
    pub use spac_core::{JsonEvent, JsonFrame, JsonStackable};
}

/// The transformer combinator surface (`map`, `map_flatten`, `filter`,
/// `collect`, `take`, `drop`, `take_while`, `drop_while`, `tap`, `scan`),
/// grouped under one path the way [`xml`] and [`json`] group their DSLs.
/// [`Transformer::then`] (spec.md's `>>`) and [`Transformer::drive`]
/// (spec.md's `>> parser`) are inherent trait methods on the
/// [`Transformer`] trait re-exported at the crate root, so they need no
/// entry here.
pub mod transform {
    pub use spac_core::transformer::combinators::{
        collect, drop, drop_while, filter, map, map_flatten, scan, tap, take, take_while,
    };
}
