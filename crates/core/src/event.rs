// this_file: crates/core/src/event.rs

//! The event model (spec.md §3): the sum type of input tokens the engine's
//! driver pulls one at a time, and the [`crate::context::StackableStrategy`]
//! implementations that translate each concrete event set into context
//! stack mutations.
//!
//! spec.md names XML and JSON as the two primary instantiations; both live
//! here as plain enums, grounded on the teacher's `StreamingEvent`
//! (`examples/vexyart-vexy-json/crates/core/src/streaming/mod.rs`), which
//! draws the same structural-vs-scalar split this module makes explicit
//! for two event families instead of one.

use crate::context::{InputTiming, StackInterpretation, StackableStrategy};
use crate::location::Location;

/// One XML token: an element open/close tag or a run of text.
///
/// `attrs` on [`XmlEvent::ElemStart`] is a plain `Vec` rather than a map —
/// attribute order is occasionally observable (duplicate attribute names
/// are a tokenizer-level concern, not this engine's), and a two-element
/// `Vec` beats a `HashMap` for the handful of attributes a typical element
/// carries.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlEvent {
    /// An opening tag, e.g. `<book id="1">`.
    ElemStart {
        /// The element's (possibly qualified) name.
        name: String,
        /// Attributes in document order.
        attrs: Vec<(String, String)>,
        /// Where this tag started.
        loc: Location,
    },
    /// A closing tag, e.g. `</book>`.
    ElemEnd {
        /// The element's name; must match the enclosing `ElemStart`.
        name: String,
        /// Where this tag started.
        loc: Location,
    },
    /// A run of character data between tags.
    Text {
        /// The text content.
        value: String,
        /// True if `value` consists only of whitespace.
        is_whitespace: bool,
        /// Where this text run started.
        loc: Location,
    },
}

impl XmlEvent {
    /// The location carried by this event, regardless of variant.
    pub fn location(&self) -> Location {
        match self {
            XmlEvent::ElemStart { loc, .. } => *loc,
            XmlEvent::ElemEnd { loc, .. } => *loc,
            XmlEvent::Text { loc, .. } => *loc,
        }
    }
}

/// A context-stack frame for an XML document: just the open element's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlFrame {
    /// The open element's name.
    pub name: String,
}

/// The canonical [`StackableStrategy`] for [`XmlEvent`]: push on
/// `ElemStart`, classified `After` (the start tag belongs to the new
/// child scope, matching how `Splitter("library" \ "book")` expects the
/// `<book>` start tag itself to already be inside the `book` sub-stream);
/// pop on `ElemEnd`, classified `Before` (the end tag still belongs to the
/// closing scope).
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlStackable;

impl StackableStrategy<XmlEvent, XmlFrame> for XmlStackable {
    fn interpret(&self, input: &XmlEvent) -> StackInterpretation<XmlFrame> {
        match input {
            XmlEvent::ElemStart { name, loc, .. } => StackInterpretation::Push {
                frame: XmlFrame { name: name.clone() },
                trace: vec![*loc],
                timing: InputTiming::After,
            },
            XmlEvent::ElemEnd { .. } => StackInterpretation::Pop {
                timing: InputTiming::Before,
            },
            XmlEvent::Text { .. } => StackInterpretation::NoChange,
        }
    }
}

/// One JSON token, as emitted by a pull tokenizer walking a JSON document.
///
/// Unlike a DOM-style `Value`, a `JsonEvent` stream names object fields and
/// array indices as their own events ([`JsonEvent::FieldStart`],
/// [`JsonEvent::IndexStart`]/[`JsonEvent::IndexEnd`]) so that
/// [`crate::matcher::ContextMatcher`] sequences like `"posts" \ any_index()`
/// can match into them without ever materializing the whole document.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonEvent {
    /// `{`
    ObjectStart(Location),
    /// `}`
    ObjectEnd(Location),
    /// `[`
    ArrayStart(Location),
    /// `]`
    ArrayEnd(Location),
    /// An object field name, emitted before the field's value events.
    FieldStart(String, Location),
    /// An array index, emitted before the element's value events.
    IndexStart(usize, Location),
    /// The matching close for an [`JsonEvent::IndexStart`].
    IndexEnd(usize, Location),
    /// A JSON string scalar.
    JString(String, Location),
    /// A JSON number scalar, kept as its source text to avoid lossy
    /// float conversion at the event level.
    JNumber(String, Location),
    /// A JSON boolean scalar.
    JBool(bool, Location),
    /// The JSON `null` scalar.
    JNull(Location),
}

impl JsonEvent {
    /// The location carried by this event, regardless of variant.
    pub fn location(&self) -> Location {
        match self {
            JsonEvent::ObjectStart(loc)
            | JsonEvent::ObjectEnd(loc)
            | JsonEvent::ArrayStart(loc)
            | JsonEvent::ArrayEnd(loc)
            | JsonEvent::FieldStart(_, loc)
            | JsonEvent::IndexStart(_, loc)
            | JsonEvent::IndexEnd(_, loc)
            | JsonEvent::JString(_, loc)
            | JsonEvent::JNumber(_, loc)
            | JsonEvent::JBool(_, loc)
            | JsonEvent::JNull(loc) => *loc,
        }
    }
}

/// A context-stack frame for a JSON document: the field name or array
/// index that opened the current scope. The top-level document and bare
/// array elements without an enclosing field push `JsonFrame::Index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonFrame {
    /// Inside an object field of this name.
    Field(String),
    /// Inside an array at this index.
    Index(usize),
}

/// The canonical [`StackableStrategy`] for [`JsonEvent`].
///
/// `ObjectStart`/`ArrayStart` themselves cause no stack change — they only
/// open a scope whose *name* arrives with the enclosing `FieldStart` or
/// `IndexStart`, which is what actually pushes a frame. `ObjectEnd`/
/// `ArrayEnd` likewise cause no pop; the matching `IndexEnd` (or the
/// implicit field-end any `FieldStart`/`IndexStart`/`*End` delivers on
/// exit from that field) does. The engine pops on `IndexEnd` and on
/// `FieldStart`/`IndexStart` that are sibling to, not inside, a prior one —
/// but since a splitter only ever calls [`StackableStrategy::interpret`]
/// once per raw input, value-level sibling transitions are resolved by the
/// token source (out of scope here), which emits at most one
/// [`JsonEvent::IndexEnd`] per [`JsonEvent::IndexStart`] and relies on
/// `FieldStart` replacing the previous field implicitly within the same
/// object depth.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonStackable;

impl StackableStrategy<JsonEvent, JsonFrame> for JsonStackable {
    fn interpret(&self, input: &JsonEvent) -> StackInterpretation<JsonFrame> {
        match input {
            JsonEvent::FieldStart(name, loc) => StackInterpretation::Push {
                frame: JsonFrame::Field(name.clone()),
                trace: vec![*loc],
                timing: InputTiming::After,
            },
            JsonEvent::IndexStart(i, loc) => StackInterpretation::Push {
                frame: JsonFrame::Index(*i),
                trace: vec![*loc],
                timing: InputTiming::After,
            },
            JsonEvent::IndexEnd(..) => StackInterpretation::Pop {
                timing: InputTiming::Before,
            },
            JsonEvent::ObjectStart(_)
            | JsonEvent::ObjectEnd(_)
            | JsonEvent::ArrayStart(_)
            | JsonEvent::ArrayEnd(_)
            | JsonEvent::JString(..)
            | JsonEvent::JNumber(..)
            | JsonEvent::JBool(..)
            | JsonEvent::JNull(_) => StackInterpretation::NoChange,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextStack;

    fn push(stack: &mut ContextStack<XmlFrame>, interp: StackInterpretation<XmlFrame>) {
        if let StackInterpretation::Push { frame, trace, .. } = interp {
            stack.push(frame, trace);
        }
    }

    #[test]
    fn xml_stackable_pushes_on_elem_start_and_pops_on_elem_end() {
        let strategy = XmlStackable;
        let mut stack: ContextStack<XmlFrame> = ContextStack::new();

        let start = XmlEvent::ElemStart {
            name: "book".into(),
            attrs: vec![],
            loc: Location::UNKNOWN,
        };
        push(&mut stack, strategy.interpret(&start));
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.top().unwrap().name, "book");

        let end = XmlEvent::ElemEnd {
            name: "book".into(),
            loc: Location::UNKNOWN,
        };
        match strategy.interpret(&end) {
            StackInterpretation::Pop { timing } => {
                assert_eq!(timing, InputTiming::Before);
                stack.pop_checked().unwrap();
            }
            other => panic!("expected Pop, got {other:?}"),
        }
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn json_stackable_treats_field_start_as_push() {
        let strategy = JsonStackable;
        match strategy.interpret(&JsonEvent::FieldStart("posts".into(), Location::UNKNOWN)) {
            StackInterpretation::Push { frame, timing, .. } => {
                assert_eq!(frame, JsonFrame::Field("posts".into()));
                assert_eq!(timing, InputTiming::After);
            }
            other => panic!("expected Push, got {other:?}"),
        }
    }
}
