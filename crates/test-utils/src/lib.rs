// this_file: crates/test-utils/src/lib.rs

//! Shared event-sequence fixtures, split out so both `spac-core`'s own test
//! suite and any downstream crate exercising it can build the same
//! canonical documents without duplicating the boilerplate — grounded on
//! the teacher's `vexy-json-test-utils` crate, which plays the identical
//! role for `vexy_json_core`'s own test suite.

use spac_core::{JsonEvent, Location, XmlEvent};

/// Builds the event sequence for the "Booklist" document spec.md §8 uses
/// throughout as its running example: a `<library>` containing two
/// `<book>` elements, each with a `<title>` and an `<author>`.
///
/// ```text
/// <library>
///   <book><title>Dune</title><author>Frank Herbert</author></book>
///   <book><title>Dawn</title><author>Octavia Butler</author></book>
/// </library>
/// ```
pub fn booklist_events() -> Vec<XmlEvent> {
    let mut events = vec![elem_start("library")];
    for (title, author) in [("Dune", "Frank Herbert"), ("Dawn", "Octavia Butler")] {
        events.push(elem_start("book"));
        events.push(elem_start("title"));
        events.push(text(title));
        events.push(elem_end("title"));
        events.push(elem_start("author"));
        events.push(text(author));
        events.push(elem_end("author"));
        events.push(elem_end("book"));
    }
    events.push(elem_end("library"));
    events
}

/// An opening tag with no attributes, at [`Location::UNKNOWN`].
pub fn elem_start(name: impl Into<String>) -> XmlEvent {
    XmlEvent::ElemStart { name: name.into(), attrs: vec![], loc: Location::UNKNOWN }
}

/// An opening tag carrying one attribute.
pub fn elem_start_with_attr(
    name: impl Into<String>,
    attr_name: impl Into<String>,
    attr_value: impl Into<String>,
) -> XmlEvent {
    XmlEvent::ElemStart {
        name: name.into(),
        attrs: vec![(attr_name.into(), attr_value.into())],
        loc: Location::UNKNOWN,
    }
}

/// A closing tag at [`Location::UNKNOWN`].
pub fn elem_end(name: impl Into<String>) -> XmlEvent {
    XmlEvent::ElemEnd { name: name.into(), loc: Location::UNKNOWN }
}

/// A non-whitespace text run at [`Location::UNKNOWN`].
pub fn text(value: impl Into<String>) -> XmlEvent {
    XmlEvent::Text { value: value.into(), is_whitespace: false, loc: Location::UNKNOWN }
}

/// A whitespace-only text run, the kind a pretty-printed document inserts
/// between sibling elements and that most consumers want to ignore.
pub fn whitespace(value: impl Into<String>) -> XmlEvent {
    XmlEvent::Text { value: value.into(), is_whitespace: true, loc: Location::UNKNOWN }
}

/// Builds the event sequence for a small "posts feed" JSON document spec.md
/// §6 alludes to with its `"posts" \ anyIndex()` matcher example:
///
/// ```text
/// { "posts": [ {"id": 1}, {"id": 2} ] }
/// ```
pub fn posts_feed_events() -> Vec<JsonEvent> {
    let mut events = vec![object_start(), field_start("posts"), array_start()];
    for (index, id) in [1, 2].into_iter().enumerate() {
        events.push(index_start(index));
        events.push(object_start());
        events.push(field_start("id"));
        events.push(jnumber(id.to_string()));
        events.push(object_end());
        events.push(index_end(index));
    }
    events.push(array_end());
    events.push(object_end());
    events
}

/// `{` at [`Location::UNKNOWN`].
pub fn object_start() -> JsonEvent {
    JsonEvent::ObjectStart(Location::UNKNOWN)
}

/// `}` at [`Location::UNKNOWN`].
pub fn object_end() -> JsonEvent {
    JsonEvent::ObjectEnd(Location::UNKNOWN)
}

/// `[` at [`Location::UNKNOWN`].
pub fn array_start() -> JsonEvent {
    JsonEvent::ArrayStart(Location::UNKNOWN)
}

/// `]` at [`Location::UNKNOWN`].
pub fn array_end() -> JsonEvent {
    JsonEvent::ArrayEnd(Location::UNKNOWN)
}

/// An object field name at [`Location::UNKNOWN`].
pub fn field_start(name: impl Into<String>) -> JsonEvent {
    JsonEvent::FieldStart(name.into(), Location::UNKNOWN)
}

/// An array index open at [`Location::UNKNOWN`].
pub fn index_start(index: usize) -> JsonEvent {
    JsonEvent::IndexStart(index, Location::UNKNOWN)
}

/// An array index close at [`Location::UNKNOWN`].
pub fn index_end(index: usize) -> JsonEvent {
    JsonEvent::IndexEnd(index, Location::UNKNOWN)
}

/// A string scalar at [`Location::UNKNOWN`].
pub fn jstring(value: impl Into<String>) -> JsonEvent {
    JsonEvent::JString(value.into(), Location::UNKNOWN)
}

/// A number scalar, kept as source text, at [`Location::UNKNOWN`].
pub fn jnumber(value: impl Into<String>) -> JsonEvent {
    JsonEvent::JNumber(value.into(), Location::UNKNOWN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booklist_events_balance_open_and_close_tags() {
        let events = booklist_events();
        let opens = events.iter().filter(|e| matches!(e, XmlEvent::ElemStart { .. })).count();
        let closes = events.iter().filter(|e| matches!(e, XmlEvent::ElemEnd { .. })).count();
        assert_eq!(opens, closes);
        assert_eq!(opens, 1 + 2 * 3); // library + 2 * (book, title, author)
    }

    #[test]
    fn posts_feed_events_has_two_indexed_entries() {
        let events = posts_feed_events();
        let starts = events.iter().filter(|e| matches!(e, JsonEvent::IndexStart(..))).count();
        assert_eq!(starts, 2);
    }
}
