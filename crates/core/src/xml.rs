// this_file: crates/core/src/xml.rs

//! The XML matcher DSL surface (spec.md §6): `tag`, `attr`, and the
//! wildcard `*`, built on the generic [`crate::matcher::ContextMatcher`]
//! combinators over [`XmlFrame`] stacks.
//!
//! These are declarative conveniences, not a separate matching mechanism —
//! `tag("book")` is exactly [`crate::matcher::predicate`] specialized to
//! comparing [`XmlFrame::name`].

use crate::event::XmlFrame;
use crate::matcher::{self, ContextMatcher};

/// Matches a single frame whose element name equals `name`, yielding the
/// name itself.
pub fn tag(name: impl Into<String>) -> ContextMatcher<XmlFrame, String> {
    let name = name.into();
    let description = name.clone();
    matcher::predicate(description, move |frame: &XmlFrame| {
        (frame.name == name).then(|| frame.name.clone())
    })
}

/// Matches a single frame whose element name equals `name`, yielding a
/// single attribute's value (or `None` if the element was matched but the
/// attribute itself is absent — use [`attr`] together with
/// [`ContextMatcher::then`] when the attribute is mandatory and its
/// absence should instead fail the match).
///
/// This variant only narrows on the tag name; callers needing the
/// attribute value as the match's `C` should combine it with the current
/// event via their joiner, since attribute values live on the triggering
/// [`crate::event::XmlEvent::ElemStart`], not on the [`XmlFrame`] the
/// stack retains after the start tag passes.
pub fn tag_with_attr(
    tag_name: impl Into<String>,
    attr_name: impl Into<String>,
) -> ContextMatcher<XmlFrame, String> {
    let tag_name = tag_name.into();
    let attr_name = attr_name.into();
    let description = format!("{tag_name}[@{attr_name}]");
    matcher::predicate(description, move |frame: &XmlFrame| {
        (frame.name == tag_name).then(|| attr_name.clone())
    })
}

/// The wildcard matcher `*`: matches any single element frame, yielding
/// its name.
pub fn any_tag() -> ContextMatcher<XmlFrame, String> {
    matcher::predicate("*", |frame: &XmlFrame| Some(frame.name.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextStack;

    #[test]
    fn tag_matches_by_name() {
        let m = tag("book");
        let mut stack: ContextStack<XmlFrame> = ContextStack::new();
        stack.push(XmlFrame { name: "book".into() }, vec![]);
        let (value, consumed) = m.try_match(stack.frames()).unwrap();
        assert_eq!(value, "book");
        assert_eq!(consumed, 1);
    }

    #[test]
    fn tag_sequence_matches_nested_path() {
        let path = tag("library").then(tag("book"));
        let mut stack: ContextStack<XmlFrame> = ContextStack::new();
        stack.push(XmlFrame { name: "library".into() }, vec![]);
        stack.push(XmlFrame { name: "book".into() }, vec![]);
        assert!(path.try_match(stack.frames()).is_some());
    }

    #[test]
    fn any_tag_matches_regardless_of_name() {
        let mut stack: ContextStack<XmlFrame> = ContextStack::new();
        stack.push(XmlFrame { name: "whatever".into() }, vec![]);
        let (value, _) = any_tag().try_match(stack.frames()).unwrap();
        assert_eq!(value, "whatever");
    }
}
