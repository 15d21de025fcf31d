// this_file: crates/core/src/json.rs

//! The JSON matcher DSL surface (spec.md §6): field-name literals,
//! `any_index`, and `index_start`, built on [`crate::matcher::ContextMatcher`]
//! over [`JsonFrame`] stacks — the JSON analogue of [`crate::xml`].

use crate::event::JsonFrame;
use crate::matcher::{self, ContextMatcher};

/// Matches a single frame that is a field of the given name, yielding the
/// name itself. Spelled `"field"` in spec.md's matcher DSL surface.
pub fn field(name: impl Into<String>) -> ContextMatcher<JsonFrame, String> {
    let name = name.into();
    let description = name.clone();
    matcher::predicate(description, move |frame: &JsonFrame| match frame {
        JsonFrame::Field(f) if *f == name => Some(f.clone()),
        _ => None,
    })
}

/// Matches a single frame that is an array element at exactly `index`,
/// yielding the index.
pub fn index_start(index: usize) -> ContextMatcher<JsonFrame, usize> {
    let description = format!("[{index}]");
    matcher::predicate(description, move |frame: &JsonFrame| match frame {
        JsonFrame::Index(i) if *i == index => Some(*i),
        _ => None,
    })
}

/// Matches a single frame that is any array element, yielding its index.
/// Spelled `anyIndex` in spec.md's matcher DSL surface.
pub fn any_index() -> ContextMatcher<JsonFrame, usize> {
    matcher::predicate("[*]", |frame: &JsonFrame| match frame {
        JsonFrame::Index(i) => Some(*i),
        _ => None,
    })
}

/// Matches a single frame regardless of whether it's a field or an array
/// element, yielding the frame itself.
pub fn any_frame() -> ContextMatcher<JsonFrame, JsonFrame> {
    matcher::any()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextStack;

    #[test]
    fn field_matches_exact_name() {
        let m = field("posts");
        let mut stack: ContextStack<JsonFrame> = ContextStack::new();
        stack.push(JsonFrame::Field("posts".into()), vec![]);
        assert!(m.try_match(stack.frames()).is_some());
    }

    #[test]
    fn field_then_any_index_matches_array_elements() {
        let path = field("posts").then(any_index());
        let mut stack: ContextStack<JsonFrame> = ContextStack::new();
        stack.push(JsonFrame::Field("posts".into()), vec![]);
        stack.push(JsonFrame::Index(3), vec![]);
        let (value, consumed) = path.try_match(stack.frames()).unwrap();
        assert_eq!(value, 3);
        assert_eq!(consumed, 2);
    }

    #[test]
    fn index_start_rejects_other_indices() {
        let m = index_start(0);
        let mut stack: ContextStack<JsonFrame> = ContextStack::new();
        stack.push(JsonFrame::Index(1), vec![]);
        assert!(m.try_match(stack.frames()).is_none());
    }
}
