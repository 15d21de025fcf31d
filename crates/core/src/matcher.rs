// this_file: crates/core/src/matcher.rs

//! Composable predicates over the [`ContextStack`] (spec.md §2 item 3 /
//! §4.5): the building blocks of `Splitter("library" \ "book")`-style
//! declarative sub-stream selection.
//!
//! A matcher is a pure function from the current stack of frames to either
//! "no match" or a matched value plus how many frames (counted from the
//! bottom) it consumed. Composition `a \ b` threads the unconsumed
//! remainder of `a` into `b`; the matcher is monotone (spec.md §3): once it
//! matches a given prefix, pushing more frames on top never un-matches it —
//! only popping one of the consumed frames does.

use crate::context::ContextFrame;
use std::sync::Arc;

type MatchFn<S, C> = Arc<dyn Fn(&[ContextFrame<S>]) -> Option<(C, usize)> + Send + Sync>;

/// A composable predicate over a context stack.
pub struct ContextMatcher<S, C> {
    inner: MatchFn<S, C>,
    description: String,
}

impl<S, C> Clone for ContextMatcher<S, C> {
    fn clone(&self) -> Self {
        ContextMatcher {
            inner: Arc::clone(&self.inner),
            description: self.description.clone(),
        }
    }
}

impl<S, C> ContextMatcher<S, C>
where
    S: 'static,
    C: 'static,
{
    /// Builds a matcher from its description (for trace/debug purposes)
    /// and matching function. The function returns `Some((value, n))` when
    /// it matches a prefix of `n` frames.
    pub fn new(
        description: impl Into<String>,
        f: impl Fn(&[ContextFrame<S>]) -> Option<(C, usize)> + Send + Sync + 'static,
    ) -> Self {
        ContextMatcher {
            inner: Arc::new(f),
            description: description.into(),
        }
    }

    /// Attempts to match against the given stack frames (bottom-first).
    /// Returns the matched value and the number of frames (from the
    /// bottom) it consumed.
    pub fn try_match(&self, frames: &[ContextFrame<S>]) -> Option<(C, usize)> {
        (self.inner)(frames)
    }

    /// A human-readable description, used in [`crate::error::SpacTraceElement::InSplitter`].
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Sequential composition `self \ next`: `self` matches a prefix, and
    /// `next` matches the remainder that follows it. The combined matcher's
    /// value is `next`'s value; the combined consumed length is the sum of
    /// both.
    pub fn then<D>(self, next: ContextMatcher<S, D>) -> ContextMatcher<S, D>
    where
        D: 'static,
    {
        let description = format!("{} \\ {}", self.description, next.description);
        ContextMatcher::new(description, move |frames| {
            let (_, consumed_a) = self.try_match(frames)?;
            let rest = frames.get(consumed_a..)?;
            let (value, consumed_b) = next.try_match(rest)?;
            Some((value, consumed_a + consumed_b))
        })
    }

    /// Maps the matched value, keeping the same consumption length.
    pub fn map<D>(self, f: impl Fn(C) -> D + Send + Sync + 'static) -> ContextMatcher<S, D>
    where
        D: 'static,
    {
        let description = self.description.clone();
        ContextMatcher::new(description, move |frames| {
            let (value, consumed) = self.try_match(frames)?;
            Some((f(value), consumed))
        })
    }

    /// Alternation: tries `self` first, falling back to `other` if `self`
    /// does not match.
    pub fn or(self, other: ContextMatcher<S, C>) -> ContextMatcher<S, C> {
        let description = format!("({} | {})", self.description, other.description);
        ContextMatcher::new(description, move |frames| {
            self.try_match(frames).or_else(|| other.try_match(frames))
        })
    }
}

/// A single-item predicate matcher: matches exactly one frame (the bottom
/// of whatever stack it is given) if `predicate` returns `Some`.
pub fn predicate<S, C>(
    description: impl Into<String>,
    predicate: impl Fn(&S) -> Option<C> + Send + Sync + 'static,
) -> ContextMatcher<S, C>
where
    S: 'static,
    C: 'static,
{
    ContextMatcher::new(description, move |frames| {
        let first = frames.first()?;
        predicate(&first.frame).map(|value| (value, 1))
    })
}

/// The wildcard matcher `*`: matches any single frame, yielding a clone of
/// it.
pub fn any<S>() -> ContextMatcher<S, S>
where
    S: Clone + 'static,
{
    predicate("*", |frame: &S| Some(frame.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextStack;

    #[test]
    fn sequence_composition_threads_remainder() {
        let lib = predicate("library", |s: &&str| (*s == "library").then_some(()));
        let book = predicate("book", |s: &&str| (*s == "book").then_some(*s));
        let matcher = lib.then(book);

        let mut stack: ContextStack<&str> = ContextStack::new();
        stack.push("library", vec![]);
        stack.push("book", vec![]);
        stack.push("title", vec![]);

        let (value, consumed) = matcher.try_match(stack.frames()).unwrap();
        assert_eq!(value, "book");
        assert_eq!(consumed, 2);
    }

    #[test]
    fn non_matching_prefix_fails() {
        let lib = predicate("library", |s: &&str| (*s == "library").then_some(()));
        let book = predicate("book", |s: &&str| (*s == "book").then_some(*s));
        let matcher = lib.then(book);

        let mut stack: ContextStack<&str> = ContextStack::new();
        stack.push("shelf", vec![]);
        stack.push("book", vec![]);

        assert!(matcher.try_match(stack.frames()).is_none());
    }

    #[test]
    fn monotone_under_extra_pushes() {
        let m = predicate("tag", |s: &&str| (*s == "a").then_some(()));
        let mut stack: ContextStack<&str> = ContextStack::new();
        stack.push("a", vec![]);
        assert!(m.try_match(stack.frames()).is_some());
        stack.push("b", vec![]);
        stack.push("c", vec![]);
        // still matches the same 1-frame prefix regardless of what's on top
        assert!(m.try_match(stack.frames()).is_some());
    }
}
