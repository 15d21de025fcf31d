// this_file: crates/core/src/error.rs

//! The structured diagnostic trail attached to engine failures (the "spac
//! trace"), and the [`SpacError`] variants that carry it.
//!
//! Errors flow through the effect channel (a plain `Result` in this
//! synchronous core), never as ordinary values, unless explicitly lifted by
//! [`crate::parser::combinators::ParserExt::attempt`]. Trace-adding
//! combinators each prepend one [`SpacTraceElement`] as the error unwinds;
//! the trace only grows, never reorders (spec.md invariant 8).

use crate::location::Location;
use std::fmt;
use std::sync::Arc;

/// Where a combinator was constructed, for trace readability.
///
/// Captured automatically via `#[track_caller]` at combinator-construction
/// call sites — capturing source locations is a language concern, and
/// `std::panic::Location` is the idiomatic Rust mechanism for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    /// Source file of the call site.
    pub file: &'static str,
    /// Line number of the call site.
    pub line: u32,
}

impl CallSite {
    /// Captures the caller's location. Must be called from a
    /// `#[track_caller]` function to be meaningful.
    #[track_caller]
    pub fn here() -> Self {
        let loc = std::panic::Location::caller();
        CallSite {
            file: loc.file(),
            line: loc.line(),
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// One element of a spac trace, prepended by the combinator that observed
/// the failure passing through it.
#[derive(Debug, Clone)]
pub enum SpacTraceElement<In> {
    /// The event that first witnessed the failure.
    InInput(In),
    /// The event that first witnessed the failure, with its source location.
    InInputContext(In, Location),
    /// The failure passed through a [`crate::splitter::Splitter`] matching
    /// `matcher_description`.
    InSplitter {
        /// Human-readable description of the matcher (e.g. `"library" \ "book"`).
        matcher_description: String,
        /// Where the splitter was constructed.
        call_site: CallSite,
    },
    /// The failure passed through one branch of a tuple/product composition.
    InCompound {
        /// 0-based index of the failing branch.
        branch_index: usize,
        /// Total number of branches in the compound.
        branch_count: usize,
        /// Where the compound was constructed.
        call_site: CallSite,
    },
    /// The failure passed through a named parser entry point.
    InParse {
        /// Name of the parser, if known.
        parser_name: String,
        /// Name of the method that was invoked (`"parse"`, `"parseSeq"`, ...).
        method_name: String,
        /// Where the call was made.
        call_site: CallSite,
    },
}

impl<In: fmt::Debug> fmt::Display for SpacTraceElement<In> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpacTraceElement::InInput(input) => write!(f, "in input {input:?}"),
            SpacTraceElement::InInputContext(input, loc) => {
                write!(f, "in input {input:?} at {loc}")
            }
            SpacTraceElement::InSplitter {
                matcher_description,
                call_site,
            } => write!(f, "in splitter `{matcher_description}` ({call_site})"),
            SpacTraceElement::InCompound {
                branch_index,
                branch_count,
                call_site,
            } => write!(
                f,
                "in compound branch {branch_index} of {branch_count} ({call_site})"
            ),
            SpacTraceElement::InParse {
                parser_name,
                method_name,
                call_site,
            } => write!(f, "in {parser_name}.{method_name} ({call_site})"),
        }
    }
}

/// An ordered trail of [`SpacTraceElement`]s, outermost (most recently
/// added) first.
pub type SpacTrace<In> = Vec<SpacTraceElement<In>>;

/// The engine's failure type.
///
/// Generic over the event type `In` so that [`SpacTraceElement::InInput`]
/// and [`SpacError::UnexpectedInput`] can carry the actual offending event
/// rather than a stringified approximation of it.
#[derive(Debug, thiserror::Error)]
pub enum SpacError<In> {
    /// A `first`-style parser reached end-of-stream before any input
    /// arrived.
    #[error("expected at least one input but the stream ended")]
    MissingFirst {
        /// The accumulated spac trace.
        trace: SpacTrace<In>,
    },

    /// [`crate::parser::combinators::ParserExt::expect_inputs`] saw an
    /// input that did not satisfy the next expectation.
    #[error("unexpected input, still expecting: {expectations:?}")]
    UnexpectedInput {
        /// The offending input.
        input: In,
        /// Labels of the expectations that were not yet satisfied.
        expectations: Vec<String>,
        /// The accumulated spac trace.
        trace: SpacTrace<In>,
    },

    /// [`crate::parser::combinators::ParserExt::expect_inputs`] ran out of
    /// input while expectations remained.
    #[error("stream ended with unfulfilled expectations: {expectations:?}")]
    UnfulfilledInputs {
        /// Labels of the expectations that were never satisfied.
        expectations: Vec<String>,
        /// The accumulated spac trace.
        trace: SpacTrace<In>,
    },

    /// Every branch of an `orElse` chain failed.
    #[error("all {} branches of a fallback chain failed", underlying_errors.len())]
    FallbackChainFailure {
        /// The underlying failures, in the order each branch failed (not
        /// chain order — see spec.md Open Questions).
        underlying_errors: Vec<SpacError<In>>,
        /// The accumulated spac trace.
        trace: SpacTrace<In>,
    },

    /// A non-engine exception escaped user-supplied code (a `map` function,
    /// a `fold` step, a predicate, ...).
    #[error("{message}")]
    Caught {
        /// The message captured from the user-code panic/error.
        message: String,
        /// The original error, if it was a `std::error::Error`.
        #[source]
        cause: Option<Arc<dyn std::error::Error + Send + Sync + 'static>>,
        /// The accumulated spac trace.
        trace: SpacTrace<In>,
    },
}

impl<In> SpacError<In> {
    /// Wraps a user-code error as a [`SpacError::Caught`] with an empty
    /// trace; combinators prepend trace elements as it unwinds.
    pub fn caught<E>(cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SpacError::Caught {
            message: cause.to_string(),
            cause: Some(Arc::new(cause)),
            trace: Vec::new(),
        }
    }

    /// Wraps a plain message as a [`SpacError::Caught`] with no source
    /// error and an empty trace.
    pub fn caught_message(message: impl Into<String>) -> Self {
        SpacError::Caught {
            message: message.into(),
            cause: None,
            trace: Vec::new(),
        }
    }

    /// A [`crate::context::ContextStack`] pop was requested while empty.
    ///
    /// Per spec.md §3, this is a programming error in the
    /// [`crate::context::StackableStrategy`] driving the stack, never a
    /// no-op: "pops never under-run an empty stack; if a pop is requested
    /// while empty... it surfaces as a parse failure."
    pub fn stack_underflow() -> Self {
        SpacError::caught_message("pop requested on an empty context stack")
    }

    /// A reference to this error's accumulated trace.
    pub fn trace(&self) -> &SpacTrace<In> {
        match self {
            SpacError::MissingFirst { trace }
            | SpacError::UnexpectedInput { trace, .. }
            | SpacError::UnfulfilledInputs { trace, .. }
            | SpacError::FallbackChainFailure { trace, .. }
            | SpacError::Caught { trace, .. } => trace,
        }
    }

    /// Prepends one trace element, as if the error had just unwound through
    /// the combinator that produced `element`.
    pub fn push_trace(mut self, element: SpacTraceElement<In>) -> Self {
        match &mut self {
            SpacError::MissingFirst { trace }
            | SpacError::UnexpectedInput { trace, .. }
            | SpacError::UnfulfilledInputs { trace, .. }
            | SpacError::FallbackChainFailure { trace, .. }
            | SpacError::Caught { trace, .. } => trace.push(element),
        }
        self
    }
}

/// The result type produced at the engine's boundary (spec.md §3): success
/// value or structured failure. Internally, combinators propagate failure
/// through this same `Result`'s `Err` arm via `?` — Rust's native error
/// channel plays the role of the "effect channel" spec.md describes.
pub type SpacResult<T, In> = Result<T, SpacError<In>>;
