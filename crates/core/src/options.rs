// this_file: crates/core/src/options.rs

//! Ambient configuration for the driver entry points (spec.md SPEC_FULL
//! §2 ambient stack), grounded on the teacher's `ParserOptions`
//! (`examples/vexyart-vexy-json/crates/core/src/parser/mod.rs`).

/// Options consumed by the driver entry points ([`crate::parser::Parser::parse`],
/// [`crate::parser::Parser::parse_seq`]).
///
/// Unlike the teacher's `ParserOptions`, this carries no syntax-leniency
/// flags — those belong to the concrete tokenizer, which is out of scope
/// here (spec.md §1). It carries only the knobs that affect the *engine's*
/// own behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Upper bound on how many stack-opening events
    /// [`crate::parser::combinators::ParserExt::followed_by`] will buffer
    /// for replay into the follow-up parser. `None` means unbounded.
    ///
    /// Exceeding this limit surfaces as a [`crate::error::SpacError::Caught`]
    /// rather than growing memory without bound.
    pub max_replay_buffer: Option<usize>,

    /// Upper bound on context stack depth. `None` means unbounded.
    /// Exceeding it surfaces as a [`crate::error::SpacError::Caught`].
    pub max_stack_depth: Option<usize>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            max_replay_buffer: None,
            max_stack_depth: None,
        }
    }
}

impl EngineOptions {
    /// The default, unbounded options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the replay buffer cap.
    pub fn with_max_replay_buffer(mut self, max: usize) -> Self {
        self.max_replay_buffer = Some(max);
        self
    }

    /// Sets the stack depth cap.
    pub fn with_max_stack_depth(mut self, max: usize) -> Self {
        self.max_stack_depth = Some(max);
        self
    }
}
