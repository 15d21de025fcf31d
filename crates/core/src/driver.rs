// this_file: crates/core/src/driver.rs

//! Driver entry points (spec.md §6): the thin loop that pulls events one at
//! a time from a token source and feeds them through a handler tree until
//! it finishes, the source ends, or the source raises.
//!
//! This is the only executable loop behind the otherwise purely
//! declarative combinator surface — everything in [`crate::parser`] and
//! [`crate::transformer`] only ever *builds* handler trees; this module is
//! what actually drives one.

use crate::error::{CallSite, SpacError, SpacResult, SpacTraceElement};
use crate::handler::Handler;
use crate::parser::Parser;
use crate::transformer::Transformer;
use std::any::type_name;

/// Any producer of a finite sequence of events (spec.md §6): "the source
/// signals end-of-stream or an error, exclusively". `next_event` returning
/// `Ok(None)` is end-of-stream; `Err(_)` is the source's own failure
/// (tokenizer errors, I/O errors, ...), lifted into the same
/// [`SpacError`] channel the rest of the engine uses.
pub trait TokenSource<In> {
    /// Pulls the next event, or signals end-of-stream / failure.
    fn next_event(&mut self) -> SpacResult<Option<In>, In>;
}

/// Any fallible iterator is a [`TokenSource`].
impl<In, I> TokenSource<In> for I
where
    I: Iterator<Item = SpacResult<In, In>>,
{
    fn next_event(&mut self) -> SpacResult<Option<In>, In> {
        self.next().transpose()
    }
}

/// An infallible in-memory sequence, adapted to a [`TokenSource`] by
/// treating every item as a success. This is what [`ParserDriver::parse_seq`]
/// builds on top of for `Vec<Event>`-style fixtures and tests.
pub struct InfallibleSource<I> {
    iter: I,
}

impl<In, I> TokenSource<In> for InfallibleSource<I>
where
    I: Iterator<Item = In>,
{
    fn next_event(&mut self) -> SpacResult<Option<In>, In> {
        Ok(self.iter.next())
    }
}

fn drive<In, H>(mut handler: H, mut source: impl TokenSource<In>) -> SpacResult<H::Out, In>
where
    H: Handler<In>,
{
    loop {
        match source.next_event() {
            Ok(Some(input)) => {
                if let Some(result) = handler.handle_input(input)? {
                    return Ok(result);
                }
            }
            Ok(None) => return handler.handle_end(),
            Err(err) => {
                if let Some(result) = handler.handle_error(err)? {
                    return Ok(result);
                }
                return handler.handle_end();
            }
        }
    }
}

/// Driver entry points available on every [`Parser`].
pub trait ParserDriver<In>: Parser<In> {
    /// Runs this parser to completion over `source`, wrapping any failure
    /// in an [`SpacTraceElement::InParse`] naming this parser's type and
    /// `"parse"`.
    #[track_caller]
    fn parse(&self, source: impl TokenSource<In>) -> SpacResult<Self::Out, In> {
        let call_site = CallSite::here();
        drive(self.new_handler(), source).map_err(|err| {
            err.push_trace(SpacTraceElement::InParse {
                parser_name: type_name::<Self>().to_string(),
                method_name: "parse".to_string(),
                call_site,
            })
        })
    }

    /// Runs this parser over an infallible in-memory sequence — the
    /// spec.md `parseSeq` entry point. Equivalent to [`ParserDriver::parse`]
    /// wrapping `source` in an always-succeeding [`TokenSource`].
    #[track_caller]
    fn parse_seq<I>(&self, source: I) -> SpacResult<Self::Out, In>
    where
        I: IntoIterator<Item = In>,
    {
        let call_site = CallSite::here();
        drive(self.new_handler(), InfallibleSource { iter: source.into_iter() }).map_err(|err| {
            err.push_trace(SpacTraceElement::InParse {
                parser_name: type_name::<Self>().to_string(),
                method_name: "parseSeq".to_string(),
                call_site,
            })
        })
    }
}

impl<In, P: Parser<In>> ParserDriver<In> for P {}

/// Driver entry points available on every [`Transformer`].
///
/// spec.md's `T.transform(iterator) -> iterator` asks for a genuinely
/// lazy, pull-based output stream; without coroutines or coordinated
/// suspension, the most faithful synchronous rendition is to drive the
/// whole input through a buffering sink and hand back the buffered
/// results as an iterator. Every output still corresponds to an
/// [`crate::handler::Handler::handle_input`] that earlier returned
/// `Ok(None)` and so preserves the same event ordering the true streaming
/// variant would — just materialized eagerly instead of chunked through
/// suspension points the core itself does not have (spec.md §5).
pub trait TransformerDriver<In, Out>: Transformer<In, Out> {
    /// Runs this transformer over `source`, collecting every value it
    /// emits, in order.
    fn transform<I>(&self, source: I) -> SpacResult<Vec<Out>, In>
    where
        I: IntoIterator<Item = In>,
    {
        let downstream = crate::parser::to_list().new_handler();
        let handler = self.wrap(downstream);
        drive(handler, InfallibleSource { iter: source.into_iter() })
    }
}

impl<In, Out, T: Transformer<In, Out>> TransformerDriver<In, Out> for T {}

#[cfg(feature = "async")]
mod async_pipe {
    use super::*;
    use futures::stream::{self, Stream, StreamExt};

    /// `T.toPipe` (spec.md §6): wraps the synchronous handler in the
    /// effect's stream abstraction. The core `Handler` never suspends
    /// (spec.md §5), so there is nothing to poll incrementally — this
    /// drives the transformer to completion once via
    /// [`TransformerDriver::transform`] and replays the result as a
    /// [`futures::Stream`], which is what "the pipe variant merely wraps
    /// the synchronous handler" (spec.md §6) comes down to once there is
    /// no asynchronous token source underneath it.
    pub fn to_pipe<In, Out, T>(
        transformer: &T,
        source: impl IntoIterator<Item = In>,
    ) -> impl Stream<Item = SpacResult<Out, In>>
    where
        T: Transformer<In, Out>,
    {
        let items = match transformer.transform(source) {
            Ok(items) => items.into_iter().map(Ok).collect::<Vec<_>>(),
            Err(err) => vec![Err(err)],
        };
        stream::iter(items)
    }

    /// Drives `parser` over an asynchronous token source (spec.md §5's
    /// optional deferred-effect surface): unlike [`to_pipe`], the source
    /// itself is genuinely polled one item at a time rather than collected
    /// up front, because a [`Handler`] only ever needs the *next* event —
    /// there is no reason to buffer the whole stream just because it
    /// happens to arrive asynchronously. The handler tree underneath is
    /// still the same synchronous one `parse`/`parse_seq` drive; this only
    /// adds an `.await` around "get the next event".
    pub async fn parse_async<In, P>(
        parser: &P,
        mut source: impl Stream<Item = SpacResult<In, In>> + Unpin,
    ) -> SpacResult<P::Out, In>
    where
        P: Parser<In>,
    {
        let call_site = CallSite::here();
        let mut handler = parser.new_handler();
        let result = loop {
            match source.next().await {
                Some(Ok(input)) => match handler.handle_input(input) {
                    Ok(Some(out)) => break Ok(out),
                    Ok(None) => continue,
                    Err(err) => break Err(err),
                },
                Some(Err(err)) => match handler.handle_error(err) {
                    Ok(Some(out)) => break Ok(out),
                    Ok(None) => break handler.handle_end(),
                    Err(err) => break Err(err),
                },
                None => break handler.handle_end(),
            }
        };
        result.map_err(|err| {
            err.push_trace(SpacTraceElement::InParse {
                parser_name: type_name::<P>().to_string(),
                method_name: "parse_async".to_string(),
                call_site,
            })
        })
    }
}

#[cfg(feature = "async")]
pub use async_pipe::{parse_async, to_pipe};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{first, to_list, Parser};

    #[test]
    fn parse_seq_drives_a_parser_over_a_vec() {
        let result = first().parse_seq(vec![1, 2, 3]);
        assert_eq!(result.unwrap(), 1);
    }

    #[test]
    fn parse_seq_reports_missing_first_with_trace() {
        let err = first().parse_seq(Vec::<i32>::new()).unwrap_err();
        assert!(matches!(err, SpacError::MissingFirst { .. }));
        assert!(!err.trace().is_empty(), "parse_seq should prepend an InParse trace element");
    }

    #[test]
    fn parse_feeds_a_fallible_source() {
        let source = vec![Ok(1), Ok(2), Ok(3)].into_iter();
        let result = to_list().parse(source);
        assert_eq!(result.unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn parse_propagates_source_errors() {
        let source =
            vec![Ok(1), Err(SpacError::caught_message("boom"))].into_iter();
        let err = first().parse(source);
        assert!(err.is_err());
    }
}

#[cfg(all(test, feature = "async"))]
mod async_tests {
    use super::async_pipe::parse_async;
    use crate::parser::{first, to_list};
    use futures::stream;

    #[test]
    fn parse_async_drives_a_parser_over_a_stream() {
        let source = stream::iter(vec![Ok(1), Ok(2), Ok(3)]);
        let result = futures::executor::block_on(parse_async(&to_list(), source));
        assert_eq!(result.unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn parse_async_finishes_as_soon_as_the_base_parser_does() {
        let source = stream::iter(vec![Ok(1), Ok(2), Ok(3)]);
        let result = futures::executor::block_on(parse_async(&first(), source));
        assert_eq!(result.unwrap(), 1);
    }

    #[test]
    fn parse_async_propagates_source_errors() {
        use crate::error::SpacError;
        let source = stream::iter(vec![Ok(1), Err(SpacError::caught_message("boom"))]);
        let result = futures::executor::block_on(parse_async(&to_list(), source));
        assert!(result.is_err());
    }
}
