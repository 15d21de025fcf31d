// this_file: crates/core/tests/property_tests.rs

//! `proptest`-driven checks for the 8 quantified invariants of spec.md §8,
//! grounded on the teacher's own `tests/property_tests.rs` convention of a
//! root-level integration test file dedicated to `proptest!` properties
//! rather than example-based `#[test]`s (those live alongside each module
//! and in `tests/scenarios.rs` at the workspace root instead).

use proptest::prelude::*;
use spac_core::driver::ParserDriver;
use spac_core::error::{CallSite, SpacError, SpacTraceElement};
use spac_core::parser::combinators::ParserExt;
use spac_core::parser::{first, fold_eval, to_list};
use spac_core::transformer::combinators::filter;
use spac_core::transformer::Transformer;
use spac_core::xml;
use spac_core::{Handler, InputTiming, Parser, Splitter, StackInterpretation, XmlEvent, XmlFrame, XmlStackable};
use spac_test_utils::{elem_end, elem_start, text};

/// Drives `parser` over `xs` one input at a time, stopping the instant its
/// handler finishes, and returns how many inputs it actually pulled.
/// Assumes `parser` never fails on the given inputs.
fn pulls_before_finish<In: Clone, P: Parser<In>>(parser: &P, xs: &[In]) -> usize {
    let mut handler = parser.new_handler();
    for (i, x) in xs.iter().enumerate() {
        if handler
            .handle_input(x.clone())
            .expect("parser under test must not fail")
            .is_some()
        {
            return i + 1;
        }
    }
    xs.len()
}

proptest! {
    /// Invariant 1: map preserves pull count — `P.map(f)` consumes exactly
    /// as many inputs as `P` would, regardless of `f`.
    #[test]
    fn map_preserves_pull_count(xs in prop::collection::vec(any::<i32>(), 1..30)) {
        let base_pulls = pulls_before_finish(&first(), &xs);
        let mapped_pulls = pulls_before_finish(&first().map(|n: i32| n * 2), &xs);
        prop_assert_eq!(base_pulls, mapped_pulls);

        let base_pulls = pulls_before_finish(&to_list(), &xs);
        let mapped_pulls = pulls_before_finish(&to_list().map(|v: Vec<i32>| v.len()), &xs);
        prop_assert_eq!(base_pulls, mapped_pulls);
    }

    /// Invariant 2: map/try_map lifts errors — a `try_map` function that
    /// always fails raises exactly when the base parser would have
    /// finished, never earlier.
    #[test]
    fn try_map_raises_exactly_when_base_finishes(xs in prop::collection::vec(any::<i32>(), 1..30)) {
        let parser = first().try_map(|_: i32| Err::<i32, _>(SpacError::caught_message("boom")));
        let mut handler = parser.new_handler();
        let mut failed_at = None;
        for (i, x) in xs.iter().enumerate() {
            match handler.handle_input(*x) {
                Ok(Some(_)) => prop_assert!(false, "try_map parser must never succeed here"),
                Ok(None) => continue,
                Err(_) => {
                    failed_at = Some(i);
                    break;
                }
            }
        }
        // `first` finishes on the very first input, so the failure must
        // surface there too — never later, never never.
        prop_assert_eq!(failed_at, Some(0));
    }

    /// Invariant 3: orElse winner — on non-empty input, whichever branch
    /// finishes first wins; here `first` always finishes before `to_list`
    /// (which only finishes at end-of-stream).
    #[test]
    fn or_else_picks_whichever_branch_finishes_first(xs in prop::collection::vec(any::<i32>(), 1..30)) {
        let combined = first().map(Some).or_else(to_list().map(|_: Vec<i32>| None::<i32>));
        let result = combined.parse_seq(xs.clone()).unwrap();
        prop_assert_eq!(result, Some(xs[0]));
    }

    /// Invariant 4: orElse failure aggregation — when every branch fails,
    /// `underlying_errors` lists them in the order each branch actually
    /// failed, not chain-declaration order.
    #[test]
    fn or_else_all_fail_orders_errors_by_failure_time(fail_a in 1usize..6, fail_b in 1usize..6) {
        prop_assume!(fail_a != fail_b);
        let a = fold_eval(0usize, move |acc, _: i32| {
            if acc + 1 >= fail_a { Err(SpacError::caught_message("a")) } else { Ok(acc + 1) }
        });
        let b = fold_eval(0usize, move |acc, _: i32| {
            if acc + 1 >= fail_b { Err(SpacError::caught_message("b")) } else { Ok(acc + 1) }
        });
        let combined = a.or_else(b);

        let xs = vec![1; 10];
        let err = combined.parse_seq(xs).unwrap_err();
        match err {
            SpacError::FallbackChainFailure { underlying_errors, .. } => {
                prop_assert_eq!(underlying_errors.len(), 2);
                let expected_first = if fail_a < fail_b { "a" } else { "b" };
                match &underlying_errors[0] {
                    SpacError::Caught { message, .. } => prop_assert_eq!(message.as_str(), expected_first),
                    other => prop_assert!(false, "expected Caught, got {other:?}"),
                }
            }
            other => prop_assert!(false, "expected FallbackChainFailure, got {other:?}"),
        }
    }

    /// Invariant 5: attempt/rethrow roundtrip — `p.attempt().rethrow()` is
    /// observationally equal to `p`, on both success and failure.
    #[test]
    fn attempt_then_rethrow_roundtrips(xs in prop::collection::vec(any::<i32>(), 0..30)) {
        let direct = to_list().parse_seq(xs.clone());
        let roundtrip = to_list().attempt().rethrow().parse_seq(xs);
        prop_assert_eq!(direct.ok(), roundtrip.ok());
    }

    /// Invariant 6: splitter exclusivity — a library of N books produces
    /// exactly N sub-results, one per book, with no cross-contamination
    /// between sibling sub-streams (which overlapping sub-handlers would
    /// produce).
    #[test]
    fn splitter_emits_exactly_one_result_per_book(book_count in 0usize..25) {
        let mut events = vec![elem_start("library")];
        for i in 0..book_count {
            events.push(elem_start("book"));
            events.push(text(&format!("book-{i}")));
            events.push(elem_end("book"));
        }
        events.push(elem_end("library"));

        let matcher = xml::tag("library").then(xml::tag("book"));
        let splitter: Splitter<XmlEvent, XmlFrame, String, XmlStackable> =
            Splitter::new(matcher, XmlStackable);
        let transformer = splitter.of(|_| {
            to_list().map(|evs: Vec<XmlEvent>| {
                evs.into_iter()
                    .filter_map(|e| match e {
                        XmlEvent::Text { value, .. } => Some(value),
                        _ => None,
                    })
                    .collect::<String>()
            })
        });

        let result = transformer.transform(events).unwrap();
        let expected: Vec<String> = (0..book_count).map(|i| format!("book-{i}")).collect();
        prop_assert_eq!(result, expected);
    }

    /// Invariant 7: followedBy replay completeness — every stack-opening
    /// event still live when the base parser finishes is replayed into the
    /// follow-up, in order, before the live stream continues.
    #[test]
    fn followed_by_replays_exactly_the_still_open_pushes(
        open_count in 0usize..10,
        trailing in prop::collection::vec(1i32..100, 0..10),
    ) {
        fn stackable(input: &i32) -> StackInterpretation<i32> {
            if *input > 0 && input % 10 == 0 {
                StackInterpretation::Push { frame: *input, trace: vec![], timing: InputTiming::After }
            } else if *input < 0 {
                StackInterpretation::Pop { timing: InputTiming::Before }
            } else {
                StackInterpretation::NoChange
            }
        }

        let pushes: Vec<i32> = (1..=open_count as i32).map(|i| i * 10).collect();
        let mut input = pushes.clone();
        input.push(42);
        input.extend(trailing.iter().copied());

        let base = filter(|n: &i32| *n == 42).drive(first());
        let parser = base.followed_by(stackable, |_| to_list());
        let result = parser.parse_seq(input).unwrap();

        let mut expected = pushes;
        expected.extend(trailing);
        prop_assert_eq!(result, expected);
    }

    /// Invariant 8: trace monotonicity — the spac-trace prefix of an error
    /// only grows as it unwinds; `push_trace` never drops or reorders an
    /// existing element.
    #[test]
    fn push_trace_only_grows(depth in 0usize..30) {
        let mut err: SpacError<i32> = SpacError::caught_message("boom");
        let mut expected_len = 0;
        for i in 0..depth {
            let before = err.trace().to_vec();
            err = err.push_trace(SpacTraceElement::InParse {
                parser_name: format!("P{i}"),
                method_name: "parse".to_string(),
                call_site: CallSite::here(),
            });
            expected_len += 1;
            prop_assert_eq!(err.trace().len(), expected_len);
            // every previously-present element is still there, untouched,
            // at the same relative position.
            prop_assert_eq!(&err.trace()[..before.len()].iter().map(|e| e.to_string()).collect::<Vec<_>>(),
                             &before.iter().map(|e| e.to_string()).collect::<Vec<_>>());
        }
    }
}
