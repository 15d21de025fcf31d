// this_file: benches/splitter_benchmarks.rs

//! Benchmark suite for the splitter engine (spec.md §4.5) through the
//! public `spac` facade: how dispatch cost scales with the number of
//! sub-streams and with how deep each sub-stream nests before closing.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use spac::{xml, Splitter, TransformerDriver, XmlEvent, XmlFrame, XmlStackable};
use spac_test_utils::{elem_end, elem_start, text};

fn library_with_books(book_count: usize, chapters_per_book: usize) -> Vec<XmlEvent> {
    let mut events = vec![elem_start("library")];
    for b in 0..book_count {
        events.push(elem_start("book"));
        for ch in 0..chapters_per_book {
            events.push(elem_start("chapter"));
            events.push(text(&format!("book {b} chapter {ch}")));
            events.push(elem_end("chapter"));
        }
        events.push(elem_end("book"));
    }
    events.push(elem_end("library"));
    events
}

fn bench_book_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("splitter_book_count");
    for &count in &[10usize, 100, 1_000] {
        let events = library_with_books(count, 1);
        group.bench_with_input(BenchmarkId::from_parameter(count), &events, |b, events| {
            b.iter(|| {
                let matcher = xml::tag("library").then(xml::tag("book"));
                let splitter = Splitter::<XmlEvent, XmlFrame, String, XmlStackable>::new(matcher, XmlStackable);
                let transformer = splitter.of(|_| spac::to_list());
                let result = transformer.transform(black_box(events.clone()));
                assert!(result.is_ok());
            })
        });
    }
    group.finish();
}

fn bench_chapter_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("splitter_chapter_depth");
    for &depth in &[10usize, 100, 1_000] {
        let events = library_with_books(10, depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &events, |b, events| {
            b.iter(|| {
                let matcher = xml::tag("library").then(xml::tag("book"));
                let splitter = Splitter::<XmlEvent, XmlFrame, String, XmlStackable>::new(matcher, XmlStackable);
                let transformer = splitter.of(|_| spac::to_list());
                let result = transformer.transform(black_box(events.clone()));
                assert!(result.is_ok());
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_book_count, bench_chapter_depth);
criterion_main!(benches);
