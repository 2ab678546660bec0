//! Benchmarks for BBCode conversion and thread extraction.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use vbulletin_bbcode::{BbCodeConverter, ConversionConfig, Thread, parse_page};

const SHOWTHREAD: &[u8] = include_bytes!("../tests/fixtures/showthread.html");

/// Generate a post body with `paragraphs` quoted and formatted paragraphs.
fn generate_post(paragraphs: usize) -> String {
    let mut post = String::with_capacity(paragraphs * 160);
    for i in 0..paragraphs {
        post.push_str(&format!(
            "[quote=User{i}]Paragraph {i} with [b]bold[/b], [i]italic[/i] and a \
             [url=http://example.com/{i}]link[/url].[/quote]\n[list][*]one[*]two[/list]\n"
        ));
    }
    post
}

fn bench_convert_simple(c: &mut Criterion) {
    let converter = BbCodeConverter::new(ConversionConfig::vbulletin().expect("preset"));

    c.bench_function("convert_simple_post", |b| {
        b.iter(|| converter.convert(black_box("[b]Hello[/b] [i]world[/i]")));
    });
}

fn bench_convert_varying_sizes(c: &mut Criterion) {
    let converter = BbCodeConverter::new(ConversionConfig::vbulletin().expect("preset"));
    let mut group = c.benchmark_group("convert_post_size");

    for paragraphs in [1, 10, 100, 1000] {
        let post = generate_post(paragraphs);
        group.throughput(Throughput::Bytes(post.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(paragraphs), &post, |b, post| {
            b.iter(|| converter.convert(post));
        });
    }
    group.finish();
}

fn bench_convert_malformed(c: &mut Criterion) {
    let converter = BbCodeConverter::new(ConversionConfig::vbulletin().expect("preset"));
    let post = "[b][i][u]".repeat(200) + &"[/b]".repeat(200);

    c.bench_function("convert_malformed_post", |b| {
        b.iter(|| converter.convert(black_box(&post)));
    });
}

fn bench_extract_thread(c: &mut Criterion) {
    c.bench_function("extract_showthread_page", |b| {
        b.iter(|| {
            let dom = parse_page(black_box(SHOWTHREAD)).expect("fixture parses");
            Thread::from_dom(1, &dom).expect("fixture extracts")
        });
    });
}

criterion_group!(
    benches,
    bench_convert_simple,
    bench_convert_varying_sizes,
    bench_convert_malformed,
    bench_extract_thread
);
criterion_main!(benches);
