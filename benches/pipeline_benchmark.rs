//! Benchmarks for ocrchunk pipeline performance.
//!
//! Run with: cargo bench
//!
//! These benchmarks run each stage on synthetic OCR pages of various sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ocrchunk::noise::filter_page;
use ocrchunk::quality::QualityScorer;
use ocrchunk::{normalize, Chunker, Domain, DomainConfig, PageRecord, Pipeline, PipelineOptions};

const SENTENCES: &[&str] = &[
    "يتعلم الطلاب في هذا الدرس كيفية قراءة النصوص وفهم معانيها.",
    "حل المعادلة ٢س + ٣ = ٧ ثم تحقق من الناتج.",
    "تتكون الخلية من نواة وغشاء وسيتوبلازم.",
    "اكتب فقرة قصيرة عن أهمية المحافظة على البيئة!",
    "ما الفرق بين الاسم والفعل والحرف؟",
];

/// Creates a synthetic page with the given number of lines, sprinkled with
/// the usual OCR debris.
fn create_test_page(line_count: usize) -> String {
    let mut page = String::new();
    for i in 0..line_count {
        match i % 9 {
            4 => page.push_str("| | | | |"),
            7 => page.push_str(&format!("صفحة {i}")),
            _ => {
                page.push_str(SENTENCES[i % SENTENCES.len()]);
                page.push(' ');
                page.push_str(SENTENCES[(i + 2) % SENTENCES.len()]);
            }
        }
        page.push('\n');
    }
    page
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");

    for line_count in [10, 50, 200] {
        let page = create_test_page(line_count);
        group.throughput(Throughput::Bytes(page.len() as u64));
        group.bench_with_input(BenchmarkId::new("lines", line_count), &page, |b, page| {
            b.iter(|| normalize(black_box(page), true));
        });
    }

    group.finish();
}

fn bench_chunking(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk");
    let options = PipelineOptions::default();
    let chunker = Chunker::new(options.chunk);

    for line_count in [10, 50, 200] {
        let text = filter_page(&normalize(&create_test_page(line_count), true), &options.line_filter);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("lines", line_count), &text, |b, text| {
            b.iter(|| chunker.chunk(black_box(text)));
        });
    }

    group.finish();
}

fn bench_scoring(c: &mut Criterion) {
    let mut group = c.benchmark_group("score");

    for domain in Domain::ALL {
        let config = DomainConfig::for_domain(domain);
        let scorer = QualityScorer::new(&config);
        let text = create_test_page(6).replace('\n', " ");
        group.bench_with_input(BenchmarkId::new("domain", domain), &text, |b, text| {
            b.iter(|| scorer.assess(black_box(text)));
        });
    }

    group.finish();
}

fn bench_process_page(c: &mut Criterion) {
    let mut group = c.benchmark_group("process_page");
    let options = PipelineOptions::default();
    let config = DomainConfig::for_domain(Domain::Textual);
    let pipeline = Pipeline::new(&options, &config);

    for line_count in [10, 50, 200] {
        let page = PageRecord::new(create_test_page(line_count)).with_page(1);
        group.throughput(Throughput::Bytes(page.text.len() as u64));
        group.bench_with_input(BenchmarkId::new("lines", line_count), &page, |b, page| {
            b.iter(|| pipeline.process_page(black_box(page)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_normalize,
    bench_chunking,
    bench_scoring,
    bench_process_page
);
criterion_main!(benches);
