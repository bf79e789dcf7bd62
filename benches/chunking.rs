use criterion::{Criterion, criterion_group, criterion_main};
use pdf_rag::document::PageRecord;
use pdf_rag::embeddings::chunking::{ChunkingConfig, chunk_pages};
use std::hint::black_box;

/// Pages of prose with paragraph and sentence structure, roughly 4 KB each
fn sample_pages(count: u32) -> Vec<PageRecord> {
    let sentence = "Retrieval pipelines split documents into overlapping chunks, embed them, \
                    and search the vectors by cosine similarity. ";
    (0..count)
        .map(|page_number| {
            let paragraph = sentence.repeat(6);
            PageRecord {
                text: [paragraph.as_str(); 5].join("\n\n"),
                source_path: "bench.pdf".to_string(),
                page_number,
            }
        })
        .collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let pages = sample_pages(50);
    let config = ChunkingConfig::default();
    c.bench_function("chunking", |b| {
        b.iter(|| chunk_pages(black_box(&pages), black_box(&config)))
    });

    let single_line = vec![PageRecord {
        text: "x".repeat(200_000),
        source_path: "bench.pdf".to_string(),
        page_number: 0,
    }];
    c.bench_function("chunking_raw_cuts", |b| {
        b.iter(|| chunk_pages(black_box(&single_line), black_box(&config)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
