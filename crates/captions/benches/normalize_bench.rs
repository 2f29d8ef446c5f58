use captions::{normalize_captions_with, NormalizeConfig};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn caption_document(cues: usize) -> String {
    let mut doc = String::from("WEBVTT\nKind: captions\nLanguage: en\n\n");
    for i in 0..cues {
        let start = i * 2;
        doc.push_str(&format!(
            "{}\n00:{:02}:{:02}.000 --> 00:{:02}:{:02}.000 align:start position:0%\n<c>word</c> &amp; another<00:00:01.000> line {i}\n\n",
            i + 1,
            (start / 60) % 60,
            start % 60,
            ((start + 2) / 60) % 60,
            (start + 2) % 60,
        ));
    }
    doc
}

fn bench_normalize(c: &mut Criterion) {
    let config = NormalizeConfig::default();
    let mut group = c.benchmark_group("normalize_captions");

    for cues in [16, 256, 4096].iter() {
        let doc = caption_document(*cues);
        group.throughput(Throughput::Bytes(doc.len() as u64));
        group.bench_function(format!("cues_{cues}"), |b| {
            b.iter(|| normalize_captions_with(black_box(&doc), black_box(&config)).expect("normalize"))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_normalize);
criterion_main!(benches);
