use std::io::Cursor;

use criterion::{criterion_group, criterion_main, Criterion};

use genodex::feature::{FeatureType, GenomicFeature};
use genodex::region::GenomicRegion;
use genodex::store::window_index::{WindowIndex, WindowIndexWriter};
use genodex::strand::Strand;

const WINDOW: u32 = 1_000;
const GENE_COUNT: i32 = 5_000;

/// One synthetic gene every 10 kb, each with two transcripts of three exons.
fn synthetic_file() -> Vec<u8> {
    let mut genes = Vec::with_capacity(GENE_COUNT as usize);
    for i in 0..GENE_COUNT {
        let start = 1 + i * 10_000;
        let end = start + 4_999;
        let mut gene =
            GenomicFeature::new(FeatureType::Gene, "chr1", start, end, Strand::Sense).unwrap();
        gene.id = i as u32;
        gene.set_property("gene_name", format!("GENE{i}"));
        for t in 0..2 {
            let mut tx = GenomicFeature::new(
                FeatureType::Transcript,
                "chr1",
                start,
                end - t * 500,
                Strand::Sense,
            )
            .unwrap();
            for e in 0..3 {
                let exon_start = start + e * 1_500;
                tx.add_child(
                    GenomicFeature::new(
                        FeatureType::Exon,
                        "chr1",
                        exon_start,
                        exon_start + 800,
                        Strand::Sense,
                    )
                    .unwrap(),
                );
            }
            gene.add_child(tx);
        }
        genes.push(gene);
    }

    let mut cursor = Cursor::new(Vec::new());
    WindowIndexWriter::write(&mut cursor, WINDOW, &genes).unwrap();
    cursor.into_inner()
}

fn bench_find(c: &mut Criterion) {
    let data = synthetic_file();
    let mut index = WindowIndex::open(Cursor::new(data)).unwrap();
    let region = GenomicRegion::new("chr1", 25_000_000, 25_050_000).unwrap();

    c.bench_function("find (50 kb region, 5k genes)", |b| {
        b.iter(|| {
            let found = index.find(&region, Some(FeatureType::Gene), 1).unwrap();
            assert!(!found.is_empty());
        });
    });
}

fn bench_nth_closest(c: &mut Criterion) {
    let data = synthetic_file();
    let mut index = WindowIndex::open(Cursor::new(data)).unwrap();
    let region = GenomicRegion::new("chr1", 25_000_500, 25_000_500).unwrap();

    c.bench_function("nth_closest (n=5, 5k genes)", |b| {
        b.iter(|| {
            let groups = index.nth_closest(&region, 5, Some(FeatureType::Gene)).unwrap();
            assert_eq!(groups.len(), 5);
        });
    });
}

criterion_group!(benches, bench_find, bench_nth_closest);
criterion_main!(benches);
