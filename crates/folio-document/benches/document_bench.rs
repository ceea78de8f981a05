// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the folio-document crate: line clustering over a
// dense synthetic page, and image placement geometry.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use folio_core::types::Anchor;
use folio_core::LineClustering;
use folio_document::extract::GlyphRun;
use folio_document::geometry::{compute_anchored_rect, compute_fitted_scale};
use folio_document::reconstruct::cluster_lines;

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// A page of 60 lines with 8 runs each, baselines jittered by a fraction of a
/// point the way real text extraction reports them.
fn synthetic_page() -> Vec<GlyphRun> {
    (0..60)
        .flat_map(|line| {
            (0..8).map(move |column| {
                let jitter = ((line * 7 + column * 3) % 5) as f64 * 0.08;
                GlyphRun::new(
                    format!("w{line}-{column}"),
                    72.0 + column as f64 * 60.0,
                    800.0 - line as f64 * 12.5 + jitter,
                    11.0,
                )
            })
        })
        .collect()
}

fn bench_line_clustering(c: &mut Criterion) {
    let runs = synthetic_page();

    c.bench_function("cluster_lines exact (480 runs)", |b| {
        b.iter(|| black_box(cluster_lines(black_box(&runs), LineClustering::Exact)));
    });
    c.bench_function("cluster_lines tolerance (480 runs)", |b| {
        b.iter(|| {
            black_box(cluster_lines(
                black_box(&runs),
                LineClustering::Tolerance { band_pt: 2.0 },
            ))
        });
    });
}

fn bench_geometry(c: &mut Criterion) {
    c.bench_function("fit and anchor on A4 (9 anchors)", |b| {
        b.iter(|| {
            for anchor in Anchor::all() {
                let size =
                    compute_fitted_scale(595.28, 841.89, 20.0, 2000.0, 1000.0, 0.8).unwrap();
                black_box(compute_anchored_rect(
                    595.28,
                    841.89,
                    20.0,
                    size.width,
                    size.height,
                    black_box(anchor),
                ));
            }
        });
    });
}

criterion_group!(benches, bench_line_clustering, bench_geometry);
criterion_main!(benches);
