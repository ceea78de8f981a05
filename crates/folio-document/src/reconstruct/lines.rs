// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Line clustering — group positioned runs into text lines, top of page first.

use std::collections::BTreeMap;

use folio_core::config::LineClustering;

use crate::extract::GlyphRun;

/// Runs sharing a baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    /// Baseline rounded to the nearest point (half away from zero).
    pub y_key: i64,
    /// Runs in extraction order.
    pub runs: Vec<GlyphRun>,
}

impl TextLine {
    /// Run texts joined by single spaces.
    pub fn text(&self) -> String {
        self.runs
            .iter()
            .map(|run| run.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub fn y_key(y: f64) -> i64 {
    y.round() as i64
}

/// Group `runs` into lines ordered by descending baseline.
pub fn cluster_lines(runs: &[GlyphRun], mode: LineClustering) -> Vec<TextLine> {
    match mode {
        LineClustering::Exact => cluster_exact(runs),
        LineClustering::Tolerance { band_pt } => cluster_tolerance(runs, band_pt),
    }
}

fn cluster_exact(runs: &[GlyphRun]) -> Vec<TextLine> {
    let mut by_key: BTreeMap<i64, Vec<GlyphRun>> = BTreeMap::new();
    for run in runs {
        by_key.entry(y_key(run.y)).or_default().push(run.clone());
    }
    by_key
        .into_iter()
        .rev()
        .map(|(y_key, runs)| TextLine { y_key, runs })
        .collect()
}

/// Each line starts at the highest unassigned run and absorbs every run
/// whose baseline is within `band_pt` below it.
fn cluster_tolerance(runs: &[GlyphRun], band_pt: f64) -> Vec<TextLine> {
    let mut order: Vec<usize> = (0..runs.len()).collect();
    order.sort_by(|&a, &b| runs[b].y.total_cmp(&runs[a].y));

    let mut lines = Vec::new();
    let mut start = 0;
    while start < order.len() {
        let top = runs[order[start]].y;
        let mut end = start + 1;
        while end < order.len() && top - runs[order[end]].y <= band_pt {
            end += 1;
        }

        let mut members = order[start..end].to_vec();
        members.sort_unstable();
        lines.push(TextLine {
            y_key: y_key(top),
            runs: members.into_iter().map(|index| runs[index].clone()).collect(),
        });
        start = end;
    }
    lines
}
