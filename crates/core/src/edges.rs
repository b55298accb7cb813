//! Edge normalization: filtering, snapping, and joining of oriented
//! segments, plus virtual edges inferred from word alignment.

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;

use crate::clustering::{bbox_from_words, bbox_overlap, cluster_objects, merge_bboxes};
use crate::types::{BBox, Edge, Orientation, SourceKind, Word};

// Word-alignment clusters use a fixed 1pt tolerance, as in pdfplumber.
const WORD_ALIGN_TOLERANCE: f64 = 1.0;

/// Drop edges shorter than `min_length` along their own axis.
pub fn filter_edges(edges: Vec<Edge>, min_length: f64) -> Vec<Edge> {
    edges
        .into_iter()
        .filter(|e| e.length() >= min_length)
        .collect()
}

/// Translate an edge perpendicular to its own axis.
fn move_edge(edge: &Edge, axis: Orientation, value: f64) -> Edge {
    match axis {
        Orientation::Horizontal => Edge {
            x0: edge.x0 + value,
            x1: edge.x1 + value,
            ..*edge
        },
        Orientation::Vertical => Edge {
            top: edge.top + value,
            bottom: edge.bottom + value,
            ..*edge
        },
    }
}

/// Relocate near-duplicate edges to their cluster mean, preserving each
/// edge's length. Vertical edges snap on x, horizontal edges on y.
pub fn snap_edges(edges: &[Edge], x_tolerance: f64, y_tolerance: f64) -> Vec<Edge> {
    let mut v_edges: Vec<Edge> = edges
        .iter()
        .filter(|e| e.orientation == Orientation::Vertical)
        .copied()
        .collect();
    let mut h_edges: Vec<Edge> = edges
        .iter()
        .filter(|e| e.orientation == Orientation::Horizontal)
        .copied()
        .collect();

    if x_tolerance > 0.0 {
        let clusters = cluster_objects(&v_edges, |e| e.x0, x_tolerance);
        let mut snapped: Vec<Edge> = Vec::new();
        for cluster in clusters {
            let avg = cluster.iter().map(|e| e.x0).sum::<f64>() / (cluster.len() as f64);
            for e in cluster {
                snapped.push(move_edge(&e, Orientation::Horizontal, avg - e.x0));
            }
        }
        v_edges = snapped;
    }

    if y_tolerance > 0.0 {
        let clusters = cluster_objects(&h_edges, |e| e.top, y_tolerance);
        let mut snapped: Vec<Edge> = Vec::new();
        for cluster in clusters {
            let avg = cluster.iter().map(|e| e.top).sum::<f64>() / (cluster.len() as f64);
            for e in cluster {
                snapped.push(move_edge(&e, Orientation::Vertical, avg - e.top));
            }
        }
        h_edges = snapped;
    }

    v_edges.into_iter().chain(h_edges).collect()
}

/// Merge collinear edges in a single left-to-right (or top-to-bottom)
/// sweep. A later edge can only extend the current open edge; it never
/// retroactively merges into an earlier closed one.
pub fn join_edge_group(edges: &[Edge], orientation: Orientation, tolerance: f64) -> Vec<Edge> {
    let start = |e: &Edge| match orientation {
        Orientation::Horizontal => e.x0,
        Orientation::Vertical => e.top,
    };
    let end = |e: &Edge| match orientation {
        Orientation::Horizontal => e.x1,
        Orientation::Vertical => e.bottom,
    };

    let mut sorted = edges.to_vec();
    sorted.sort_by(|a, b| {
        start(a)
            .partial_cmp(&start(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut joined: Vec<Edge> = Vec::new();
    let Some(first) = sorted.first() else {
        return joined;
    };
    joined.push(*first);
    for e in sorted.into_iter().skip(1) {
        let last = joined.last_mut().unwrap();
        if start(&e) <= end(last) + tolerance {
            if end(&e) > end(last) {
                match orientation {
                    Orientation::Horizontal => last.x1 = e.x1,
                    Orientation::Vertical => last.bottom = e.bottom,
                }
            }
        } else {
            joined.push(e);
        }
    }
    joined
}

/// Snap then join: produce a minimal edge set with no overlapping or
/// near-duplicate collinear segments.
pub fn merge_edges(
    edges: Vec<Edge>,
    snap_x_tolerance: f64,
    snap_y_tolerance: f64,
    join_x_tolerance: f64,
    join_y_tolerance: f64,
) -> Vec<Edge> {
    let edges = if snap_x_tolerance > 0.0 || snap_y_tolerance > 0.0 {
        snap_edges(&edges, snap_x_tolerance, snap_y_tolerance)
    } else {
        edges
    };

    // Group edges lying on the same infinite line.
    let mut grouped: BTreeMap<(Orientation, OrderedFloat<f64>), Vec<Edge>> = BTreeMap::new();
    for e in edges {
        let key_val = match e.orientation {
            Orientation::Horizontal => e.top,
            Orientation::Vertical => e.x0,
        };
        grouped
            .entry((e.orientation, OrderedFloat(key_val)))
            .or_default()
            .push(e);
    }

    let mut merged: Vec<Edge> = Vec::new();
    for ((orientation, _), group) in grouped {
        let tol = match orientation {
            Orientation::Horizontal => join_x_tolerance,
            Orientation::Vertical => join_y_tolerance,
        };
        merged.extend(join_edge_group(&group, orientation, tol));
    }
    merged
}

/// Virtual horizontal edges connecting the tops of at least
/// `word_threshold` words, each spanning the global extent of all
/// surviving clusters.
pub fn words_to_edges_h(words: &[Word], word_threshold: usize) -> Vec<Edge> {
    let clusters = cluster_objects(words, |w| w.top, WORD_ALIGN_TOLERANCE);
    let rects: Vec<BBox> = clusters
        .into_iter()
        .filter(|c| c.len() >= word_threshold)
        .map(|c| bbox_from_words(&c))
        .collect();
    if rects.is_empty() {
        return Vec::new();
    }
    let min_x0 = rects.iter().map(|r| r.x0).fold(f64::INFINITY, f64::min);
    let max_x1 = rects.iter().map(|r| r.x1).fold(f64::NEG_INFINITY, f64::max);

    rects
        .into_iter()
        .map(|r| Edge::horizontal(r.top, min_x0, max_x1, SourceKind::Word))
        .collect()
}

/// Virtual vertical edges connecting the left, right, or center of at
/// least `word_threshold` words. Candidate cluster boxes that overlap
/// are merged to a fixed point before edges are emitted; each surviving
/// box contributes an edge at its left and right x.
pub fn words_to_edges_v(words: &[Word], word_threshold: usize) -> Vec<Edge> {
    let by_x0 = cluster_objects(words, |w| w.x0, WORD_ALIGN_TOLERANCE);
    let by_x1 = cluster_objects(words, |w| w.x1, WORD_ALIGN_TOLERANCE);
    let by_center = cluster_objects(words, |w| w.center_x(), WORD_ALIGN_TOLERANCE);

    let mut clusters = Vec::new();
    clusters.extend(by_x0);
    clusters.extend(by_x1);
    clusters.extend(by_center);
    clusters.sort_by(|a, b| b.len().cmp(&a.len()));

    let bboxes: Vec<BBox> = clusters
        .into_iter()
        .filter(|c| c.len() >= word_threshold)
        .map(|c| bbox_from_words(&c))
        .collect();

    let condensed = condense_bboxes(bboxes);
    if condensed.is_empty() {
        return Vec::new();
    }

    let mut sorted = condensed;
    sorted.sort_by(|a, b| a.x0.partial_cmp(&b.x0).unwrap_or(std::cmp::Ordering::Equal));

    let min_top = sorted.iter().map(|r| r.top).fold(f64::INFINITY, f64::min);
    let max_bottom = sorted
        .iter()
        .map(|r| r.bottom)
        .fold(f64::NEG_INFINITY, f64::max);

    let mut edges = Vec::with_capacity(sorted.len() * 2);
    for r in sorted {
        edges.push(Edge::vertical(r.x0, min_top, max_bottom, SourceKind::Word));
        edges.push(Edge::vertical(r.x1, min_top, max_bottom, SourceKind::Word));
    }
    edges
}

/// Merge overlapping boxes until no two remaining boxes overlap. The
/// result is a fixed point independent of input order.
fn condense_bboxes(bboxes: Vec<BBox>) -> Vec<BBox> {
    let mut boxes = bboxes;
    loop {
        let mut merged_any = false;
        let mut out: Vec<BBox> = Vec::new();
        'next: for bbox in boxes {
            for existing in out.iter_mut() {
                if bbox_overlap(bbox, *existing).is_some() {
                    *existing = merge_bboxes(bbox, *existing);
                    merged_any = true;
                    continue 'next;
                }
            }
            out.push(bbox);
        }
        boxes = out;
        if !merged_any {
            return boxes;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(y: f64, x0: f64, x1: f64) -> Edge {
        Edge::horizontal(y, x0, x1, SourceKind::Line)
    }

    fn v(x: f64, top: f64, bottom: f64) -> Edge {
        Edge::vertical(x, top, bottom, SourceKind::Line)
    }

    fn word(x0: f64, top: f64, x1: f64, bottom: f64) -> Word {
        Word {
            x0,
            top,
            x1,
            bottom,
            text: "w".to_string(),
        }
    }

    #[test]
    fn filter_edges_checks_own_axis() {
        let edges = vec![h(0.0, 0.0, 2.0), h(0.0, 0.0, 10.0), v(0.0, 0.0, 1.0)];
        let kept = filter_edges(edges, 3.0);
        assert_eq!(kept, vec![h(0.0, 0.0, 10.0)]);
    }

    #[test]
    fn snap_moves_cluster_to_mean() {
        let edges = vec![v(10.0, 0.0, 50.0), v(12.0, 0.0, 50.0)];
        let snapped = snap_edges(&edges, 3.0, 3.0);
        assert_eq!(snapped.len(), 2);
        for e in snapped {
            assert_eq!(e.x0, 11.0);
            assert_eq!(e.x1, 11.0);
            // Length preserved.
            assert_eq!(e.length(), 50.0);
        }
    }

    #[test]
    fn snap_is_idempotent() {
        let edges = vec![v(10.0, 0.0, 50.0), v(12.0, 0.0, 50.0), h(5.0, 0.0, 40.0)];
        let once = snap_edges(&edges, 3.0, 3.0);
        let twice = snap_edges(&once, 3.0, 3.0);
        assert_eq!(once, twice);
    }

    #[test]
    fn join_merges_within_tolerance() {
        let edges = vec![h(0.0, 0.0, 10.0), h(0.0, 10.5, 20.0)];
        let joined = join_edge_group(&edges, Orientation::Horizontal, 1.0);
        assert_eq!(joined, vec![h(0.0, 0.0, 20.0)]);
    }

    #[test]
    fn join_is_a_single_sweep() {
        // The middle edge closes before the long first edge would have
        // reached the third; the sweep never reopens a closed edge.
        let edges = vec![h(0.0, 0.0, 10.0), h(0.0, 20.0, 30.0), h(0.0, 31.0, 40.0)];
        let joined = join_edge_group(&edges, Orientation::Horizontal, 1.0);
        assert_eq!(joined, vec![h(0.0, 0.0, 10.0), h(0.0, 20.0, 40.0)]);
    }

    #[test]
    fn join_does_not_shrink_contained_edge() {
        let edges = vec![h(0.0, 0.0, 30.0), h(0.0, 5.0, 10.0)];
        let joined = join_edge_group(&edges, Orientation::Horizontal, 1.0);
        assert_eq!(joined, vec![h(0.0, 0.0, 30.0)]);
    }

    #[test]
    fn merge_edges_groups_by_line() {
        let edges = vec![
            h(0.0, 0.0, 10.0),
            h(0.0, 10.5, 20.0),
            h(50.0, 0.0, 20.0),
            v(0.0, 0.0, 25.0),
            v(0.0, 25.5, 50.0),
        ];
        let merged = merge_edges(edges, 0.0, 0.0, 1.0, 1.0);
        assert_eq!(
            merged,
            vec![h(0.0, 0.0, 20.0), h(50.0, 0.0, 20.0), v(0.0, 0.0, 50.0)]
        );
    }

    #[test]
    fn words_to_edges_h_spans_global_extent() {
        let words = vec![
            word(0.0, 0.0, 10.0, 5.0),
            word(50.0, 0.2, 80.0, 5.0),
            word(0.0, 20.0, 30.0, 25.0),
        ];
        let edges = words_to_edges_h(&words, 1);
        assert_eq!(edges.len(), 2);
        for e in &edges {
            assert_eq!(e.orientation, Orientation::Horizontal);
            assert_eq!(e.source_kind, SourceKind::Word);
            assert_eq!(e.x0, 0.0);
            assert_eq!(e.x1, 80.0);
        }
        assert_eq!(edges[0].top, 0.0);
        assert_eq!(edges[1].top, 20.0);
    }

    #[test]
    fn words_to_edges_h_respects_threshold() {
        let words = vec![word(0.0, 0.0, 10.0, 5.0), word(0.0, 20.0, 30.0, 25.0)];
        assert!(words_to_edges_h(&words, 2).is_empty());
    }

    #[test]
    fn words_to_edges_v_emits_left_and_right() {
        // Three rows left-aligned at x=0, widths varying.
        let words = vec![
            word(0.0, 0.0, 10.0, 5.0),
            word(0.0, 10.0, 12.0, 15.0),
            word(0.0, 20.0, 11.0, 25.0),
        ];
        let edges = words_to_edges_v(&words, 3);
        // One condensed box -> two vertical edges.
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].x0, 0.0);
        assert_eq!(edges[1].x0, 12.0);
        for e in &edges {
            assert_eq!(e.top, 0.0);
            assert_eq!(e.bottom, 25.0);
        }
    }

    #[test]
    fn condense_reaches_fixed_point() {
        // a overlaps b, b overlaps c, but a does not overlap c directly;
        // the fixed point still merges all three.
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(8.0, 0.0, 18.0, 10.0);
        let c = BBox::new(16.0, 0.0, 26.0, 10.0);
        let out = condense_bboxes(vec![a, c, b]);
        assert_eq!(out, vec![BBox::new(0.0, 0.0, 26.0, 10.0)]);
    }
}
