//! Vertex discovery: points where vertical and horizontal edges cross
//! within tolerance.

use std::collections::BTreeMap;

use crate::types::{Edge, KeyPoint, Orientation, key_point};

/// The edges contributing to one vertex.
#[derive(Clone, Debug, Default)]
pub struct Intersection {
    pub v: Vec<Edge>,
    pub h: Vec<Edge>,
}

/// Given a list of edges, return the points at which they intersect
/// within tolerance, keyed by the `(x, y)` vertex.
///
/// A vertical/horizontal pair crosses if the vertical edge's `x0` lies
/// within the horizontal edge's x-span (widened by `x_tolerance`) AND
/// the horizontal edge's `top` lies within the vertical edge's y-span
/// (widened by `y_tolerance`). Each qualifying vertex accumulates both
/// contributing edges.
pub fn edges_to_intersections(
    edges: &[Edge],
    x_tolerance: f64,
    y_tolerance: f64,
) -> BTreeMap<KeyPoint, Intersection> {
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

    // Deterministic accumulation order.
    v_edges.sort_by(|a, b| {
        (a.x0, a.top)
            .partial_cmp(&(b.x0, b.top))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    h_edges.sort_by(|a, b| {
        (a.top, a.x0)
            .partial_cmp(&(b.top, b.x0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut intersections: BTreeMap<KeyPoint, Intersection> = BTreeMap::new();
    for v in &v_edges {
        for h in &h_edges {
            if v.top <= h.top + y_tolerance
                && v.bottom >= h.top - y_tolerance
                && v.x0 >= h.x0 - x_tolerance
                && v.x0 <= h.x1 + x_tolerance
            {
                let vertex = intersections.entry(key_point(v.x0, h.top)).or_default();
                vertex.v.push(*v);
                vertex.h.push(*h);
            }
        }
    }
    intersections
}
