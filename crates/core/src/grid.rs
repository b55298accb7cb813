//! Cell inference from vertex intersections and grouping of cells into
//! contiguous tables.

use std::collections::{BTreeMap, HashSet};

use crate::intersections::Intersection;
use crate::types::{BBox, KeyPoint};

/// Given the vertex intersection map, return all minimal rectangular
/// cells those vertices describe, in vertex scan order.
///
/// For each vertex, candidate opposite corners below-and-right are
/// tried in ascending rectangle area, so the minimal enclosing cell is
/// found first. All four sides must be backed by an edge whose own span
/// covers the full corner-to-corner distance.
pub fn intersections_to_cells(intersections: &BTreeMap<KeyPoint, Intersection>) -> Vec<BBox> {
    let points: Vec<KeyPoint> = intersections.keys().copied().collect();
    let mut cells = Vec::new();
    for origin in &points {
        if let Some(cell) = find_smallest_cell(intersections, &points, *origin) {
            cells.push(cell);
        }
    }
    cells
}

/// True if some edge contributing to either vertex spans the whole
/// distance between the two (axis-aligned) corners. Touching an edge at
/// one endpoint is not enough.
fn edge_connects(
    intersections: &BTreeMap<KeyPoint, Intersection>,
    p1: KeyPoint,
    p2: KeyPoint,
) -> bool {
    if p1 == p2 {
        return false;
    }
    let contributors = |p: KeyPoint| intersections.get(&p);

    if p1.1 == p2.1 {
        // Horizontal connection along y = p1.1.
        let y = p1.1.into_inner();
        let (x_min, x_max) = if p1.0 <= p2.0 { (p1.0, p2.0) } else { (p2.0, p1.0) };
        for point in [p1, p2] {
            let Some(inter) = contributors(point) else {
                continue;
            };
            for h in &inter.h {
                if h.top == y && h.x0 <= x_min.into_inner() && h.x1 >= x_max.into_inner() {
                    return true;
                }
            }
        }
    }

    if p1.0 == p2.0 {
        // Vertical connection along x = p1.0.
        let x = p1.0.into_inner();
        let (y_min, y_max) = if p1.1 <= p2.1 { (p1.1, p2.1) } else { (p2.1, p1.1) };
        for point in [p1, p2] {
            let Some(inter) = contributors(point) else {
                continue;
            };
            for v in &inter.v {
                if v.x0 == x && v.top <= y_min.into_inner() && v.bottom >= y_max.into_inner() {
                    return true;
                }
            }
        }
    }

    false
}

fn find_smallest_cell(
    intersections: &BTreeMap<KeyPoint, Intersection>,
    points: &[KeyPoint],
    origin: KeyPoint,
) -> Option<BBox> {
    // Candidate opposite corners: strictly below and right of origin,
    // nearest (by area) first. Ties break on (x, y) for determinism.
    let mut candidates: Vec<KeyPoint> = points
        .iter()
        .filter(|p| p.0 > origin.0 && p.1 > origin.1)
        .copied()
        .collect();
    candidates.sort_by(|a, b| {
        let area_a = (a.0.into_inner() - origin.0.into_inner())
            * (a.1.into_inner() - origin.1.into_inner());
        let area_b = (b.0.into_inner() - origin.0.into_inner())
            * (b.1.into_inner() - origin.1.into_inner());
        area_a
            .partial_cmp(&area_b)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(b))
    });

    for candidate in candidates {
        let top_right = (candidate.0, origin.1);
        let bottom_left = (origin.0, candidate.1);
        if intersections.contains_key(&top_right)
            && intersections.contains_key(&bottom_left)
            && edge_connects(intersections, origin, top_right)
            && edge_connects(intersections, top_right, candidate)
            && edge_connects(intersections, candidate, bottom_left)
            && edge_connects(intersections, bottom_left, origin)
        {
            return Some(BBox::new(
                origin.0.into_inner(),
                origin.1.into_inner(),
                candidate.0.into_inner(),
                candidate.1.into_inner(),
            ));
        }
    }
    None
}

/// Group cells into maximal contiguous tables via shared-corner
/// adjacency, then discard degenerate groups.
///
/// The grouping is a greedy scan: the current group's corner set grows
/// by moving in any remaining cell sharing a corner with it; when no
/// match remains the group closes and the next remaining cell seeds a
/// new one. Output therefore depends on the input cell order, which is
/// the deterministic scan order of [`intersections_to_cells`].
///
/// A group survives only with at least 2 cells spanning at least 2
/// distinct left-edge x-coordinates. Surviving groups are sorted by
/// their topmost-then-leftmost cell coordinate.
pub fn cells_to_tables(cells: Vec<BBox>) -> Vec<Vec<BBox>> {
    let mut remaining: Vec<BBox> = cells;
    let mut groups: Vec<Vec<BBox>> = Vec::new();

    let mut current_cells: Vec<BBox> = Vec::new();
    let mut current_corners: HashSet<KeyPoint> = HashSet::new();

    while !remaining.is_empty() {
        if current_cells.is_empty() {
            let seed = remaining.remove(0);
            current_corners.extend(seed.corners());
            current_cells.push(seed);
        } else {
            let found = remaining.iter().position(|cell| {
                cell.corners()
                    .iter()
                    .any(|corner| current_corners.contains(corner))
            });
            match found {
                Some(i) => {
                    let cell = remaining.remove(i);
                    current_corners.extend(cell.corners());
                    current_cells.push(cell);
                }
                None => {
                    groups.push(std::mem::take(&mut current_cells));
                    current_corners.clear();
                }
            }
        }
    }
    if !current_cells.is_empty() {
        groups.push(current_cells);
    }

    groups.retain(|group| {
        if group.len() < 2 {
            return false;
        }
        let x_coords: HashSet<_> = group.iter().map(|c| crate::types::key_f64(c.x0)).collect();
        x_coords.len() >= 2
    });

    groups.sort_by(|a, b| {
        let min_key = |cells: &[BBox]| {
            cells
                .iter()
                .map(|c| (crate::types::key_f64(c.top), crate::types::key_f64(c.x0)))
                .min()
                .unwrap()
        };
        min_key(a).cmp(&min_key(b))
    });
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intersections::edges_to_intersections;
    use crate::types::{Edge, SourceKind};

    fn h(y: f64, x0: f64, x1: f64) -> Edge {
        Edge::horizontal(y, x0, x1, SourceKind::Line)
    }

    fn v(x: f64, top: f64, bottom: f64) -> Edge {
        Edge::vertical(x, top, bottom, SourceKind::Line)
    }

    // Full-span grid rails.
    fn grid_edges(xs: &[f64], ys: &[f64]) -> Vec<Edge> {
        let (&y0, &y1) = (ys.first().unwrap(), ys.last().unwrap());
        let (&x0, &x1) = (xs.first().unwrap(), xs.last().unwrap());
        let mut edges = Vec::new();
        for &x in xs {
            edges.push(v(x, y0, y1));
        }
        for &y in ys {
            edges.push(h(y, x0, x1));
        }
        edges
    }

    #[test]
    fn minimal_cells_from_full_grid() {
        let edges = grid_edges(&[0.0, 50.0, 100.0], &[0.0, 30.0, 60.0]);
        let inter = edges_to_intersections(&edges, 0.0, 0.0);
        assert_eq!(inter.len(), 9);
        let cells = intersections_to_cells(&inter);
        // 2x2 grid: four minimal cells, never one 100x60 cell.
        assert_eq!(cells.len(), 4);
        for cell in &cells {
            assert_eq!(cell.width(), 50.0);
            assert_eq!(cell.height(), 30.0);
        }
    }

    #[test]
    fn side_not_spanned_by_one_edge_is_not_connected() {
        // Left side split into two edges with a gap; no single edge
        // spans the full side, so no cell forms.
        let edges = vec![
            v(0.0, 0.0, 4.0),
            v(0.0, 6.0, 10.0),
            v(10.0, 0.0, 10.0),
            h(0.0, 0.0, 10.0),
            h(10.0, 0.0, 10.0),
        ];
        let inter = edges_to_intersections(&edges, 0.0, 0.0);
        let cells = intersections_to_cells(&inter);
        assert!(cells.is_empty());
    }

    #[test]
    fn partial_inner_edge_does_not_split_cell() {
        // A short horizontal stub at y=5 crosses only the left rail;
        // the lone vertex it adds cannot complete a rectangle, so the
        // only cell is the full one.
        let edges = vec![
            v(0.0, 0.0, 10.0),
            v(10.0, 0.0, 10.0),
            h(0.0, 0.0, 10.0),
            h(5.0, 0.0, 4.0),
            h(10.0, 0.0, 10.0),
        ];
        let inter = edges_to_intersections(&edges, 0.0, 0.0);
        let cells = intersections_to_cells(&inter);
        assert_eq!(cells, vec![BBox::new(0.0, 0.0, 10.0, 10.0)]);
    }

    #[test]
    fn two_separate_groups() {
        let mut edges = grid_edges(&[0.0, 10.0, 20.0], &[0.0, 10.0, 20.0]);
        edges.extend(grid_edges(&[100.0, 110.0, 120.0], &[100.0, 110.0, 120.0]));
        let inter = edges_to_intersections(&edges, 0.0, 0.0);
        let cells = intersections_to_cells(&inter);
        let tables = cells_to_tables(cells);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].len(), 4);
        assert_eq!(tables[1].len(), 4);
        // Sorted by topmost-then-leftmost coordinate.
        assert!(tables[0][0].top < tables[1][0].top);
    }

    #[test]
    fn single_column_group_is_rejected() {
        // Two stacked cells share corners but have one distinct x0.
        let cells = vec![
            BBox::new(0.0, 0.0, 50.0, 30.0),
            BBox::new(0.0, 30.0, 50.0, 60.0),
        ];
        assert!(cells_to_tables(cells).is_empty());
    }

    #[test]
    fn single_cell_group_is_rejected() {
        let cells = vec![BBox::new(0.0, 0.0, 50.0, 30.0)];
        assert!(cells_to_tables(cells).is_empty());
    }

    #[test]
    fn corner_sharing_chains_into_one_table() {
        let cells = vec![
            BBox::new(0.0, 0.0, 50.0, 30.0),
            BBox::new(50.0, 0.0, 100.0, 30.0),
            BBox::new(0.0, 30.0, 50.0, 60.0),
            BBox::new(50.0, 30.0, 100.0, 60.0),
        ];
        let tables = cells_to_tables(cells);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].len(), 4);
    }
}
