//! The reconstruction pipeline: region in, tables out.

use tracing::debug;

use crate::edges::{filter_edges, merge_edges, words_to_edges_h, words_to_edges_v};
use crate::error::Result;
use crate::grid::{cells_to_tables, intersections_to_cells};
use crate::intersections::edges_to_intersections;
use crate::table::Table;
use crate::text::chars_to_words;
use crate::types::{BBox, Char, Edge, Strategy, TableSettings, Word};

/// One page region to reconstruct: its primitives plus the strategy
/// deciding where grid lines come from.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Region {
    /// Caller-supplied label, echoed in logs and errors.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub bbox: Option<BBox>,
    pub strategy: Strategy,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub words: Vec<Word>,
    #[serde(default)]
    pub chars: Vec<Char>,
}

/// Reconstructs tables from regions. Settings are validated once here,
/// so `find_tables` never re-checks them.
#[derive(Clone, Debug)]
pub struct TableFinder {
    settings: TableSettings,
}

impl TableFinder {
    pub fn new(settings: TableSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &TableSettings {
        &self.settings
    }

    /// Run the full pipeline on one region: derive edges per the
    /// strategy, normalize them, find vertices, infer cells, and group
    /// cells into [`Table`]s. Tables come back sorted topmost first.
    pub fn find_tables(&self, region: &Region) -> Result<Vec<Table>> {
        for edge in &region.edges {
            edge.validate()?;
        }
        for word in &region.words {
            word.validate()?;
        }
        for c in &region.chars {
            c.validate()?;
        }

        let s = &self.settings;
        let edges = self.strategy_edges(region);
        let edges = filter_edges(edges, s.edge_min_length);
        let edges = merge_edges(
            edges,
            s.snap_tolerance,
            s.snap_tolerance,
            s.join_tolerance,
            s.join_tolerance,
        );
        let intersections = edges_to_intersections(
            &edges,
            s.intersection_tolerance,
            s.intersection_tolerance,
        );
        let cells = intersections_to_cells(&intersections);
        let groups = cells_to_tables(cells);
        debug!(
            region = region.id.as_deref().unwrap_or("-"),
            edges = edges.len(),
            vertices = intersections.len(),
            tables = groups.len(),
            "region reconstructed"
        );

        Ok(groups
            .into_iter()
            .map(|cells| {
                let bbox = bbox_of(&cells);
                let chars = region
                    .chars
                    .iter()
                    .filter(|c| {
                        let (x, y) = c.center();
                        x >= bbox.x0 && x < bbox.x1 && y >= bbox.top && y < bbox.bottom
                    })
                    .cloned()
                    .collect();
                Table::new(cells, chars, s.line_tolerance)
            })
            .collect())
    }

    fn strategy_edges(&self, region: &Region) -> Vec<Edge> {
        match region.strategy {
            Strategy::Lines => region.edges.clone(),
            Strategy::Text => {
                // Words can be synthesized from characters when the
                // caller only has the finer-grained primitives.
                let synthesized;
                let words: &[Word] = if region.words.is_empty() && !region.chars.is_empty() {
                    synthesized = chars_to_words(&region.chars);
                    &synthesized
                } else {
                    &region.words
                };
                let mut edges = words_to_edges_v(words, self.settings.min_words_vertical);
                edges.extend(words_to_edges_h(words, self.settings.min_words_horizontal));
                edges
            }
        }
    }
}

fn bbox_of(cells: &[BBox]) -> BBox {
    let mut x0 = f64::INFINITY;
    let mut top = f64::INFINITY;
    let mut x1 = f64::NEG_INFINITY;
    let mut bottom = f64::NEG_INFINITY;
    for c in cells {
        x0 = x0.min(c.x0);
        top = top.min(c.top);
        x1 = x1.max(c.x1);
        bottom = bottom.max(c.bottom);
    }
    BBox {
        x0,
        top,
        x1,
        bottom,
    }
}
