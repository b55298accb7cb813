//! Structured table model: row decomposition, header inference, cell
//! text extraction, Markdown and tabular export.

use std::collections::HashSet;

use indexmap::IndexMap;
use once_cell::sync::OnceCell;

use crate::clustering::{bbox_from_cells, cluster_objects};
use crate::text::assemble_text;
use crate::types::{BBox, Char, KeyF64, key_f64};

// Cells whose tops differ by no more than this share a row.
const ROW_TOLERANCE: f64 = 3.0;

/// One table row: a cell slot per column, `None` marking merged-cell
/// gaps, sorted left to right.
#[derive(Clone, Debug, PartialEq)]
pub struct TableRow {
    pub cells: Vec<Option<BBox>>,
}

impl TableRow {
    /// Bounding box over the populated slots.
    pub fn bbox(&self) -> BBox {
        bbox_over(self.cells.iter().flatten())
    }
}

/// Header information for a table. `external` marks headers supplied by
/// the caller rather than derived from row 0.
#[derive(Clone, Debug, PartialEq)]
pub struct TableHeader {
    pub bbox: BBox,
    pub cells: Vec<Option<BBox>>,
    pub names: Vec<String>,
    pub external: bool,
}

fn bbox_over<'a, I: IntoIterator<Item = &'a BBox>>(cells: I) -> BBox {
    let mut iter = cells.into_iter().peekable();
    if iter.peek().is_none() {
        return BBox::new(0.0, 0.0, 0.0, 0.0);
    }
    bbox_from_cells(iter)
}

/// A reconstructed table: an unordered cell set plus the characters of
/// its region. Rows, extracted content, and the header are computed on
/// first access and cached; the caches are thread-safe.
#[derive(Debug)]
pub struct Table {
    cells: Vec<BBox>,
    chars: Vec<Char>,
    line_tolerance: f64,
    rows: OnceCell<Vec<TableRow>>,
    content: OnceCell<Vec<Vec<String>>>,
    header: OnceCell<TableHeader>,
}

impl Table {
    pub fn new(cells: Vec<BBox>, chars: Vec<Char>, line_tolerance: f64) -> Self {
        Self {
            cells,
            chars,
            line_tolerance,
            rows: OnceCell::new(),
            content: OnceCell::new(),
            header: OnceCell::new(),
        }
    }

    /// Attach a caller-supplied header (e.g. one repeated from a
    /// previous page). Row 0 is then treated as data.
    pub fn with_header(self, header: TableHeader) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(TableHeader {
            external: true,
            ..header
        });
        Self {
            header: cell,
            ..self
        }
    }

    /// The cells in their generation scan order.
    pub fn cells(&self) -> &[BBox] {
        &self.cells
    }

    /// Bounding rectangle of all cells.
    pub fn bbox(&self) -> BBox {
        bbox_over(self.cells.iter())
    }

    /// Cells grouped into rows by top coordinate and padded with `None`
    /// to a uniform column count.
    pub fn rows(&self) -> &[TableRow] {
        self.rows.get_or_init(|| self.compute_rows())
    }

    pub fn row_count(&self) -> usize {
        self.rows().len()
    }

    pub fn col_count(&self) -> usize {
        self.rows().first().map_or(0, |r| r.cells.len())
    }

    pub fn header(&self) -> &TableHeader {
        self.header.get_or_init(|| self.detect_header())
    }

    fn compute_rows(&self) -> Vec<TableRow> {
        if self.cells.is_empty() {
            return Vec::new();
        }

        // Column slots come from the distinct left edges across the
        // whole table; a row missing a column carries None there, so
        // data never shifts sideways.
        let mut x_coords: Vec<KeyF64> = self.cells.iter().map(|c| key_f64(c.x0)).collect();
        x_coords.sort();
        x_coords.dedup();

        let clusters = cluster_objects(&self.cells, |c| c.top, ROW_TOLERANCE);
        clusters
            .into_iter()
            .map(|mut row_cells| {
                row_cells.sort_by(|a, b| {
                    a.x0.partial_cmp(&b.x0).unwrap_or(std::cmp::Ordering::Equal)
                });
                let cells = x_coords
                    .iter()
                    .map(|x| row_cells.iter().find(|c| key_f64(c.x0) == *x).copied())
                    .collect();
                TableRow { cells }
            })
            .collect()
    }

    /// Extract per-cell text. A character belongs to the cell whose
    /// half-open rectangle `[x0, x1) x [top, bottom)` contains its
    /// center point, so a character on a shared boundary lands in
    /// exactly one cell. Empty slots yield empty strings.
    pub fn extract(&self) -> &[Vec<String>] {
        self.content.get_or_init(|| self.compute_content())
    }

    fn compute_content(&self) -> Vec<Vec<String>> {
        self.rows()
            .iter()
            .map(|row| {
                row.cells
                    .iter()
                    .map(|slot| match slot {
                        Some(cell) => {
                            let chars: Vec<&Char> = self
                                .chars
                                .iter()
                                .filter(|c| char_in_bbox(c, cell))
                                .collect();
                            assemble_text(&chars, self.line_tolerance)
                        }
                        None => String::new(),
                    })
                    .collect()
            })
            .collect()
    }

    fn detect_header(&self) -> TableHeader {
        let rows = self.rows();
        let Some(first_row) = rows.first() else {
            return TableHeader {
                bbox: BBox::new(0.0, 0.0, 0.0, 0.0),
                cells: Vec::new(),
                names: Vec::new(),
                external: false,
            };
        };

        let first_texts = self.extract().first().cloned().unwrap_or_default();
        let names = (0..self.col_count())
            .map(|i| {
                let text = first_texts.get(i).map(|t| t.trim()).unwrap_or("");
                if text.is_empty() {
                    format!("Col{}", i + 1)
                } else {
                    text.to_string()
                }
            })
            .collect();

        TableHeader {
            bbox: first_row.bbox(),
            cells: first_row.cells.clone(),
            names,
            external: false,
        }
    }

    /// Column names with `_1`, `_2`, ... suffixes appended to
    /// duplicates. Export-only; `header().names` keeps the raw values.
    pub fn unique_column_names(&self) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        self.header()
            .names
            .iter()
            .map(|name| {
                let mut candidate = name.clone();
                let mut counter = 1usize;
                while seen.contains(&candidate) {
                    candidate = format!("{name}_{counter}");
                    counter += 1;
                }
                seen.insert(candidate.clone());
                candidate
            })
            .collect()
    }

    /// Render the table as a Markdown pipe table: one header row, a
    /// `---` separator per column, then the data rows. Row 0 is skipped
    /// only when the header was derived internally from it.
    ///
    /// `clean` additionally HTML-escapes cell text; `fill_empty`
    /// propagates neighbor values into blank cells first.
    pub fn to_markdown(&self, clean: bool, fill_empty: bool) -> String {
        let content = self.extract();
        if content.is_empty() {
            return String::new();
        }
        let data: Vec<Vec<String>> = if fill_empty {
            fill_empty_cells(content.to_vec())
        } else {
            content.to_vec()
        };

        let header = self.header();
        let col_count = self.col_count();

        let mut out = String::from("|");
        for i in 0..col_count {
            let raw = header.names.get(i).map(String::as_str).unwrap_or("");
            let name = if raw.trim().is_empty() {
                format!("Col{}", i + 1)
            } else {
                raw.to_string()
            };
            out.push_str(&sanitize_cell(&name, clean));
            out.push('|');
        }
        out.push('\n');

        out.push('|');
        for _ in 0..col_count {
            out.push_str("---|");
        }
        out.push('\n');

        let start_row = if header.external { 0 } else { 1 };
        for row in data.iter().skip(start_row) {
            out.push('|');
            for cell in row.iter().take(col_count) {
                out.push_str(&sanitize_cell(cell, clean));
                out.push('|');
            }
            out.push('\n');
        }
        out
    }

    /// Export data rows as records keyed by deduplicated column name.
    pub fn to_records(&self) -> Vec<IndexMap<String, String>> {
        let columns = self.unique_column_names();
        let start_row = if self.header().external { 0 } else { 1 };
        self.extract()
            .iter()
            .skip(start_row)
            .map(|row| {
                columns
                    .iter()
                    .enumerate()
                    .map(|(i, name)| (name.clone(), row.get(i).cloned().unwrap_or_default()))
                    .collect()
            })
            .collect()
    }
}

fn char_in_bbox(c: &Char, bbox: &BBox) -> bool {
    let (h_mid, v_mid) = c.center();
    h_mid >= bbox.x0 && h_mid < bbox.x1 && v_mid >= bbox.top && v_mid < bbox.bottom
}

fn sanitize_cell(text: &str, clean: bool) -> String {
    let mut text = text.replace('\n', "<br>").replace('|', "\\|");
    if clean {
        text = html_escape::encode_text(&text).replace('-', "&#45;");
    }
    text
}

/// Approximate merged cells by propagating neighbor values into blank
/// cells: one left-to-right pass within every row, then one
/// top-to-bottom pass per column over the row-filled data. The vertical
/// pass always sees horizontally completed rows.
pub(crate) fn fill_empty_cells(mut data: Vec<Vec<String>>) -> Vec<Vec<String>> {
    for row in data.iter_mut() {
        for j in 1..row.len() {
            if row[j].trim().is_empty() {
                row[j] = row[j - 1].clone();
            }
        }
    }
    let col_count = data.first().map_or(0, Vec::len);
    for j in 0..col_count {
        for i in 1..data.len() {
            if data[i].len() > j && data[i][j].trim().is_empty() {
                let above = data[i - 1].get(j).cloned().unwrap_or_default();
                data[i][j] = above;
            }
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ch(text: &str, x0: f64, top: f64, x1: f64, bottom: f64) -> Char {
        Char {
            x0,
            top,
            x1,
            bottom,
            text: text.to_string(),
            style: None,
        }
    }

    // 2x2 grid of 50x30 cells at the origin.
    fn grid_cells() -> Vec<BBox> {
        vec![
            BBox::new(0.0, 0.0, 50.0, 30.0),
            BBox::new(50.0, 0.0, 100.0, 30.0),
            BBox::new(0.0, 30.0, 50.0, 60.0),
            BBox::new(50.0, 30.0, 100.0, 60.0),
        ]
    }

    fn grid_chars() -> Vec<Char> {
        vec![
            ch("a", 10.0, 10.0, 15.0, 20.0),
            ch("b", 60.0, 10.0, 65.0, 20.0),
            ch("c", 10.0, 40.0, 15.0, 50.0),
            ch("d", 60.0, 40.0, 65.0, 50.0),
        ]
    }

    #[test]
    fn rows_and_counts() {
        let table = Table::new(grid_cells(), Vec::new(), 2.0);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.col_count(), 2);
        assert_eq!(table.bbox(), BBox::new(0.0, 0.0, 100.0, 60.0));
    }

    #[test]
    fn missing_cell_becomes_none_slot() {
        let mut cells = grid_cells();
        cells.remove(2); // drop bottom-left
        let table = Table::new(cells, Vec::new(), 2.0);
        let rows = table.rows();
        assert_eq!(rows[1].cells[0], None);
        assert!(rows[1].cells[1].is_some());
        // Content keeps the column alignment.
        assert_eq!(table.extract()[1][0], "");
    }

    #[test]
    fn extract_reads_cells_in_order() {
        let table = Table::new(grid_cells(), grid_chars(), 2.0);
        assert_eq!(
            table.extract(),
            &[
                vec!["a".to_string(), "b".to_string()],
                vec!["c".to_string(), "d".to_string()],
            ]
        );
    }

    #[test]
    fn char_center_on_right_boundary_belongs_to_next_cell() {
        // Center x is exactly 50.0, the shared boundary.
        let chars = vec![ch("x", 45.0, 10.0, 55.0, 20.0)];
        let table = Table::new(grid_cells(), chars, 2.0);
        assert_eq!(table.extract()[0][0], "");
        assert_eq!(table.extract()[0][1], "x");
    }

    #[test]
    fn header_names_from_first_row_with_blanks_generated() {
        let chars = vec![ch("Name", 10.0, 10.0, 30.0, 20.0)];
        let table = Table::new(grid_cells(), chars, 2.0);
        let header = table.header();
        assert_eq!(header.names, vec!["Name".to_string(), "Col2".to_string()]);
        assert!(!header.external);
        assert_eq!(header.names.len(), table.col_count());
    }

    #[test]
    fn duplicate_names_suffixed_for_export_only() {
        let chars = vec![
            ch("X", 10.0, 10.0, 15.0, 20.0),
            ch("X", 60.0, 10.0, 65.0, 20.0),
        ];
        let table = Table::new(grid_cells(), chars, 2.0);
        assert_eq!(table.header().names, vec!["X".to_string(), "X".to_string()]);
        assert_eq!(
            table.unique_column_names(),
            vec!["X".to_string(), "X_1".to_string()]
        );
    }

    #[test]
    fn markdown_skips_first_row_for_internal_header() {
        let table = Table::new(grid_cells(), grid_chars(), 2.0);
        let md = table.to_markdown(false, false);
        assert_eq!(md, "|a|b|\n|---|---|\n|c|d|\n");
    }

    #[test]
    fn markdown_keeps_all_rows_for_external_header() {
        let header = TableHeader {
            bbox: BBox::new(0.0, 0.0, 0.0, 0.0),
            cells: Vec::new(),
            names: vec!["L".to_string(), "R".to_string()],
            external: false,
        };
        let table = Table::new(grid_cells(), grid_chars(), 2.0).with_header(header);
        assert!(table.header().external);
        let md = table.to_markdown(false, false);
        assert_eq!(md, "|L|R|\n|---|---|\n|a|b|\n|c|d|\n");
    }

    #[test]
    fn markdown_escapes_pipes_and_newlines() {
        assert_eq!(sanitize_cell("a|b\nc", false), "a\\|b<br>c");
    }

    #[test]
    fn markdown_clean_mode_escapes_html() {
        assert_eq!(sanitize_cell("<b>-</b>", true), "&lt;b&gt;&#45;&lt;/b&gt;");
    }

    #[test]
    fn fill_empty_horizontal_then_vertical() {
        let data = vec![
            vec!["A".to_string(), "".to_string(), "C".to_string()],
            vec!["".to_string(), "B2".to_string(), "".to_string()],
        ];
        let filled = fill_empty_cells(data);
        // The horizontal pass cascades within each row; the vertical
        // pass then fills row 2's head from the completed row 1.
        assert_eq!(filled[0], vec!["A", "A", "C"]);
        assert_eq!(filled[1], vec!["A", "B2", "B2"]);
    }

    #[test]
    fn to_records_uses_deduplicated_names() {
        let chars = vec![
            ch("X", 10.0, 10.0, 15.0, 20.0),
            ch("X", 60.0, 10.0, 65.0, 20.0),
            ch("1", 10.0, 40.0, 15.0, 50.0),
            ch("2", 60.0, 40.0, 65.0, 50.0),
        ];
        let table = Table::new(grid_cells(), chars, 2.0);
        let records = table.to_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("X").unwrap(), "1");
        assert_eq!(records[0].get("X_1").unwrap(), "2");
    }
}
