//! Geometric primitives and reconstruction settings.
//!
//! All coordinates live in page space: origin top-left, y increasing
//! downward. Primitives are immutable once supplied; "modify"
//! operations elsewhere in the crate are pure functions returning new
//! values.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TableError};

// Default settings, matching pdfplumber's table extraction defaults.
pub(crate) const DEFAULT_SNAP_TOLERANCE: f64 = 3.0;
pub(crate) const DEFAULT_JOIN_TOLERANCE: f64 = 3.0;
pub(crate) const DEFAULT_INTERSECTION_TOLERANCE: f64 = 3.0;
pub(crate) const DEFAULT_MIN_WORDS_VERTICAL: usize = 3;
pub(crate) const DEFAULT_MIN_WORDS_HORIZONTAL: usize = 1;
pub(crate) const DEFAULT_EDGE_MIN_LENGTH: f64 = 3.0;
pub(crate) const DEFAULT_LINE_TOLERANCE: f64 = 2.0;

/// Ordered key types for float-coordinate maps.
pub type KeyF64 = OrderedFloat<f64>;
pub type KeyPoint = (KeyF64, KeyF64);

pub(crate) fn key_f64(v: f64) -> KeyF64 {
    OrderedFloat(v)
}

pub(crate) fn key_point(x: f64, y: f64) -> KeyPoint {
    (OrderedFloat(x), OrderedFloat(y))
}

/// An `(x, y)` pair in page coordinates.
pub type Point = (f64, f64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Where an edge came from. Edges synthesized from word alignment are
/// treated uniformly with vector-graphic edges downstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Line,
    Word,
}

/// Axis-aligned rectangle: `(x0, top)` is the upper-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

impl BBox {
    pub fn new(x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self {
            x0,
            top,
            x1,
            bottom,
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn is_finite(&self) -> bool {
        self.x0.is_finite() && self.top.is_finite() && self.x1.is_finite() && self.bottom.is_finite()
    }

    pub(crate) fn corners(&self) -> [KeyPoint; 4] {
        [
            key_point(self.x0, self.top),
            key_point(self.x1, self.top),
            key_point(self.x1, self.bottom),
            key_point(self.x0, self.bottom),
        ]
    }
}

/// An oriented axis-aligned segment. For a horizontal edge
/// `top == bottom`; for a vertical edge `x0 == x1`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
    pub orientation: Orientation,
    #[serde(default = "SourceKind::line")]
    pub source_kind: SourceKind,
}

impl SourceKind {
    fn line() -> Self {
        SourceKind::Line
    }
}

impl Edge {
    pub fn horizontal(y: f64, x0: f64, x1: f64, source_kind: SourceKind) -> Self {
        Self {
            x0,
            x1,
            top: y,
            bottom: y,
            orientation: Orientation::Horizontal,
            source_kind,
        }
    }

    pub fn vertical(x: f64, top: f64, bottom: f64, source_kind: SourceKind) -> Self {
        Self {
            x0: x,
            x1: x,
            top,
            bottom,
            orientation: Orientation::Vertical,
            source_kind,
        }
    }

    /// Extent along the edge's own axis.
    pub fn length(&self) -> f64 {
        match self.orientation {
            Orientation::Horizontal => self.x1 - self.x0,
            Orientation::Vertical => self.bottom - self.top,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        for v in [self.x0, self.x1, self.top, self.bottom] {
            if !v.is_finite() {
                return Err(TableError::geometry("edge", format!("non-finite coordinate {v}")));
            }
        }
        match self.orientation {
            Orientation::Horizontal if self.top != self.bottom => {
                return Err(TableError::geometry(
                    "edge",
                    format!("horizontal edge with top {} != bottom {}", self.top, self.bottom),
                ));
            }
            Orientation::Vertical if self.x0 != self.x1 => {
                return Err(TableError::geometry(
                    "edge",
                    format!("vertical edge with x0 {} != x1 {}", self.x0, self.x1),
                ));
            }
            _ => {}
        }
        if self.length() <= 0.0 {
            return Err(TableError::geometry(
                "edge",
                format!("zero-length edge at ({}, {})", self.x0, self.top),
            ));
        }
        Ok(())
    }
}

/// A word produced externally by grouping adjacent characters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
    pub text: String,
}

impl Word {
    pub fn bbox(&self) -> BBox {
        BBox::new(self.x0, self.top, self.x1, self.bottom)
    }

    pub fn center_x(&self) -> f64 {
        (self.x0 + self.x1) / 2.0
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_rect("word", self.x0, self.top, self.x1, self.bottom)
    }
}

/// The finest-grained text unit. Cell membership is decided by the
/// character's center point, never its bounding box.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Char {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
    pub text: String,
    #[serde(default)]
    pub style: Option<String>,
}

impl Char {
    pub fn center(&self) -> Point {
        ((self.x0 + self.x1) / 2.0, (self.top + self.bottom) / 2.0)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_rect("character", self.x0, self.top, self.x1, self.bottom)
    }
}

fn validate_rect(kind: &'static str, x0: f64, top: f64, x1: f64, bottom: f64) -> Result<()> {
    for v in [x0, top, x1, bottom] {
        if !v.is_finite() {
            return Err(TableError::geometry(kind, format!("non-finite coordinate {v}")));
        }
    }
    if x0 > x1 || top > bottom {
        return Err(TableError::geometry(
            kind,
            format!("degenerate rectangle ({x0}, {top}, {x1}, {bottom})"),
        ));
    }
    Ok(())
}

/// How grid lines are derived for a region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Explicit vector-graphic lines.
    Lines,
    /// Virtual lines inferred from word alignment.
    Text,
}

impl Strategy {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "lines" => Ok(Strategy::Lines),
            "text" => Ok(Strategy::Text),
            other => Err(TableError::UnknownStrategy(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Lines => "lines",
            Strategy::Text => "text",
        }
    }
}

/// Tolerances and thresholds for grid reconstruction.
///
/// All fields must be non-negative; [`TableSettings::validate`] is
/// checked once at [`crate::TableFinder`] construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSettings {
    pub snap_tolerance: f64,
    pub join_tolerance: f64,
    pub intersection_tolerance: f64,
    pub min_words_vertical: usize,
    pub min_words_horizontal: usize,
    pub edge_min_length: f64,
    pub line_tolerance: f64,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            snap_tolerance: DEFAULT_SNAP_TOLERANCE,
            join_tolerance: DEFAULT_JOIN_TOLERANCE,
            intersection_tolerance: DEFAULT_INTERSECTION_TOLERANCE,
            min_words_vertical: DEFAULT_MIN_WORDS_VERTICAL,
            min_words_horizontal: DEFAULT_MIN_WORDS_HORIZONTAL,
            edge_min_length: DEFAULT_EDGE_MIN_LENGTH,
            line_tolerance: DEFAULT_LINE_TOLERANCE,
        }
    }
}

impl TableSettings {
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("snap_tolerance", self.snap_tolerance),
            ("join_tolerance", self.join_tolerance),
            ("intersection_tolerance", self.intersection_tolerance),
            ("edge_min_length", self.edge_min_length),
            ("line_tolerance", self.line_tolerance),
        ];
        for (name, value) in checks {
            if !(value >= 0.0) {
                return Err(TableError::InvalidSetting { name, value });
            }
        }
        Ok(())
    }
}
