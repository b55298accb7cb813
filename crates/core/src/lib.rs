//! tessella - table-structure reconstruction from page geometry.
//!
//! Given the geometric primitives of a page region (oriented line
//! segments, positioned words and characters), tessella infers a
//! rectangular cell grid, groups cells into tables, and exposes a
//! structured table model with Markdown and record export.
//!
//! The pipeline is pure and synchronous: a [`TableFinder`] holds only
//! validated settings, and independent regions can be processed from
//! independent threads.

pub mod clustering;
pub mod edges;
pub mod error;
pub mod finder;
pub mod grid;
pub mod intersections;
pub mod table;
pub mod text;
pub mod types;

pub use error::{Result, TableError};
pub use finder::{Region, TableFinder};
pub use table::{Table, TableHeader, TableRow};
pub use types::{BBox, Char, Edge, Orientation, SourceKind, Strategy, TableSettings, Word};
