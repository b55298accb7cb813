//! Character grouping and text assembly for cell contents.
//!
//! Words normally arrive pre-grouped from the rendering engine; the
//! fallback here synthesizes them from characters when a region only
//! carries the finer-grained primitives.

use crate::clustering::cluster_objects;
use crate::types::{Char, Word};

// Gap thresholds for grouping characters, matching the original
// word-synthesis heuristics (same line within 2pt, gap up to 3pt).
const WORD_LINE_TOLERANCE: f64 = 2.0;
const WORD_GAP_TOLERANCE: f64 = 3.0;

fn expand_ligature(text: &str) -> &str {
    match text {
        "\u{fb00}" => "ff",
        "\u{fb01}" => "fi",
        "\u{fb02}" => "fl",
        "\u{fb03}" => "ffi",
        "\u{fb04}" => "ffl",
        "\u{fb05}" => "st",
        "\u{fb06}" => "st",
        _ => text,
    }
}

fn chars_to_word(chars: &[&Char]) -> Word {
    let mut x0 = f64::INFINITY;
    let mut top = f64::INFINITY;
    let mut x1 = f64::NEG_INFINITY;
    let mut bottom = f64::NEG_INFINITY;
    let mut text = String::new();
    for c in chars {
        x0 = x0.min(c.x0);
        top = top.min(c.top);
        x1 = x1.max(c.x1);
        bottom = bottom.max(c.bottom);
        text.push_str(expand_ligature(&c.text));
    }
    Word {
        x0,
        top,
        x1,
        bottom,
        text,
    }
}

/// Group characters into words by proximity: same line within 2pt,
/// horizontal gap no wider than 3pt. Whitespace characters split words
/// and are dropped.
pub fn chars_to_words(chars: &[Char]) -> Vec<Word> {
    let mut sorted: Vec<&Char> = chars.iter().collect();
    sorted.sort_by(|a, b| {
        (a.top, a.x0)
            .partial_cmp(&(b.top, b.x0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut words: Vec<Word> = Vec::new();
    let mut current: Vec<&Char> = Vec::new();
    for c in sorted {
        if c.text.chars().all(char::is_whitespace) {
            if !current.is_empty() {
                words.push(chars_to_word(&current));
                current.clear();
            }
            continue;
        }
        if let Some(last) = current.last() {
            let same_line = (c.top - last.top).abs() <= WORD_LINE_TOLERANCE;
            let adjacent = c.x0 - last.x1 <= WORD_GAP_TOLERANCE;
            if !(same_line && adjacent) {
                words.push(chars_to_word(&current));
                current.clear();
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(chars_to_word(&current));
    }
    words
}

/// Assemble the text of one cell: characters clustered into lines by
/// `line_tolerance` on top, each line read left to right with single
/// spaces between words, lines joined with newlines.
pub fn assemble_text(chars: &[&Char], line_tolerance: f64) -> String {
    if chars.is_empty() {
        return String::new();
    }
    let lines = cluster_objects(chars, |c| c.top, line_tolerance);
    let mut out = String::new();
    for (i, line) in lines.into_iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let mut line = line;
        line.sort_by(|a, b| a.x0.partial_cmp(&b.x0).unwrap_or(std::cmp::Ordering::Equal));
        let mut prev_x1: Option<f64> = None;
        for c in line {
            if c.text.chars().all(char::is_whitespace) {
                prev_x1 = Some(c.x1);
                continue;
            }
            if let Some(x1) = prev_x1 {
                if c.x0 - x1 > WORD_GAP_TOLERANCE {
                    out.push(' ');
                }
            }
            out.push_str(expand_ligature(&c.text));
            prev_x1 = Some(c.x1);
        }
    }
    out
}
