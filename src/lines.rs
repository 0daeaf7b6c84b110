//! The twelve fixed line patterns of a 5x5 card and completion detection.

use serde::Serialize;

use std::collections::HashSet;

use crate::card::{CARD_COLUMNS, CARD_ROWS, CardGrid, CardValue};

/// Number of fixed line patterns on a card: 5 rows, 5 columns, 2 diagonals.
pub const LINE_COUNT: usize = 12;

/// Completed lines required to claim bingo, and the number of progress
/// letters a client can light up.
pub const WIN_LINE_COUNT: usize = 5;

/// Ordered progress letters shown to clients.
pub const PROGRESS_LETTERS: [char; WIN_LINE_COUNT] = ['B', 'I', 'N', 'G', 'O'];

/// The fixed patterns as `(row, column)` cells. Indices 0-4 are rows top to
/// bottom, 5-9 are columns left to right, 10 is the main diagonal, 11 the
/// anti-diagonal. The order is stable so clients can reference a line by
/// index across calls.
pub const LINE_PATTERNS: [[(usize, usize); CARD_ROWS]; LINE_COUNT] = build_patterns();

const fn build_patterns() -> [[(usize, usize); CARD_ROWS]; LINE_COUNT] {
    let mut patterns = [[(0, 0); CARD_ROWS]; LINE_COUNT];
    let mut i = 0;
    while i < CARD_ROWS {
        let mut j = 0;
        while j < CARD_COLUMNS {
            patterns[i][j] = (i, j); // row i
            patterns[CARD_ROWS + i][j] = (j, i); // column i
            j += 1;
        }
        patterns[2 * CARD_ROWS][i] = (i, i);
        patterns[2 * CARD_ROWS + 1][i] = (i, CARD_COLUMNS - 1 - i);
        i += 1;
    }
    patterns
}

/// Result of scanning a card against the set of marked values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineProgress {
    /// How many of the twelve patterns are fully marked.
    pub count: usize,
    /// Indices into [`LINE_PATTERNS`] of the completed lines, ascending.
    pub indices: Vec<usize>,
}

/// Compute which line patterns are fully covered by `marked`.
///
/// A line is complete iff every one of its five card values is marked.
pub fn completed_lines(card: &CardGrid, marked: &HashSet<CardValue>) -> LineProgress {
    let mut indices = Vec::new();
    for (index, pattern) in LINE_PATTERNS.iter().enumerate() {
        if pattern
            .iter()
            .all(|&(row, column)| marked.contains(&card[row][column]))
        {
            indices.push(index);
        }
    }
    LineProgress {
        count: indices.len(),
        indices,
    }
}

/// The lit progress letters for a completed-line count, clamped to five.
pub fn lit_letters(count: usize) -> String {
    PROGRESS_LETTERS[..count.min(WIN_LINE_COUNT)].iter().collect()
}
