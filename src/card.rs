//! Banded 5x5 card generation and validation.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::collections::HashSet;
use std::ops::RangeInclusive;

/// Numeric type for a single card cell.
pub type CardValue = u16;

/// Columns on a card.
pub const CARD_COLUMNS: usize = 5;
/// Cells per column.
pub const CARD_ROWS: usize = 5;

/// A fully populated card, indexed `[row][column]`.
pub type CardGrid = [[CardValue; CARD_COLUMNS]; CARD_ROWS];

/// Value range and banding rules applied to every card of a match.
///
/// The inclusive range is split into [`CARD_COLUMNS`] contiguous equal-width
/// bands; column `c` may only hold values from band `c`. The default is the
/// classic 1-75 split with 15-wide bands per column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRules {
    /// Smallest callable value.
    pub min_value: CardValue,
    /// Largest callable value.
    pub max_value: CardValue,
}

impl Default for CardRules {
    fn default() -> Self {
        Self {
            min_value: 1,
            max_value: 75,
        }
    }
}

impl CardRules {
    /// Width of each column band.
    fn band_width(&self) -> CardValue {
        (self.max_value - self.min_value + 1) / CARD_COLUMNS as CardValue
    }

    /// Inclusive band of values allowed in the given column.
    pub fn column_band(&self, column: usize) -> RangeInclusive<CardValue> {
        let width = self.band_width();
        let start = self.min_value + width * column as CardValue;
        start..=start + width - 1
    }

    /// Whether a called value falls inside the overall range.
    pub fn contains(&self, value: CardValue) -> bool {
        (self.min_value..=self.max_value).contains(&value)
    }

    /// Whether the range can band a full card: ascending, and wide enough
    /// for five distinct values in every column. Rules failing this would
    /// underflow the banding math or starve the rejection sampler.
    pub fn is_valid(&self) -> bool {
        self.min_value < self.max_value
            && (self.max_value - self.min_value + 1) as usize >= CARD_ROWS * CARD_COLUMNS
    }
}

/// Rejection reasons for a client-supplied card.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardError {
    /// The grid is not 5x5.
    #[error("card must be a {CARD_ROWS}x{CARD_COLUMNS} grid")]
    Shape,
    /// A value appears more than once anywhere on the card.
    #[error("card value {0} appears more than once")]
    Duplicate(CardValue),
    /// A value sits in the wrong column for its band.
    #[error("card value {value} is outside the band for column {column}")]
    OutOfBand {
        /// The offending value.
        value: CardValue,
        /// Zero-based column index.
        column: usize,
    },
}

/// Generate a card whose columns each hold five distinct values drawn
/// uniformly from that column's band.
///
/// Draws by rejection sampling: keep rolling until the column's distinct set
/// reaches five, then place the values in draw order down the column.
pub fn generate_card(rules: &CardRules) -> CardGrid {
    let mut rng = rand::rng();
    let mut grid: CardGrid = [[0; CARD_COLUMNS]; CARD_ROWS];

    for column in 0..CARD_COLUMNS {
        let band = rules.column_band(column);
        let mut drawn: Vec<CardValue> = Vec::with_capacity(CARD_ROWS);
        while drawn.len() < CARD_ROWS {
            let value = rng.random_range(band.clone());
            if !drawn.contains(&value) {
                drawn.push(value);
            }
        }
        for (row, value) in drawn.into_iter().enumerate() {
            grid[row][column] = value;
        }
    }

    grid
}

/// Verify a client-supplied card: 5x5 shape, every cell populated, global
/// uniqueness across all 25 values, and per-column band membership.
pub fn validate_card(cells: &[Vec<CardValue>], rules: &CardRules) -> Result<CardGrid, CardError> {
    if cells.len() != CARD_ROWS || cells.iter().any(|row| row.len() != CARD_COLUMNS) {
        return Err(CardError::Shape);
    }

    let mut grid: CardGrid = [[0; CARD_COLUMNS]; CARD_ROWS];
    let mut seen = HashSet::with_capacity(CARD_ROWS * CARD_COLUMNS);

    for (row_index, row) in cells.iter().enumerate() {
        for (column, &value) in row.iter().enumerate() {
            if !rules.column_band(column).contains(&value) {
                return Err(CardError::OutOfBand { value, column });
            }
            if !seen.insert(value) {
                return Err(CardError::Duplicate(value));
            }
            grid[row_index][column] = value;
        }
    }

    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bands_cover_one_to_seventy_five() {
        let rules = CardRules::default();
        assert_eq!(rules.column_band(0), 1..=15);
        assert_eq!(rules.column_band(2), 31..=45);
        assert_eq!(rules.column_band(4), 61..=75);
    }

    #[test]
    fn generated_cards_are_distinct_and_banded() {
        let rules = CardRules::default();
        for _ in 0..50 {
            let card = generate_card(&rules);
            let mut seen = HashSet::new();
            for row in &card {
                for (column, &value) in row.iter().enumerate() {
                    assert!(rules.column_band(column).contains(&value));
                    assert!(seen.insert(value), "duplicate value {value}");
                }
            }
            assert_eq!(seen.len(), 25);
        }
    }

    #[test]
    fn rule_validity_requires_room_for_a_full_card() {
        assert!(CardRules::default().is_valid());
        assert!(
            CardRules {
                min_value: 1,
                max_value: 25
            }
            .is_valid()
        );
        assert!(
            !CardRules {
                min_value: 1,
                max_value: 24
            }
            .is_valid()
        );
        assert!(
            !CardRules {
                min_value: 50,
                max_value: 20
            }
            .is_valid()
        );
    }

    #[test]
    fn generated_cards_pass_validation() {
        let rules = CardRules::default();
        let card = generate_card(&rules);
        let rows: Vec<Vec<CardValue>> = card.iter().map(|row| row.to_vec()).collect();
        assert_eq!(validate_card(&rows, &rules), Ok(card));
    }

    #[test]
    fn validation_rejects_bad_shape() {
        let rules = CardRules::default();
        let rows = vec![vec![1, 16, 31, 46, 61]; 4];
        assert_eq!(validate_card(&rows, &rules), Err(CardError::Shape));
    }

    #[test]
    fn validation_rejects_duplicates() {
        let rules = CardRules::default();
        let card = generate_card(&rules);
        let mut rows: Vec<Vec<CardValue>> = card.iter().map(|row| row.to_vec()).collect();
        rows[4][0] = rows[0][0];
        assert_eq!(validate_card(&rows, &rules), Err(CardError::Duplicate(rows[0][0])));
    }

    #[test]
    fn validation_rejects_out_of_band_values() {
        let rules = CardRules::default();
        let card = generate_card(&rules);
        let mut rows: Vec<Vec<CardValue>> = card.iter().map(|row| row.to_vec()).collect();
        rows[2][0] = 75; // belongs to the last column's band
        assert_eq!(
            validate_card(&rows, &rules),
            Err(CardError::OutOfBand {
                value: 75,
                column: 0
            })
        );
    }
}
