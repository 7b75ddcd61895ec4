//! Small symmetric identicons for accounts
//!
//! A 5x5 grid mirrored around the middle column, colored from the account
//! hash. Rendered as blocks in the terminal.

use crate::crypto::AccountId;
use sha2::{Digest, Sha256};

pub const GRID: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identicon {
    pub color: (u8, u8, u8),
    pub cells: [[bool; GRID]; GRID],
}

impl Identicon {
    pub fn for_account(account: &AccountId) -> Self {
        let digest = Sha256::digest(account.0);
        let color = (digest[0], digest[1], digest[2]);

        let mut cells = [[false; GRID]; GRID];
        let half = GRID.div_ceil(2);
        for (row, line) in cells.iter_mut().enumerate() {
            for col in 0..half {
                let on = digest[3 + row * half + col] % 2 == 0;
                line[col] = on;
                line[GRID - 1 - col] = on;
            }
        }

        Identicon { color, cells }
    }

    /// Number of filled cells.
    pub fn filled(&self) -> usize {
        self.cells.iter().flatten().filter(|c| **c).count()
    }

    /// One string per row, two characters per cell.
    pub fn rows(&self) -> Vec<String> {
        self.cells
            .iter()
            .map(|row| {
                row.iter()
                    .map(|on| if *on { "██" } else { "  " })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identicon_is_mirrored() {
        let icon = Identicon::for_account(&AccountId([7; 32]));
        for row in icon.cells.iter() {
            for col in 0..GRID {
                assert_eq!(row[col], row[GRID - 1 - col]);
            }
        }
    }

    #[test]
    fn test_identicon_is_stable_per_account() {
        let a = Identicon::for_account(&AccountId([1; 32]));
        assert_eq!(a, Identicon::for_account(&AccountId([1; 32])));
        assert_ne!(a, Identicon::for_account(&AccountId([2; 32])));
        assert_eq!(a.rows().len(), GRID);
    }
}
