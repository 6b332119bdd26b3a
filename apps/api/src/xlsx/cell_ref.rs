use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const MAX_COLUMN: u32 = 16_384;
const MAX_ROW: u32 = 1_048_576;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid cell reference '{0}'")]
pub struct InvalidCellRef(pub String);

/// An A1-style cell coordinate. Column and row are both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub column: u32,
    pub row: u32,
}

impl CellRef {
    pub fn parse(text: &str) -> Result<Self, InvalidCellRef> {
        let invalid = || InvalidCellRef(text.to_string());

        let split = text
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (letters, digits) = text.split_at(split);
        if letters.is_empty() || letters.len() > 3 || !letters.chars().all(|c| c.is_ascii_uppercase())
        {
            return Err(invalid());
        }
        if digits.starts_with('0') || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let column = letters
            .bytes()
            .fold(0u32, |acc, b| acc * 26 + u32::from(b - b'A' + 1));
        let row: u32 = digits.parse().map_err(|_| invalid())?;

        if column > MAX_COLUMN || row > MAX_ROW {
            return Err(invalid());
        }
        Ok(CellRef { column, row })
    }

    pub fn column_name(&self) -> String {
        let mut n = self.column;
        let mut letters = Vec::new();
        while n > 0 {
            let rem = ((n - 1) % 26) as u8;
            letters.push(char::from(b'A' + rem));
            n = (n - 1) / 26;
        }
        letters.iter().rev().collect()
    }
}

impl FromStr for CellRef {
    type Err = InvalidCellRef;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CellRef::parse(s)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column_name(), self.row)
    }
}
