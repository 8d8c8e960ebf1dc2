//! Advisory header check for customer workbooks.
//!
//! Only the first row of the first sheet is inspected. The backend repeats
//! the check authoritatively, and its verdict wins whenever the two differ.

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use std::fmt;
use std::io::Cursor;
use thiserror::Error;

/// Columns every customer workbook must carry, in reporting order.
pub const REQUIRED_HEADERS: [&str; 10] = [
    "customer",
    "phone",
    "fore_closure",
    "settlement",
    "minimum_part_payment",
    "foreclosure_reward",
    "settlement_reward",
    "minimum_part_payment_reward",
    "payment_url",
    "lender_name",
];

#[derive(Error, Debug)]
pub enum WorkbookError {
    #[error("unreadable workbook: {0}")]
    Unreadable(#[from] calamine::Error),

    #[error("workbook has no sheets")]
    NoSheets,
}

/// A cell of the header row. Text is trimmed; anything else is kept as read
/// and can never satisfy a required header.
#[derive(Clone, Debug, PartialEq)]
pub enum HeaderCell {
    Text(String),
    Other(String),
    Empty,
}

impl From<&Data> for HeaderCell {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::String(s) => HeaderCell::Text(s.trim().to_string()),
            Data::Empty => HeaderCell::Empty,
            other => HeaderCell::Other(other.to_string()),
        }
    }
}

impl fmt::Display for HeaderCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderCell::Text(s) => write!(f, "{s:?}"),
            HeaderCell::Other(s) => write!(f, "{s} (not text)"),
            HeaderCell::Empty => f.write_str("(empty)"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum ValidationOutcome {
    #[default]
    Pending,
    Valid,
    Invalid(Vec<String>),
    ReadError,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }
}

/// Reads the first row of the first sheet. An empty sheet yields no cells.
pub fn read_header_row(bytes: &[u8]) -> Result<Vec<HeaderCell>, WorkbookError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(WorkbookError::NoSheets)??;

    Ok(range
        .rows()
        .next()
        .map(|row| row.iter().map(HeaderCell::from).collect())
        .unwrap_or_default())
}

/// Required headers absent from `row`, in the order of `required`.
pub fn missing_headers(row: &[HeaderCell], required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|header| {
            !row.iter()
                .any(|cell| matches!(cell, HeaderCell::Text(text) if text == *header))
        })
        .map(|header| header.to_string())
        .collect()
}

pub fn validate_headers(bytes: &[u8], required: &[&str]) -> ValidationOutcome {
    let row = match read_header_row(bytes) {
        Ok(row) => row,
        Err(e) => {
            tracing::warn!(error = %e, "failed to read workbook");
            return ValidationOutcome::ReadError;
        }
    };

    let missing = missing_headers(&row, required);
    if missing.is_empty() {
        ValidationOutcome::Valid
    } else {
        ValidationOutcome::Invalid(missing)
    }
}
