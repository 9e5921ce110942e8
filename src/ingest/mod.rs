//! Validation and normalization of uploaded spreadsheets.
//!
//! `validate` turns the raw bytes of an `.xlsx` upload into an ordered list of `UploadRow`s or
//! a classified `IngestError`. It has no side effects, so it always runs before any database work.

mod columns;
mod workbook;

use crate::model::{Amount, MonthLabel, UploadRow};
use calamine::Data;
use columns::Columns;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;
use workbook::{cell_to_string, Sheet};

/// The header of the month column.
pub const MONTH: &str = "Month";

/// The header of the amount column.
pub const AMOUNT: &str = "Amount";

/// Columns that every upload must have. Other columns are ignored.
pub const REQUIRED_COLUMNS: [&str; 2] = [MONTH, AMOUNT];

/// The only file extension accepted for uploads.
pub const XLSX_EXTENSION: &str = ".xlsx";

/// Why an upload was rejected. Every variant is the uploader's problem, never the server's.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IngestError {
    /// The bytes are not a readable xlsx workbook.
    #[error("Failed to read Excel: {0}")]
    Parse(String),

    /// The header row lacks one or more required columns. `expected` is always the full, sorted
    /// list of required columns.
    #[error("Missing required columns. Expected {expected:?}")]
    Schema {
        expected: Vec<&'static str>,
        missing: Vec<&'static str>,
    },

    /// A value in the amount column could not be read as a number.
    #[error("Amount column must be numeric (row {row}: '{value}' is not a number)")]
    NotNumeric { row: usize, value: String },
}

impl IngestError {
    fn schema(missing: Vec<&'static str>) -> Self {
        let mut expected = REQUIRED_COLUMNS.to_vec();
        expected.sort_unstable();
        IngestError::Schema { expected, missing }
    }
}

/// Returns true if `file_name` ends with `.xlsx`, ignoring case.
pub fn has_xlsx_extension(file_name: &str) -> bool {
    file_name.to_lowercase().ends_with(XLSX_EXTENSION)
}

/// Parses and validates an uploaded workbook.
///
/// - The first worksheet is read; its first row is the header row.
/// - `Month` and `Amount` must both be present.
/// - Each month is trimmed and title-cased.
/// - Each amount must be numeric; a single bad value rejects the whole upload.
///
/// Rows come back in spreadsheet order. A sheet with only a header yields an empty vector.
pub fn validate(bytes: &[u8]) -> Result<Vec<UploadRow>, IngestError> {
    let sheet = Sheet::read(bytes).map_err(IngestError::Parse)?;
    let columns = sheet.header().map(Columns::new).unwrap_or_default();

    let (Some(month_ix), Some(amount_ix)) = (columns.index(MONTH), columns.index(AMOUNT)) else {
        return Err(IngestError::schema(columns.missing(&REQUIRED_COLUMNS)));
    };

    let mut rows = Vec::new();
    for (row_number, cells) in sheet.data_rows() {
        let month = MonthLabel::normalize(cells.get(month_ix).map(cell_to_string).unwrap_or_default());
        let amount_cell = cells.get(amount_ix).unwrap_or(&Data::Empty);
        let amount = parse_amount(amount_cell).ok_or_else(|| IngestError::NotNumeric {
            row: row_number,
            value: cell_to_string(amount_cell),
        })?;
        rows.push(UploadRow::new(month, amount));
    }

    debug!("Validated {} rows", rows.len());
    Ok(rows)
}

/// Numeric cells are taken as they are, text cells must parse as a number. Booleans, dates,
/// errors and empty cells are not numbers.
fn parse_amount(cell: &Data) -> Option<Amount> {
    match cell {
        Data::Float(f) => Amount::from_f64(*f),
        Data::Int(i) => Some(Amount::from(*i)),
        Data::String(s) => Amount::from_str(s).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{xlsx, Cell};

    fn months(rows: &[UploadRow]) -> Vec<&str> {
        rows.iter().map(|r| r.month().as_str()).collect()
    }

    fn amounts(rows: &[UploadRow]) -> Vec<f64> {
        rows.iter().map(|r| r.amount().to_f64()).collect()
    }

    #[test]
    fn test_validate_normalizes_rows_in_order() {
        let bytes = xlsx(&[
            vec![Cell::text("Month"), Cell::text("Amount")],
            vec![Cell::text("  march "), Cell::number(300.0)],
            vec![Cell::text("JAN"), Cell::number(100.25)],
            vec![Cell::text("february"), Cell::text(" 200 ")],
        ]);
        let rows = validate(&bytes).unwrap();
        assert_eq!(months(&rows), vec!["March", "Jan", "February"]);
        assert_eq!(amounts(&rows), vec![300.0, 100.25, 200.0]);
    }

    #[test]
    fn test_validate_header_only_is_empty() {
        let bytes = xlsx(&[vec![Cell::text("Month"), Cell::text("Amount")]]);
        assert!(validate(&bytes).unwrap().is_empty());
    }

    #[test]
    fn test_validate_ignores_extra_columns_and_order() {
        let bytes = xlsx(&[
            vec![Cell::text("Amount"), Cell::text("Note"), Cell::text("Month")],
            vec![Cell::number(5.0), Cell::text("rent"), Cell::text("apr")],
        ]);
        let rows = validate(&bytes).unwrap();
        assert_eq!(months(&rows), vec!["Apr"]);
        assert_eq!(amounts(&rows), vec![5.0]);
    }

    #[test]
    fn test_validate_keeps_duplicate_months() {
        let bytes = xlsx(&[
            vec![Cell::text("Month"), Cell::text("Amount")],
            vec![Cell::text("Jan"), Cell::number(1.0)],
            vec![Cell::text("Jan"), Cell::number(2.0)],
        ]);
        let rows = validate(&bytes).unwrap();
        assert_eq!(months(&rows), vec!["Jan", "Jan"]);
    }

    #[test]
    fn test_validate_numeric_month_becomes_text() {
        let bytes = xlsx(&[
            vec![Cell::text("Month"), Cell::text("Amount")],
            vec![Cell::number(3.0), Cell::number(10.0)],
        ]);
        let rows = validate(&bytes).unwrap();
        assert_eq!(months(&rows), vec!["3"]);
    }

    #[test]
    fn test_validate_skips_blank_rows() {
        let bytes = xlsx(&[
            vec![Cell::text("Month"), Cell::text("Amount")],
            vec![Cell::text("Jan"), Cell::number(1.0)],
            vec![Cell::Empty, Cell::Empty],
            vec![Cell::text("Feb"), Cell::number(2.0)],
        ]);
        assert_eq!(validate(&bytes).unwrap().len(), 2);
    }

    #[test]
    fn test_validate_missing_amount_names_both_columns() {
        let bytes = xlsx(&[
            vec![Cell::text("Month"), Cell::text("Total")],
            vec![Cell::text("Jan"), Cell::number(1.0)],
        ]);
        let err = validate(&bytes).unwrap_err();
        assert_eq!(
            err,
            IngestError::Schema {
                expected: vec!["Amount", "Month"],
                missing: vec!["Amount"],
            }
        );
        assert_eq!(
            err.to_string(),
            r#"Missing required columns. Expected ["Amount", "Month"]"#
        );
    }

    #[test]
    fn test_validate_missing_month_names_both_columns() {
        let bytes = xlsx(&[vec![Cell::text("Amount")], vec![Cell::number(1.0)]]);
        let err = validate(&bytes).unwrap_err();
        assert!(err.to_string().contains(r#"["Amount", "Month"]"#));
    }

    #[test]
    fn test_validate_column_names_are_case_sensitive() {
        let bytes = xlsx(&[vec![Cell::text("month"), Cell::text("amount")]]);
        let err = validate(&bytes).unwrap_err();
        assert!(matches!(err, IngestError::Schema { .. }));
    }

    #[test]
    fn test_validate_empty_sheet_is_schema_error() {
        let bytes = xlsx(&[]);
        let err = validate(&bytes).unwrap_err();
        assert!(matches!(err, IngestError::Schema { .. }));
    }

    #[test]
    fn test_validate_non_numeric_amount_rejects_batch() {
        let bytes = xlsx(&[
            vec![Cell::text("Month"), Cell::text("Amount")],
            vec![Cell::text("Jan"), Cell::number(1.0)],
            vec![Cell::text("Feb"), Cell::text("abc")],
        ]);
        let err = validate(&bytes).unwrap_err();
        assert_eq!(
            err,
            IngestError::NotNumeric {
                row: 3,
                value: "abc".to_string()
            }
        );
        assert!(err.to_string().starts_with("Amount column must be numeric"));
    }

    #[test]
    fn test_validate_empty_amount_is_not_numeric() {
        let bytes = xlsx(&[
            vec![Cell::text("Month"), Cell::text("Amount")],
            vec![Cell::text("Jan"), Cell::Empty],
        ]);
        let err = validate(&bytes).unwrap_err();
        assert!(matches!(err, IngestError::NotNumeric { row: 2, .. }));
    }

    #[test]
    fn test_validate_empty_month_is_stored_as_empty_label() {
        let bytes = xlsx(&[
            vec![Cell::text("Month"), Cell::text("Amount")],
            vec![Cell::Empty, Cell::number(5.0)],
            vec![Cell::text("   "), Cell::number(6.0)],
        ]);
        let rows = validate(&bytes).unwrap();
        assert_eq!(months(&rows), vec!["", ""]);
        assert_eq!(amounts(&rows), vec![5.0, 6.0]);
    }

    #[test]
    fn test_validate_keeps_extreme_and_precise_amounts() {
        let precise = 123456789.12345678_f64;
        let bytes = xlsx(&[
            vec![Cell::text("Month"), Cell::text("Amount")],
            vec![Cell::text("Jan"), Cell::number(1e30)],
            vec![Cell::text("Feb"), Cell::number(1e-30)],
            vec![Cell::text("Mar"), Cell::text("1e30")],
            vec![Cell::text("Apr"), Cell::text("1e-30")],
            vec![Cell::text("May"), Cell::number(precise)],
            vec![Cell::text("Jun"), Cell::text("123456789.12345678")],
        ]);
        let rows = validate(&bytes).unwrap();
        assert_eq!(
            amounts(&rows),
            vec![1e30, 1e-30, 1e30, 1e-30, precise, precise]
        );
    }

    #[test]
    fn test_validate_boolean_amount_is_not_numeric() {
        let bytes = xlsx(&[
            vec![Cell::text("Month"), Cell::text("Amount")],
            vec![Cell::text("Jan"), Cell::Bool(true)],
        ]);
        assert!(matches!(
            validate(&bytes).unwrap_err(),
            IngestError::NotNumeric { .. }
        ));
    }

    #[test]
    fn test_validate_garbage_is_parse_error() {
        let err = validate(b"Month,Amount\nJan,1\n").unwrap_err();
        assert!(matches!(err, IngestError::Parse(_)));
        assert!(err.to_string().starts_with("Failed to read Excel: "));
    }

    #[test]
    fn test_sample_workbook_is_valid() {
        let rows = validate(crate::server::SAMPLE_XLSX).unwrap();
        assert_eq!(rows.len(), 12);
        assert_eq!(rows[0].month().as_str(), "Jan");
    }

    #[test]
    fn test_has_xlsx_extension() {
        assert!(has_xlsx_extension("finances.xlsx"));
        assert!(has_xlsx_extension("FINANCES.XLSX"));
        assert!(!has_xlsx_extension("finances.xls"));
        assert!(!has_xlsx_extension("finances.csv"));
        assert!(!has_xlsx_extension("xlsx"));
    }
}
