//! Reads the first worksheet of an `.xlsx` workbook held in memory.

use calamine::{open_workbook_from_rs, Data, Range, Reader, Xlsx, XlsxError};
use std::io::Cursor;
use tracing::trace;

/// The used range of a worksheet as rows of cells. The first row is the header row.
#[derive(Debug, Clone, Default, PartialEq)]
pub(super) struct Sheet {
    /// 1-based spreadsheet row number of the first row in `rows`.
    first_row: usize,
    rows: Vec<Vec<Data>>,
}

impl Sheet {
    /// Opens `bytes` as an xlsx workbook and returns its first worksheet. Errors are returned as
    /// strings because they are only ever shown to the uploader.
    pub(super) fn read(bytes: &[u8]) -> Result<Self, String> {
        let mut workbook: Xlsx<_> =
            open_workbook_from_rs(Cursor::new(bytes)).map_err(|e: XlsxError| e.to_string())?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| String::from("the workbook has no worksheets"))?
            .map_err(|e| e.to_string())?;
        Ok(Self::from_range(&range))
    }

    fn from_range(range: &Range<Data>) -> Self {
        let first_row = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);
        let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
        trace!("Read worksheet with {} rows starting at row {first_row}", rows.len());
        Self { first_row, rows }
    }

    #[cfg(test)]
    pub(super) fn from_rows(rows: Vec<Vec<Data>>) -> Self {
        Self { first_row: 1, rows }
    }

    /// The header row, if the sheet has any content at all.
    pub(super) fn header(&self) -> Option<&[Data]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Data rows paired with their 1-based spreadsheet row numbers. Rows in which every cell is
    /// empty are skipped.
    pub(super) fn data_rows(&self) -> impl Iterator<Item = (usize, &[Data])> {
        let first_row = self.first_row;
        self.rows
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, row)| !row.iter().all(|c| matches!(c, Data::Empty)))
            .map(move |(ix, row)| (first_row + ix, row.as_slice()))
    }
}

/// Renders a cell as text the way a spreadsheet displays it.
pub(super) fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.is_finite() {
                format!("{f:.0}")
            } else {
                format!("{f}")
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => {
            if *b {
                "TRUE".to_string()
            } else {
                "FALSE".to_string()
            }
        }
        Data::Error(e) => format!("#ERROR: {e:?}"),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}
