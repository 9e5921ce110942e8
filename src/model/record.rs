use crate::model::{Amount, MonthLabel};
use serde::{Deserialize, Serialize};

/// A validated spreadsheet row, ready to be written for some user and year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRow {
    pub(crate) month: MonthLabel,
    pub(crate) amount: Amount,
}

impl UploadRow {
    pub fn new(month: MonthLabel, amount: Amount) -> Self {
        Self { month, amount }
    }

    pub fn month(&self) -> &MonthLabel {
        &self.month
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }
}

/// A stored financial record joined with the owning user's name. This is the shape returned by
/// `GET /api/finances/:user_id/:year`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordView {
    pub user_name: String,
    pub month: MonthLabel,
    pub amount: Amount,
}

/// The outcome of a successful upload.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub message: String,
    pub inserted_count: u64,
}

impl UploadSummary {
    pub fn new(user_id: i64, year: i64, inserted_count: u64) -> Self {
        Self {
            message: format!(
                "Uploaded {inserted_count} rows for user_id={user_id}, year={year}"
            ),
            inserted_count,
        }
    }
}
