//! Types that represent the core data model: amounts, month labels and records.
mod amount;
mod month;
mod record;

pub use amount::{Amount, AmountError};
pub use month::{month_rank, title_case, MonthLabel, MONTH_ORDER, UNRECOGNIZED_RANK};
pub use record::{RecordView, UploadRow, UploadSummary};
