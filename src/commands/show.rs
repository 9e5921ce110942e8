use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::model::RecordView;
use crate::{Config, Result};

/// Returns the records for (`user_id`, `year`) in calendar order. The message lists one record
/// per line; the structure holds the records themselves.
pub async fn show(config: Config, user_id: i64, year: i64) -> Result<Out<Vec<RecordView>>> {
    let records = config
        .db()
        .read_records(user_id, year)
        .await
        .pub_result(ErrorType::Database)?;

    if records.is_empty() {
        return Ok(Out::new(
            format!("No records for user_id={user_id}, year={year}"),
            records,
        ));
    }

    let mut message = format!(
        "{} records for {} (user_id={user_id}), year={year}",
        records.len(),
        records[0].user_name
    );
    for record in &records {
        message.push_str(&format!(
            "\n  {:<12}{:>16}",
            record.month,
            record.amount.pretty()
        ));
    }
    Ok(Out::new(message, records))
}
