use crate::domain::models::run::Record;
use anyhow::{Context, Error};
use std::io::Write;
use std::path::Path;

/// Writes `records` as CSV with a header row taken from the [`Record`] fields.
pub fn write_records<W: Write>(records: &[Record], writer: W) -> Result<(), Error> {
    let mut csv = csv::Writer::from_writer(writer);
    if records.is_empty() {
        csv.write_record(Record::FIELDS)?;
    }
    for record in records {
        csv.serialize(record)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_records_to_path(records: &[Record], path: &Path) -> Result<(), Error> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_records(records, file).with_context(|| format!("Failed to write {}", path.display()))
}
