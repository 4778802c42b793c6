use crate::models::CleanRecord;
use anyhow::{anyhow, Context, Result};
use std::path::Path;

pub async fn write_json(path: &Path, records: &[CleanRecord]) -> Result<()> {
    super::write_json(path, records).await
}

/// CSV with one column per `CleanRecord` field; missing values are empty cells.
pub async fn write_csv(path: &Path, records: &[CleanRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer
            .serialize(record)
            .with_context(|| format!("Failed to encode CSV row for {:?}", record.url))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to finish CSV: {}", e.error()))?;

    super::write_atomic(path, &bytes).await
}
