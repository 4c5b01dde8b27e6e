use std::path::Path;

use tracing::{info, warn};

use crate::error::Result;
use crate::types::{HealthRecord, HealthStatus};

/// Write `record` to `<dir>/<job>.json`, overwriting any previous record for
/// that job. One file per job keeps concurrent writes from the three jobs
/// from racing on the same file.
pub fn write(dir: &Path, record: &HealthRecord) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.json", record.job));
    let body = serde_json::to_vec_pretty(record)?;
    std::fs::write(&path, body)?;

    match record.status {
        HealthStatus::Healthy => info!(job = %record.job, processed = record.processed, "job health: healthy"),
        HealthStatus::Unhealthy => {
            warn!(job = %record.job, processed = record.processed, errors = record.errors, "job health: unhealthy")
        }
    }
    Ok(())
}
