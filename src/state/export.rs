//! Progress export/import for backups between sessions of the room.

use super::AppState;
use crate::error::GameResult;
use crate::types::{Identity, ProgressRecord, PUZZLE_COUNT};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Schema version for export format compatibility
pub const EXPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressExport {
    pub schema_version: u32,
    /// Export timestamp (ISO8601)
    pub exported_at: String,
    pub records: Vec<ProgressRecord>,
}

impl ProgressExport {
    pub fn new(mut records: Vec<ProgressRecord>) -> Self {
        records.sort_by(|a, b| {
            (&a.team_id, &a.player_name).cmp(&(&b.team_id, &b.player_name))
        });
        Self {
            schema_version: EXPORT_SCHEMA_VERSION,
            exported_at: chrono::Utc::now().to_rfc3339(),
            records,
        }
    }

    /// Validate the export before import
    pub fn validate(&self) -> Result<(), String> {
        if self.schema_version > EXPORT_SCHEMA_VERSION {
            return Err(format!(
                "Export schema version {} is newer than supported version {}. \
                 Please update the server.",
                self.schema_version, EXPORT_SCHEMA_VERSION
            ));
        }

        let mut seen = HashSet::new();
        for record in &self.records {
            let identity = record.identity();
            let key = identity.storage_key();
            if Identity::new(&record.player_name, &record.team_id).as_ref() != Some(&identity) {
                return Err(format!("Record '{}' has a malformed identity", key));
            }
            if !seen.insert(identity) {
                return Err(format!("Record '{}' appears more than once", key));
            }
            if usize::from(record.current_page) > PUZZLE_COUNT {
                return Err(format!(
                    "Record '{}' has current_page {} beyond the last puzzle",
                    key, record.current_page
                ));
            }
        }
        Ok(())
    }
}

impl AppState {
    pub async fn export_progress(&self) -> GameResult<ProgressExport> {
        let records = self.store.list_all().await?;
        tracing::info!(records = records.len(), "Exported progress");
        Ok(ProgressExport::new(records))
    }

    /// Write every record in the export; existing records with the same key
    /// are overwritten. Returns how many were imported.
    pub async fn import_progress(&self, export: ProgressExport) -> Result<usize, String> {
        export.validate()?;
        let count = export.records.len();
        for record in export.records {
            self.store
                .upsert(record)
                .await
                .map_err(|e| e.to_string())?;
        }
        tracing::info!(records = count, "Imported progress");
        Ok(count)
    }
}
