use crate::core::directory::LicenseDirectory;
use crate::core::store::migrate_licenses;
use crate::domain::model::License;
use crate::domain::ports::{Clock, FileSource, KeyValueStore, Notifier};
use crate::utils::error::{DirectoryError, Result};
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashSet;

pub const EXPORT_FILE_PREFIX: &str = "medical-contacts-export-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBundle {
    pub file_name: String,
    pub contents: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Licenses found in the file. This is the number shown to the user.
    pub in_file: usize,
    pub merged: usize,
    pub skipped: usize,
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("{}{}.json", EXPORT_FILE_PREFIX, date.format("%Y-%m-%d"))
}

pub fn export_json(licenses: &[License]) -> Result<String> {
    Ok(serde_json::to_string_pretty(licenses)?)
}

pub fn export_bundle(licenses: &[License], date: NaiveDate) -> Result<ExportBundle> {
    Ok(ExportBundle {
        file_name: export_file_name(date),
        contents: export_json(licenses)?,
    })
}

/// Parses an export file. The top level must be an array and every element a
/// license record; records without `mode` get the same upgrade as on load.
pub fn parse_import(text: &str) -> Result<Vec<License>> {
    let parsed: Value = serde_json::from_str(text).map_err(|e| DirectoryError::ImportParseError {
        message: e.to_string(),
    })?;

    let Value::Array(items) = migrate_licenses(parsed) else {
        return Err(DirectoryError::format(None, "top-level value is not an array"));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<License>(item).map_err(|e| {
                DirectoryError::format(Some(index), format!("record {}: {}", index, e))
            })
        })
        .collect()
}

/// Appends imported licenses whose id is not already present. Ids repeated
/// inside the file are kept once (first occurrence).
pub fn merge_by_id(current: &[License], imported: Vec<License>) -> (Vec<License>, ImportReport) {
    let in_file = imported.len();
    let mut seen: HashSet<String> = current.iter().map(|l| l.id.clone()).collect();
    let mut merged = current.to_vec();

    for license in imported {
        if seen.insert(license.id.clone()) {
            merged.push(license);
        }
    }

    let added = merged.len() - current.len();
    let report = ImportReport {
        in_file,
        merged: added,
        skipped: in_file - added,
    };
    (merged, report)
}

impl<S: KeyValueStore, N: Notifier, C: Clock> LicenseDirectory<S, N, C> {
    pub fn export(&self, date: NaiveDate) -> Result<ExportBundle> {
        let bundle = export_bundle(self.licenses(), date)?;
        tracing::info!(
            "📦 Exported {} licenses to {}",
            self.licenses().len(),
            bundle.file_name
        );
        self.notifier().success("Data exported successfully");
        Ok(bundle)
    }

    /// Reads, validates and merges a file. On any failure the user is told and
    /// the collection is left as it was.
    pub async fn import<F>(&mut self, source: &F) -> Result<ImportReport>
    where
        F: FileSource + ?Sized,
    {
        tracing::info!("📥 Importing licenses from {}", source.name());

        let outcome = match source.read_text().await {
            Ok(text) => parse_import(&text),
            Err(e) => Err(e),
        };

        let imported = match outcome {
            Ok(imported) => imported,
            Err(e) => {
                tracing::error!("❌ Import from {} failed: {}", source.name(), e);
                self.notifier().error(&e.user_friendly_message());
                return Err(e);
            }
        };

        let (merged, report) = merge_by_id(self.licenses(), imported);
        self.replace_all(move |_| merged);

        tracing::info!(
            "Import merged {} of {} licenses ({} already present)",
            report.merged,
            report.in_file,
            report.skipped
        );
        self.notifier()
            .success(&format!("{} license(s) imported successfully", report.in_file));
        Ok(report)
    }
}
