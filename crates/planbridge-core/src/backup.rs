//! Backup files: a JSON object with one array per collection
//!
//! Restoring is lenient. Missing keys become empty collections, items that
//! fail their structural validator are dropped, and unusable settings fall
//! back to defaults. Everything skipped is listed in a [`RestoreReport`].

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::coerce;
use crate::entity::{
    BoardColumn, BoardLayout, BucketlistItem, Goal, ImportantDate, Project, Sprint, Story,
    Tradition, Vision,
};
use crate::error::{Error, Result};
use crate::settings::Settings;
use crate::snapshot::{Collected, Collections, Snapshot};
use crate::validate::{narrow, Validate};

/// Backup format version
pub const BACKUP_VERSION: i64 = 1;

/// Shape of a backup file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub exported_at: DateTime<Utc>,
    pub version: i64,
    #[serde(flatten)]
    pub snapshot: Snapshot,
}

impl Backup {
    /// Wrap a snapshot, stamped now
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            exported_at: Utc::now(),
            version: BACKUP_VERSION,
            snapshot,
        }
    }

    /// Pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save the backup to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_json()?;
        fs::write(path.as_ref(), content).map_err(|e| Error::FileWrite {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }
}

/// An item left out of a restore
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DroppedItem {
    /// Collection key in the backup (e.g., "importantDates")
    pub collection: String,
    /// Position in the backup array
    pub index: usize,
}

/// What a restore skipped or defaulted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    /// Collection keys absent from the backup
    pub missing: Vec<String>,
    /// Collection keys present but not arrays
    pub malformed: Vec<String>,
    /// Items that failed validation
    pub dropped: Vec<DroppedItem>,
    /// Settings were absent or invalid and defaults were used
    pub settings_defaulted: bool,
}

impl RestoreReport {
    /// True when nothing was present-but-unusable
    pub fn is_clean(&self) -> bool {
        self.malformed.is_empty() && self.dropped.is_empty()
    }
}

/// Result of a lenient restore
#[derive(Debug, Clone, PartialEq)]
pub struct Restored {
    pub snapshot: Snapshot,
    /// `exportedAt` of the backup, when readable
    pub exported_at: Option<DateTime<Utc>>,
    pub report: RestoreReport,
}

fn restore_items<T: Validate + DeserializeOwned>(
    object: &Map<String, Value>,
    key: &str,
    report: &mut RestoreReport,
) -> Vec<T> {
    let items = match object.get(key) {
        None | Some(Value::Null) => {
            report.missing.push(key.to_string());
            return Vec::new();
        }
        Some(Value::Array(items)) => items,
        Some(_) => {
            warn!(collection = key, "backup collection is not an array");
            report.malformed.push(key.to_string());
            return Vec::new();
        }
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(index, value)| {
            let item = narrow::<T>(value);
            if item.is_none() {
                warn!(collection = key, index, "dropping invalid backup item");
                report.dropped.push(DroppedItem {
                    collection: key.to_string(),
                    index,
                });
            }
            item
        })
        .collect()
}

fn restore_collection<T: Collected>(
    object: &Map<String, Value>,
    collections: &mut Collections,
    report: &mut RestoreReport,
) {
    *T::of_mut(collections) = restore_items(object, T::FIELD, report);
}

/// Restore a snapshot from backup JSON.
///
/// Fails only when the text is not JSON or not a JSON object.
pub fn restore(json: &str) -> Result<Restored> {
    let value: Value = serde_json::from_str(json)?;
    let object = value
        .as_object()
        .ok_or_else(|| Error::InvalidBackup("top level is not an object".to_string()))?;

    let mut report = RestoreReport::default();
    let mut collections = Collections::default();

    restore_collection::<Story>(object, &mut collections, &mut report);
    restore_collection::<Goal>(object, &mut collections, &mut report);
    restore_collection::<Project>(object, &mut collections, &mut report);
    restore_collection::<Vision>(object, &mut collections, &mut report);
    restore_collection::<BucketlistItem>(object, &mut collections, &mut report);
    restore_collection::<ImportantDate>(object, &mut collections, &mut report);
    restore_collection::<Tradition>(object, &mut collections, &mut report);
    restore_collection::<Sprint>(object, &mut collections, &mut report);

    let board_columns = restore_items::<BoardColumn>(object, "boardColumns", &mut report);
    let board_layouts = restore_items::<BoardLayout>(object, "boardLayouts", &mut report);

    let settings = match object.get("settings") {
        None | Some(Value::Null) => {
            report.settings_defaulted = true;
            Settings::default()
        }
        Some(value) => narrow::<Settings>(value).unwrap_or_else(|| {
            warn!("backup settings invalid, using defaults");
            report.settings_defaulted = true;
            Settings::default()
        }),
    };

    let exported_at = object
        .get("exportedAt")
        .and_then(Value::as_str)
        .and_then(coerce::timestamp);

    debug!(
        entities = collections.total(),
        dropped = report.dropped.len(),
        "restored backup"
    );

    Ok(Restored {
        snapshot: Snapshot {
            collections,
            board_columns,
            board_layouts,
            settings,
        },
        exported_at,
        report,
    })
}

/// Read and restore a backup file
pub fn load_backup<P: AsRef<Path>>(path: P) -> Result<Restored> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    restore(&content)
}
