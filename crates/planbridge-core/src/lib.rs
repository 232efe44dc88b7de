//! planbridge-core: Core library for exchanging personal planning data
//!
//! This library provides functionality to:
//! - Encode and decode planning entities as flat rows of text cells
//! - Read and write multi-section CSV documents with optional header rows
//! - Convert collections to and from grid values for a remote sheet store
//! - Merge imported collections into existing ones by natural key
//! - Save backups and restore them leniently through structural validators

pub mod backup;
pub mod codec;
pub mod coerce;
pub mod document;
pub mod entity;
pub mod error;
pub mod merger;
pub mod registry;
pub mod schema;
pub mod settings;
pub mod sheet;
pub mod snapshot;
pub mod validate;

pub use backup::{load_backup, restore, Backup, RestoreReport, Restored};
pub use codec::{NamedRow, Record, Row, RowView, RowWriter};
pub use document::{parse_document, read_document, write_document, write_document_file, ParsedDocument};
pub use entity::{
    BoardColumn, BoardLayout, BucketlistItem, ChecklistItem, Goal, ImportantDate, Label, Project,
    Role, Sprint, Story, Tradition, Vision,
};
pub use error::{Error, Result};
pub use merger::{apply_import, merge, ImportOptions, ImportOutcome, ImportSummary, Imported, MergeMode};
pub use registry::{registry, KindSpec};
pub use schema::{EntityKind, Schema};
pub use settings::{Settings, SettingsBuilder};
pub use snapshot::{Collected, Collections, Snapshot};
pub use validate::{narrow, Validate};
