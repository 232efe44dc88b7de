//! Merge engine for reconciling imported collections with existing ones
//!
//! Two policies exist. `Overwrite` replaces a collection with the imported
//! one. `Merge` keeps every existing item and appends imported items whose
//! dedup key is new; on a key collision the existing copy always wins.
//! Collections are handled independently of each other, and settings are
//! either replaced wholesale or left untouched.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::hash::Hash;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::codec::Record;
use crate::document::ParsedDocument;
use crate::entity::{
    BucketlistItem, Goal, ImportantDate, Project, Sprint, Story, Tradition, Vision,
};
use crate::error::{Error, Result};
use crate::schema::EntityKind;
use crate::settings::Settings;
use crate::snapshot::{Collected, Collections, Snapshot};

/// How an imported collection combines with the existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Replace the existing collection
    Overwrite,
    /// Append imported items with unseen keys
    #[default]
    Merge,
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeMode::Overwrite => write!(f, "overwrite"),
            MergeMode::Merge => write!(f, "merge"),
        }
    }
}

impl FromStr for MergeMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "overwrite" => Ok(MergeMode::Overwrite),
            "merge" => Ok(MergeMode::Merge),
            other => Err(format!("unknown merge mode '{}': expected merge or overwrite", other)),
        }
    }
}

/// Combine two collections under `mode`.
///
/// In merge mode the result is `existing` in its original order followed by
/// the imported items whose key is not among the existing keys, in import
/// order. Duplicate keys inside `imported` itself are not collapsed; use
/// [`dedup_by_key`] first when that matters.
pub fn merge<T, K, F>(existing: &[T], imported: &[T], mode: MergeMode, key_of: F) -> Vec<T>
where
    T: Clone,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    match mode {
        MergeMode::Overwrite => imported.to_vec(),
        MergeMode::Merge => {
            let seen: HashSet<K> = existing.iter().map(&key_of).collect();
            existing
                .iter()
                .chain(imported.iter().filter(|item| !seen.contains(&key_of(*item))))
                .cloned()
                .collect()
        }
    }
}

/// [`merge`] keyed by the record's dedup key
pub fn merge_records<T: Record + Clone>(existing: &[T], imported: &[T], mode: MergeMode) -> Vec<T> {
    merge(existing, imported, mode, T::dedup_key)
}

/// Drop later items whose key was already seen, keeping order
pub fn dedup_by_key<T, K, F>(items: &[T], key_of: F) -> Vec<T>
where
    T: Clone,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| seen.insert(key_of(*item)))
        .cloned()
        .collect()
}

/// Which collections to import, and how
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    pub mode: MergeMode,
    #[serde(rename = "importStories")]
    pub stories: bool,
    #[serde(rename = "importGoals")]
    pub goals: bool,
    #[serde(rename = "importProjects")]
    pub projects: bool,
    #[serde(rename = "importVisions")]
    pub visions: bool,
    #[serde(rename = "importBucketlist")]
    pub bucketlist: bool,
    #[serde(rename = "importImportantDates")]
    pub important_dates: bool,
    #[serde(rename = "importTraditions")]
    pub traditions: bool,
    #[serde(rename = "importSprints")]
    pub sprints: bool,
    /// Replace settings wholesale; never merged
    #[serde(rename = "importSettings")]
    pub settings: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self::all(MergeMode::Merge)
    }
}

impl ImportOptions {
    /// Every collection selected, settings left alone
    pub fn all(mode: MergeMode) -> Self {
        Self {
            mode,
            stories: true,
            goals: true,
            projects: true,
            visions: true,
            bucketlist: true,
            important_dates: true,
            traditions: true,
            sprints: true,
            settings: false,
        }
    }

    /// Nothing selected
    pub fn none(mode: MergeMode) -> Self {
        Self {
            mode,
            stories: false,
            goals: false,
            projects: false,
            visions: false,
            bucketlist: false,
            important_dates: false,
            traditions: false,
            sprints: false,
            settings: false,
        }
    }

    fn flag(&self, kind: EntityKind) -> Option<bool> {
        match kind {
            EntityKind::Story => Some(self.stories),
            EntityKind::Goal => Some(self.goals),
            EntityKind::Project => Some(self.projects),
            EntityKind::Vision => Some(self.visions),
            EntityKind::BucketlistItem => Some(self.bucketlist),
            EntityKind::ImportantDate => Some(self.important_dates),
            EntityKind::Tradition => Some(self.traditions),
            EntityKind::Sprint => Some(self.sprints),
            EntityKind::Settings => Some(self.settings),
            EntityKind::Role | EntityKind::Label => None,
        }
    }

    fn flag_mut(&mut self, kind: EntityKind) -> Option<&mut bool> {
        match kind {
            EntityKind::Story => Some(&mut self.stories),
            EntityKind::Goal => Some(&mut self.goals),
            EntityKind::Project => Some(&mut self.projects),
            EntityKind::Vision => Some(&mut self.visions),
            EntityKind::BucketlistItem => Some(&mut self.bucketlist),
            EntityKind::ImportantDate => Some(&mut self.important_dates),
            EntityKind::Tradition => Some(&mut self.traditions),
            EntityKind::Sprint => Some(&mut self.sprints),
            EntityKind::Settings => Some(&mut self.settings),
            EntityKind::Role | EntityKind::Label => None,
        }
    }

    /// Whether `kind` is selected. Roles and labels ride along with settings.
    pub fn selects(&self, kind: EntityKind) -> bool {
        match kind {
            EntityKind::Role | EntityKind::Label => self.settings,
            _ => self.flag(kind).unwrap_or(false),
        }
    }

    /// Select or deselect `kind`. Roles and labels map to the settings flag.
    pub fn select(&mut self, kind: EntityKind, on: bool) {
        let kind = match kind {
            EntityKind::Role | EntityKind::Label => EntityKind::Settings,
            other => other,
        };
        if let Some(flag) = self.flag_mut(kind) {
            *flag = on;
        }
    }

    /// Load options from a JSON file; absent keys take their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save options to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), content).map_err(|e| Error::FileWrite {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }
}

/// Data offered for import
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Imported {
    pub collections: Collections,
    /// `None` when the source carried no settings; existing settings then
    /// survive even if settings import is selected
    pub settings: Option<Settings>,
}

impl From<Snapshot> for Imported {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            collections: snapshot.collections,
            settings: Some(snapshot.settings),
        }
    }
}

impl From<ParsedDocument> for Imported {
    fn from(doc: ParsedDocument) -> Self {
        let has_settings = doc.settings.is_some() || !doc.roles.is_empty() || !doc.labels.is_empty();
        let snapshot = doc.into_snapshot();
        Self {
            collections: snapshot.collections,
            settings: has_settings.then_some(snapshot.settings),
        }
    }
}

/// Counts for one collection of an import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    pub kind: EntityKind,
    pub selected: bool,
    pub existing: usize,
    pub imported: usize,
    pub result: usize,
}

impl CollectionSummary {
    /// Items in the result that were not there before (merge mode)
    pub fn added(&self) -> usize {
        self.result.saturating_sub(self.existing)
    }
}

/// What an import did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub mode: MergeMode,
    pub collections: Vec<CollectionSummary>,
    pub settings_replaced: bool,
}

impl ImportSummary {
    /// Summary for one kind
    pub fn get(&self, kind: EntityKind) -> Option<&CollectionSummary> {
        self.collections.iter().find(|c| c.kind == kind)
    }
}

/// Merged snapshot plus a summary
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome {
    pub snapshot: Snapshot,
    pub summary: ImportSummary,
}

fn merge_collection<T: Collected>(
    existing: &Collections,
    imported: &Collections,
    options: &ImportOptions,
    merged: &mut Collections,
    summary: &mut ImportSummary,
) {
    let before = T::of(existing);
    let incoming = T::of(imported);
    let selected = options.selects(T::KIND);

    let result = if selected {
        merge_records(before, incoming, options.mode)
    } else {
        before.clone()
    };

    debug!(
        kind = %T::KIND,
        selected,
        existing = before.len(),
        imported = incoming.len(),
        result = result.len(),
        "merged collection"
    );

    summary.collections.push(CollectionSummary {
        kind: T::KIND,
        selected,
        existing: before.len(),
        imported: incoming.len(),
        result: result.len(),
    });
    *T::of_mut(merged) = result;
}

/// Apply an import to an existing snapshot.
///
/// Unselected collections pass through from `existing`. Board columns and
/// layouts always pass through. Settings are replaced only when selected and
/// the import carries settings.
pub fn apply_import(existing: &Snapshot, imported: &Imported, options: &ImportOptions) -> ImportOutcome {
    let mut summary = ImportSummary {
        mode: options.mode,
        collections: Vec::new(),
        settings_replaced: false,
    };
    let mut collections = Collections::default();
    let (old, new) = (&existing.collections, &imported.collections);

    merge_collection::<Story>(old, new, options, &mut collections, &mut summary);
    merge_collection::<Goal>(old, new, options, &mut collections, &mut summary);
    merge_collection::<Project>(old, new, options, &mut collections, &mut summary);
    merge_collection::<Vision>(old, new, options, &mut collections, &mut summary);
    merge_collection::<BucketlistItem>(old, new, options, &mut collections, &mut summary);
    merge_collection::<ImportantDate>(old, new, options, &mut collections, &mut summary);
    merge_collection::<Tradition>(old, new, options, &mut collections, &mut summary);
    merge_collection::<Sprint>(old, new, options, &mut collections, &mut summary);

    let settings = match (&imported.settings, options.settings) {
        (Some(settings), true) => {
            summary.settings_replaced = true;
            settings.clone()
        }
        _ => existing.settings.clone(),
    };

    info!(
        mode = %options.mode,
        added = summary.collections.iter().map(CollectionSummary::added).sum::<usize>(),
        settings_replaced = summary.settings_replaced,
        "applied import"
    );

    ImportOutcome {
        snapshot: Snapshot {
            collections,
            board_columns: existing.board_columns.clone(),
            board_layouts: existing.board_layouts.clone(),
            settings,
        },
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tests::{sample_goal, sample_story};
    use crate::entity::{BoardLayout, Theme};

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        key: &'static str,
        v: u32,
    }

    fn item(key: &'static str, v: u32) -> Item {
        Item { key, v }
    }

    fn key(i: &Item) -> &'static str {
        i.key
    }

    #[test]
    fn test_existing_wins_on_collision() {
        let a = vec![item("x", 1)];
        let b = vec![item("x", 2)];
        assert_eq!(merge(&a, &b, MergeMode::Merge, key), vec![item("x", 1)]);
    }

    #[test]
    fn test_merge_appends_new_in_import_order() {
        let a = vec![item("b", 1), item("a", 1)];
        let b = vec![item("z", 2), item("a", 2), item("c", 2)];
        assert_eq!(
            merge(&a, &b, MergeMode::Merge, key),
            vec![item("b", 1), item("a", 1), item("z", 2), item("c", 2)]
        );
    }

    #[test]
    fn test_overwrite_returns_imported() {
        let a = vec![item("x", 1), item("y", 1)];
        let b = vec![item("q", 2)];
        assert_eq!(merge(&a, &b, MergeMode::Overwrite, key), b);
        assert!(merge(&a, &[], MergeMode::Overwrite, key).is_empty());
    }

    #[test]
    fn test_merge_is_idempotent() {
        let a = vec![item("x", 1), item("y", 1)];
        let b = vec![item("y", 2), item("z", 2)];
        let once = merge(&a, &b, MergeMode::Merge, key);
        let twice = merge(&once, &b, MergeMode::Merge, key);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_sides() {
        let a = vec![item("x", 1)];
        assert_eq!(merge(&a, &[], MergeMode::Merge, key), a);

        // duplicates inside the import are kept as-is
        let b = vec![item("x", 1), item("x", 2)];
        assert_eq!(merge(&[], &b, MergeMode::Merge, key), b);
        assert_eq!(dedup_by_key(&b, key), vec![item("x", 1)]);
    }

    #[test]
    fn test_merge_records_uses_dedup_key() {
        let existing = vec![sample_story("Plan trip")];
        let mut renamed_id = sample_story("  Plan trip ");
        renamed_id.id = "other".to_string();
        let imported = vec![renamed_id, sample_story("Fix bike")];

        let merged = merge_records(&existing, &imported, MergeMode::Merge);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], existing[0]);
        assert_eq!(merged[1].title, "Fix bike");
    }

    #[test]
    fn test_merge_records_keeps_titles_differing_in_case() {
        let existing = vec![sample_story("US taxes")];
        let imported = vec![sample_story("us taxes")];

        let merged = merge_records(&existing, &imported, MergeMode::Merge);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].title, "us taxes");
    }

    fn existing_snapshot() -> Snapshot {
        let mut snapshot = Snapshot::default();
        snapshot.collections.stories = vec![sample_story("Plan trip")];
        snapshot.collections.goals = vec![sample_goal("Run")];
        snapshot.board_layouts = vec![BoardLayout {
            id: "main".to_string(),
            name: "Main".to_string(),
            column_ids: vec![],
        }];
        snapshot
    }

    fn imported_data() -> Imported {
        let mut collections = Collections::default();
        collections.stories = vec![sample_story("Plan trip"), sample_story("Fix bike")];
        collections.goals = vec![sample_goal("Swim")];
        Imported {
            collections,
            settings: Some(Settings::builder().theme(Theme::Dark).build()),
        }
    }

    #[test]
    fn test_unselected_collections_pass_through() {
        let existing = existing_snapshot();
        let mut options = ImportOptions::none(MergeMode::Overwrite);
        options.stories = true;

        let outcome = apply_import(&existing, &imported_data(), &options);
        assert_eq!(outcome.snapshot.collections.stories.len(), 2);
        assert_eq!(outcome.snapshot.collections.goals, existing.collections.goals);
        assert_eq!(outcome.snapshot.board_layouts, existing.board_layouts);
        assert_eq!(outcome.snapshot.settings, existing.settings);
        assert!(!outcome.summary.settings_replaced);

        let goals = outcome.summary.get(EntityKind::Goal).unwrap();
        assert!(!goals.selected);
        assert_eq!(goals.result, 1);
    }

    #[test]
    fn test_merge_mode_across_collections() {
        let existing = existing_snapshot();
        let outcome = apply_import(&existing, &imported_data(), &ImportOptions::default());

        let stories = &outcome.snapshot.collections.stories;
        assert_eq!(stories.len(), 2);
        assert_eq!(stories[1].title, "Fix bike");
        assert_eq!(outcome.snapshot.collections.goals.len(), 2);
        assert_eq!(outcome.summary.get(EntityKind::Story).unwrap().added(), 1);

        let again = apply_import(&outcome.snapshot, &imported_data(), &ImportOptions::default());
        assert_eq!(again.snapshot, outcome.snapshot);
    }

    #[test]
    fn test_settings_replaced_wholesale_or_kept() {
        let existing = existing_snapshot();
        let mut options = ImportOptions::none(MergeMode::Merge);
        options.settings = true;

        let outcome = apply_import(&existing, &imported_data(), &options);
        assert!(outcome.summary.settings_replaced);
        assert_eq!(outcome.snapshot.settings.appearance.theme, Theme::Dark);

        let no_settings = Imported {
            settings: None,
            ..imported_data()
        };
        let outcome = apply_import(&existing, &no_settings, &options);
        assert!(!outcome.summary.settings_replaced);
        assert_eq!(outcome.snapshot.settings, existing.settings);
    }

    #[test]
    fn test_options_select_and_wire_names() {
        let mut options = ImportOptions::none(MergeMode::Merge);
        options.select(EntityKind::ImportantDate, true);
        options.select(EntityKind::Label, true);
        assert!(options.selects(EntityKind::ImportantDate));
        assert!(options.settings);
        assert!(options.selects(EntityKind::Role));

        let value = serde_json::to_value(&options).unwrap();
        assert_eq!(value["mode"], "merge");
        assert_eq!(value["importImportantDates"], true);
        assert_eq!(value["importStories"], false);

        let partial: ImportOptions =
            serde_json::from_str(r#"{"mode":"overwrite","importSettings":true}"#).unwrap();
        assert_eq!(partial.mode, MergeMode::Overwrite);
        assert!(partial.stories);
        assert!(partial.settings);
    }

    #[test]
    fn test_options_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        let options = ImportOptions::none(MergeMode::Overwrite);
        options.save(&path).unwrap();
        assert_eq!(ImportOptions::load(&path).unwrap(), options);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("Overwrite".parse::<MergeMode>().unwrap(), MergeMode::Overwrite);
        assert!("replace".parse::<MergeMode>().is_err());
    }
}
